//! `exit` and `wait`: task termination and zombie reaping.
//!
//! Only an LWP anchor calls `exit` (a member calls
//! [`crate::process::thread::thread_exit`] instead); exiting an anchor
//! takes its whole group down with it, reparents its children to task 1
//! (`init`, if present), wakes its own parent, and never returns.

use crate::error::{KernelError, KernelResult};
use crate::process::pcb::{TaskId, TaskState};
use crate::process::table::{sched_lock, Kernel};

const INIT_TASK: TaskId = 1;

fn reparent_children(k: &mut Kernel, of: TaskId) {
    reparent_children_to(k, of, INIT_TASK);
}

/// Reparent every live child of `of` to `new_parent`, waking `new_parent`
/// so a `wait` blocked there notices the new children. Used both by `exit`
/// (orphans go to `init`) and by
/// [`crate::process::thread::thread_exit`] (a dying LWP member's own
/// children, if it had forked any, go to its group's anchor instead).
pub(crate) fn reparent_children_to(k: &mut Kernel, of: TaskId, new_parent: TaskId) {
    let children: alloc::vec::Vec<TaskId> = k
        .children_of(of)
        .filter(|t| t.state != TaskState::Unused)
        .map(|t| t.id)
        .collect();
    for child in children.iter().copied() {
        if let Some(t) = k.task_mut(child) {
            t.parent = if t.id == new_parent { None } else { Some(new_parent) };
        }
    }
    if !children.is_empty() {
        crate::process::wait::wakeup_locked(k, new_parent as usize);
    }
}

/// Terminate the calling anchor and its whole LWP group with `retval` as
/// the anchor's exit status. Never returns.
pub fn exit(retval: i64) -> ! {
    let id = crate::process::current_id().expect("exit with no current task");
    {
        let mut k = sched_lock();
        debug_assert!(
            k.task(id).map(|t| t.is_anchor()).unwrap_or(false),
            "exit called by a non-anchor LWP member"
        );

        let members: alloc::vec::Vec<TaskId> = k
            .tasks
            .iter()
            .filter(|t| t.state != TaskState::Unused && t.anchor_id() == id && t.id != id)
            .map(|t| t.id)
            .collect();
        for member in members {
            if let Some(t) = k.task_mut(member) {
                t.state = TaskState::Zombie;
            }
            // Wake anyone blocked in `thread_join(member)` before freeing
            // the slot out from under them -- the channel is the member's
            // own id, same as `thread_join`'s `sleept(id as usize, ..)`.
            crate::process::wait::wakeup_locked(&mut k, member as usize);
            k.free(member);
        }

        reparent_children(&mut k, id);

        let parent = k.task(id).and_then(|t| t.parent);
        if let Some(t) = k.task_mut(id) {
            t.lwp.retval = retval;
            t.state = TaskState::Zombie;
        }
        k.qpop(id);
        if let Some(parent) = parent {
            crate::process::wait::wakeup_locked(&mut k, parent as usize);
        }
    }
    crate::sched::yield_to_scheduler();
    unreachable!("a zombie anchor must never be rescheduled");
}

/// Block until any child anchor of the caller becomes a zombie, then reap
/// it and return its id. Returns [`KernelError::NotOurChild`] only if the
/// caller has no children left to wait for at all.
pub fn wait() -> KernelResult<TaskId> {
    let caller = crate::process::current_id().ok_or(KernelError::NotFound {
        resource: "current task",
        id: 0,
    })?;
    let mut k = sched_lock();
    loop {
        let mut has_children = false;
        let zombie = {
            let mut found = None;
            for child in k.children_of(caller) {
                if child.state == TaskState::Unused {
                    continue;
                }
                has_children = true;
                if child.state == TaskState::Zombie {
                    found = Some(child.id);
                    break;
                }
            }
            found
        };
        if let Some(child) = zombie {
            k.free(child);
            return Ok(child);
        }
        if !has_children {
            return Err(KernelError::NotOurChild);
        }
        k = crate::process::wait::sleep(caller as usize, k);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::table::sched_lock;

    #[test]
    fn wait_with_no_children_reports_not_our_child() {
        let mut k = sched_lock();
        let id = k.alloc().unwrap();
        k.task_mut(id).unwrap().state = TaskState::Runnable;
        drop(k);
        crate::process::set_current_id(Some(id));
        assert_eq!(wait(), Err(KernelError::NotOurChild));
        crate::process::set_current_id(None);
    }

    #[test]
    fn wait_reaps_an_already_zombie_child() {
        let mut k = sched_lock();
        let parent = k.alloc().unwrap();
        k.task_mut(parent).unwrap().state = TaskState::Runnable;
        let child = k.alloc().unwrap();
        {
            let t = k.task_mut(child).unwrap();
            t.parent = Some(parent);
            t.state = TaskState::Zombie;
        }
        drop(k);
        crate::process::set_current_id(Some(parent));
        assert_eq!(wait(), Ok(child));
        crate::process::set_current_id(None);
    }
}
