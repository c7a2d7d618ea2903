//! Component D: the LWP (light-weight process) layer.
//!
//! Every member of an LWP group shares its anchor's address-space sizing
//! (`sz`/`hpsz`); only the anchor is ever linked into the MLFQ or stride
//! set. Which member actually runs during the anchor's turn is
//! [`nextlwp`]'s job: a round robin over the group, memoized on the
//! anchor's own `schidx` so consecutive picks don't restart from the
//! first member every time.

use crate::arch::context::Context;
use crate::config::NOFILE;
use crate::error::{KernelError, KernelResult};
use crate::process::pcb::{TaskId, TaskState};
use crate::process::table::Kernel;

/// Stack slots per group, including slot 0 (the anchor). Bounded by the
/// fixed-size `lwpidx`-derived kernel stack region, not by the task
/// table itself.
const MAX_LWP_PER_GROUP: u32 = 16;
const LWP_STACK_SIZE: usize = 16 * 1024;
const LWP_STACK_BASE: usize = 0x4000_0000;

fn group_members(k: &Kernel, anchor: TaskId) -> alloc::vec::Vec<TaskId> {
    let mut v: alloc::vec::Vec<TaskId> = k
        .tasks
        .iter()
        .filter(|t| t.state != TaskState::Unused && t.anchor_id() == anchor)
        .map(|t| t.id)
        .collect();
    v.sort_unstable();
    v
}

/// The next `Runnable` member of `anchor`'s group to run, round robin from
/// the anchor's memoized position. Returns `None` if no member is
/// currently runnable (the whole group is asleep or zombie).
pub fn nextlwp(k: &mut Kernel, anchor: TaskId) -> Option<TaskId> {
    let members = group_members(k, anchor);
    if members.is_empty() {
        return None;
    }
    let start = k
        .task(anchor)
        .map(|t| t.lwp.schidx as usize % members.len())
        .unwrap_or(0);
    for offset in 0..members.len() {
        let idx = (start + offset) % members.len();
        let candidate = members[idx];
        if k.task(candidate)
            .map(|t| {
                t.state == TaskState::Runnable
                    || t.state
                        == TaskState::Sleeping(crate::process::pcb::SleepReason::ThreadJoin)
            })
            .unwrap_or(false)
        {
            if let Some(a) = k.task_mut(anchor) {
                a.lwp.schidx = (idx as u32 + 1) % members.len() as u32;
            }
            return Some(candidate);
        }
    }
    None
}

/// Grow (or shrink, if `delta` is negative) the calling task's LWP
/// group's shared address-space size. No real paging backs this (see
/// spec non-goals); `sz` is bookkeeping shared by every member.
pub fn growproc(delta: isize) -> KernelResult<usize> {
    let caller = crate::process::current_id()
        .ok_or(KernelError::NotFound { resource: "current task", id: 0 })?;
    let mut k = crate::process::table::sched_lock();
    let anchor = k.task(caller).map(|t| t.anchor_id()).unwrap_or(caller);
    let t = k
        .task_mut(anchor)
        .ok_or(KernelError::ProcessNotFound { pid: anchor as u64 })?;
    let new_sz = if delta >= 0 {
        t.sz.saturating_add(delta as usize)
    } else {
        t.sz.saturating_sub((-delta) as usize)
    };
    t.sz = new_sz;
    Ok(new_sz)
}

/// Create a new task in the caller's LWP group, running `entry(arg)` on a
/// fresh stack slot. The new task shares the group's `sz`/`hpsz` and open
/// files, and is `Runnable` immediately -- it is not itself MLFQ/stride
/// visible, only reachable via the anchor's turn through [`nextlwp`].
pub fn thread_create(entry: usize, arg: usize) -> KernelResult<TaskId> {
    let caller = crate::process::current_id()
        .ok_or(KernelError::NotFound { resource: "current task", id: 0 })?;
    let mut k = crate::process::table::sched_lock();
    let anchor = k.task(caller).map(|t| t.anchor_id()).unwrap_or(caller);

    let used: alloc::vec::Vec<u32> = group_members(&k, anchor)
        .into_iter()
        .filter_map(|id| k.task(id).map(|t| t.lwp.lwpidx))
        .collect();
    let lwpidx = (1..MAX_LWP_PER_GROUP)
        .find(|i| !used.contains(i))
        .ok_or(KernelError::NoFreeLwpIndex)?;

    let (sz, hpsz, open_files) = k
        .task(anchor)
        .map(|t| (t.sz, t.hpsz, t.open_files))
        .unwrap_or((0, 0, [false; NOFILE]));

    let id = k.alloc()?;
    let stack_top = LWP_STACK_BASE + lwpidx as usize * LWP_STACK_SIZE + LWP_STACK_SIZE;
    {
        let t = k.task_mut(id).expect("just allocated");
        t.set_name("lwp");
        t.parent = Some(caller);
        t.oproc = Some(anchor);
        t.sz = sz;
        t.hpsz = hpsz;
        t.open_files = open_files;
        t.lwp.lwpidx = lwpidx;
        t.kstack = stack_top;
        // A fresh LWP's stack is built the same way a brand new task's
        // would be: a one-frame call into `entry(arg)` whose return
        // address is a sentinel -- ordinary threads never return, they
        // call `thread_exit`.
        t.context = Context::new_user(entry, stack_top);
        t.context.set_return_value(arg);
        t.state = TaskState::Runnable;
    }
    Ok(id)
}

/// Exit the calling task (which must not be its group's anchor --
/// `exit()` is how an anchor terminates) with `retval`, reparenting any
/// children it forked to its group's anchor, waking anyone joined on it,
/// and freeing its slot immediately.
pub fn thread_exit(retval: i64) -> ! {
    let id = crate::process::current_id().expect("thread_exit with no current task");
    {
        let mut k = crate::process::table::sched_lock();
        let anchor = k.task(id).map(|t| t.anchor_id()).unwrap_or(id);
        if let Some(t) = k.task_mut(id) {
            debug_assert!(!t.is_anchor(), "thread_exit called on an LWP anchor");
            t.lwp.retval = retval;
            t.state = TaskState::Zombie;
        }
        crate::process::exit::reparent_children_to(&mut k, id, anchor);
        crate::process::wait::wakeup_locked(&mut k, id as usize);
    }
    crate::sched::yield_to_scheduler();
    unreachable!("a zombie task must never be rescheduled");
}

/// Block until the LWP member `id` exits, then reap it and return its
/// exit value. `id` must name a live member of the caller's own group.
pub fn thread_join(id: TaskId) -> KernelResult<i64> {
    let caller = crate::process::current_id()
        .ok_or(KernelError::NotFound { resource: "current task", id: 0 })?;
    let mut k = crate::process::table::sched_lock();
    let anchor = k.task(caller).map(|t| t.anchor_id()).unwrap_or(caller);

    loop {
        if k.task(caller).map(|t| t.killed).unwrap_or(false) {
            return Err(KernelError::Killed);
        }
        match k.task(id) {
            Some(t) if t.anchor_id() != anchor => return Err(KernelError::NotOurChild),
            Some(t) if t.state == TaskState::Zombie => {
                let retval = t.lwp.retval;
                k.free(id);
                return Ok(retval);
            }
            Some(_) => {
                k = crate::process::wait::sleept(id as usize, k);
            }
            None => return Err(KernelError::ProcessNotFound { pid: id as u64 }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::table::sched_lock;

    #[test]
    fn nextlwp_round_robins_among_runnable_members() {
        let mut k = sched_lock();
        let anchor = k.alloc().unwrap();
        k.task_mut(anchor).unwrap().state = TaskState::Runnable;

        let member = k.alloc().unwrap();
        {
            let t = k.task_mut(member).unwrap();
            t.oproc = Some(anchor);
            t.state = TaskState::Runnable;
        }

        let first = nextlwp(&mut k, anchor).unwrap();
        let second = nextlwp(&mut k, anchor).unwrap();
        assert_ne!(first, second);
        let third = nextlwp(&mut k, anchor).unwrap();
        assert_eq!(first, third);
    }

    #[test]
    fn nextlwp_skips_non_runnable_members() {
        let mut k = sched_lock();
        let anchor = k.alloc().unwrap();
        k.task_mut(anchor).unwrap().state = TaskState::Runnable;
        let sleeper = k.alloc().unwrap();
        {
            let t = k.task_mut(sleeper).unwrap();
            t.oproc = Some(anchor);
            t.state = TaskState::Sleeping(crate::process::pcb::SleepReason::Normal);
        }
        assert_eq!(nextlwp(&mut k, anchor), Some(anchor));
    }
}
