//! `fork`: create a new, independent task as a copy of the caller.
//!
//! If the caller is itself an LWP member, the child joins the same group
//! (it inherits the caller's anchor and is never separately MLFQ/stride
//! visible); otherwise the child becomes its own anchor and is enqueued
//! at MLFQ level 0. No address space is actually copied (see spec
//! non-goals): `sz`/`hpsz` and the open-file bitmap are copied as
//! bookkeeping, exactly as xv6 copies `proc->sz` and the `ofile` table.

use crate::error::KernelError;
use crate::process::pcb::{TaskId, TaskState};
use crate::process::table::sched_lock;

/// Duplicate the caller into a new task, runnable immediately at MLFQ
/// level 0. Returns the child's id.
pub fn fork() -> Result<TaskId, KernelError> {
    let caller = crate::process::current_id().ok_or(KernelError::NotFound {
        resource: "current task",
        id: 0,
    })?;
    let mut k = sched_lock();
    let (sz, hpsz, open_files, context) = {
        let parent = k
            .task(caller)
            .ok_or(KernelError::ProcessNotFound { pid: caller as u64 })?;
        (parent.sz, parent.hpsz, parent.open_files, parent.context.clone())
    };

    let group = k.task(caller).and_then(|t| t.oproc);

    let child = k.alloc()?;
    {
        let t = k.task_mut(child).expect("just allocated");
        t.set_name("fork");
        t.parent = Some(caller);
        t.oproc = group;
        t.sz = sz;
        t.hpsz = hpsz;
        t.open_files = open_files;
        t.context = context;
        t.context.set_return_value(0); // child sees fork() return 0
        t.state = TaskState::Runnable;
    }
    // Only a fresh anchor is scheduler-visible; a child that joined an
    // existing group is reached through its anchor's turn, like any other
    // LWP member.
    if group.is_none() {
        k.qpush(child);
    }
    Ok(child)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::table::sched_lock;

    #[test]
    fn child_inherits_address_space_size() {
        let mut k = sched_lock();
        let parent = k.alloc().unwrap();
        k.task_mut(parent).unwrap().sz = 4096;
        k.task_mut(parent).unwrap().state = TaskState::Runnable;
        drop(k);

        crate::process::set_current_id(Some(parent));
        let child = fork().unwrap();

        let k = sched_lock();
        assert_eq!(k.task(child).unwrap().sz, 4096);
        assert_eq!(k.task(child).unwrap().parent, Some(parent));
        assert!(k.task(child).unwrap().is_anchor());
        crate::process::set_current_id(None);
    }

    #[test]
    fn child_of_an_lwp_member_joins_the_same_group() {
        let mut k = sched_lock();
        let anchor = k.alloc().unwrap();
        k.task_mut(anchor).unwrap().state = TaskState::Runnable;
        let member = k.alloc().unwrap();
        {
            let t = k.task_mut(member).unwrap();
            t.oproc = Some(anchor);
            t.state = TaskState::Runnable;
        }
        drop(k);

        crate::process::set_current_id(Some(member));
        let child = fork().unwrap();

        let k = sched_lock();
        assert_eq!(k.task(child).unwrap().oproc, Some(anchor));
        assert!(!k.task(child).unwrap().is_anchor());
        crate::process::set_current_id(None);
    }
}
