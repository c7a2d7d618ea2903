//! Sleep, wakeup, and kill.
//!
//! `sleep` and `wakeup` are channel-keyed: any number of tasks can block on
//! the same opaque value, and a single `wakeup` moves all of them back to
//! `Runnable` at once. The scheduler never picks a `Sleeping` task of either
//! reason (see [`crate::process::pcb::SleepReason`]) -- only anchors that
//! have become `Runnable` again are re-threaded onto the MLFQ or stride
//! ready lists, via [`crate::sched::requeue`].

use crate::process::pcb::{Channel, SleepReason, TaskId, TaskState};
use crate::process::table::{sched_lock, Kernel};
use crate::sync::spinlock::SpinLockGuard;

/// Block the current task on `chan` for an ordinary reason, giving up the
/// scheduler lock and yielding the CPU. Returns once someone has called
/// [`wakeup`] on the same channel and the scheduler has run this task
/// again; the scheduler lock is re-acquired and handed back to the caller.
pub fn sleep(chan: usize, guard: SpinLockGuard<'static, Kernel>) -> SpinLockGuard<'static, Kernel> {
    sleep_as(chan, SleepReason::Normal, guard)
}

/// Like [`sleep`], but tagged as a `thread_join` wait for diagnostics.
pub fn sleept(chan: usize, guard: SpinLockGuard<'static, Kernel>) -> SpinLockGuard<'static, Kernel> {
    sleep_as(chan, SleepReason::ThreadJoin, guard)
}

fn sleep_as(
    chan: usize,
    reason: SleepReason,
    mut guard: SpinLockGuard<'static, Kernel>,
) -> SpinLockGuard<'static, Kernel> {
    let id = crate::process::current_id().expect("sleep called with no current task");
    {
        let t = guard
            .task_mut(id)
            .expect("current task missing from table");
        t.chan = Some(Channel(chan));
        t.state = TaskState::Sleeping(reason);
    }
    // A running task is never linked into a ready list, so there is
    // nothing to unlink here -- `requeue` on the wake side is what puts it
    // back.
    drop(guard);
    crate::sched::yield_to_scheduler();
    sched_lock()
}

/// Wake every task sleeping on `chan`, re-threading woken anchors onto
/// their ready list. Safe to call whether or not anyone is actually
/// sleeping on `chan`.
pub fn wakeup(chan: usize) {
    let mut k = sched_lock();
    wakeup_locked(&mut k, chan);
}

/// Same as [`wakeup`], but for callers that already hold the scheduler
/// lock (e.g. `exit`, which wakes its parent while still holding the lock
/// it needs for reparenting).
pub fn wakeup_locked(k: &mut Kernel, chan: usize) {
    let woken: alloc::vec::Vec<TaskId> = k
        .tasks
        .iter_mut()
        .filter(|t| t.chan == Some(Channel(chan)) && matches!(t.state, TaskState::Sleeping(_)))
        .map(|t| {
            t.chan = None;
            t.state = TaskState::Runnable;
            t.id
        })
        .collect();
    for id in woken {
        let is_anchor = k.task(id).map(|t| t.is_anchor()).unwrap_or(false);
        if is_anchor {
            crate::sched::requeue(k, id);
        }
    }
}

/// Mark a task killed. A killed task that is merely sleeping is woken
/// immediately (so it can notice `killed` and exit); a killed task that is
/// runnable or running exits the next time it checks. Returns an error if
/// `id` does not name a live task.
pub fn kill(id: TaskId) -> crate::error::KernelResult<()> {
    let mut k = sched_lock();
    let t = k
        .task_mut(id)
        .ok_or(crate::error::KernelError::ProcessNotFound { pid: id as u64 })?;
    t.killed = true;
    if let TaskState::Sleeping(_) = t.state {
        let chan = t.chan.map(|c| c.0);
        if let Some(chan) = chan {
            wakeup_locked(&mut k, chan);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::table::sched_lock;

    #[test]
    fn wakeup_with_no_sleepers_is_a_no_op() {
        wakeup(0xdead_beef);
    }

    #[test]
    fn kill_unknown_task_reports_not_found() {
        let err = kill(0xffff_ff00).unwrap_err();
        assert!(matches!(
            err,
            crate::error::KernelError::ProcessNotFound { .. }
        ));
    }

    #[test]
    fn wakeup_moves_sleepers_back_to_runnable() {
        let mut k = sched_lock();
        let id = k.alloc().unwrap();
        {
            let t = k.task_mut(id).unwrap();
            t.chan = Some(Channel(42));
            t.state = TaskState::Sleeping(SleepReason::Normal);
            t.oproc = Some(id); // make it a non-anchor so requeue is skipped
        }
        wakeup_locked(&mut k, 42);
        assert_eq!(k.task(id).unwrap().state, TaskState::Runnable);
    }
}
