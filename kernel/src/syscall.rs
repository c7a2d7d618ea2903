//! The numbered syscall surface: yield/getlev/set_cpu_share, the LWP
//! calls, the xem calls, and the rwlock calls.
//!
//! Each handler collapses a [`crate::error::KernelError`] down to the
//! stable ABI convention of a negative return code -- `-1` for "the
//! operation failed" and `-2` for "arguments were invalid" -- rather than
//! exposing the richer in-kernel error type across the syscall boundary.

use crate::error::KernelError;
use crate::process::pcb::TaskId;
use crate::process::table::sched_lock;
use crate::sync::rwlock::{self, RwLock};
use crate::sync::xem::{self, Xem};

const EFAIL: isize = -1;
const EINVAL: isize = -2;

fn to_errno(err: KernelError) -> isize {
    match err {
        KernelError::ShareCapExceeded => EINVAL,
        _ => EFAIL,
    }
}

/// Syscall 22: demote the caller one MLFQ level (a no-op unless its
/// allotment for the current level has already run out), then give up the
/// remainder of the current quantum.
pub fn sys_yield() -> isize {
    if let Some(id) = crate::process::current_id() {
        let mut k = sched_lock();
        let anchor = k.task(id).map(|t| t.anchor_id()).unwrap_or(id);
        k.qdown(anchor);
        drop(k);
    }
    crate::sched::yield_to_scheduler();
    0
}

/// Syscall 23: the calling anchor's current MLFQ level, or `-1` if it is
/// stride-scheduled (no MLFQ level) or not itself an anchor.
pub fn sys_getlev() -> isize {
    let Some(id) = crate::process::current_id() else {
        return EFAIL;
    };
    let k = sched_lock();
    let anchor = k.task(id).map(|t| t.anchor_id()).unwrap_or(id);
    match k.task(anchor).and_then(|t| t.sched) {
        Some(crate::process::pcb::SchedClass::Mlfq { level, .. }) => level as isize,
        _ => EFAIL,
    }
}

/// Syscall 24: reserve `share` percent of the CPU in the stride set.
pub fn sys_set_cpu_share(share: u8) -> isize {
    let Some(id) = crate::process::current_id() else {
        return EFAIL;
    };
    let mut k = sched_lock();
    let anchor = k.task(id).map(|t| t.anchor_id()).unwrap_or(id);
    match k.set_cpu_share(anchor, share) {
        Ok(()) => 0,
        Err(e) => to_errno(e),
    }
}

/// Syscall 25: `thread_create(entry, arg)`.
pub fn sys_thread_create(entry: usize, arg: usize) -> isize {
    match crate::process::thread::thread_create(entry, arg) {
        Ok(id) => id as isize,
        Err(e) => to_errno(e),
    }
}

/// Syscall 26: `thread_exit(retval)`. Never returns.
pub fn sys_thread_exit(retval: i64) -> ! {
    crate::process::thread::thread_exit(retval)
}

/// Syscall 27: `thread_join(id, &mut retval)`.
pub fn sys_thread_join(id: TaskId, retval: &mut i64) -> isize {
    match crate::process::thread::thread_join(id) {
        Ok(r) => {
            *retval = r;
            0
        }
        Err(e) => to_errno(e),
    }
}

/// Syscall 28: `xem_init(xem, initial)`.
pub fn sys_xem_init(xem: &mut Xem, initial: i32) -> isize {
    xem.init(initial);
    0
}

/// Syscall 29: `xem_wait(xem)`.
pub fn sys_xem_wait(xem: &mut Xem) -> isize {
    match xem::xem_wait(xem) {
        Ok(()) => 0,
        Err(e) => to_errno(e),
    }
}

/// Syscall 30: `xem_unlock(xem)`.
pub fn sys_xem_unlock(xem: &mut Xem) -> isize {
    xem::xem_unlock(xem);
    0
}

/// Syscall 31: `rwlock_init(rw)`.
pub fn sys_rwlock_init(rw: &mut RwLock) -> isize {
    rw.init();
    0
}

/// Syscall 32: `acquire_readlock(rw)`.
pub fn sys_acquire_readlock(rw: &mut RwLock) -> isize {
    match rwlock::acquire_readlock(rw) {
        Ok(()) => 0,
        Err(e) => to_errno(e),
    }
}

/// Syscall 33: `acquire_writelock(rw)`.
pub fn sys_acquire_writelock(rw: &mut RwLock) -> isize {
    match rwlock::acquire_writelock(rw) {
        Ok(()) => 0,
        Err(e) => to_errno(e),
    }
}

/// Syscall 34: `release_readlock(rw)`.
pub fn sys_release_readlock(rw: &mut RwLock) -> isize {
    match rwlock::release_readlock(rw) {
        Ok(()) => 0,
        Err(e) => to_errno(e),
    }
}

/// Syscall 35: `release_writelock(rw)`.
pub fn sys_release_writelock(rw: &mut RwLock) -> isize {
    rwlock::release_writelock(rw);
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn getlev_without_a_current_task_fails() {
        crate::process::set_current_id(None);
        assert_eq!(sys_getlev(), EFAIL);
    }

    #[test]
    fn set_cpu_share_rejects_out_of_range_share() {
        let mut k = sched_lock();
        let id = k.alloc().unwrap();
        drop(k);
        crate::process::set_current_id(Some(id));
        assert_eq!(sys_set_cpu_share(200), EINVAL);
        crate::process::set_current_id(None);
    }
}
