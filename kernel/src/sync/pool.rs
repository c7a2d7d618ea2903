//! Kernel lock pool backing [`crate::sync::xem::Xem`] bindings.
//!
//! An xem does not carry its own spinlock; it lazily binds to one slot of a
//! global pool of `NPROC` [`SpinLock`]s on first `wait`, and releases the
//! slot once it goes idle (`value >= 1` and its FIFO empty) on `unlock`.
//! This mirrors the pool-backed semaphore variant the spec consolidates
//! from (the plain xv6 `semaphore.c` gives each xem its own embedded
//! `locked` word instead; see DESIGN.md for why the pool variant was
//! chosen).

use crate::config::NPROC;
use crate::error::{KernelError, KernelResult};
use crate::sync::spinlock::SpinLock;

/// Guards the pool's bound/unbound bookkeeping and the pool-guard sleep
/// channel used when every slot is taken.
static GUARD: SpinLock<[bool; NPROC]> = SpinLock::new([false; NPROC]);

static SLOTS: [SpinLock<()>; NPROC] = [const { SpinLock::new(()) }; NPROC];

/// Opaque wake channel used when a `wait` blocks looking for a free slot.
pub fn pool_guard_channel() -> usize {
    SLOTS.as_ptr() as usize
}

/// Claim the first free slot, marking it bound. Returns its index.
///
/// Blocks (via the caller's own sleep loop against [`pool_guard_channel`])
/// rather than failing outright when no slot is free: callers are expected
/// to call this only from within a sleep retry loop, mirroring the design
/// note that binding can require `sleep on the pool-guard channel if none
/// is free`.
pub fn try_claim() -> KernelResult<usize> {
    let mut bound = GUARD.lock();
    for (idx, slot) in bound.iter_mut().enumerate() {
        if !*slot {
            *slot = true;
            return Ok(idx);
        }
    }
    Err(KernelError::NoFreePoolSlot)
}

/// Release a previously claimed slot and wake anyone sleeping on
/// [`pool_guard_channel`] waiting for one to free up.
pub fn release(idx: usize) {
    let mut bound = GUARD.lock();
    debug_assert!(bound[idx], "releasing an unbound pool slot");
    bound[idx] = false;
    drop(bound);
    crate::process::wait::wakeup(pool_guard_channel());
}

/// Acquire the raw spinlock for a bound slot.
pub fn lock(idx: usize) -> crate::sync::spinlock::SpinLockGuard<'static, ()> {
    SLOTS[idx].lock()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_are_disjoint_and_reclaimable() {
        let a = try_claim().unwrap();
        let b = try_claim().unwrap();
        assert_ne!(a, b);
        release(a);
        release(b);
    }

    #[test]
    fn pool_exhaustion_reports_no_free_slot() {
        let mut claimed = alloc::vec::Vec::new();
        for _ in 0..NPROC {
            claimed.push(try_claim().unwrap());
        }
        assert_eq!(try_claim(), Err(KernelError::NoFreePoolSlot));
        for idx in claimed {
            release(idx);
        }
    }
}
