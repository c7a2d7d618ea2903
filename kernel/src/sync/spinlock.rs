//! Component A: spinlock with counted interrupt-disable discipline.
//!
//! This is the xv6 `acquire`/`release`/`holding` plus `pushcli`/`popcli`
//! pattern: `acquire` disables interrupts on the local CPU and spins on a
//! test-and-set; `release` only re-enables interrupts once the outermost
//! `push` has been undone, so nested acquisitions on the same CPU don't
//! re-enable interrupts early. This is the single global lock
//! ([`crate::process::table::sched_lock`]) that guards the task table, the
//! MLFQ lists and the stride set, and it is also what each slot of the
//! kernel lock pool behind [`crate::sync::xem::Xem`] is built from.

use core::{
    cell::UnsafeCell,
    ops::{Deref, DerefMut},
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

/// Per-CPU nesting counter for the push/pop interrupt-disable discipline.
///
/// The core does not SMP-load-balance (see spec non-goals), so a single
/// counter (rather than one per CPU) is enough to drive the one hart this
/// pedagogical core actually runs on. Nesting depth and the
/// interrupt-enabled state *before* the outermost `push` are tracked
/// together so `popcli` can restore exactly what `pushcli` saw.
static CLI_DEPTH: AtomicUsize = AtomicUsize::new(0);
static INTENA_BEFORE: AtomicBool = AtomicBool::new(false);

/// Real `cli`/`sti`/flags-read on bare metal; a no-op stand-in on the host
/// test target, where executing those privileged instructions from ring 3
/// would fault. Mirrors the allocator split in `lib.rs`.
#[cfg(target_os = "none")]
mod raw {
    pub fn are_enabled() -> bool {
        crate::arch::x86_64::interrupts::are_enabled()
    }
    pub fn disable() {
        crate::arch::x86_64::interrupts::disable();
    }
    pub fn enable() {
        crate::arch::x86_64::interrupts::enable();
    }
}

#[cfg(not(target_os = "none"))]
mod raw {
    use core::sync::atomic::{AtomicBool, Ordering};

    // No real interrupts exist on the host test target; this flag just
    // lets pushcli/popcli's own bookkeeping exercise the same logic it
    // runs on bare metal.
    static SIMULATED_ENABLED: AtomicBool = AtomicBool::new(true);

    pub fn are_enabled() -> bool {
        SIMULATED_ENABLED.load(Ordering::SeqCst)
    }
    pub fn disable() {
        SIMULATED_ENABLED.store(false, Ordering::SeqCst);
    }
    pub fn enable() {
        SIMULATED_ENABLED.store(true, Ordering::SeqCst);
    }
}

/// Disable interrupts, incrementing the nesting count. The first call
/// records whether interrupts were enabled, so the matching `popcli` only
/// re-enables them if they were enabled before the whole nested section
/// started.
pub fn pushcli() {
    let enabled = raw::are_enabled();
    raw::disable();
    if CLI_DEPTH.fetch_add(1, Ordering::SeqCst) == 0 {
        INTENA_BEFORE.store(enabled, Ordering::SeqCst);
    }
}

/// Undo one `pushcli`. Only the outermost call re-enables interrupts, and
/// only if they were enabled before the nesting began.
///
/// # Panics
/// Panics if called without a matching `pushcli` (depth underflow), and if
/// interrupts are observed enabled while inside a nested section -- both
/// indicate a locking discipline bug.
pub fn popcli() {
    if raw::are_enabled() {
        panic!("popcli: interrupts enabled while nested");
    }
    let prev = CLI_DEPTH.fetch_sub(1, Ordering::SeqCst);
    if prev == 0 {
        panic!("popcli: unmatched pop");
    }
    if prev == 1 && INTENA_BEFORE.load(Ordering::SeqCst) {
        raw::enable();
    }
}

/// A mutual-exclusion lock built on a test-and-set loop plus the
/// `pushcli`/`popcli` discipline above.
///
/// Unlike a plain spin mutex, holding this lock also disables interrupts on
/// the current CPU for its entire held duration -- required because the
/// scheduler itself runs on the timer interrupt path and must never
/// re-enter the lock it is already spinning on.
pub struct SpinLock<T> {
    locked: AtomicBool,
    data: UnsafeCell<T>,
}

// SAFETY: access to `data` is only ever granted through `lock()`, which
// holds `locked` for the guard's lifetime; the underlying test-and-set
// provides the mutual exclusion `Sync` requires.
unsafe impl<T: Send> Sync for SpinLock<T> {}
unsafe impl<T: Send> Send for SpinLock<T> {}

impl<T> SpinLock<T> {
    pub const fn new(data: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            data: UnsafeCell::new(data),
        }
    }

    /// Acquire the lock, disabling interrupts first (so an interrupt on
    /// this CPU can never observe it half-held).
    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        pushcli();
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            core::hint::spin_loop();
        }
        crate::arch::barriers::memory_fence();
        SpinLockGuard { lock: self }
    }

    /// True if the lock is currently held (by anyone). Racy by nature --
    /// intended for assertions, not synchronization.
    pub fn holding(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }
}

impl<T: Default> Default for SpinLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[must_use = "the lock is released when the guard drops"]
pub struct SpinLockGuard<'a, T> {
    lock: &'a SpinLock<T>,
}

impl<T> Deref for SpinLockGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        // SAFETY: holding the guard implies `locked` is true and was set by
        // this acquisition, so no other guard for this lock can exist.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for SpinLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: see Deref; the guard holds exclusive access.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for SpinLockGuard<'_, T> {
    fn drop(&mut self) {
        crate::arch::barriers::memory_fence();
        self.lock.locked.store(false, Ordering::Release);
        popcli();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutual_exclusion_of_data() {
        let lock = SpinLock::new(0u32);
        {
            let mut guard = lock.lock();
            *guard += 1;
        }
        assert_eq!(*lock.lock(), 1);
    }

    #[test]
    fn nested_pushcli_restores_original_state() {
        // Host tests run without the x86_64 `interrupts` backend wired to
        // real hardware state, so this only exercises the counter
        // discipline, not real flag manipulation.
        pushcli();
        pushcli();
        popcli();
        popcli();
    }
}
