//! Memory barrier abstractions.
//!
//! Centralizes fence operations so that non-arch code does not need
//! `#[cfg(target_arch)]` blocks with inline assembly scattered through it.

/// Full memory fence -- all reads and writes issued before this barrier are
/// globally visible before any reads or writes issued after it.
///
/// x86_64's memory model already orders stores-before-store and
/// loads-before-load; `SeqCst` gives MFENCE-equivalent ordering for the
/// store/load and load/store cases the hardware doesn't order for free.
#[inline(always)]
pub fn memory_fence() {
    core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
}
