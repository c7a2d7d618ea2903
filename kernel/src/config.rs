//! Tunable constants for the scheduler, LWP layer and synchronization
//! primitives.
//!
//! These values define the observable scheduling policy and the user-visible
//! ABI layout (queue sizes baked into [`crate::sync::xem::Xem`]). They are
//! kept in one place instead of scattered `const` items because several of
//! them (quanta, allotments, boost period, share cap) are cross-referenced
//! by more than one module.

/// Number of task slots in the global task table.
pub const NPROC: usize = 64;

/// Number of CPUs the scheduler state tracks per-CPU bookkeeping for.
///
/// The core is not SMP-load-balanced (see spec non-goals): every CPU draws
/// from the same global ready set, this only sizes the push/pop interrupt
/// discipline counters.
pub const NCPU: usize = 8;

/// Capacity of a semaphore's FIFO waiter queue.
pub const XEMQSIZE: usize = 128;

/// MLFQ level 0 quantum, in timer ticks.
pub const Q0TICKS: u32 = 5;
/// MLFQ level 1 quantum, in timer ticks.
pub const Q1TICKS: u32 = 10;
/// MLFQ level 2 quantum, in timer ticks.
pub const Q2TICKS: u32 = 20;

/// Total time-in-level budget before a level-0 task is demoted to level 1.
pub const Q0ALTMT: u32 = 20;
/// Total time-in-level budget before a level-1 task is demoted to level 2.
pub const Q1ALTMT: u32 = 40;

/// Period, in ticks, between MLFQ priority boosts.
pub const BSTPRD: u64 = 200;

/// Stride quantum, in timer ticks.
pub const SSTICKS: u32 = 5;

/// Maximum total CPU share (percent) the stride set may reserve.
pub const SHAREMAX: u8 = 80;

/// Total ticket pool divided among stride citizens and the MLFQ
/// pseudo-citizen.
pub const GTICKETS: u64 = 10_000;

/// Maximum open files per task (bookkeeping only; no real file system
/// backs this in this core).
pub const NOFILE: usize = 16;
