//! Task management: the flat task table, fork/exit, the LWP layer, and
//! sleep/wakeup.
//!
//! There is no separate Process/Thread hierarchy here -- every schedulable
//! entity is one [`pcb::Task`] in one [`table::Kernel`] table, whether it is
//! an ordinary task or one member of an LWP group. See `table.rs` for the
//! single global lock this all hangs off of.

#![allow(dead_code)]

pub mod exit;
pub mod fork;
pub mod pcb;
pub mod table;
pub mod thread;
pub mod wait;

pub use pcb::{Channel, SleepReason, Task, TaskId, TaskState};

use crate::config::NCPU;
use core::sync::atomic::{AtomicU32, Ordering};

/// Per-CPU "currently running task" slots. The core is not
/// SMP-load-balanced (see spec non-goals), but still tracks one slot per
/// CPU so `current()` and the scheduler loop generalize past a single
/// hart without a redesign.
static CURRENT: [core::sync::atomic::AtomicU32; NCPU] = {
    const ZERO: AtomicU32 = AtomicU32::new(0);
    [ZERO; NCPU]
};

/// Index of the CPU executing this call. Always 0 until a platform layer
/// wires up real per-CPU identification (APIC id, etc.) -- out of scope
/// for this core.
pub fn cpu_id() -> usize {
    0
}

/// The task id currently running on this CPU, if any.
pub fn current_id() -> Option<TaskId> {
    let raw = CURRENT[cpu_id()].load(Ordering::Acquire);
    if raw == 0 {
        None
    } else {
        Some(raw)
    }
}

/// Record which task is now running on this CPU. Called only by the
/// scheduler loop immediately before a context switch.
pub(crate) fn set_current_id(id: Option<TaskId>) {
    CURRENT[cpu_id()].store(id.unwrap_or(0), Ordering::Release);
}

/// Initialize the task table with a single anchor "init" task, analogous
/// to xv6's `userinit`. Intended to be called once at boot.
pub fn init() {
    let mut k = table::sched_lock();
    let id = k.alloc().expect("task table exhausted during init");
    {
        let t = k.task_mut(id).expect("just-allocated task missing");
        t.set_name("init");
        t.state = TaskState::Runnable;
        t.sz = 0;
        t.hpsz = 0;
    }
    k.qpush(id);
    crate::println!("[PROCESS] init task created with id {id}");
}
