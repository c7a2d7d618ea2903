//! The scheduler loop and the tick entry point that drives both the MLFQ
//! and the stride set forward in real time.
//!
//! Exactly one CPU's worth of "scheduler context" exists (this core does
//! not load-balance across CPUs; see spec non-goals): a task that blocks
//! or yields switches back into it, and the loop below picks the next
//! citizen and switches into that task's saved context in turn. This is
//! the xv6 `scheduler()`/`sched()` split translated onto the arena-indexed
//! task table instead of a linked `ptable`.

use crate::arch::context::{switch_context, Context};
use crate::process::pcb::{SchedClass, TaskId, TaskState};
use crate::process::table::{sched_lock, Kernel};

lazy_static::lazy_static! {
    static ref SCHED_CONTEXT: crate::sync::SpinLock<Context> =
        crate::sync::SpinLock::new(Context::default());
}

/// Re-thread a woken anchor onto its ready list if it was never linked
/// (a task's `sched` class is assigned once, by `qpush`/`set_cpu_share`,
/// and preserved across sleep/wake -- see [`crate::process::wait`]).
pub fn requeue(k: &mut Kernel, id: TaskId) {
    if k.task(id).map(|t| t.sched.is_none()).unwrap_or(false) {
        k.qpush(id);
    }
}

/// The CPU's idle loop: repeatedly pick the next citizen and run it until
/// it yields, sleeps, or its quantum expires.
pub fn scheduler() -> ! {
    loop {
        let run_id = {
            let mut k = sched_lock();
            k.qboost(k.ticks);
            k.nextproc()
                .and_then(|anchor| crate::process::thread::nextlwp(&mut k, anchor))
        };

        match run_id {
            Some(id) => {
                {
                    let mut k = sched_lock();
                    if let Some(t) = k.task_mut(id) {
                        t.state = TaskState::Running;
                    }
                }
                crate::process::set_current_id(Some(id));

                let task_ctx_ptr: *const Context = {
                    let k = sched_lock();
                    &k.task(id).expect("picked task vanished").context as *const Context
                };
                {
                    let mut sched_ctx = SCHED_CONTEXT.lock();
                    // SAFETY: `task_ctx_ptr` points into the 'static task
                    // table; the task named by `id` cannot be freed while
                    // it is Running.
                    switch_context(&mut sched_ctx, unsafe { &*task_ctx_ptr });
                }
                crate::process::set_current_id(None);
            }
            None => crate::arch::idle(),
        }
    }
}

/// Switch from the currently running task back into the scheduler loop.
/// Used by a voluntary yield and by [`crate::process::wait::sleep`]/
/// [`crate::process::wait::sleept`] once a task has recorded its sleep
/// channel and released the scheduler lock.
pub fn yield_to_scheduler() {
    let id = crate::process::current_id().expect("yield_to_scheduler with no current task");
    let task_ctx_ptr: *mut Context = {
        let mut k = sched_lock();
        &mut k
            .task_mut(id)
            .expect("current task missing from table")
            .context as *mut Context
    };
    let mut sched_ctx = SCHED_CONTEXT.lock();
    // SAFETY: see `scheduler`; this task owns its own context slot while
    // it is the one executing.
    switch_context(unsafe { &mut *task_ctx_ptr }, &sched_ctx);
}

/// Called once per timer interrupt. Advances the global tick count, runs
/// the periodic MLFQ boost check, and accounts the tick against whichever
/// scheduling class is currently running.
pub fn tick() {
    let mut k = sched_lock();
    k.ticks += 1;
    k.qboost(k.ticks);

    let Some(id) = crate::process::current_id() else {
        return;
    };
    // Scheduling class lives on the anchor, not on whichever LWP member
    // happens to be executing.
    let anchor = k.task(id).map(|t| t.anchor_id()).unwrap_or(id);
    match k.task(anchor).and_then(|t| t.sched) {
        Some(SchedClass::Mlfq { .. }) => {
            if k.mlfq_tick(anchor) {
                k.quantum_left = 0;
            }
        }
        _ => {
            k.quantum_left = k.quantum_left.saturating_sub(1);
        }
    }
}
