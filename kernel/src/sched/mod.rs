//! Scheduling: the MLFQ (component B), the stride set (component C), and
//! the loop that ties them together with the timer interrupt.

pub mod mlfq;
pub mod scheduler;
pub mod stride;

pub use scheduler::{requeue, scheduler as run, tick, yield_to_scheduler};

pub fn init() {
    crate::process::init();
    crate::println!("[SCHED] task table and MLFQ level 0 ready");
}
