//! Kernel core: task table, MLFQ+stride scheduler, LWP layer, and the
//! xem/rwlock synchronization primitives.

#![no_std]
#![cfg_attr(all(test, target_os = "none"), no_main)]
#![feature(custom_test_frameworks)]
#![feature(abi_x86_interrupt)]
#![cfg_attr(target_os = "none", feature(alloc_error_handler))]
// Custom test runner only for bare-metal; host target uses the standard
// #[test] harness so `cargo test` exercises this crate directly.
#![cfg_attr(target_os = "none", test_runner(crate::test_runner))]
#![cfg_attr(target_os = "none", reexport_test_harness_main = "test_main")]

#[cfg(feature = "alloc")]
extern crate alloc;

// Bare-metal target: a real heap backed by the bootloader-mapped region.
#[cfg(all(target_arch = "x86_64", target_os = "none"))]
use linked_list_allocator::LockedHeap;

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
#[global_allocator]
static ALLOCATOR: LockedHeap = LockedHeap::empty();

/// Get a reference to the global allocator.
#[cfg(all(target_arch = "x86_64", target_os = "none"))]
pub fn get_allocator() -> &'static LockedHeap {
    &ALLOCATOR
}

// Host target: delegate to the system allocator so `cargo test` can use
// `alloc::vec::Vec` and friends normally.
#[cfg(not(target_os = "none"))]
extern crate std;
#[cfg(not(target_os = "none"))]
#[global_allocator]
static SYSTEM_ALLOCATOR: std::alloc::System = std::alloc::System;

#[macro_use]
pub mod print;

// compiler_builtins doesn't supply these for the bare-metal target; the
// host target links libc, which already provides them, so pulling this in
// there would conflict at link time.
#[cfg(target_os = "none")]
mod intrinsics;

pub mod arch;
pub mod config;
pub mod error;
pub mod process;
pub mod sched;
pub mod sync;
mod syscall;

mod test_framework;

// Re-export the core scheduling and task types for external callers and
// for the test/bench binaries under `tests/`.
pub use error::{KernelError, KernelResult};
pub use process::pcb::{Channel, SchedClass, SleepReason, Task, TaskId, TaskState};
pub use process::table::{sched_lock, Kernel};

#[cfg(test)]
pub use test_framework::test_runner;
pub use test_framework::{test_panic_handler, Testable};

#[cfg(all(test, target_os = "none"))]
#[no_mangle]
pub extern "C" fn _start() -> ! {
    test_main();
    loop {
        core::hint::spin_loop();
    }
}

#[cfg(all(test, target_os = "none"))]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    test_framework::test_panic_handler(info)
}

/// Heap allocation error handler.
///
/// Panic is intentional: heap allocation failure in a no_std kernel is
/// unrecoverable. The alloc_error_handler ABI requires `-> !`.
#[cfg(target_os = "none")]
#[alloc_error_handler]
fn alloc_error_handler(layout: core::alloc::Layout) -> ! {
    panic!("Allocation error: {:?}", layout);
}
