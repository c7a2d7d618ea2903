#![no_std]
#![no_main]

use core::panic::PanicInfo;

use stride_kernel::{arch, sched};

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    stride_kernel::println!("[KERNEL PANIC] {}", info);
    arch::halt();
}

#[no_mangle]
pub extern "C" fn _start() -> ! {
    stride_kernel::println!("kernel core booting");

    arch::serial_init();
    sched::init();

    stride_kernel::println!("entering scheduler loop");
    sched::run();
}
