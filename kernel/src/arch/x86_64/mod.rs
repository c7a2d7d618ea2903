//! x86_64 architecture support.
//!
//! Interrupt control, serial I/O (COM1 at 0x3F8), and the register-save
//! context switch. GDT/IDT/paging/boot are out of scope for this core; a
//! platform layer above this crate is expected to have brought the CPU into
//! long mode with interrupts routed to [`crate::arch::x86_64::timer::tick`]
//! before handing control to the scheduler.

#![allow(clippy::missing_safety_doc)]

pub mod context;
pub mod serial;
pub mod timer;

/// Halt the CPU. Used by panic/shutdown paths.
#[allow(dead_code)]
pub fn halt() -> ! {
    x86_64::instructions::interrupts::disable();
    loop {
        x86_64::instructions::hlt();
    }
}

/// Enable hardware interrupts.
#[allow(dead_code)]
pub fn enable_interrupts() {
    x86_64::instructions::interrupts::enable();
}

/// Disable interrupts for the scope of the returned guard, restoring the
/// prior state when it drops.
///
/// This is a convenience for a single, non-nesting critical section. The
/// scheduler lock's own push/pop discipline (see
/// [`crate::sync::spinlock::SchedLock`]) is what nests correctly across
/// recursive acquisitions and is what scheduler code actually uses.
#[allow(dead_code)]
pub fn disable_interrupts() -> impl Drop {
    struct InterruptGuard {
        was_enabled: bool,
    }

    impl Drop for InterruptGuard {
        fn drop(&mut self) {
            if self.was_enabled {
                x86_64::instructions::interrupts::enable();
            }
        }
    }

    let was_enabled = x86_64::instructions::interrupts::are_enabled();
    x86_64::instructions::interrupts::disable();
    InterruptGuard { was_enabled }
}

pub fn idle() {
    x86_64::instructions::hlt();
}

pub fn serial_init() -> uart_16550::SerialPort {
    // SAFETY: SerialPort::new(0x3F8) creates a serial port handle for COM1
    // at the standard I/O base address. The address is well-known and the
    // port is initialized immediately after construction.
    let mut serial_port = unsafe { uart_16550::SerialPort::new(0x3F8) };
    serial_port.init();
    serial_port
}

/// Raw interrupt enable/disable, for the push/pop counting discipline in
/// [`crate::sync::spinlock`]. Unlike [`disable_interrupts`]'s guard, these
/// don't track nesting themselves -- the caller's counter does.
pub mod interrupts {
    pub fn are_enabled() -> bool {
        x86_64::instructions::interrupts::are_enabled()
    }

    pub fn enable() {
        x86_64::instructions::interrupts::enable();
    }

    pub fn disable() {
        x86_64::instructions::interrupts::disable();
    }
}
