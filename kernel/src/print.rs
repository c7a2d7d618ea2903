//! Console output macros. This core has one debug console -- the serial
//! port -- so `print!`/`println!` and `serial_print!`/`serial_println!`
//! are the same thing; the latter pair exist for call sites grounded on
//! the teacher's convention of naming serial output explicitly.

#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => ($crate::arch::x86_64::serial::_print(format_args!($($arg)*)));
}

#[macro_export]
macro_rules! println {
    () => ($crate::print!("\n"));
    ($($arg:tt)*) => ($crate::print!("{}\n", format_args!($($arg)*)));
}

#[macro_export]
macro_rules! serial_print {
    ($($arg:tt)*) => ($crate::print!($($arg)*));
}

#[macro_export]
macro_rules! serial_println {
    ($($arg:tt)*) => ($crate::println!($($arg)*));
}
