use core::fmt::Arguments;

#[doc(hidden)]
pub fn _print(args: Arguments) {
    #[cfg(test)]
    std::print!("{}", args);

    #[cfg(all(not(test), target_arch = "x86"))]
    {
        use core::fmt::Write;
        // The console never reports an error, so there is nothing useful to do with one.
        let _ = crate::console::CONSOLE.lock().write_fmt(args);
    }

    #[cfg(all(not(test), not(target_arch = "x86")))]
    let _ = args;
}

#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => {$crate::print::_print(format_args!($($arg)*))};
}

#[macro_export]
macro_rules! println {
    () => {$crate::print::_print(format_args!("\n"))};
    ($($arg:tt)*) => {$crate::print::_print(format_args!("{}\n", format_args!($($arg)*)))};
}
