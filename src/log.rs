//! Leveled kernel logging on top of `println!`.
//!
//! Every line is prefixed with its level, e.g. `[INFO] idt: loaded`. The maximum level is a
//! runtime setting so a debugging session can turn up the verbosity without a rebuild.

use core::fmt;
use core::sync::atomic::{AtomicU8, Ordering};

use crate::config::DEFAULT_LOG_LEVEL;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
#[repr(u8)]
pub enum Level {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl Level {
    fn from_raw(raw: u8) -> Level {
        match raw {
            0 => Level::Error,
            1 => Level::Warn,
            2 => Level::Info,
            3 => Level::Debug,
            _ => Level::Trace,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static MAX_LEVEL: AtomicU8 = AtomicU8::new(DEFAULT_LOG_LEVEL as u8);

pub fn set_max_level(level: Level) {
    MAX_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn max_level() -> Level {
    Level::from_raw(MAX_LEVEL.load(Ordering::Relaxed))
}

#[inline]
pub fn enabled(level: Level) -> bool {
    passes(level, max_level())
}

fn passes(level: Level, max: Level) -> bool {
    level <= max
}

#[doc(hidden)]
pub fn _log(level: Level, args: fmt::Arguments) {
    if enabled(level) {
        crate::println!("[{}] {}", level, args);
    }
}

#[macro_export]
macro_rules! kerror {
    ($($arg:tt)*) => {$crate::log::_log($crate::log::Level::Error, format_args!($($arg)*))};
}

#[macro_export]
macro_rules! kwarn {
    ($($arg:tt)*) => {$crate::log::_log($crate::log::Level::Warn, format_args!($($arg)*))};
}

#[macro_export]
macro_rules! kinfo {
    ($($arg:tt)*) => {$crate::log::_log($crate::log::Level::Info, format_args!($($arg)*))};
}

#[macro_export]
macro_rules! kdebug {
    ($($arg:tt)*) => {$crate::log::_log($crate::log::Level::Debug, format_args!($($arg)*))};
}

#[macro_export]
macro_rules! ktrace {
    ($($arg:tt)*) => {$crate::log::_log($crate::log::Level::Trace, format_args!($($arg)*))};
}
