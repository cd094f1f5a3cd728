//! Minimal leveled logging to stderr.
//!
//! Logging is off until a threshold is set with [`set_max_level`] or read from
//! the `TLS_CORE_LOG` environment variable by [`init_from_env`].

use core::{
    fmt,
    str::FromStr,
    sync::atomic::{AtomicU8, Ordering},
};
use std::{env, thread};

use snafu::Snafu;

/// Environment variable read by [`init_from_env`].
pub const ENV_VAR: &str = "TLS_CORE_LOG";

const OFF: u8 = u8::MAX;

static MAX_LEVEL: AtomicU8 = AtomicU8::new(OFF);

#[macro_export]
macro_rules! log {
    ($level:expr, $($arg:tt)*) => {
        $crate::log::log($level, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {
        $crate::log!($crate::log::LogLevel::Trace, $($arg)*)
    };
}

#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        $crate::log!($crate::log::LogLevel::Debug, $($arg)*)
    };
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::log!($crate::log::LogLevel::Info, $($arg)*)
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::log!($crate::log::LogLevel::Warn, $($arg)*)
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::log!($crate::log::LogLevel::Error, $($arg)*)
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl LogLevel {
    const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Trace),
            1 => Some(Self::Debug),
            2 => Some(Self::Info),
            3 => Some(Self::Warn),
            4 => Some(Self::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Snafu)]
#[snafu(display("invalid log level `{value}`, expected trace, debug, info, warn, error or off"))]
pub struct ParseLevelError {
    value: String,
}

/// Parses a threshold; `off` yields `None`.
pub fn parse_max_level(value: &str) -> Result<Option<LogLevel>, ParseLevelError> {
    if value.trim().eq_ignore_ascii_case("off") {
        return Ok(None);
    }
    value.parse().map(Some)
}

impl FromStr for LogLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let level = match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Self::Trace,
            "debug" => Self::Debug,
            "info" => Self::Info,
            "warn" | "warning" => Self::Warn,
            "error" => Self::Error,
            _ => {
                return ParseLevelSnafu { value: s }.fail();
            }
        };
        Ok(level)
    }
}

/// Sets the lowest level that is printed; `None` disables logging.
pub fn set_max_level(level: Option<LogLevel>) {
    MAX_LEVEL.store(level.map_or(OFF, |l| l as u8), Ordering::Relaxed);
}

#[must_use]
pub fn max_level() -> Option<LogLevel> {
    LogLevel::from_u8(MAX_LEVEL.load(Ordering::Relaxed))
}

#[must_use]
pub fn enabled(level: LogLevel) -> bool {
    max_level().is_some_and(|max| level >= max)
}

/// Applies the threshold from [`ENV_VAR`], if set.
///
/// An unset variable leaves the current threshold untouched.
pub fn init_from_env() -> Result<(), ParseLevelError> {
    if let Ok(value) = env::var(ENV_VAR) {
        set_max_level(parse_max_level(&value)?);
    }
    Ok(())
}

pub fn log(level: LogLevel, message: fmt::Arguments) {
    if !enabled(level) {
        return;
    }
    let current = thread::current();
    match current.name() {
        Some(name) => eprintln!("[{name}] {} {message}", LevelFormat(level)),
        None => eprintln!("[{:?}] {} {message}", current.id(), LevelFormat(level)),
    }
}

struct LevelFormat(LogLevel);

impl fmt::Display for LevelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self.0 {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => " INFO",
            LogLevel::Warn => " WARN",
            LogLevel::Error => "ERROR",
        };
        f.write_str(msg)
    }
}
