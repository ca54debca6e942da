// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Leveled kernel logging over the SBI console
//! OWNERS: @kernel-team
//! STATUS: Functional
//! PUBLIC API: log_error!/log_warn!/log_info!/log_debug!/log_trace!, emit()
//! DEPENDS_ON: console::lock()
//! INVARIANTS: One record per line; Debug/Trace compiled out of release builds
//!
//! Output format: `[LEVEL target] message`.

use core::fmt::{self, Arguments, Write};

/// Severity, most severe first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Least severe level emitted by this build.
pub const MAX_LEVEL: Level = if cfg!(debug_assertions) { Level::Trace } else { Level::Info };

impl Level {
    pub const fn tag(self) -> &'static str {
        match self {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        }
    }

    #[inline]
    pub const fn enabled(self) -> bool {
        self as u8 <= MAX_LEVEL as u8
    }
}

/// One log line, formatted lazily.
pub struct Record<'a> {
    pub level: Level,
    pub target: &'a str,
    pub args: Arguments<'a>,
}

impl fmt::Display for Record<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {}] {}", self.level.tag(), self.target, self.args)
    }
}

/// Writes `record` plus a newline into `w`.
pub fn write_record<W: Write + ?Sized>(w: &mut W, record: &Record<'_>) -> fmt::Result {
    writeln!(w, "{record}")
}

/// Emits one record through the global console if `level` is enabled.
pub fn emit(level: Level, target: &str, args: Arguments<'_>) {
    if level.enabled() {
        let _ = write_record(&mut *crate::console::lock(), &Record { level, target, args });
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! __synapse_log {
    ($level:ident, target: $target:expr, $($arg:tt)+) => {
        $crate::log::emit($crate::log::Level::$level, $target, format_args!($($arg)+))
    };
    ($level:ident, $($arg:tt)+) => {
        $crate::log::emit($crate::log::Level::$level, module_path!(), format_args!($($arg)+))
    };
}

#[macro_export]
macro_rules! log_error { ($($t:tt)+) => { $crate::__synapse_log!(Error, $($t)+) }; }
#[macro_export]
macro_rules! log_warn { ($($t:tt)+) => { $crate::__synapse_log!(Warn, $($t)+) }; }
#[macro_export]
macro_rules! log_info { ($($t:tt)+) => { $crate::__synapse_log!(Info, $($t)+) }; }
#[macro_export]
macro_rules! log_debug { ($($t:tt)+) => { $crate::__synapse_log!(Debug, $($t)+) }; }
#[macro_export]
macro_rules! log_trace { ($($t:tt)+) => { $crate::__synapse_log!(Trace, $($t)+) }; }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_carries_level_and_target() {
        let mut out = String::new();
        write_record(
            &mut out,
            &Record { level: Level::Warn, target: "mm", args: format_args!("low: {} pages", 3) },
        )
        .unwrap();
        assert_eq!(out, "[WARN mm] low: 3 pages\n");
    }

    #[test]
    fn release_builds_stop_at_info() {
        assert!(Level::Error.enabled());
        assert!(Level::Info.enabled());
        assert_eq!(Level::Debug.enabled(), cfg!(debug_assertions));
        assert_eq!(Level::Trace.enabled(), cfg!(debug_assertions));
    }

    #[test]
    fn macros_expand_on_host() {
        log_info!(target: "test", "value={}", 1);
        log_debug!("no target {}", 2);
        log_error!(target: "test", "x");
    }
}
