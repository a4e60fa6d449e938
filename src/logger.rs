//! Structured logging with visual box-drawing formatting.
//!
//! The daemon and CLI share one output style: messages are grouped into
//! blocks started with `log_block_start!`, continued with `log_decorated!`
//! or `log_indented!`, and the whole run is bracketed by `log_version!` /
//! `log_end!`. Logging can be silenced at runtime (used by commands that
//! only want to check daemon liveness, not print a banner).

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

static LOGGING_ENABLED: AtomicBool = AtomicBool::new(true);

pub struct Log;

impl Log {
    pub fn set_enabled(enabled: bool) {
        LOGGING_ENABLED.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled() -> bool {
        LOGGING_ENABLED.load(Ordering::SeqCst)
    }
}

/// Route a fully-formatted line to stdout. Separated out so macros stay thin.
pub fn write_output(text: &str) {
    print!("{text}");
    let _ = std::io::stdout().flush();
}

#[macro_export]
macro_rules! log_decorated {
    ($fmt:literal $($arg:tt)*) => {{
        if $crate::logger::Log::is_enabled() {
            $crate::logger::write_output(&format!(concat!("┣ ", $fmt, "\n") $($arg)*));
        }
    }};
}

#[macro_export]
macro_rules! log_indented {
    ($fmt:literal $($arg:tt)*) => {{
        if $crate::logger::Log::is_enabled() {
            $crate::logger::write_output(&format!(concat!("┃   ", $fmt, "\n") $($arg)*));
        }
    }};
}

#[macro_export]
macro_rules! log_pipe {
    () => {{
        if $crate::logger::Log::is_enabled() {
            $crate::logger::write_output("┃\n");
        }
    }};
}

#[macro_export]
macro_rules! log_block_start {
    ($fmt:literal $($arg:tt)*) => {{
        if $crate::logger::Log::is_enabled() {
            $crate::logger::write_output(&format!(concat!("┃\n┣ ", $fmt, "\n") $($arg)*));
        }
    }};
}

#[macro_export]
macro_rules! log_version {
    () => {{
        if $crate::logger::Log::is_enabled() {
            let version = env!("CARGO_PKG_VERSION");
            $crate::logger::write_output(&format!("┏ abraxasd v{version} ━━╸\n"));
        }
    }};
}

#[macro_export]
macro_rules! log_end {
    () => {{
        if $crate::logger::Log::is_enabled() {
            $crate::logger::write_output("╹\n");
        }
    }};
}

#[macro_export]
macro_rules! log_warning {
    ($fmt:literal $($arg:tt)*) => {{
        if $crate::logger::Log::is_enabled() {
            $crate::logger::write_output(&format!(concat!("┣[\x1b[33mWARNING\x1b[0m] ", $fmt, "\n") $($arg)*));
        }
    }};
}

#[macro_export]
macro_rules! log_error {
    ($fmt:literal $($arg:tt)*) => {{
        if $crate::logger::Log::is_enabled() {
            $crate::logger::write_output(&format!(concat!("┣[\x1b[31mERROR\x1b[0m] ", $fmt, "\n") $($arg)*));
        }
    }};
}

#[macro_export]
macro_rules! log_debug {
    ($fmt:literal $($arg:tt)*) => {{
        if $crate::logger::Log::is_enabled() {
            $crate::logger::write_output(&format!(concat!("┣[DEBUG] ", $fmt, "\n") $($arg)*));
        }
    }};
}

#[macro_export]
macro_rules! log_info {
    ($fmt:literal $($arg:tt)*) => {{
        if $crate::logger::Log::is_enabled() {
            $crate::logger::write_output(&format!(concat!("┣[INFO] ", $fmt, "\n") $($arg)*));
        }
    }};
}
