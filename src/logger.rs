//! Terminal logging with colored module prefixes.
//!
//! Everything goes to stderr so that stdout stays free for piping.
//!
//! ```ignore
//! log!("detect"; "found {} candidates", count);
//! debug!("remove"; "background estimate {:?}", color);
//! warn!("remove"; "icon {} has no usable border", index);
//! ```

use owo_colors::{OwoColorize, Stream};
use std::{
    io::{stderr, Write},
    sync::atomic::{AtomicBool, Ordering},
};

/// Global verbose flag (set by --verbose CLI argument)
static VERBOSE: AtomicBool = AtomicBool::new(false);

pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

/// Log a message with a colored module prefix
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Log a message only when --verbose is enabled
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

/// Log a non-fatal problem
#[macro_export]
macro_rules! warn {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::warn($module, &format!($($arg)*))
    }};
}

pub fn log(module: &str, message: &str) {
    write_line(&colorize_prefix(module), message);
}

pub fn warn(module: &str, message: &str) {
    let prefix = format!("[{module}]");
    let prefix = prefix
        .if_supports_color(Stream::Stderr, |p| p.bright_red())
        .to_string();
    write_line(&prefix, message);
}

fn write_line(prefix: &str, message: &str) {
    let mut stderr = stderr().lock();
    // a closed stderr is not worth failing the run over
    writeln!(stderr, "{prefix} {message}").ok();
}

fn colorize_prefix(module: &str) -> String {
    let prefix = format!("[{module}]");
    match module.to_ascii_lowercase().as_str() {
        "detect" => prefix
            .if_supports_color(Stream::Stderr, |p| p.bright_blue())
            .to_string(),
        "error" => prefix
            .if_supports_color(Stream::Stderr, |p| p.bright_red())
            .to_string(),
        "done" => prefix
            .if_supports_color(Stream::Stderr, |p| p.bright_green())
            .to_string(),
        _ => prefix
            .if_supports_color(Stream::Stderr, |p| p.bright_yellow())
            .to_string(),
    }
}
