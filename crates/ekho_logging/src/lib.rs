#![deny(missing_docs)]
//! Shared logging utilities for the Ekho workspace.
//!
//! This crate provides the `ekho_*` logging macros used across the codebase,
//! the logger setup used by the `ekho` binary, and a minimal test
//! initializer for the global logger.
//!
//! Every macro accepts an optional leading `job = <expr>;` clause. When
//! present the line is prefixed with `job=<id>` so that the interleaved
//! output of concurrent pollers can be filtered per job.

use std::fs::File;
use std::path::Path;

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

#[doc(hidden)]
#[macro_export]
macro_rules! __ekho_log {
    ($level:ident, job = $job:expr; $($arg:tt)*) => {{
        log::$level!("job={} {}", $job, format_args!($($arg)*));
    }};
    ($level:ident, $($arg:tt)*) => {{
        log::$level!($($arg)*);
    }};
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! ekho_trace {
    ($($arg:tt)*) => { $crate::__ekho_log!(trace, $($arg)*) };
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! ekho_debug {
    ($($arg:tt)*) => { $crate::__ekho_log!(debug, $($arg)*) };
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! ekho_info {
    ($($arg:tt)*) => { $crate::__ekho_log!(info, $($arg)*) };
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! ekho_warn {
    ($($arg:tt)*) => { $crate::__ekho_log!(warn, $($arg)*) };
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! ekho_error {
    ($($arg:tt)*) => { $crate::__ekho_log!(error, $($arg)*) };
}

/// Destination for log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogDestination {
    /// Write to a log file only.
    File,
    /// Write to the terminal (stderr for warnings and errors).
    Terminal,
    /// Write to both file and terminal.
    Both,
}

/// Initialize the global logger.
///
/// `log_file` is only opened for [`LogDestination::File`] and
/// [`LogDestination::Both`]. A file that cannot be created is reported on
/// stderr and skipped. Calling this twice is harmless; the second call is
/// ignored by `log`.
pub fn initialize(destination: LogDestination, level: LevelFilter, log_file: &Path) {
    let config = build_config();

    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    if matches!(destination, LogDestination::Terminal | LogDestination::Both) {
        loggers.push(TermLogger::new(
            level,
            config.clone(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        ));
    }
    if matches!(destination, LogDestination::File | LogDestination::Both) {
        if let Some(file_logger) = create_file_logger(level, config, log_file) {
            loggers.push(file_logger);
        }
    }
    if loggers.is_empty() {
        return;
    }

    let _ = CombinedLogger::init(loggers);
}

/// Parse a level name such as `"debug"` or `"WARN"`; unknown names map to `Info`.
pub fn parse_level(raw: &str) -> LevelFilter {
    raw.trim().parse().unwrap_or(LevelFilter::Info)
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build()
}

fn create_file_logger(
    level: LevelFilter,
    config: Config,
    log_file: &Path,
) -> Option<Box<WriteLogger<File>>> {
    match File::create(log_file) {
        Ok(file) => Some(WriteLogger::new(level, config, file)),
        Err(err) => {
            eprintln!("Warning: Could not create log file at {:?}: {}", log_file, err);
            None
        }
    }
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_level_accepts_any_case_and_defaults_to_info() {
        assert_eq!(parse_level("debug"), LevelFilter::Debug);
        assert_eq!(parse_level(" WARN "), LevelFilter::Warn);
        assert_eq!(parse_level("off"), LevelFilter::Off);
        assert_eq!(parse_level("chatty"), LevelFilter::Info);
    }

    #[test]
    fn job_scoped_macros_expand() {
        initialize_for_tests();
        let job = "veo_demo_1234";
        ekho_info!(job = job; "progress {}%", 40);
        ekho_debug!("plain line {}", 1);
        ekho_warn!(job = job; "transient failure");
    }
}
