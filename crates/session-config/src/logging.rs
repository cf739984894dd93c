//! Logging initialization for the session tools.
//!
//! Thin wrapper over the observability crate: JSONL to
//! `~/.merchant-session/logs/session.jsonl` plus compact stderr output.

use crate::Paths;
use observability::LogConfig;

/// Initialize the logging system.
///
/// `level` is the default filter; `RUST_LOG` overrides it. When `paths` is
/// given, events are also appended to its log file.
pub fn init_logging(level: &str, paths: Option<&Paths>) {
    observability::init_with_config(LogConfig {
        service_name: "merchant-session".into(),
        default_level: level.into(),
        log_path: paths.map(Paths::log_file),
        also_stderr: true,
    });
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
