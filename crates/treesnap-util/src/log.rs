//! Logging setup using tracing.
//!
//! This module provides consistent logging configuration across treesnap.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Crates whose events are emitted at the configured level.
const CRATE_TARGETS: &[&str] = &["treesnap", "treesnap_snapshot", "treesnap_util"];

/// Log level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Level used for the `--verbose` flag.
    pub fn verbose(verbose: bool) -> Self {
        if verbose {
            LogLevel::Debug
        } else {
            LogLevel::default()
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogConfig {
    /// Level for treesnap's own crates.
    pub level: LogLevel,
}

impl LogConfig {
    /// Filter directive for the configured level, e.g. `treesnap=debug,treesnap_snapshot=debug`.
    pub fn filter_directive(&self) -> String {
        CRATE_TARGETS
            .iter()
            .map(|target| format!("{}={}", target, self.level.as_str()))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Initialize logging to stderr with the given configuration.
///
/// `RUST_LOG` takes precedence over the configured level. This should be
/// called once at application startup.
pub fn init(config: LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter_directive()));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
