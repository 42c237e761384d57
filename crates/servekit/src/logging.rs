//! Logging configuration.
//!
//! Two outputs are configured here:
//!
//! - [`LoggerConfig`] builds the application [`Logger`] that writes JSON
//!   lines for requests and errors.
//! - [`LoggingConfig`] and [`init_logging`] set up `tracing`, which this
//!   crate uses for its own diagnostics (e.g. a log sink that stopped
//!   accepting writes).
//!
//! Nothing here reads the environment unless `from_env` is called.
//!
//! # Environment Variables
//!
//! - `LOG_LEVEL`: minimum [`Level`] for the application logger (default: `info`)
//! - `LOG_OUTPUT`: `stdout` (default) or `stderr`
//! - `LOG_FORMAT`: diagnostics format, either `json` (default) or `text`
//! - `RUST_LOG`: diagnostics filter (default: `warn`)
//!
//! # Example
//!
//! ```no_run
//! use servekit::logging::{init_logging, LoggerConfig, LoggingConfig};
//!
//! init_logging(&LoggingConfig::from_env());
//! let logger = LoggerConfig::from_env().build();
//! logger.info("starting", [("env", "production")]);
//! ```

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::logger::{Level, Logger};

/// Where the application logger writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
}

impl LogOutput {
    /// Parse an output name. Returns `Stdout` for anything but "stderr".
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "stderr" => LogOutput::Stderr,
            _ => LogOutput::Stdout,
        }
    }
}

/// Configuration for the application [`Logger`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Entries below this level are dropped.
    pub min_level: Level,
    pub output: LogOutput,
}

impl LoggerConfig {
    /// Create configuration from environment variables.
    ///
    /// - `LOG_LEVEL`: "info" (default), "error" or "fatal"; unknown values
    ///   fall back to the default
    /// - `LOG_OUTPUT`: "stdout" (default) or "stderr"
    pub fn from_env() -> Self {
        let min_level = std::env::var("LOG_LEVEL")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_default();

        let output = std::env::var("LOG_OUTPUT")
            .map(|v| LogOutput::parse(&v))
            .unwrap_or_default();

        Self { min_level, output }
    }

    pub fn build(&self) -> Logger {
        match self.output {
            LogOutput::Stdout => Logger::stdout(self.min_level),
            LogOutput::Stderr => Logger::stderr(self.min_level),
        }
    }
}

/// Diagnostics output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON structured logging (default, production).
    #[default]
    Json,
    /// Human-readable text logging (development).
    Text,
}

impl LogFormat {
    /// Parse log format from string.
    ///
    /// Accepts "json", "text", or "pretty" (alias for text).
    /// Returns `Json` for any other value.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => LogFormat::Text,
            _ => LogFormat::Json,
        }
    }
}

/// Configuration for `tracing` diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Filter directive (e.g., "warn", "servekit=debug").
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Json,
            level: "warn".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Create configuration from environment variables.
    ///
    /// - `LOG_FORMAT`: "json" (default) or "text"
    /// - `RUST_LOG`: filter directive (default: "warn")
    pub fn from_env() -> Self {
        let format = std::env::var("LOG_FORMAT")
            .map(|v| LogFormat::parse(&v))
            .unwrap_or(LogFormat::Json);

        let level = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string());

        Self { format, level }
    }
}

/// Install a global `tracing` subscriber for diagnostics, writing to stderr.
///
/// Call once at startup. Returns `false` if a subscriber was already
/// installed.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Text => registry
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init()
            .is_ok(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .is_ok(),
    }
}
