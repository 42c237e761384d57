//! Leveled JSON-lines logger.
//!
//! A [`Logger`] writes one JSON object per line to any byte sink:
//!
//! ```json
//! {"level":"INFO","time":"2025-12-30T10:00:00Z","message":"request","properties":{"method":"GET"}}
//! {"level":"ERROR","time":"2025-12-30T10:00:01Z","message":"database unreachable","trace":"..."}
//! ```
//!
//! Loggers are plain values. Construct one at startup and share it through an
//! `Arc` with whatever needs it.
//!
//! # Example
//!
//! ```
//! use servekit::logger::{Level, Logger, Properties};
//!
//! let logger = Logger::new(std::io::sink(), Level::Info);
//! logger.info("starting server", [("addr", "0.0.0.0:4000")]);
//! logger.error("connection refused", Properties::new());
//! ```

use std::backtrace::Backtrace;
use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Key/value pairs attached to a log entry.
pub type Properties = BTreeMap<String, String>;

/// Severity of a log entry. `Info < Error < Fatal`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    #[default]
    Info,
    Error,
    Fatal,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Info => "INFO",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
        })
    }
}

/// Error returned when parsing an unknown level name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown log level: {0}")]
pub struct ParseLevelError(String);

impl FromStr for Level {
    type Err = ParseLevelError;

    /// Accepts `info`, `error` and `fatal` in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Level::Info),
            "error" => Ok(Level::Error),
            "fatal" => Ok(Level::Fatal),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

/// One emitted log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: Level,
    /// RFC 3339 UTC timestamp, second precision.
    pub time: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: Properties,
    /// Stack trace, captured for `Error` and `Fatal` only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

impl LogEntry {
    fn new(level: Level, message: String, properties: Properties) -> Self {
        let trace = (level >= Level::Error).then(|| Backtrace::force_capture().to_string());
        Self {
            level,
            time: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            message,
            properties,
            trace,
        }
    }
}

/// Mutex-serialized writer of [`LogEntry`] lines.
pub struct Logger {
    out: Mutex<Box<dyn Write + Send>>,
    min_level: Level,
}

impl Logger {
    /// Create a logger writing to `out`. Entries below `min_level` are
    /// dropped.
    pub fn new(out: impl Write + Send + 'static, min_level: Level) -> Self {
        Self {
            out: Mutex::new(Box::new(out)),
            min_level,
        }
    }

    pub fn stdout(min_level: Level) -> Self {
        Self::new(io::stdout(), min_level)
    }

    pub fn stderr(min_level: Level) -> Self {
        Self::new(io::stderr(), min_level)
    }

    pub fn min_level(&self) -> Level {
        self.min_level
    }

    pub fn info<K, V>(
        &self,
        message: impl Into<String>,
        properties: impl IntoIterator<Item = (K, V)>,
    ) where
        K: Into<String>,
        V: Into<String>,
    {
        self.log(Level::Info, message.into(), collect(properties));
    }

    pub fn error<K, V>(
        &self,
        err: impl fmt::Display,
        properties: impl IntoIterator<Item = (K, V)>,
    ) where
        K: Into<String>,
        V: Into<String>,
    {
        self.log(Level::Error, err.to_string(), collect(properties));
    }

    /// Log at `Fatal` level, then exit the process with status 1.
    pub fn fatal<K, V>(
        &self,
        err: impl fmt::Display,
        properties: impl IntoIterator<Item = (K, V)>,
    ) -> !
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.log(Level::Fatal, err.to_string(), collect(properties));
        std::process::exit(1)
    }

    fn log(&self, level: Level, message: String, properties: Properties) {
        if let Err(err) = self.print(level, message, properties) {
            report_write_failure(&err);
        }
    }

    /// Build, serialize and write one entry. Returns the number of bytes
    /// written, zero when the entry was filtered out.
    fn print(&self, level: Level, message: String, properties: Properties) -> io::Result<usize> {
        if level < self.min_level {
            return Ok(0);
        }

        let entry = LogEntry::new(level, message, properties);
        let mut line = serde_json::to_vec(&entry).unwrap_or_else(|err| {
            format!("{}: unable to marshal log message: {err}", Level::Error).into_bytes()
        });
        line.push(b'\n');

        let mut out = self.out.lock();
        out.write_all(&line)?;
        out.flush()?;
        Ok(line.len())
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("min_level", &self.min_level)
            .finish_non_exhaustive()
    }
}

fn collect<K, V>(properties: impl IntoIterator<Item = (K, V)>) -> Properties
where
    K: Into<String>,
    V: Into<String>,
{
    properties
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect()
}

/// Sink failures never reach the caller; they go to tracing and stderr.
fn report_write_failure(err: &io::Error) {
    tracing::warn!(error = %err, "failed to write log entry");
    let _ = writeln!(io::stderr(), "Failed to log message: {err}");
}
