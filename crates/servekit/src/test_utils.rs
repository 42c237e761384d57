//! Test utilities for logger and middleware testing.
//!
//! This module provides in-memory sinks to capture log output.

use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::logger::{Level, LogEntry, Logger};

/// Cloneable in-memory sink. All clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far.
    pub fn contents(&self) -> Vec<u8> {
        self.inner.lock().clone()
    }

    /// Written output split into lines, without the trailing newlines.
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.contents())
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Written output parsed as log entries, one per line.
    ///
    /// # Panics
    ///
    /// Panics if a line is not a [`LogEntry`].
    pub fn entries(&self) -> Vec<LogEntry> {
        self.lines()
            .iter()
            .map(|line| {
                serde_json::from_str(line)
                    .unwrap_or_else(|e| panic!("not a log entry: {line:?}: {e}"))
            })
            .collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Sink whose every write fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingWriter;

impl Write for FailingWriter {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A shared logger writing to a fresh [`SharedBuffer`].
pub fn test_logger(min_level: Level) -> (Arc<Logger>, SharedBuffer) {
    let buffer = SharedBuffer::new();
    let logger = Arc::new(Logger::new(buffer.clone(), min_level));
    (logger, buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_buffer_clones_share_storage() {
        let buffer = SharedBuffer::new();
        let mut writer = buffer.clone();
        writer.write_all(b"one\ntwo\n").unwrap();

        assert_eq!(buffer.lines(), vec!["one", "two"]);
    }

    #[test]
    fn test_entries_parse_logger_output() {
        let (logger, buffer) = test_logger(Level::Info);
        logger.info("ready", [("port", "4000")]);

        let entries = buffer.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "ready");
        assert_eq!(entries[0].properties["port"], "4000");
    }

    #[test]
    fn test_failing_writer_fails() {
        let err = FailingWriter.write_all(b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
