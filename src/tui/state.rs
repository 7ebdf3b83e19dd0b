//! Log capture for the TUI.
//!
//! While the terminal is in raw mode, tracing output is routed into a
//! [`LogBuffer`] through [`LogMakeWriter`] and rendered by the Logs view.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing_subscriber::fmt::MakeWriter;

/// Severity parsed back out of a formatted log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Level of a line written by the fmt layer; unknown lines count as info.
    pub fn from_line(line: &str) -> Self {
        let head: String = line.chars().take(48).collect();
        if head.contains("ERROR") {
            LogLevel::Error
        } else if head.contains("WARN") {
            LogLevel::Warn
        } else if head.contains("DEBUG") {
            LogLevel::Debug
        } else if head.contains("TRACE") {
            LogLevel::Trace
        } else {
            LogLevel::Info
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LogLevel::Trace => "Trace",
            LogLevel::Debug => "Debug",
            LogLevel::Info => "Info",
            LogLevel::Warn => "Warn",
            LogLevel::Error => "Error",
        }
    }
}

/// Bounded in-memory log buffer.
pub struct LogBuffer {
    lines: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    // A panic while holding the lock only loses log lines.
    fn lock(&self) -> MutexGuard<'_, VecDeque<String>> {
        self.lines.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append a line, evicting the oldest past capacity.
    pub fn push_line(&self, line: String) {
        let mut lines = self.lock();
        lines.push_back(line);
        while lines.len() > self.capacity {
            lines.pop_front();
        }
    }

    /// Up to `limit` most recent lines at or above `min_level`, oldest first.
    pub fn recent(&self, limit: usize, min_level: LogLevel) -> Vec<String> {
        let lines = self.lock();
        let mut matching: Vec<String> = lines
            .iter()
            .rev()
            .filter(|line| LogLevel::from_line(line) >= min_level)
            .take(limit)
            .cloned()
            .collect();
        matching.reverse();
        matching
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

/// Writer that splits fmt output into lines for a [`LogBuffer`].
pub struct LogWriter {
    buffer: Arc<LogBuffer>,
    pending: Vec<u8>,
}

impl LogWriter {
    fn flush_pending(&mut self) {
        if !self.pending.is_empty() {
            let line = String::from_utf8_lossy(&self.pending).trim_end().to_string();
            self.buffer.push_line(line);
            self.pending.clear();
        }
    }
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for &b in buf {
            if b == b'\n' {
                self.flush_pending();
            } else {
                self.pending.push(b);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_pending();
        Ok(())
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        self.flush_pending();
    }
}

/// `MakeWriter` handing out writers into a shared [`LogBuffer`].
#[derive(Clone)]
pub struct LogMakeWriter {
    buffer: Arc<LogBuffer>,
}

impl LogMakeWriter {
    pub fn new(buffer: Arc<LogBuffer>) -> Self {
        Self { buffer }
    }
}

impl<'a> MakeWriter<'a> for LogMakeWriter {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter {
            buffer: Arc::clone(&self.buffer),
            pending: Vec::new(),
        }
    }
}
