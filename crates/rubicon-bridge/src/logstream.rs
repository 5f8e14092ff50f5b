//! Line-buffered pseudo-streams that forward interpreter output to the log
//!
//! The interpreter writes arbitrary fragments to its standard streams. A
//! [`LineBuffer`] joins them and emits one log record per complete line;
//! a trailing partial line stays buffered until its newline arrives.
//! `flush` does not force it out.
//!
//! Through [`io::Write`] the buffer accepts raw bytes; a UTF-8 sequence
//! split across two writes is decoded once it is complete.

use std::io;
use std::{mem, str};

/// Log target used for everything the interpreter prints
pub const LOG_TARGET: &str = "Python";

/// Severity of a forwarded line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Verbose
    Verbose,
    /// Debug
    Debug,
    /// Info, used for standard output
    Info,
    /// Warning
    Warn,
    /// Error, used for standard error
    Error,
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Verbose => log::Level::Trace,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Info => log::Level::Info,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Error => log::Level::Error,
        }
    }
}

/// Emit one line at `level` under [`LOG_TARGET`]
pub fn emit(level: LogLevel, line: &str) {
    log::log!(target: LOG_TARGET, log::Level::from(level), "{line}");
}

/// Pending partial line for one stream
#[derive(Debug, Clone)]
pub struct LineBuffer {
    level: LogLevel,
    pending: String,
    undecoded: Vec<u8>,
}

impl LineBuffer {
    /// Empty buffer emitting at `level`
    pub fn new(level: LogLevel) -> Self {
        Self {
            level,
            pending: String::new(),
            undecoded: Vec::new(),
        }
    }

    /// Text written since the last newline
    pub fn pending(&self) -> &str {
        &self.pending
    }

    /// Append `text` and return the lines it completed, without their
    /// newlines.
    pub fn take_lines(&mut self, text: &str) -> Vec<String> {
        self.pending.push_str(text);
        let Some(end) = self.pending.rfind('\n') else {
            return Vec::new();
        };
        let rest = self.pending.split_off(end + 1);
        let complete = std::mem::replace(&mut self.pending, rest);
        complete[..end].split('\n').map(str::to_string).collect()
    }

    /// Append `text` and log every completed line
    pub fn write_str(&mut self, text: &str) {
        let level = self.level;
        for line in self.take_lines(text) {
            emit(level, &line);
        }
    }
}

impl io::Write for LineBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.undecoded.extend_from_slice(buf);
        loop {
            let end = match str::from_utf8(&self.undecoded) {
                Ok(_) => self.undecoded.len(),
                // Incomplete sequence at the end: keep it for the next write.
                Err(e) => match e.error_len() {
                    None => e.valid_up_to(),
                    Some(invalid) => e.valid_up_to() + invalid,
                },
            };
            if end == 0 {
                break;
            }
            let rest = self.undecoded.split_off(end);
            let bytes = mem::replace(&mut self.undecoded, rest);
            self.write_str(&String::from_utf8_lossy(&bytes));
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
