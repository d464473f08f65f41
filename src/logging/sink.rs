// SPDX-License-Identifier: Apache-2.0 OR MIT
// Output sinks for log lines

use super::logger::LogLine;
use crate::output::SharedOutput;
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

/// Destination for formatted log lines
pub trait LogSink: Send {
    fn write_line(&mut self, line: &LogLine);

    fn flush(&mut self);
}

/// Writes to stdout
pub struct StdoutSink {
    stdout: std::io::Stdout,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self {
            stdout: std::io::stdout(),
        }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for StdoutSink {
    fn write_line(&mut self, line: &LogLine) {
        let _ = writeln!(self.stdout, "{}", line);
    }

    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }
}

/// Writes to stderr
pub struct StderrSink {
    stderr: std::io::Stderr,
}

impl StderrSink {
    pub fn new() -> Self {
        Self {
            stderr: std::io::stderr(),
        }
    }
}

impl Default for StderrSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for StderrSink {
    fn write_line(&mut self, line: &LogLine) {
        let _ = writeln!(self.stderr, "{}", line);
    }

    fn flush(&mut self) {
        let _ = self.stderr.flush();
    }
}

/// Writes into the runner's shared output stream
///
/// Whatever stream the runner currently has installed receives the line, so
/// a redirect done by the runner also captures harness logs.
pub struct SharedOutputSink {
    output: SharedOutput,
}

impl SharedOutputSink {
    pub fn new(output: SharedOutput) -> Self {
        Self { output }
    }
}

impl LogSink for SharedOutputSink {
    fn write_line(&mut self, line: &LogLine) {
        self.output.write_line(&line.to_string());
    }

    fn flush(&mut self) {
        self.output.flush();
    }
}

/// Keeps formatted lines in memory
#[derive(Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LogSink for MemorySink {
    fn write_line(&mut self, line: &LogLine) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_string());
    }

    fn flush(&mut self) {}
}
