// SPDX-License-Identifier: Apache-2.0 OR MIT
// Logger handle with severity filtering

use super::sink::{LogSink, StderrSink, StdoutSink};
use super::{Facility, Severity};
use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// One formatted log record
#[derive(Debug, Clone)]
pub struct LogLine {
    pub timestamp: DateTime<Local>,
    pub severity: Severity,
    pub facility: Facility,
    pub message: String,
    pub kvs: Vec<(String, String)>,
}

impl std::fmt::Display for LogLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] [{}] [{}] {}",
            self.timestamp.format("%H:%M:%S%.3f"),
            self.severity,
            self.facility,
            self.message
        )?;
        for (key, value) in &self.kvs {
            write!(f, " {}={}", key, value)?;
        }
        Ok(())
    }
}

/// Logger handle for writing log lines
///
/// Cheap to clone; all clones share the sink and the level settings.
#[derive(Clone)]
pub struct Logger {
    sink: Arc<Mutex<Box<dyn LogSink>>>,
    /// Global minimum log level (default: Info)
    global_min_level: Arc<AtomicU8>,
    /// Per-facility minimum log levels, override the global one
    facility_min_levels: Arc<RwLock<HashMap<Facility, Severity>>>,
}

impl Logger {
    pub fn new(sink: impl LogSink + 'static) -> Self {
        Self {
            sink: Arc::new(Mutex::new(Box::new(sink))),
            global_min_level: Arc::new(AtomicU8::new(Severity::Info.as_u8())),
            facility_min_levels: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn stdout() -> Self {
        Self::new(StdoutSink::new())
    }

    pub fn stderr() -> Self {
        Self::new(StderrSink::new())
    }

    #[inline]
    fn should_log(&self, severity: Severity, facility: Facility) -> bool {
        let levels = self
            .facility_min_levels
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(&min_level) = levels.get(&facility) {
            return severity <= min_level;
        }
        drop(levels);

        severity.as_u8() <= self.global_min_level.load(Ordering::Relaxed)
    }

    fn emit(&self, line: LogLine) {
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        sink.write_line(&line);
        sink.flush();
    }

    pub fn log(&self, severity: Severity, facility: Facility, message: &str) {
        if !self.should_log(severity, facility) {
            return;
        }
        self.emit(LogLine {
            timestamp: Local::now(),
            severity,
            facility,
            message: message.to_string(),
            kvs: Vec::new(),
        });
    }

    pub fn log_kv(
        &self,
        severity: Severity,
        facility: Facility,
        message: &str,
        kvs: &[(&str, &str)],
    ) {
        if !self.should_log(severity, facility) {
            return;
        }
        self.emit(LogLine {
            timestamp: Local::now(),
            severity,
            facility,
            message: message.to_string(),
            kvs: kvs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });
    }

    #[inline]
    pub fn error(&self, facility: Facility, message: &str) {
        self.log(Severity::Error, facility, message);
    }

    #[inline]
    pub fn warning(&self, facility: Facility, message: &str) {
        self.log(Severity::Warning, facility, message);
    }

    #[inline]
    pub fn notice(&self, facility: Facility, message: &str) {
        self.log(Severity::Notice, facility, message);
    }

    #[inline]
    pub fn info(&self, facility: Facility, message: &str) {
        self.log(Severity::Info, facility, message);
    }

    #[inline]
    pub fn debug(&self, facility: Facility, message: &str) {
        self.log(Severity::Debug, facility, message);
    }

    pub fn set_global_level(&self, level: Severity) {
        self.global_min_level.store(level.as_u8(), Ordering::Relaxed);
    }

    pub fn global_level(&self) -> Severity {
        Severity::from_u8(self.global_min_level.load(Ordering::Relaxed))
    }

    pub fn set_facility_level(&self, facility: Facility, level: Severity) {
        self.facility_min_levels
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(facility, level);
    }

    pub fn clear_facility_level(&self, facility: Facility) {
        self.facility_min_levels
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&facility);
    }
}
