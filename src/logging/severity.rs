// SPDX-License-Identifier: Apache-2.0 OR MIT
// Severity levels, numbered like syslog (lower is more severe)

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Log severity. Only the syslog levels the harness actually emits exist.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// A stage, command or test could not complete
    Error = 3,
    /// Something was skipped or degraded (sweep kills, probe retries)
    Warning = 4,
    /// Lifecycle milestones (topology up, topology closed)
    Notice = 5,
    /// Per-stage and per-test progress
    Info = 6,
    /// Commands sent, raw CLI output, probe attempts
    Debug = 7,
}

impl Severity {
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
            Severity::Notice => "NOTICE",
            Severity::Info => "INFO",
            Severity::Debug => "DEBUG",
        }
    }

    /// Levels outside the harness range clamp to the nearest one.
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0..=3 => Severity::Error,
            4 => Severity::Warning,
            5 => Severity::Notice,
            6 => Severity::Info,
            _ => Severity::Debug,
        }
    }

    /// Daemon log level flag value (`-l N`) matching this harness level.
    ///
    /// sysrepo uses 0..4 where 3 is "info" and 4 is "debug".
    pub const fn daemon_level(self) -> u8 {
        match self {
            Severity::Debug => 4,
            _ => 3,
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(Severity::Error),
            "warning" | "warn" => Ok(Severity::Warning),
            "notice" => Ok(Severity::Notice),
            "info" => Ok(Severity::Info),
            "debug" => Ok(Severity::Debug),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
