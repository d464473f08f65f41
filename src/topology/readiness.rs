// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Readiness gates between topology stages.
//!
//! A gate polls one health signal with bounded exponential backoff. A fixed
//! delay is still available as a probe kind for daemons that expose no
//! usable signal.

use serde::{Deserialize, Serialize};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;

use super::sweep;
use crate::logging::{Facility, Logger};
use crate::{log_debug, log_info, log_warning};

const TCP_CONNECT_TIMEOUT: Duration = Duration::from_millis(500);

/// Health signal polled by a readiness gate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Probe {
    /// Ready as soon as the process is spawned
    #[default]
    None,
    /// Fixed pause, no polling
    Delay { ms: u64 },
    /// Command exits successfully (`vppctl show version`)
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
    /// TCP connect succeeds; "connection refused" means not ready yet
    TcpPort { address: String },
    /// Path exists (unix socket, pid file)
    Path { path: PathBuf },
    /// A process whose name contains the pattern is present
    Process { pattern: String },
}

impl Probe {
    /// Run the probe once.
    ///
    /// `Ok(false)` is "not ready yet"; `Err` is a transient failure that is
    /// logged and retried like `Ok(false)`.
    pub fn check(&self) -> std::io::Result<bool> {
        match self {
            Probe::None | Probe::Delay { .. } => Ok(true),
            Probe::Command { program, args } => {
                let status = Command::new(program)
                    .args(args)
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .status()?;
                Ok(status.success())
            }
            Probe::TcpPort { address } => {
                for addr in address.to_socket_addrs()? {
                    if TcpStream::connect_timeout(&addr, TCP_CONNECT_TIMEOUT).is_ok() {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Probe::Path { path } => Ok(path.exists()),
            Probe::Process { pattern } => Ok(!sweep::find(std::slice::from_ref(pattern)).is_empty()),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Probe::None => "nothing".to_string(),
            Probe::Delay { ms } => format!("{}ms delay", ms),
            Probe::Command { program, args } => {
                format!("'{} {}' to succeed", program, args.join(" "))
            }
            Probe::TcpPort { address } => format!("TCP {} to accept", address),
            Probe::Path { path } => format!("{} to exist", path.display()),
            Probe::Process { pattern } => format!("process matching '{}'", pattern),
        }
    }
}

/// Backoff parameters for polling a probe
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryPolicy {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub timeout_ms: u64,
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: 100,
            max_delay_ms: 2000,
            timeout_ms: 30_000,
            backoff_factor: 1.5,
        }
    }
}

impl RetryPolicy {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Delay that follows `delay`, capped at `max_delay_ms`.
    ///
    /// A factor that does not give a representable delay (negative, NaN,
    /// overflowing) jumps straight to the cap.
    pub fn next_delay(&self, delay: Duration) -> Duration {
        let max = Duration::from_millis(self.max_delay_ms);
        Duration::try_from_secs_f64(delay.as_secs_f64() * self.backoff_factor)
            .map_or(max, |next| next.min(max))
    }
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("timed out after {elapsed:?} waiting for {description} ({attempts} attempts)")]
    Timeout {
        description: String,
        elapsed: Duration,
        attempts: u32,
    },
}

/// Readiness gate for one stage: a probe, its backoff and a settle pause
/// applied once the probe passes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Readiness {
    pub probe: Probe,
    pub retry: RetryPolicy,
    pub settle_ms: u64,
}

impl Readiness {
    pub fn delay(ms: u64) -> Self {
        Self {
            probe: Probe::Delay { ms },
            ..Self::default()
        }
    }

    pub fn probe(probe: Probe) -> Self {
        Self {
            probe,
            ..Self::default()
        }
    }

    pub fn with_settle(mut self, settle_ms: u64) -> Self {
        self.settle_ms = settle_ms;
        self
    }

    /// Block until the stage labelled `label` is ready.
    pub fn wait(&self, label: &str, logger: &Logger) -> Result<(), ProbeError> {
        match &self.probe {
            Probe::None => {}
            Probe::Delay { ms } => {
                log_debug!(logger, Facility::Topology, "{}: fixed {}ms pause", label, ms);
                std::thread::sleep(Duration::from_millis(*ms));
            }
            probe => {
                let description = format!("{} ({})", label, probe.describe());
                let attempts =
                    wait_for_condition(&self.retry, &description, logger, || probe.check())?;
                log_info!(
                    logger,
                    Facility::Topology,
                    "{} ready after {} attempt(s)",
                    label,
                    attempts
                );
            }
        }
        if self.settle_ms > 0 {
            std::thread::sleep(Duration::from_millis(self.settle_ms));
        }
        Ok(())
    }
}

/// Poll `condition` with exponential backoff until it returns `Ok(true)`.
///
/// Returns the number of attempts made. Errors from `condition` are
/// transient during startup and only logged.
pub fn wait_for_condition<F>(
    policy: &RetryPolicy,
    description: &str,
    logger: &Logger,
    mut condition: F,
) -> Result<u32, ProbeError>
where
    F: FnMut() -> std::io::Result<bool>,
{
    let start = Instant::now();
    let mut delay = Duration::from_millis(policy.initial_delay_ms);
    let mut attempts = 0;

    loop {
        attempts += 1;
        match condition() {
            Ok(true) => return Ok(attempts),
            Ok(false) => {
                log_debug!(
                    logger,
                    Facility::Topology,
                    "[{:.1}s] waiting for {}",
                    start.elapsed().as_secs_f64(),
                    description
                );
            }
            Err(e) => {
                log_warning!(
                    logger,
                    Facility::Topology,
                    "[{:.1}s] {}: transient error: {}",
                    start.elapsed().as_secs_f64(),
                    description,
                    e
                );
            }
        }

        if start.elapsed() + delay > policy.timeout() {
            return Err(ProbeError::Timeout {
                description: description.to_string(),
                elapsed: start.elapsed(),
                attempts,
            });
        }
        std::thread::sleep(delay);
        delay = policy.next_delay(delay);
    }
}
