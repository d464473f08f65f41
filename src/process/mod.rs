// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Handles on external processes.
//!
//! A [`ProcessHandle`] owns one spawned program, either a background daemon
//! whose output goes to a log file or an interactive client driven over a
//! pseudo-terminal. Handles move through `Unspawned -> Running ->
//! Terminated`. Once terminated every operation is a no-op.

pub mod login;
pub mod session;

use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use regex::Regex;
use std::fs::File;
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use thiserror::Error;
use wait_timeout::ChildExt;

pub use login::{LoginSpec, LoginState};
pub use session::{Session, SessionError};

use crate::logging::{Facility, Logger, Severity};
use crate::{log_debug, log_info, log_kv, log_warning};

/// Settings for an interactive program
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSpec {
    /// Regex matching the command prompt
    pub prompt: String,
    /// Bound on every prompt wait
    pub timeout: Duration,
    pub login: Option<LoginSpec>,
    /// Sent before the session is closed
    pub exit_command: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProcessKind {
    /// Runs in its own process group; stdout and stderr go to the log file
    Daemon,
    /// Runs on a pseudo-terminal; the log file receives the transcript
    Interactive(SessionSpec),
}

/// Everything needed to start one program
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSpec {
    /// Short name used in logs ("vpp", "sysrepod", ...)
    pub label: String,
    pub program: String,
    pub args: Vec<String>,
    pub log_file: PathBuf,
    pub kind: ProcessKind,
    /// Time between the polite stop request and SIGKILL
    pub grace: Duration,
}

impl ProcessSpec {
    pub fn daemon(label: &str, program: &str, args: Vec<String>, log_file: PathBuf) -> Self {
        Self {
            label: label.to_string(),
            program: program.to_string(),
            args,
            log_file,
            kind: ProcessKind::Daemon,
            grace: Duration::from_secs(2),
        }
    }

    pub fn interactive(
        label: &str,
        program: &str,
        args: Vec<String>,
        log_file: PathBuf,
        session: SessionSpec,
    ) -> Self {
        Self {
            label: label.to_string(),
            program: program.to_string(),
            args,
            log_file,
            kind: ProcessKind::Interactive(session),
            grace: Duration::from_secs(2),
        }
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Unspawned,
    Running,
    Terminated,
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("{label}: spawn() called in state {state:?}")]
    InvalidState { label: String, state: HandleState },

    #[error("{label}: failed to open log file {path}: {source}")]
    LogFile {
        label: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{label}: failed to start '{program}': {source}")]
    Spawn {
        label: String,
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{label}: {source}")]
    Session {
        label: String,
        #[source]
        source: SessionError,
    },

    #[error("{label}: invalid prompt pattern: {source}")]
    Pattern {
        label: String,
        #[source]
        source: regex::Error,
    },

    #[error("{label}: {source}")]
    Io {
        label: String,
        #[source]
        source: std::io::Error,
    },
}

impl ProcessError {
    /// True if an expected prompt never appeared.
    pub fn is_timeout(&self) -> bool {
        match self {
            ProcessError::Session { source, .. } => match source {
                SessionError::Timeout { .. } => true,
                SessionError::Login { source, .. } => {
                    matches!(**source, SessionError::Timeout { .. })
                }
                _ => false,
            },
            _ => false,
        }
    }
}

enum Runtime {
    Daemon(Child),
    Interactive { session: Session, prompt: Regex },
}

/// One owned external process
pub struct ProcessHandle {
    spec: ProcessSpec,
    state: HandleState,
    runtime: Option<Runtime>,
    pid: Option<u32>,
    logger: Logger,
}

impl ProcessHandle {
    pub fn new(spec: ProcessSpec, logger: Logger) -> Self {
        Self {
            spec,
            state: HandleState::Unspawned,
            runtime: None,
            pid: None,
            logger,
        }
    }

    pub fn label(&self) -> &str {
        &self.spec.label
    }

    pub fn spec(&self) -> &ProcessSpec {
        &self.spec
    }

    pub fn state(&self) -> HandleState {
        self.state
    }

    /// Pid of the spawned program, kept after termination for diagnostics.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn is_running(&self) -> bool {
        self.state == HandleState::Running
    }

    /// True if the process is gone (or was never started).
    pub fn has_exited(&mut self) -> bool {
        match self.runtime.as_mut() {
            Some(Runtime::Daemon(child)) => !matches!(child.try_wait(), Ok(None)),
            Some(Runtime::Interactive { session, .. }) => session.has_exited(),
            None => true,
        }
    }

    /// Start the program. Interactive programs also complete their login
    /// before this returns.
    ///
    /// A failed login leaves the handle `Terminated` with the program
    /// killed.
    pub fn spawn(&mut self) -> Result<(), ProcessError> {
        if self.state != HandleState::Unspawned {
            return Err(ProcessError::InvalidState {
                label: self.spec.label.clone(),
                state: self.state,
            });
        }

        let runtime = match self.spec.kind.clone() {
            ProcessKind::Daemon => self.spawn_daemon()?,
            ProcessKind::Interactive(session) => self.spawn_interactive(&session)?,
        };
        self.runtime = Some(runtime);
        self.state = HandleState::Running;
        Ok(())
    }

    fn spawn_daemon(&mut self) -> Result<Runtime, ProcessError> {
        let label = self.spec.label.clone();
        let log_error = |source| ProcessError::LogFile {
            label: label.clone(),
            path: self.spec.log_file.clone(),
            source,
        };
        let log = File::create(&self.spec.log_file).map_err(log_error)?;
        let log_err = log.try_clone().map_err(log_error)?;

        let child = Command::new(&self.spec.program)
            .args(&self.spec.args)
            .stdin(Stdio::null())
            .stdout(log)
            .stderr(log_err)
            .process_group(0)
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                label: label.clone(),
                program: self.spec.program.clone(),
                source,
            })?;

        self.pid = Some(child.id());
        log_kv!(
            self.logger,
            Severity::Info,
            Facility::Process,
            "spawned",
            "label" => &label,
            "pid" => &child.id().to_string(),
            "cmd" => &format!("{} {}", self.spec.program, self.spec.args.join(" ")),
            "log" => &self.spec.log_file.display().to_string()
        );
        Ok(Runtime::Daemon(child))
    }

    fn spawn_interactive(&mut self, spec: &SessionSpec) -> Result<Runtime, ProcessError> {
        let label = self.spec.label.clone();
        let prompt = Regex::new(&spec.prompt).map_err(|source| ProcessError::Pattern {
            label: label.clone(),
            source,
        })?;

        let mut session = Session::spawn(
            &self.spec.program,
            &self.spec.args,
            Some(&self.spec.log_file),
            spec.timeout,
            self.logger.clone(),
        )
        .map_err(|source| match source {
            SessionError::Spawn { program, source } => ProcessError::Spawn {
                label: label.clone(),
                program,
                source,
            },
            source => ProcessError::Session {
                label: label.clone(),
                source,
            },
        })?;
        self.pid = Some(session.pid());
        log_kv!(
            self.logger,
            Severity::Info,
            Facility::Process,
            "spawned",
            "label" => &label,
            "pid" => &session.pid().to_string(),
            "cmd" => &self.spec.program,
            "log" => &self.spec.log_file.display().to_string()
        );

        if let Some(login) = &spec.login {
            if let Err(source) = login::login(&mut session, &prompt, login, &self.logger) {
                log_warning!(self.logger, Facility::Process, "{}: login failed", label);
                let _ = session.kill();
                self.state = HandleState::Terminated;
                return Err(ProcessError::Session { label, source });
            }
            log_info!(self.logger, Facility::Process, "{}: logged in", label);
        }

        Ok(Runtime::Interactive { session, prompt })
    }

    /// Send a command and return the output printed before the next prompt.
    ///
    /// `Ok(None)` when there is no session to talk to: the handle is not
    /// running or wraps a daemon.
    pub fn send_command(&mut self, text: &str) -> Result<Option<String>, ProcessError> {
        let Some(Runtime::Interactive { session, prompt }) = self.runtime.as_mut() else {
            return Ok(None);
        };
        log_debug!(self.logger, Facility::Process, "{} <- {}", self.spec.label, text);
        let reply = session
            .command(text, prompt)
            .map_err(|source| ProcessError::Session {
                label: self.spec.label.clone(),
                source,
            })?;
        log_debug!(self.logger, Facility::Process, "{} -> {}", self.spec.label, reply.trim_end());
        Ok(Some(reply))
    }

    /// Stop the program politely, then forcefully after the grace period.
    ///
    /// Daemons get SIGTERM to their whole process group; interactive
    /// programs get their exit command. Calling this again is a no-op.
    pub fn terminate(&mut self) -> Result<(), ProcessError> {
        self.stop(false)
    }

    /// Stop the program with SIGKILL. Calling this again is a no-op.
    pub fn kill(&mut self) -> Result<(), ProcessError> {
        self.stop(true)
    }

    fn stop(&mut self, force: bool) -> Result<(), ProcessError> {
        self.state = HandleState::Terminated;
        let Some(runtime) = self.runtime.take() else {
            return Ok(());
        };

        let label = self.spec.label.clone();
        let io_error = |source| ProcessError::Io {
            label: label.clone(),
            source,
        };
        match runtime {
            Runtime::Daemon(mut child) => {
                stop_group(&mut child, force, self.spec.grace, &self.logger, &label)
                    .map_err(io_error)?;
            }
            Runtime::Interactive { session, .. } => {
                let stopped = if force {
                    session.kill()
                } else {
                    session.close(self.session_exit_command(), self.spec.grace)
                };
                stopped.map_err(|source| ProcessError::Session {
                    label: label.clone(),
                    source,
                })?;
            }
        }
        log_info!(
            self.logger,
            Facility::Process,
            "{} {}",
            label,
            if force { "killed" } else { "terminated" }
        );
        Ok(())
    }

    fn session_exit_command(&self) -> Option<&str> {
        match &self.spec.kind {
            ProcessKind::Interactive(spec) => spec.exit_command.as_deref(),
            ProcessKind::Daemon => None,
        }
    }

    /// Give up ownership without stopping the program.
    ///
    /// Used in debug mode so processes stay up for inspection after the
    /// harness is gone. The pseudo-terminal of an interactive program is
    /// leaked on purpose: closing it would hang the program up.
    pub fn release(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            if let Runtime::Interactive { session, .. } = runtime {
                std::mem::forget(session);
            }
            log_info!(
                self.logger,
                Facility::Process,
                "{} left running (pid {:?})",
                self.spec.label,
                self.pid
            );
        }
        self.state = HandleState::Terminated;
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        if let Err(e) = self.terminate() {
            log_warning!(self.logger, Facility::Process, "teardown on drop: {}", e);
        }
    }
}

/// Signal the process group led by `child`, wait up to `grace`, then
/// SIGKILL the group and reap the child.
fn stop_group(
    child: &mut Child,
    force: bool,
    grace: Duration,
    logger: &Logger,
    label: &str,
) -> std::io::Result<()> {
    let group = Pid::from_raw(child.id() as i32);

    if !force {
        if let Err(e) = killpg(group, Signal::SIGTERM) {
            log_debug!(logger, Facility::Process, "{}: SIGTERM to group: {}", label, e);
        }
        if child.wait_timeout(grace)?.is_some() {
            // Leader is gone; stragglers in the group still get SIGKILL.
            let _ = killpg(group, Signal::SIGKILL);
            return Ok(());
        }
        log_warning!(
            logger,
            Facility::Process,
            "{} ignored SIGTERM for {:?}",
            label,
            grace
        );
    }

    if let Err(e) = killpg(group, Signal::SIGKILL) {
        log_debug!(logger, Facility::Process, "{}: SIGKILL to group: {}", label, e);
        let _ = child.kill();
    }
    child.wait()?;
    Ok(())
}
