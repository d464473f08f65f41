// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Interactive programs driven over a pseudo-terminal.
//!
//! A thin layer over [`rexpect`]: the pty session does the reading and the
//! bounded waits, this module adds first-of-several matching with the index
//! of the winning pattern, a transcript with secrets masked, and reply
//! cleanup.

use regex::Regex;
use rexpect::error::Error as ExpectError;
use rexpect::process::signal::Signal;
use rexpect::process::wait::WaitStatus;
use rexpect::reader::ReadUntil;
use rexpect::session::{spawn_command, PtySession};
use std::env;
use std::fs::File;
use std::io::{self, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

use super::login::{LoginState, Token};
use crate::logging::{Facility, Logger};
use crate::{log_debug, log_warning};

const EXIT_POLL: Duration = Duration::from_millis(50);

static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").expect("escape pattern is valid")
});

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("session I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("invalid prompt pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("timed out after {timeout:?} waiting for {waiting_for}: {detail}")]
    Timeout {
        waiting_for: String,
        timeout: Duration,
        detail: String,
    },

    #[error("program exited while waiting for {waiting_for}: {detail}")]
    Eof { waiting_for: String, detail: String },

    #[error("pseudo-terminal: {0}")]
    Pty(#[source] ExpectError),

    #[error("no login transition from {state:?} on {token:?}")]
    NoTransition { state: LoginState, token: Token },

    #[error("login failed in state {state:?}: {source}")]
    Login {
        state: LoginState,
        #[source]
        source: Box<SessionError>,
    },
}

/// Result of a successful [`Session::expect`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Index of the pattern that matched first in the output
    pub index: usize,
    /// Output preceding the match
    pub before: String,
    pub matched: String,
}

/// An interactive program attached to a pseudo-terminal
pub struct Session {
    pty: PtySession,
    transcript: Option<File>,
    timeout: Duration,
    logger: Logger,
}

impl Session {
    /// Start `program` as a session leader on a fresh pseudo-terminal.
    ///
    /// Terminal echo starts off. Everything read from and written to the
    /// terminal is copied into `transcript` when given.
    pub fn spawn(
        program: &str,
        args: &[String],
        transcript: Option<&Path>,
        timeout: Duration,
        logger: Logger,
    ) -> Result<Self, SessionError> {
        // exec failures happen after the fork, where they cannot be
        // reported, so the program is resolved up front.
        let resolved = resolve_program(program).map_err(|source| SessionError::Spawn {
            program: program.to_string(),
            source,
        })?;
        let transcript = transcript.map(File::create).transpose()?;

        let mut command = Command::new(&resolved);
        command.args(args);
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        let pty = spawn_command(command, Some(timeout_ms)).map_err(|e| match e {
            ExpectError::Io(source) => SessionError::Spawn {
                program: program.to_string(),
                source,
            },
            other => SessionError::Pty(other),
        })?;

        let session = Self {
            pty,
            transcript,
            timeout,
            logger,
        };
        log_debug!(
            session.logger,
            Facility::Session,
            "spawned {} (pid {}) on a pseudo-terminal",
            resolved.display(),
            session.pid()
        );
        Ok(session)
    }

    pub fn pid(&self) -> u32 {
        self.pty.process.child_pid.as_raw() as u32
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn is_alive(&self) -> bool {
        matches!(self.pty.process.status(), Some(WaitStatus::StillAlive))
    }

    pub fn has_exited(&mut self) -> bool {
        !self.is_alive()
    }

    fn record(&mut self, text: &[u8]) {
        if let Some(transcript) = self.transcript.as_mut() {
            let _ = transcript.write_all(text);
            let _ = transcript.flush();
        }
    }

    /// Wait until any of `patterns` matches the unread output.
    ///
    /// When several patterns match, the one starting earliest wins (ties go
    /// to the lower index). Output up to the end of the match is consumed.
    pub fn expect(&mut self, patterns: &[&Regex]) -> Result<Match, SessionError> {
        let needles = patterns
            .iter()
            .map(|re| ReadUntil::Regex((*re).clone()))
            .collect();
        let (before, matched) = self.pty.exp_any(needles).map_err(|e| match e {
            ExpectError::Timeout { .. } => SessionError::Timeout {
                waiting_for: describe(patterns),
                timeout: self.timeout,
                detail: e.to_string(),
            },
            ExpectError::EOF { .. } => SessionError::Eof {
                waiting_for: describe(patterns),
                detail: e.to_string(),
            },
            other => SessionError::Pty(other),
        })?;

        self.record(before.as_bytes());
        self.record(matched.as_bytes());
        Ok(Match {
            index: match_index(&before, &matched, patterns),
            before,
            matched,
        })
    }

    /// Write `text` followed by a newline.
    pub fn send_line(&mut self, text: &str) -> Result<(), SessionError> {
        self.write_line(text)?;
        self.record(format!("{}\n", text).as_bytes());
        Ok(())
    }

    /// Like [`send_line`](Self::send_line) but kept out of the transcript.
    pub fn send_secret(&mut self, text: &str) -> Result<(), SessionError> {
        self.write_line(text)?;
        self.record(b"********\n");
        Ok(())
    }

    fn write_line(&mut self, text: &str) -> Result<(), SessionError> {
        self.pty.send_line(text).map_err(SessionError::Pty)?;
        Ok(())
    }

    /// Send `text` and return the output printed before the next `prompt`.
    ///
    /// The echoed command line and terminal escape sequences are removed
    /// and line endings are normalised to `\n`.
    pub fn command(&mut self, text: &str, prompt: &Regex) -> Result<String, SessionError> {
        self.send_line(text)?;
        let reply = self.expect(&[prompt])?;
        Ok(clean_reply(&reply.before, text))
    }

    /// End the program: send `exit_command` if given, give it `grace` to
    /// exit on its own, then kill it.
    pub fn close(mut self, exit_command: Option<&str>, grace: Duration) -> Result<(), SessionError> {
        if let Some(exit) = exit_command {
            if let Err(e) = self.send_line(exit) {
                log_warning!(self.logger, Facility::Session, "failed to send '{}': {}", exit, e);
            }
        }
        let deadline = Instant::now() + grace;
        while self.is_alive() && Instant::now() < deadline {
            thread::sleep(EXIT_POLL);
        }
        if self.is_alive() {
            log_debug!(
                self.logger,
                Facility::Session,
                "pid {} still running after {:?}, killing",
                self.pid(),
                grace
            );
            self.pty
                .process
                .kill(Signal::SIGKILL)
                .map_err(SessionError::Pty)?;
        }
        Ok(())
    }

    /// Kill the program without asking it to exit.
    pub fn kill(mut self) -> Result<(), SessionError> {
        if self.is_alive() {
            self.pty
                .process
                .kill(Signal::SIGKILL)
                .map_err(SessionError::Pty)?;
        }
        Ok(())
    }
}

/// Locate `program` the way `execvp` would.
fn resolve_program(program: &str) -> io::Result<PathBuf> {
    fn is_executable(path: &Path) -> bool {
        path.metadata()
            .is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
    }
    let not_found = || io::Error::new(io::ErrorKind::NotFound, "no such executable");

    if program.contains('/') {
        let path = PathBuf::from(program);
        return if is_executable(&path) {
            Ok(path)
        } else {
            Err(not_found())
        };
    }
    env::var_os("PATH")
        .iter()
        .flat_map(env::split_paths)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
        .ok_or_else(not_found)
}

/// Which of `patterns` produced `matched`, given the output before it.
fn match_index(before: &str, matched: &str, patterns: &[&Regex]) -> usize {
    let text = format!("{}{}", before, matched);
    patterns
        .iter()
        .position(|re| re.find(&text).is_some_and(|m| m.start() == before.len()))
        .unwrap_or(0)
}

fn describe(patterns: &[&Regex]) -> String {
    patterns
        .iter()
        .map(|re| format!("/{}/", re.as_str()))
        .collect::<Vec<_>>()
        .join(" or ")
}

/// Strip the echoed command and terminal noise from a command reply.
pub fn clean_reply(raw: &str, command: &str) -> String {
    let text = ANSI_ESCAPE.replace_all(raw, "");
    let text = text.replace("\r\n", "\n").replace('\r', "");
    let mut lines: Vec<&str> = text.split('\n').collect();
    if lines.first().is_some_and(|first| first.contains(command)) {
        lines.remove(0);
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemorySink;

    fn re(pattern: &str) -> Regex {
        Regex::new(pattern).unwrap()
    }

    fn sh(script: &str, timeout: Duration) -> Session {
        Session::spawn(
            "sh",
            &["-c".to_string(), script.to_string()],
            None,
            timeout,
            Logger::new(MemorySink::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_match_index_picks_pattern_at_match_start() {
        let password = re("Password:");
        let host_key = re(r"continue connecting \(yes/no\)\?");
        let index = match_index(
            "Are you sure you want to ",
            "continue connecting (yes/no)?",
            &[&password, &host_key],
        );
        assert_eq!(index, 1);
    }

    #[test]
    fn test_match_index_tie_goes_to_lower_index() {
        let a = re("> ");
        let b = re(">");
        assert_eq!(match_index("root@localhost", "> ", &[&a, &b]), 0);
    }

    #[test]
    fn test_expect_first_of_several() {
        let mut session = sh(
            "printf 'continue connecting (yes/no)? Password: '; sleep 5",
            Duration::from_secs(5),
        );
        let password = re("Password:");
        let host_key = re(r"continue connecting \(yes/no\)\?");

        let first = session.expect(&[&password, &host_key]).unwrap();
        assert_eq!(first.index, 1);
        let second = session.expect(&[&password, &host_key]).unwrap();
        assert_eq!(second.index, 0);
        assert_eq!(second.matched, "Password:");

        session.kill().unwrap();
    }

    #[test]
    fn test_expect_times_out() {
        let mut session = sh("sleep 5", Duration::from_millis(300));
        let err = session.expect(&[&re("> ")]).unwrap_err();
        assert!(matches!(err, SessionError::Timeout { .. }), "{}", err);
        session.kill().unwrap();
    }

    #[test]
    fn test_expect_sees_exit() {
        let mut session = sh("printf 'bye\\n'", Duration::from_secs(5));
        let err = session.expect(&[&re("> ")]).unwrap_err();
        assert!(matches!(err, SessionError::Eof { .. }), "{}", err);
    }

    #[test]
    fn test_close_sends_exit_command() {
        let mut session = sh("printf '> '; read cmd; exit 0", Duration::from_secs(5));
        session.expect(&[&re("> ")]).unwrap();
        let started = Instant::now();
        session.close(Some("exit"), Duration::from_secs(5)).unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let err = Session::spawn(
            "/nonexistent/bin/netopeer2-cli",
            &[],
            None,
            Duration::from_secs(1),
            Logger::new(MemorySink::new()),
        )
        .err()
        .unwrap();
        assert!(matches!(err, SessionError::Spawn { .. }));
        assert!(resolve_program("sc-no-such-program-anywhere").is_err());
        assert!(resolve_program("sh").is_ok());
    }

    #[test]
    fn test_clean_reply_drops_echo_and_escapes() {
        let raw = "get --filter-xpath /ietf-interfaces:*\x1b[0K\r\nDATA\r\n<name>host-vpp1</name>\r\n";
        assert_eq!(
            clean_reply(raw, "get --filter-xpath /ietf-interfaces:*"),
            "DATA\n<name>host-vpp1</name>\n"
        );
    }

    #[test]
    fn test_clean_reply_keeps_first_line_without_echo() {
        assert_eq!(clean_reply("OK\r\n", "edit-config"), "OK\n");
    }

    #[test]
    fn test_describe_patterns() {
        let a = re("Password:");
        let b = re("yes/no");
        assert_eq!(describe(&[&a, &b]), "/Password:/ or /yes/no/");
    }
}
