// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Login handshake for interactive NETCONF clients.
//!
//! The handshake is a small state machine. Each state names the prompts it
//! accepts; the session waits for whichever appears first and the
//! transition table decides what to send back. Every wait is bounded by
//! the session timeout and a timeout in any state fails the login.
//!
//! ```text
//! AwaitPrompt --prompt/initiate--> AwaitChallenge
//! AwaitChallenge --password prompt/password--> AwaitCommandPrompt
//! AwaitChallenge --host key prompt/accept--> AwaitPassword
//! AwaitPassword --password prompt/password--> AwaitCommandPrompt
//! AwaitCommandPrompt --prompt--> Authenticated
//! ```

use regex::Regex;

use super::session::{Session, SessionError};
use crate::logging::{Facility, Logger};
use crate::log_debug;

/// What to send while logging in
#[derive(Debug, Clone, PartialEq)]
pub struct LoginSpec {
    /// Sent at the first prompt, e.g. `connect --host localhost`
    pub initiation: String,
    pub password: String,
    /// Regex for the password challenge
    pub password_prompt: String,
    /// Regex for the host-authenticity confirmation
    pub host_key_prompt: String,
    /// Answer to the host-authenticity confirmation
    pub accept_host_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    AwaitPrompt,
    AwaitChallenge,
    AwaitPassword,
    AwaitCommandPrompt,
    Authenticated,
}

/// Prompt recognised in the program output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Prompt,
    PasswordPrompt,
    HostKeyPrompt,
}

/// What to write after a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Nothing,
    Initiate,
    AcceptHostKey,
    Password,
}

impl LoginState {
    /// Tokens this state waits for, in priority order.
    pub fn expected(self) -> &'static [Token] {
        match self {
            LoginState::AwaitPrompt | LoginState::AwaitCommandPrompt => &[Token::Prompt],
            LoginState::AwaitChallenge => &[Token::PasswordPrompt, Token::HostKeyPrompt],
            LoginState::AwaitPassword => &[Token::PasswordPrompt],
            LoginState::Authenticated => &[],
        }
    }

    pub fn transition(self, token: Token) -> Option<(LoginState, Reply)> {
        use LoginState::*;
        match (self, token) {
            (AwaitPrompt, Token::Prompt) => Some((AwaitChallenge, Reply::Initiate)),
            (AwaitChallenge, Token::PasswordPrompt) => {
                Some((AwaitCommandPrompt, Reply::Password))
            }
            (AwaitChallenge, Token::HostKeyPrompt) => Some((AwaitPassword, Reply::AcceptHostKey)),
            (AwaitPassword, Token::PasswordPrompt) => Some((AwaitCommandPrompt, Reply::Password)),
            (AwaitCommandPrompt, Token::Prompt) => Some((Authenticated, Reply::Nothing)),
            _ => None,
        }
    }
}

struct Patterns {
    prompt: Regex,
    password: Regex,
    host_key: Regex,
}

impl Patterns {
    fn get(&self, token: Token) -> &Regex {
        match token {
            Token::Prompt => &self.prompt,
            Token::PasswordPrompt => &self.password,
            Token::HostKeyPrompt => &self.host_key,
        }
    }
}

/// Drive `session` from its first prompt to an authenticated command prompt.
pub fn login(
    session: &mut Session,
    prompt: &Regex,
    spec: &LoginSpec,
    logger: &Logger,
) -> Result<(), SessionError> {
    let patterns = Patterns {
        prompt: prompt.clone(),
        password: Regex::new(&spec.password_prompt)?,
        host_key: Regex::new(&spec.host_key_prompt)?,
    };

    let mut state = LoginState::AwaitPrompt;
    while state != LoginState::Authenticated {
        let tokens = state.expected();
        let regexes: Vec<&Regex> = tokens.iter().map(|t| patterns.get(*t)).collect();

        let seen = session.expect(&regexes).map_err(|source| SessionError::Login {
            state,
            source: Box::new(source),
        })?;
        let token = tokens[seen.index];
        let (next, reply) = state
            .transition(token)
            .ok_or(SessionError::NoTransition { state, token })?;

        let sent = match reply {
            Reply::Nothing => Ok(()),
            Reply::Initiate => session.send_line(&spec.initiation),
            Reply::AcceptHostKey => session.send_line(&spec.accept_host_key),
            Reply::Password => session.send_secret(&spec.password),
        };
        sent.map_err(|source| SessionError::Login {
            state,
            source: Box::new(source),
        })?;

        log_debug!(
            logger,
            Facility::Session,
            "login: {:?} --{:?}/{:?}--> {:?}",
            state,
            token,
            reply,
            next
        );
        state = next;
    }
    Ok(())
}
