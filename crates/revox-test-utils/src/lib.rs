//! Testing utilities for the Revox workspace
//!
//! Scripted collaborators: a portal session replaying login outcomes and
//! activation counts, and a mailbox replaying codes. Both repeat their last
//! scripted value once the script runs out.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use revox_core::{
    ActivationCount, CodeSource, CodeSourceError, Context, LoginOutcome, LoginSession,
    RevoxConfig, Secret, SessionError, VerificationCode,
};
use std::collections::VecDeque;

/// Call recorded by [`ScriptedSession`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCall {
    Login(LoginOutcome),
    ApplyTwoFactor(String),
    Count(u32),
    RevokeClick,
}

#[derive(Debug, Default)]
struct Script<T> {
    queue: VecDeque<T>,
    last: Option<T>,
}

impl<T: Clone> Script<T> {
    fn new(items: impl IntoIterator<Item = T>) -> Self {
        Self {
            queue: items.into_iter().collect(),
            last: None,
        }
    }

    fn next(&mut self) -> Option<T> {
        if let Some(item) = self.queue.pop_front() {
            self.last = Some(item.clone());
        }
        self.last.clone()
    }
}

/// Portal session replaying scripted outcomes
#[derive(Debug)]
pub struct ScriptedSession {
    logins: Script<LoginOutcome>,
    counts: Script<u32>,
    accepted: Vec<String>,
    calls: Vec<SessionCall>,
}

impl Default for ScriptedSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedSession {
    /// Session that logs in successfully and has nothing to revoke
    pub fn new() -> Self {
        Self {
            logins: Script::new([LoginOutcome::Success]),
            counts: Script::new([0]),
            accepted: Vec::new(),
            calls: Vec::new(),
        }
    }

    /// Outcomes returned by successive logins
    pub fn logins(mut self, outcomes: impl IntoIterator<Item = LoginOutcome>) -> Self {
        self.logins = Script::new(outcomes);
        self
    }

    /// Activation counts returned by successive count reads
    pub fn counts(mut self, counts: impl IntoIterator<Item = u32>) -> Self {
        self.counts = Script::new(counts);
        self
    }

    /// Codes the portal accepts
    pub fn accepting<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.accepted = codes.into_iter().map(Into::into).collect();
        self
    }

    /// Every call in order
    pub fn calls(&self) -> &[SessionCall] {
        &self.calls
    }

    pub fn login_calls(&self) -> usize {
        self.count_calls(|c| matches!(c, SessionCall::Login(_)))
    }

    pub fn revoke_clicks(&self) -> usize {
        self.count_calls(|c| matches!(c, SessionCall::RevokeClick))
    }

    pub fn applied_codes(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                SessionCall::ApplyTwoFactor(code) => Some(code.as_str()),
                _ => None,
            })
            .collect()
    }

    fn count_calls(&self, pred: impl Fn(&SessionCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }
}

#[async_trait]
impl LoginSession for ScriptedSession {
    async fn login(&mut self) -> Result<LoginOutcome, SessionError> {
        let outcome = self
            .logins
            .next()
            .ok_or_else(|| SessionError::Command("no login scripted".to_string()))?;
        self.calls.push(SessionCall::Login(outcome));
        Ok(outcome)
    }

    async fn apply_two_factor(&mut self, code: &VerificationCode) -> Result<bool, SessionError> {
        self.calls
            .push(SessionCall::ApplyTwoFactor(code.as_str().to_string()));
        Ok(self.accepted.iter().any(|c| c == code.as_str()))
    }

    async fn count(&mut self) -> Result<ActivationCount, SessionError> {
        let count = self
            .counts
            .next()
            .ok_or_else(|| SessionError::ElementNotFound("activations label".to_string()))?;
        self.calls.push(SessionCall::Count(count));
        Ok(ActivationCount::new(count))
    }

    async fn revoke_all(&mut self) -> Result<(), SessionError> {
        self.calls.push(SessionCall::RevokeClick);
        Ok(())
    }
}

/// Mailbox replaying scripted codes
#[derive(Debug, Default)]
pub struct ScriptedCodeSource {
    codes: Mutex<Script<String>>,
    fetches: Mutex<u32>,
    unreachable: bool,
}

impl ScriptedCodeSource {
    /// Mailbox returning `codes` in order, then the last one forever
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            codes: Mutex::new(Script::new(codes.into_iter().map(Into::into))),
            fetches: Mutex::new(0),
            unreachable: false,
        }
    }

    /// Mailbox that never has a code
    pub fn empty() -> Self {
        Self::new([""])
    }

    /// Mailbox whose server refuses connections
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    /// Number of fetches so far
    pub fn fetches(&self) -> u32 {
        *self.fetches.lock()
    }
}

#[async_trait]
impl CodeSource for ScriptedCodeSource {
    async fn fetch_latest(&self) -> Result<VerificationCode, CodeSourceError> {
        *self.fetches.lock() += 1;
        if self.unreachable {
            return Err(CodeSourceError::Connect("connection refused".to_string()));
        }
        Ok(self
            .codes
            .lock()
            .next()
            .map(VerificationCode::from)
            .unwrap_or_default())
    }
}

/// Valid configuration with the given retry budgets and no deadline
pub fn test_config(unity_retries: u32, email_retries: u32, delay_secs: u64) -> RevoxConfig {
    let mut config = RevoxConfig::default();
    config.unity.login = "ci@example.com".to_string();
    config.unity.password = Secret::new("hunter2");
    config.unity.retry_count = unity_retries;
    config.email.login = "codes@example.com".to_string();
    config.email.password = Secret::new("mail-pass");
    config.email.host = "imap.example.com".to_string();
    config.email.retry_count = email_retries;
    config.email.retry_delay_seconds = delay_secs;
    config.run.timeout_secs = 0;
    config
}

/// Context for [`test_config`]
pub fn test_context(unity_retries: u32, email_retries: u32, delay_secs: u64) -> Context {
    Context::new(test_config(unity_retries, email_retries, delay_secs))
}
