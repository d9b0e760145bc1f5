//! Error types for Revox Core
//!
//! Two failure kinds are retryable, each by its own policy:
//! - `RevokeFailed` by the outer revoke policy
//! - `TwoFactorFailed` by the inner two-factor policy
//!
//! Everything else (rejected credentials, collaborator errors, bad
//! configuration) is fatal and propagates unchanged.

use std::fmt;

/// Main Revox error type
#[derive(Debug, thiserror::Error)]
pub enum RevoxError {
    /// Retryable orchestration failure
    #[error(transparent)]
    Orchestration(#[from] OrchestrationError),

    /// Portal rejected the credentials
    #[error("cannot authorize {login}")]
    Unauthorized {
        /// Portal account that failed to sign in
        login: String,
    },

    /// Browser session failed
    #[error("portal session error: {0}")]
    Session(#[from] SessionError),

    /// Mailbox access failed
    #[error("mailbox error: {0}")]
    CodeSource(#[from] CodeSourceError),

    /// Configuration rejected
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Whole run exceeded its deadline
    #[error("run timed out after {secs}s")]
    Timeout {
        /// Configured deadline in seconds
        secs: u64,
    },
}

impl RevoxError {
    /// Revoke attempt left activations behind
    #[inline]
    #[must_use]
    pub fn revoke_failed() -> Self {
        Self::Orchestration(OrchestrationError::new(FailureKind::RevokeFailed))
    }

    /// Two-factor step failed with a cause
    #[inline]
    pub fn two_factor_failed(cause: impl Into<String>) -> Self {
        Self::Orchestration(
            OrchestrationError::new(FailureKind::TwoFactorFailed).with_cause(cause),
        )
    }

    /// Failure kind, if this is a retryable orchestration failure
    #[inline]
    #[must_use]
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Orchestration(e) => Some(e.kind),
            _ => None,
        }
    }

    /// Stage of the workflow the error belongs to
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            Self::Orchestration(e) => match e.kind {
                FailureKind::RevokeFailed => Stage::Revoke,
                FailureKind::TwoFactorFailed => Stage::TwoFactor,
            },
            Self::Unauthorized { .. } => Stage::Authorization,
            Self::Session(_) => Stage::Portal,
            Self::CodeSource(_) => Stage::Mailbox,
            Self::Config(_) => Stage::Configuration,
            Self::Timeout { .. } => Stage::Timeout,
        }
    }
}

/// Retryable failure kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Activations remained after a revoke attempt
    RevokeFailed,
    /// Code could not be fetched or was rejected
    TwoFactorFailed,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::RevokeFailed => "revoke failed",
            Self::TwoFactorFailed => "two-factor failed",
        })
    }
}

/// Tagged orchestration failure with an optional cause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestrationError {
    /// Failure kind
    pub kind: FailureKind,
    /// Human-readable cause
    pub cause: Option<String>,
}

impl OrchestrationError {
    /// Failure without a cause
    #[inline]
    #[must_use]
    pub fn new(kind: FailureKind) -> Self {
        Self { kind, cause: None }
    }

    /// Attach a cause
    #[inline]
    #[must_use]
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }
}

impl fmt::Display for OrchestrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}: {cause}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for OrchestrationError {}

/// Workflow stage named in the final diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Signing in
    Authorization,
    /// Resolving the emailed code
    TwoFactor,
    /// Revoking activations
    Revoke,
    /// Browser session plumbing
    Portal,
    /// Mailbox plumbing
    Mailbox,
    /// Loading settings
    Configuration,
    /// Overall deadline
    Timeout,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Authorization => "authorization",
            Self::TwoFactor => "two-factor",
            Self::Revoke => "revoke",
            Self::Portal => "portal",
            Self::Mailbox => "mailbox",
            Self::Configuration => "configuration",
            Self::Timeout => "timeout",
        })
    }
}

/// Errors raised by a [`LoginSession`](crate::session::LoginSession)
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Driver could not be reached
    #[error("driver unreachable: {0}")]
    Transport(String),

    /// Required page element missing
    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// Driver answered with an error or malformed payload
    #[error("driver command failed: {0}")]
    Command(String),
}

/// Errors raised by a [`CodeSource`](crate::session::CodeSource)
#[derive(Debug, thiserror::Error)]
pub enum CodeSourceError {
    /// Connection or TLS handshake failed
    #[error("connect failed: {0}")]
    Connect(String),

    /// Mailbox rejected the credentials
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Listing or reading messages failed
    #[error("fetch failed: {0}")]
    Fetch(String),
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Required value missing or blank
    #[error("{0} must be set")]
    Missing(&'static str),

    /// Value out of range
    #[error("{field} is invalid: {reason}")]
    Invalid {
        /// Offending key
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },
}
