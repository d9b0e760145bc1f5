//! Retry policy shared by the revoke and two-factor layers
//!
//! A policy is a bounded number of attempts, a fixed delay between them,
//! and a classifier deciding which errors are worth another attempt. An
//! error the classifier rejects leaves the policy immediately.

use crate::config::{EmailConfig, UnityConfig};
use crate::error::{FailureKind, RevoxError};
use futures::future::BoxFuture;
use std::time::Duration;

/// What a policy does with a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try again if attempts remain
    Retry,
    /// Propagate immediately
    Fatal,
}

/// Classifier from error to retry decision
pub type Classifier = fn(&RevoxError) -> RetryDecision;

/// Bounded retry with fixed delay
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    name: &'static str,
    max_attempts: u32,
    delay: Duration,
    classifier: Classifier,
}

impl RetryPolicy {
    /// Policy with no delay that retries nothing
    ///
    /// `max_attempts` is clamped to at least one.
    #[must_use]
    pub fn new(name: &'static str, max_attempts: u32) -> Self {
        Self {
            name,
            max_attempts: max_attempts.max(1),
            delay: Duration::ZERO,
            classifier: |_| RetryDecision::Fatal,
        }
    }

    /// Outer policy: whole workflow, retried on `RevokeFailed`
    #[must_use]
    pub fn revoke(config: &UnityConfig) -> Self {
        Self::new("revoke", config.retry_count).retry_on(retry_revoke_failed)
    }

    /// Inner policy: code fetch and apply, retried on `TwoFactorFailed`
    #[must_use]
    pub fn two_factor(config: &EmailConfig) -> Self {
        Self::new("two-factor", config.retry_count)
            .with_delay(config.retry_delay())
            .retry_on(retry_two_factor_failed)
    }

    /// Set the delay between attempts
    #[inline]
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Set the classifier
    #[inline]
    #[must_use]
    pub fn retry_on(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Policy name used in logs
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Upper bound on attempts
    #[inline]
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay between attempts
    #[inline]
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Classify an error
    #[inline]
    #[must_use]
    pub fn classify(&self, error: &RevoxError) -> RetryDecision {
        (self.classifier)(error)
    }

    /// Run `op` until it succeeds, fails fatally, or attempts run out
    ///
    /// `op` receives the mutable state and the 1-based attempt number.
    /// On exhaustion the last error is returned.
    ///
    /// # Errors
    /// The first fatal error, or the last retryable one once the budget is
    /// spent.
    pub async fn execute<S, T, F>(&self, state: &mut S, mut op: F) -> Result<T, RevoxError>
    where
        S: ?Sized,
        F: for<'s> FnMut(&'s mut S, u32) -> BoxFuture<'s, Result<T, RevoxError>>,
    {
        let mut attempt = 1;
        loop {
            let error = match op(state, attempt).await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            match self.classify(&error) {
                RetryDecision::Fatal => return Err(error),
                RetryDecision::Retry if attempt >= self.max_attempts => {
                    tracing::error!(
                        policy = self.name,
                        attempts = attempt,
                        error = %error,
                        "Retry budget exhausted"
                    );
                    return Err(error);
                }
                RetryDecision::Retry => {
                    tracing::warn!(
                        policy = self.name,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = u64::try_from(self.delay.as_millis()).unwrap_or(u64::MAX),
                        error = %error,
                        "Retrying"
                    );
                    if !self.delay.is_zero() {
                        tokio::time::sleep(self.delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }
}

fn retry_revoke_failed(error: &RevoxError) -> RetryDecision {
    match error.failure_kind() {
        Some(FailureKind::RevokeFailed) => RetryDecision::Retry,
        Some(FailureKind::TwoFactorFailed) | None => RetryDecision::Fatal,
    }
}

fn retry_two_factor_failed(error: &RevoxError) -> RetryDecision {
    match error.failure_kind() {
        Some(FailureKind::TwoFactorFailed) => RetryDecision::Retry,
        Some(FailureKind::RevokeFailed) | None => RetryDecision::Fatal,
    }
}
