//! Collaborator traits consumed by the orchestrator
//!
//! [`LoginSession`] drives the portal in a browser; [`CodeSource`] reads the
//! mailbox the portal sends verification codes to. Errors from either are
//! fatal to the run.

use crate::code::VerificationCode;
use crate::count::ActivationCount;
use crate::error::{CodeSourceError, SessionError};
use crate::outcome::LoginOutcome;
use async_trait::async_trait;

/// Portal session driven through a browser
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoginSession: Send {
    /// Submit the configured credentials
    async fn login(&mut self) -> Result<LoginOutcome, SessionError>;

    /// Submit a verification code; `true` when the portal accepted it
    async fn apply_two_factor(&mut self, code: &VerificationCode) -> Result<bool, SessionError>;

    /// Read the number of active activations
    async fn count(&mut self) -> Result<ActivationCount, SessionError>;

    /// Press the portal's revoke control once
    async fn revoke_all(&mut self) -> Result<(), SessionError>;

    /// Revoke every activation and verify the result
    ///
    /// Returns `true` when no activations remain, including when there
    /// were none to begin with (the revoke control is not touched then).
    async fn try_revoke(&mut self) -> Result<bool, SessionError> {
        let before = self.count().await?;
        if before.is_zero() {
            tracing::info!("Nothing to revoke, skipping");
            return Ok(true);
        }

        tracing::info!(count = before.get(), "Revoking activations");
        self.revoke_all().await?;

        let after = self.count().await?;
        if after.is_zero() {
            return Ok(true);
        }

        tracing::error!(
            before = before.get(),
            after = after.get(),
            "Failed to revoke {} activations, {} left",
            before,
            after
        );
        Ok(false)
    }
}

/// Mailbox delivering verification codes
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CodeSource: Send + Sync {
    /// Code from the most recent verification email; empty when none
    async fn fetch_latest(&self) -> Result<VerificationCode, CodeSourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct Seats {
        counts: VecDeque<u32>,
        clicks: u32,
    }

    #[async_trait]
    impl LoginSession for Seats {
        async fn login(&mut self) -> Result<LoginOutcome, SessionError> {
            Ok(LoginOutcome::Success)
        }

        async fn apply_two_factor(&mut self, _: &VerificationCode) -> Result<bool, SessionError> {
            Ok(true)
        }

        async fn count(&mut self) -> Result<ActivationCount, SessionError> {
            self.counts
                .pop_front()
                .map(ActivationCount::new)
                .ok_or_else(|| SessionError::ElementNotFound("label".to_string()))
        }

        async fn revoke_all(&mut self) -> Result<(), SessionError> {
            self.clicks += 1;
            Ok(())
        }
    }

    fn seats(counts: &[u32]) -> Seats {
        Seats {
            counts: counts.iter().copied().collect(),
            clicks: 0,
        }
    }

    #[tokio::test]
    async fn zero_count_skips_revoke() {
        let mut session = seats(&[0]);
        assert!(session.try_revoke().await.unwrap());
        assert_eq!(session.clicks, 0);
        assert!(session.counts.is_empty());
    }

    #[tokio::test]
    async fn revoke_verified_by_recount() {
        let mut session = seats(&[3, 0]);
        assert!(session.try_revoke().await.unwrap());
        assert_eq!(session.clicks, 1);
    }

    #[tokio::test]
    async fn remaining_activations_fail_revoke() {
        let mut session = seats(&[3, 1]);
        assert!(!session.try_revoke().await.unwrap());
        assert_eq!(session.clicks, 1);
    }

    #[tokio::test]
    async fn count_error_propagates() {
        let mut session = seats(&[]);
        assert!(matches!(
            session.try_revoke().await,
            Err(SessionError::ElementNotFound(_))
        ));
    }
}
