//! Login, two-factor and revoke orchestration
//!
//! One run is an outer retry loop around the whole workflow:
//!
//! 1. Log in and classify the outcome
//! 2. `Success`: revoke
//! 3. `TwoFactorRequired`: fetch and apply the emailed code under the
//!    inner retry policy, then revoke
//! 4. `Failure`: stop, credentials will not get better by retrying
//!
//! A revoke that leaves activations behind restarts the workflow from a
//! fresh login under the outer policy, even when it happens after a
//! resolved two-factor challenge.

use crate::context::Context;
use crate::error::RevoxError;
use crate::outcome::LoginOutcome;
use crate::retry::RetryPolicy;
use crate::session::{CodeSource, LoginSession};
use std::time::Duration;
use tokio::time::Instant;
use tracing::Instrument;

/// Counters collected during a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Calls to [`LoginSession::login`]
    pub login_attempts: u32,
    /// Attempts of the two-factor sub-workflow
    pub two_factor_attempts: u32,
    /// Calls to [`CodeSource::fetch_latest`]
    pub code_fetches: u32,
    /// Calls to [`LoginSession::try_revoke`]
    pub revoke_attempts: u32,
    /// Wall-clock time of the run
    pub elapsed: Duration,
}

/// Drives the login, two-factor and revoke workflow to completion
#[derive(Debug)]
pub struct Orchestrator<S, C> {
    revoke_policy: RetryPolicy,
    two_factor_policy: RetryPolicy,
    workflow: Workflow<S, C>,
}

#[derive(Debug)]
struct Workflow<S, C> {
    ctx: Context,
    session: S,
    codes: C,
    grace_period: Duration,
    report: RunReport,
}

impl<S, C> Orchestrator<S, C>
where
    S: LoginSession + 'static,
    C: CodeSource + 'static,
{
    /// Build an orchestrator with policies taken from the context's config
    #[must_use]
    pub fn new(ctx: Context, session: S, codes: C) -> Self {
        let config = ctx.config();
        let revoke_policy = RetryPolicy::revoke(&config.unity);
        let two_factor_policy = RetryPolicy::two_factor(&config.email);
        let grace_period = config.email.grace_period();

        Self {
            revoke_policy,
            two_factor_policy,
            workflow: Workflow {
                ctx,
                session,
                codes,
                grace_period,
                report: RunReport::default(),
            },
        }
    }

    /// Replace both retry policies
    #[inline]
    #[must_use]
    pub fn with_policies(mut self, revoke: RetryPolicy, two_factor: RetryPolicy) -> Self {
        self.revoke_policy = revoke;
        self.two_factor_policy = two_factor;
        self
    }

    /// Run until activations are revoked or a fatal error occurs
    ///
    /// # Errors
    /// - `Unauthorized` when the portal rejects the credentials
    /// - the last `TwoFactorFailed` or `RevokeFailed` once its budget is spent
    /// - `Timeout` when the configured deadline expires
    /// - any collaborator error, unchanged
    pub async fn run(&mut self) -> Result<RunReport, RevoxError> {
        let span = self.workflow.ctx.span().clone();
        let deadline = self.workflow.ctx.config().run.timeout();
        self.workflow.report = RunReport::default();
        let start = Instant::now();

        let result = match deadline {
            Some(limit) => tokio::time::timeout(limit, self.execute())
                .instrument(span.clone())
                .await
                .unwrap_or(Err(RevoxError::Timeout {
                    secs: limit.as_secs(),
                })),
            None => self.execute().instrument(span.clone()).await,
        };

        self.workflow.report.elapsed = start.elapsed();
        let report = &self.workflow.report;
        span.in_scope(|| match &result {
            Ok(()) => tracing::info!(
                login_attempts = report.login_attempts,
                code_fetches = report.code_fetches,
                elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
                "Activations revoked"
            ),
            Err(e) => tracing::error!(stage = %e.stage(), error = %e, "Run failed"),
        });

        result.map(|()| self.workflow.report.clone())
    }

    async fn execute(&mut self) -> Result<(), RevoxError> {
        let two_factor = self.two_factor_policy;
        self.revoke_policy
            .execute(&mut self.workflow, move |workflow, attempt| {
                Box::pin(workflow.attempt(two_factor, attempt))
            })
            .await
    }

    /// Counters of the last run
    #[inline]
    #[must_use]
    pub fn report(&self) -> &RunReport {
        &self.workflow.report
    }

    /// Run context
    #[inline]
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.workflow.ctx
    }

    /// Portal session, e.g. to close it after the run
    #[inline]
    pub fn session_mut(&mut self) -> &mut S {
        &mut self.workflow.session
    }

    /// Give back the collaborators
    #[inline]
    pub fn into_parts(self) -> (S, C) {
        (self.workflow.session, self.workflow.codes)
    }
}

impl<S, C> Workflow<S, C>
where
    S: LoginSession + 'static,
    C: CodeSource + 'static,
{
    async fn attempt(&mut self, two_factor: RetryPolicy, attempt: u32) -> Result<(), RevoxError> {
        self.report.login_attempts += 1;
        let outcome = self.session.login().await?;
        tracing::info!(attempt, outcome = %outcome, "Login finished");

        match outcome {
            LoginOutcome::Success => {
                tracing::info!("Login successful, revoking");
                self.revoke().await
            }
            LoginOutcome::Failure => Err(RevoxError::Unauthorized {
                login: self.ctx.login().to_string(),
            }),
            LoginOutcome::TwoFactorRequired => {
                tracing::info!(
                    email = %self.ctx.config().email.login,
                    "Two-factor verification requested"
                );
                two_factor
                    .execute(self, |workflow, attempt| {
                        Box::pin(workflow.resolve_two_factor(attempt))
                    })
                    .await
            }
        }
    }

    async fn resolve_two_factor(&mut self, attempt: u32) -> Result<(), RevoxError> {
        self.report.two_factor_attempts += 1;
        if !self.grace_period.is_zero() {
            tokio::time::sleep(self.grace_period).await;
        }

        self.report.code_fetches += 1;
        let code = self.codes.fetch_latest().await?;
        if code.is_empty() {
            return Err(RevoxError::two_factor_failed("can't fetch code"));
        }

        tracing::info!(attempt, "Applying verification code");
        if !self.session.apply_two_factor(&code).await? {
            return Err(RevoxError::two_factor_failed("can't apply code"));
        }

        self.revoke().await
    }

    async fn revoke(&mut self) -> Result<(), RevoxError> {
        self.report.revoke_attempts += 1;
        if self.session.try_revoke().await? {
            Ok(())
        } else {
            Err(RevoxError::revoke_failed())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::VerificationCode;
    use crate::config::{RevoxConfig, Secret};
    use crate::error::{FailureKind, SessionError};
    use crate::session::{MockCodeSource, MockLoginSession};

    fn config(unity_retries: u32, email_retries: u32, delay_secs: u64) -> RevoxConfig {
        let mut config = RevoxConfig::default();
        config.unity.login = "ci@example.com".to_string();
        config.unity.password = Secret::new("hunter2");
        config.unity.retry_count = unity_retries;
        config.email.login = "codes@example.com".to_string();
        config.email.password = Secret::new("mail-pass");
        config.email.host = "imap.example.com".to_string();
        config.email.retry_count = email_retries;
        config.email.retry_delay_seconds = delay_secs;
        config
    }

    fn orchestrator(
        config: RevoxConfig,
        session: MockLoginSession,
        codes: MockCodeSource,
    ) -> Orchestrator<MockLoginSession, MockCodeSource> {
        Orchestrator::new(Context::new(config), session, codes)
    }

    #[tokio::test(start_paused = true)]
    async fn success_revokes_without_mailbox() {
        let mut session = MockLoginSession::new();
        session
            .expect_login()
            .times(1)
            .returning(|| Ok(LoginOutcome::Success));
        session.expect_try_revoke().times(1).returning(|| Ok(true));
        session.expect_apply_two_factor().never();
        let mut codes = MockCodeSource::new();
        codes.expect_fetch_latest().never();

        let report = orchestrator(config(3, 3, 5), session, codes)
            .run()
            .await
            .unwrap();

        assert_eq!(report.login_attempts, 1);
        assert_eq!(report.code_fetches, 0);
        assert_eq!(report.revoke_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_credentials_are_fatal() {
        let mut session = MockLoginSession::new();
        session
            .expect_login()
            .times(1)
            .returning(|| Ok(LoginOutcome::Failure));
        session.expect_try_revoke().never();
        let mut codes = MockCodeSource::new();
        codes.expect_fetch_latest().never();

        let mut orchestrator = orchestrator(config(5, 5, 5), session, codes);
        let err = orchestrator.run().await.unwrap_err();

        assert!(matches!(err, RevoxError::Unauthorized { ref login } if login == "ci@example.com"));
        assert_eq!(orchestrator.report().login_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_revoke_retries_whole_workflow() {
        let mut session = MockLoginSession::new();
        session
            .expect_login()
            .times(3)
            .returning(|| Ok(LoginOutcome::Success));
        session.expect_try_revoke().times(3).returning(|| Ok(false));
        let codes = MockCodeSource::new();

        let mut orchestrator = orchestrator(config(3, 3, 5), session, codes);
        let err = orchestrator.run().await.unwrap_err();

        assert_eq!(err.failure_kind(), Some(FailureKind::RevokeFailed));
        assert_eq!(orchestrator.report().login_attempts, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn revoke_recovers_on_later_attempt() {
        let mut session = MockLoginSession::new();
        session
            .expect_login()
            .times(2)
            .returning(|| Ok(LoginOutcome::Success));
        let mut revokes = 0;
        session.expect_try_revoke().times(2).returning(move || {
            revokes += 1;
            Ok(revokes == 2)
        });

        let report = orchestrator(config(3, 3, 5), session, MockCodeSource::new())
            .run()
            .await
            .unwrap();

        assert_eq!(report.login_attempts, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn two_factor_code_applied_then_revoked() {
        let mut session = MockLoginSession::new();
        session
            .expect_login()
            .times(1)
            .returning(|| Ok(LoginOutcome::TwoFactorRequired));
        session
            .expect_apply_two_factor()
            .withf(|code| code.as_str() == "482913")
            .times(1)
            .returning(|_| Ok(true));
        session.expect_try_revoke().times(1).returning(|| Ok(true));
        let mut codes = MockCodeSource::new();
        codes
            .expect_fetch_latest()
            .times(1)
            .returning(|| Ok(VerificationCode::new("482913")));

        let report = orchestrator(config(3, 3, 5), session, codes)
            .run()
            .await
            .unwrap();

        assert_eq!(report.code_fetches, 1);
        assert_eq!(report.two_factor_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_code_exhausts_inner_budget() {
        let mut session = MockLoginSession::new();
        session
            .expect_login()
            .times(1)
            .returning(|| Ok(LoginOutcome::TwoFactorRequired));
        session.expect_apply_two_factor().never();
        session.expect_try_revoke().never();
        let mut codes = MockCodeSource::new();
        codes
            .expect_fetch_latest()
            .times(4)
            .returning(|| Ok(VerificationCode::empty()));

        let start = Instant::now();
        let mut orchestrator = orchestrator(config(3, 4, 10), session, codes);
        let err = orchestrator.run().await.unwrap_err();

        assert_eq!(err.failure_kind(), Some(FailureKind::TwoFactorFailed));
        assert!(err.to_string().contains("can't fetch code"));
        assert!(start.elapsed() >= Duration::from_secs(30));
        assert_eq!(orchestrator.report().login_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_code_is_retried_with_fresh_fetch() {
        let mut session = MockLoginSession::new();
        session
            .expect_login()
            .times(1)
            .returning(|| Ok(LoginOutcome::TwoFactorRequired));
        session
            .expect_apply_two_factor()
            .times(2)
            .returning(|code| Ok(code.as_str() == "222222"));
        session.expect_try_revoke().times(1).returning(|| Ok(true));
        let mut codes = MockCodeSource::new();
        let mut fetched = 0;
        codes.expect_fetch_latest().times(2).returning(move || {
            fetched += 1;
            Ok(VerificationCode::new(if fetched == 1 { "111111" } else { "222222" }))
        });

        let report = orchestrator(config(3, 3, 5), session, codes)
            .run()
            .await
            .unwrap();

        assert_eq!(report.code_fetches, 2);
        assert_eq!(report.login_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn revoke_failure_after_two_factor_restarts_login() {
        let mut session = MockLoginSession::new();
        let mut logins = 0;
        session.expect_login().times(2).returning(move || {
            logins += 1;
            Ok(if logins == 1 {
                LoginOutcome::TwoFactorRequired
            } else {
                LoginOutcome::Success
            })
        });
        session
            .expect_apply_two_factor()
            .times(1)
            .returning(|_| Ok(true));
        let mut revokes = 0;
        session.expect_try_revoke().times(2).returning(move || {
            revokes += 1;
            Ok(revokes == 2)
        });
        let mut codes = MockCodeSource::new();
        codes
            .expect_fetch_latest()
            .times(1)
            .returning(|| Ok(VerificationCode::new("482913")));

        let report = orchestrator(config(3, 3, 5), session, codes)
            .run()
            .await
            .unwrap();

        assert_eq!(report.login_attempts, 2);
        assert_eq!(report.two_factor_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn session_error_is_not_retried() {
        let mut session = MockLoginSession::new();
        session
            .expect_login()
            .times(1)
            .returning(|| Err(SessionError::ElementNotFound("#email".to_string())));

        let err = orchestrator(config(5, 5, 5), session, MockCodeSource::new())
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, RevoxError::Session(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_bounds_whole_run() {
        let mut session = MockLoginSession::new();
        session
            .expect_login()
            .times(1)
            .returning(|| Ok(LoginOutcome::TwoFactorRequired));
        let mut codes = MockCodeSource::new();
        codes
            .expect_fetch_latest()
            .returning(|| Ok(VerificationCode::empty()));

        let mut config = config(3, 1000, 10);
        config.run.timeout_secs = 60;

        let err = orchestrator(config, session, codes)
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, RevoxError::Timeout { secs: 60 }));
    }
}
