//! Wiring of the portal session, mailbox and orchestrator

use revox_core::{
    Context, Orchestrator, RevoxConfig, RevoxError, RunReport, SessionError, Stage,
};
use revox_mail::ImapCodeSource;
use revox_portal::{DriverProcess, PortalSession};

/// Process status for a completed run
pub const EXIT_SUCCESS: u8 = 0;
/// Process status for any fatal error
pub const EXIT_FAILURE: u8 = 1;

/// Map the outcome of the binary to its process status
#[must_use]
pub fn exit_status<T>(result: &anyhow::Result<T>) -> u8 {
    match result {
        Ok(_) => EXIT_SUCCESS,
        Err(_) => EXIT_FAILURE,
    }
}

/// Stage a failure belongs to; errors raised before the run count as
/// configuration
#[must_use]
pub fn failure_stage(err: &anyhow::Error) -> String {
    err.downcast_ref::<RevoxError>()
        .map_or_else(|| Stage::Configuration.to_string(), |e| e.stage().to_string())
}

/// Run one revoke job against the configured account
///
/// The browser session and any launched driver are released on every
/// exit path.
///
/// # Errors
/// Any fatal [`RevoxError`]; `stage()` names where it happened.
pub async fn run(config: RevoxConfig) -> Result<RunReport, RevoxError> {
    let ctx = Context::new(config);
    tracing::info!(run_id = %ctx.run_id(), login = ctx.login(), "Starting revoke run");

    let portal = &ctx.config().portal;
    let driver = match &portal.driver_path {
        Some(path) => Some(
            DriverProcess::spawn(path, &portal.webdriver_url)
                .await
                .map_err(SessionError::from)?,
        ),
        None => None,
    };

    let result = drive(ctx).await;

    if let Some(driver) = driver {
        driver.shutdown().await;
    }
    result
}

async fn drive(ctx: Context) -> Result<RunReport, RevoxError> {
    let session = PortalSession::open(ctx.config()).await?;
    let codes = ImapCodeSource::from_config(&ctx.config().email);

    let mut orchestrator = Orchestrator::new(ctx, session, codes);
    let result = orchestrator.run().await;

    if let Err(e) = orchestrator.session_mut().close().await {
        tracing::warn!(error = %e, "Failed to close browser session");
    }
    result
}
