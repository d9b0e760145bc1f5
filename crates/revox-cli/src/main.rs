//! `revox` binary entry point

use anyhow::Context as _;
use clap::Parser;
use revox_cli::{
    exit_status, failure_stage, init_logging, load_env_file, run, Cli, ConfigLoader,
};
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let env_loaded = match load_env_file(cli.env_file.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("revox: {e}");
            return ExitCode::FAILURE;
        }
    };
    // Re-read so env fallbacks see values from the .env file
    let cli = if env_loaded { Cli::parse() } else { cli };

    if let Err(e) = init_logging(cli.log_format, &cli.log_level) {
        eprintln!("revox: {e}");
        return ExitCode::FAILURE;
    }

    let result = execute(&cli).await;
    if let Err(e) = &result {
        tracing::error!(stage = %failure_stage(e), error = %format!("{e:#}"), "Revoke failed");
    }
    ExitCode::from(exit_status(&result))
}

async fn execute(cli: &Cli) -> anyhow::Result<()> {
    let mut loader = ConfigLoader::new().with_overrides(cli.overrides());
    if let Some(path) = &cli.config {
        loader = loader.with_config_path(path);
    }
    let config = loader.load().context("loading configuration")?;

    let report = run(config).await?;
    tracing::info!(
        logins = report.login_attempts,
        two_factor_attempts = report.two_factor_attempts,
        revoke_attempts = report.revoke_attempts,
        elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
        "Done"
    );
    Ok(())
}
