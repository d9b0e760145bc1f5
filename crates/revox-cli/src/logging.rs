//! Tracing subscriber setup
//!
//! - [`LogFormat::Human`]: readable lines for interactive runs
//! - [`LogFormat::Json`]: newline-delimited JSON for CI log collectors
//!
//! `RUST_LOG` takes precedence over the `--log-level` directive.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Human,
    /// Newline-delimited JSON
    Json,
}

/// Filter from `RUST_LOG`, else from `level`, else `info`
#[must_use]
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber
///
/// # Errors
/// A global subscriber is already set.
pub fn init_logging(
    format: LogFormat,
    level: &str,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = env_filter(level);

    match format {
        LogFormat::Human => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false))
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).with_current_span(true))
            .try_init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_level_falls_back() {
        // Must not panic on a directive EnvFilter rejects
        let _ = env_filter("not a [valid directive");
    }

    #[test]
    fn second_init_is_an_error() {
        let _ = init_logging(LogFormat::Json, "debug");
        assert!(init_logging(LogFormat::Human, "info").is_err());
    }
}
