//! Command line arguments

use crate::config::ConfigOverrides;
use crate::logging::LogFormat;
use clap::Parser;
use std::path::PathBuf;

/// Revoke every seat activation of an account
#[derive(Debug, Clone, Parser)]
#[command(name = "revox", version, about)]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, env = "REVOX_CONFIG")]
    pub config: Option<PathBuf>,

    /// `.env` file to load before reading the environment
    #[arg(long, env = "REVOX_ENV_FILE")]
    pub env_file: Option<PathBuf>,

    /// Account login
    #[arg(long, env = "REVOX_UNITY_LOGIN")]
    pub unity_login: Option<String>,

    /// Account password
    #[arg(long, env = "REVOX_UNITY_PASSWORD", hide_env_values = true)]
    pub unity_password: Option<String>,

    /// Login and revoke attempts
    #[arg(long, env = "REVOX_UNITY_RETRY_COUNT")]
    pub unity_retry_count: Option<u32>,

    /// Mailbox login
    #[arg(long, env = "REVOX_EMAIL_LOGIN")]
    pub email_login: Option<String>,

    /// Mailbox password
    #[arg(long, env = "REVOX_EMAIL_PASSWORD", hide_env_values = true)]
    pub email_password: Option<String>,

    /// IMAP server
    #[arg(long, env = "REVOX_EMAIL_HOST")]
    pub email_host: Option<String>,

    /// IMAP TLS port
    #[arg(long, env = "REVOX_EMAIL_PORT")]
    pub email_port: Option<u16>,

    /// Code fetch and apply attempts
    #[arg(long, env = "REVOX_EMAIL_RETRY_COUNT")]
    pub email_retry_count: Option<u32>,

    /// Seconds between code attempts
    #[arg(long, env = "REVOX_EMAIL_RETRY_DELAY_SECONDS")]
    pub email_retry_delay_seconds: Option<u64>,

    /// WebDriver endpoint
    #[arg(long, env = "REVOX_WEBDRIVER_URL")]
    pub webdriver_url: Option<String>,

    /// Launch this geckodriver binary instead of using a running driver
    #[arg(long, env = "REVOX_GECKODRIVER")]
    pub geckodriver: Option<String>,

    /// Overall deadline in seconds, 0 to disable
    #[arg(long, env = "REVOX_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Log output format
    #[arg(long, env = "REVOX_LOG_FORMAT", value_enum, default_value_t = LogFormat::Human)]
    pub log_format: LogFormat,

    /// Log filter directive, overridden by `RUST_LOG`
    #[arg(long, env = "REVOX_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Configuration values carried by the arguments
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            unity_login: self.unity_login.clone(),
            unity_password: self.unity_password.clone(),
            unity_retry_count: self.unity_retry_count,
            email_login: self.email_login.clone(),
            email_password: self.email_password.clone(),
            email_host: self.email_host.clone(),
            email_port: self.email_port,
            email_retry_count: self.email_retry_count,
            email_retry_delay_seconds: self.email_retry_delay_seconds,
            webdriver_url: self.webdriver_url.clone(),
            driver_path: self.geckodriver.clone(),
            timeout_secs: self.timeout_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_map_to_overrides() {
        let cli = Cli::try_parse_from([
            "revox",
            "--unity-login",
            "ci@example.com",
            "--unity-retry-count",
            "4",
            "--email-port",
            "1993",
            "--email-retry-delay-seconds",
            "2",
            "--geckodriver",
            "/opt/geckodriver",
            "--log-format",
            "json",
        ])
        .unwrap();

        let overrides = cli.overrides();
        assert_eq!(overrides.unity_login.as_deref(), Some("ci@example.com"));
        assert_eq!(overrides.unity_retry_count, Some(4));
        assert_eq!(overrides.email_port, Some(1993));
        assert_eq!(overrides.email_retry_delay_seconds, Some(2));
        assert_eq!(overrides.driver_path.as_deref(), Some("/opt/geckodriver"));
        assert_eq!(cli.log_format, LogFormat::Json);
    }

    #[test]
    fn non_numeric_count_rejected() {
        assert!(Cli::try_parse_from(["revox", "--unity-retry-count", "three"]).is_err());
    }
}
