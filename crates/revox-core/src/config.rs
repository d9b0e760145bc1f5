//! Run configuration
//!
//! Deserialized from the `[unity]`, `[email]`, `[portal]` and `[run]`
//! tables of `revox.toml`, then patched by command-line overrides and
//! validated once before anything touches the network.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Subject marker of the portal's verification emails
pub const DEFAULT_SUBJECT_MARKER: &str = "Verification code for Unity ID";

/// Password or other credential; never printed
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// Wrap a credential
    #[inline]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Reveal the credential for submission
    #[inline]
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether the credential is blank
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Complete configuration for one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevoxConfig {
    /// Portal account
    pub unity: UnityConfig,
    /// Mailbox receiving verification codes
    pub email: EmailConfig,
    /// Browser driver and portal URLs
    pub portal: PortalConfig,
    /// Whole-run limits
    pub run: RunConfig,
}

impl RevoxConfig {
    /// Check every section
    ///
    /// # Errors
    /// Returns the first missing or out-of-range value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.unity.validate()?;
        self.email.validate()?;
        self.portal.validate()
    }
}

/// Portal account (`Unity.*` options)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnityConfig {
    /// Sign-in email
    pub login: String,
    /// Sign-in password
    pub password: Secret,
    /// Attempts of the whole login and revoke workflow
    pub retry_count: u32,
}

impl Default for UnityConfig {
    fn default() -> Self {
        Self {
            login: String::new(),
            password: Secret::default(),
            retry_count: 3,
        }
    }
}

impl UnityConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.login.trim().is_empty() {
            return Err(ConfigError::Missing("unity.login"));
        }
        if self.password.is_empty() {
            return Err(ConfigError::Missing("unity.password"));
        }
        at_least_one("unity.retry_count", self.retry_count)
    }
}

/// Mailbox receiving the codes (`Email.*` options)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    /// IMAP user
    pub login: String,
    /// IMAP password
    pub password: Secret,
    /// IMAP server
    pub host: String,
    /// IMAP TLS port
    pub port: u16,
    /// Attempts to fetch and apply a code
    pub retry_count: u32,
    /// Delay between two-factor attempts
    pub retry_delay_seconds: u64,
    /// Wait before each fetch so the email can arrive
    pub grace_period_seconds: u64,
    /// Subject substring identifying verification emails
    pub subject_marker: String,
    /// Folder to search
    pub mailbox: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            login: String::new(),
            password: Secret::default(),
            host: String::new(),
            port: 993,
            retry_count: 5,
            retry_delay_seconds: 10,
            grace_period_seconds: 4,
            subject_marker: DEFAULT_SUBJECT_MARKER.to_string(),
            mailbox: "INBOX".to_string(),
        }
    }
}

impl EmailConfig {
    /// Delay between two-factor attempts
    #[inline]
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_seconds)
    }

    /// Wait before each code fetch
    #[inline]
    #[must_use]
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_seconds)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.login.trim().is_empty() {
            return Err(ConfigError::Missing("email.login"));
        }
        if self.password.is_empty() {
            return Err(ConfigError::Missing("email.password"));
        }
        if self.host.trim().is_empty() {
            return Err(ConfigError::Missing("email.host"));
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid {
                field: "email.port",
                reason: "port 0 is not connectable".to_string(),
            });
        }
        if self.subject_marker.is_empty() {
            return Err(ConfigError::Missing("email.subject_marker"));
        }
        at_least_one("email.retry_count", self.retry_count)
    }
}

/// Browser driver and portal locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// WebDriver endpoint
    pub webdriver_url: String,
    /// `geckodriver` binary to launch; `None` uses an already running driver
    pub driver_path: Option<String>,
    /// Sign-in page
    pub base_url: String,
    /// Subscriptions page listing activations
    pub licenses_url: String,
    /// Implicit element wait
    pub implicit_wait_seconds: u64,
    /// Run the browser without a window
    pub headless: bool,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:4444".to_string(),
            driver_path: None,
            base_url: "https://id.unity.com".to_string(),
            licenses_url: "https://id.unity.com/en/subscriptions".to_string(),
            implicit_wait_seconds: 4,
            headless: true,
        }
    }
}

impl PortalConfig {
    /// Implicit element wait
    #[inline]
    #[must_use]
    pub fn implicit_wait(&self) -> Duration {
        Duration::from_secs(self.implicit_wait_seconds)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (field, url) in [
            ("portal.webdriver_url", &self.webdriver_url),
            ("portal.base_url", &self.base_url),
            ("portal.licenses_url", &self.licenses_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("expected an http(s) URL, got {url:?}"),
                });
            }
        }
        Ok(())
    }
}

/// Whole-run limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Deadline for the entire run; `0` disables it
    pub timeout_secs: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self { timeout_secs: 900 }
    }
}

impl RunConfig {
    /// Deadline, if enabled
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

fn at_least_one(field: &'static str, value: u32) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            field,
            reason: "at least one attempt is required".to_string(),
        });
    }
    Ok(())
}
