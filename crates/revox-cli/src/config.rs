//! Configuration loading
//!
//! Layering, lowest first:
//! 1. Built-in defaults
//! 2. TOML file: explicit `--config`, else the first default location found
//! 3. Command line and environment overrides
//!
//! The result is validated before it is returned. A `.env` file is loaded
//! separately by [`load_env_file`] so that environment fallbacks see it.

use once_cell::sync::Lazy;
use revox_core::{ConfigError, RevoxConfig, Secret};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

static DEFAULT_CONFIG_LOCATIONS: Lazy<Vec<PathBuf>> = Lazy::new(|| {
    vec![
        PathBuf::from("revox.toml"),
        PathBuf::from("config/revox.toml"),
    ]
});

/// Errors while assembling the configuration
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    /// Explicitly requested file does not exist
    #[error("configuration file {path} not found")]
    MissingConfig {
        /// Requested path
        path: PathBuf,
    },

    /// File exists but cannot be read
    #[error("cannot read {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File is not valid TOML for the configuration schema
    #[error("cannot parse {path}: {source}")]
    Parse {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: toml::de::Error,
    },

    /// Explicitly requested `.env` file does not exist
    #[error("env file {path} not found")]
    MissingEnvFile {
        /// Requested path
        path: PathBuf,
    },

    /// `.env` file is malformed
    #[error("cannot load env file: {0}")]
    Env(#[from] dotenvy::Error),

    /// Merged configuration failed validation
    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

/// Values given on the command line or through the environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// `--unity-login`
    pub unity_login: Option<String>,
    /// `--unity-password`
    pub unity_password: Option<String>,
    /// `--unity-retry-count`
    pub unity_retry_count: Option<u32>,
    /// `--email-login`
    pub email_login: Option<String>,
    /// `--email-password`
    pub email_password: Option<String>,
    /// `--email-host`
    pub email_host: Option<String>,
    /// `--email-port`
    pub email_port: Option<u16>,
    /// `--email-retry-count`
    pub email_retry_count: Option<u32>,
    /// `--email-retry-delay-seconds`
    pub email_retry_delay_seconds: Option<u64>,
    /// `--webdriver-url`
    pub webdriver_url: Option<String>,
    /// `--geckodriver`
    pub driver_path: Option<String>,
    /// `--timeout-secs`
    pub timeout_secs: Option<u64>,
}

impl ConfigOverrides {
    /// Write every present value into `config`
    pub fn apply(&self, config: &mut RevoxConfig) {
        fn set<T: Clone>(target: &mut T, value: Option<&T>) {
            if let Some(value) = value {
                target.clone_from(value);
            }
        }

        set(&mut config.unity.login, self.unity_login.as_ref());
        if let Some(password) = &self.unity_password {
            config.unity.password = Secret::new(password.as_str());
        }
        set(&mut config.unity.retry_count, self.unity_retry_count.as_ref());

        set(&mut config.email.login, self.email_login.as_ref());
        if let Some(password) = &self.email_password {
            config.email.password = Secret::new(password.as_str());
        }
        set(&mut config.email.host, self.email_host.as_ref());
        set(&mut config.email.port, self.email_port.as_ref());
        set(&mut config.email.retry_count, self.email_retry_count.as_ref());
        set(
            &mut config.email.retry_delay_seconds,
            self.email_retry_delay_seconds.as_ref(),
        );

        set(&mut config.portal.webdriver_url, self.webdriver_url.as_ref());
        if let Some(path) = &self.driver_path {
            config.portal.driver_path = Some(path.clone());
        }
        set(&mut config.run.timeout_secs, self.timeout_secs.as_ref());
    }
}

/// Assembles a validated [`RevoxConfig`]
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    search_paths: Vec<PathBuf>,
    overrides: ConfigOverrides,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self {
            config_path: None,
            search_paths: DEFAULT_CONFIG_LOCATIONS.clone(),
            overrides: ConfigOverrides::default(),
        }
    }
}

impl ConfigLoader {
    /// Loader using the default locations
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require this file instead of searching
    #[must_use]
    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Replace the default search locations
    #[must_use]
    pub fn with_search_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.search_paths = paths;
        self
    }

    /// Values applied on top of the file
    #[must_use]
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Read, merge and validate
    ///
    /// # Errors
    /// See [`ConfigLoadError`].
    pub fn load(&self) -> Result<RevoxConfig, ConfigLoadError> {
        let mut config = match self.resolve_path()? {
            Some(path) => read_file(&path)?,
            None => {
                tracing::debug!("No configuration file, using defaults");
                RevoxConfig::default()
            }
        };

        self.overrides.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn resolve_path(&self) -> Result<Option<PathBuf>, ConfigLoadError> {
        if let Some(explicit) = &self.config_path {
            if !explicit.exists() {
                return Err(ConfigLoadError::MissingConfig {
                    path: explicit.clone(),
                });
            }
            return Ok(Some(explicit.clone()));
        }

        Ok(self
            .search_paths
            .iter()
            .find(|candidate| candidate.exists())
            .cloned())
    }
}

fn read_file(path: &Path) -> Result<RevoxConfig, ConfigLoadError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = toml::from_str(&contents).map_err(|source| ConfigLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), "Configuration loaded");
    Ok(config)
}

/// Load `.env` variables into the process environment
///
/// Returns whether a file was read. Without a path a missing `.env` is
/// not an error; a requested file must exist. Malformed files are errors.
/// Variables already set are kept.
///
/// # Errors
/// `MissingEnvFile` for an absent requested file, `Env` for unparsable files.
pub fn load_env_file(path: Option<&Path>) -> Result<bool, ConfigLoadError> {
    let loaded = match path {
        Some(path) if !path.exists() => {
            return Err(ConfigLoadError::MissingEnvFile {
                path: path.to_path_buf(),
            })
        }
        Some(path) => dotenvy::from_path(path).map(|()| true),
        None => dotenvy::dotenv().map(|_| true),
    };

    match loaded {
        Ok(found) => Ok(found),
        Err(dotenvy::Error::Io(_)) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn overrides_replace_only_given_values() {
        let mut config = RevoxConfig::default();
        config.unity.login = "file@example.com".into();
        config.email.host = "imap.file.example".into();

        ConfigOverrides {
            unity_login: Some("cli@example.com".into()),
            unity_password: Some("s3cret".into()),
            email_port: Some(1993),
            driver_path: Some("/usr/bin/geckodriver".into()),
            timeout_secs: Some(0),
            ..ConfigOverrides::default()
        }
        .apply(&mut config);

        assert_eq!(config.unity.login, "cli@example.com");
        assert_eq!(config.unity.password.expose(), "s3cret");
        assert_eq!(config.email.host, "imap.file.example");
        assert_eq!(config.email.port, 1993);
        assert_eq!(config.unity.retry_count, 3);
        assert_eq!(config.portal.driver_path.as_deref(), Some("/usr/bin/geckodriver"));
        assert_eq!(config.run.timeout(), None);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = ConfigLoader::new()
            .with_config_path("/nonexistent/revox.toml")
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigLoadError::MissingConfig { .. }));
    }

    #[test]
    fn missing_requested_env_file_is_an_error() {
        let err = load_env_file(Some(Path::new("/nonexistent/.env"))).unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::MissingEnvFile { path } if path == Path::new("/nonexistent/.env")
        ));
    }
}
