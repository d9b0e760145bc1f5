//! Revox command line
//!
//! Loads configuration from file, `.env`, environment and flags, installs
//! the tracing subscriber and runs the revoke workflow with the browser
//! portal session and the IMAP code source.

#![warn(unreachable_pub)]

pub mod app;
pub mod cli;
pub mod config;
pub mod logging;

pub use app::{exit_status, failure_stage, run, EXIT_FAILURE, EXIT_SUCCESS};
pub use cli::Cli;
pub use config::{load_env_file, ConfigLoadError, ConfigLoader, ConfigOverrides};
pub use logging::{init_logging, LogFormat};
