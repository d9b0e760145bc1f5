//! Revox Core - activation revoke orchestrator
//!
//! Signs in to the account portal, resolves an emailed two-factor code
//! when the portal asks for one, and revokes every license activation:
//! - Closed login outcomes matched exhaustively
//! - One retry policy type serving both the revoke and two-factor layers
//! - Fatal and retryable failures kept apart
//!
//! The browser and mailbox are reached through the [`LoginSession`] and
//! [`CodeSource`] traits.
//!
//! # Example
//!
//! ```rust,ignore
//! use revox_core::{Context, Orchestrator, RevoxConfig};
//!
//! # async fn example(session: impl revox_core::LoginSession + 'static,
//! #                  codes: impl revox_core::CodeSource + 'static)
//! #     -> Result<(), revox_core::RevoxError> {
//! let config: RevoxConfig = load_config()?;
//! config.validate()?;
//!
//! let mut orchestrator = Orchestrator::new(Context::new(config), session, codes);
//! let report = orchestrator.run().await?;
//! println!("Revoked after {} login attempts", report.login_attempts);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod code;
pub mod config;
pub mod context;
pub mod count;
pub mod error;
pub mod orchestrator;
pub mod outcome;
pub mod retry;
pub mod session;

// Re-exports for convenience
pub use code::VerificationCode;
pub use config::{
    EmailConfig, PortalConfig, RevoxConfig, RunConfig, Secret, UnityConfig,
    DEFAULT_SUBJECT_MARKER,
};
pub use context::Context;
pub use count::ActivationCount;
pub use error::{
    CodeSourceError, ConfigError, FailureKind, OrchestrationError, RevoxError, SessionError,
    Stage,
};
pub use orchestrator::{Orchestrator, RunReport};
pub use outcome::LoginOutcome;
pub use retry::{Classifier, RetryDecision, RetryPolicy};
pub use session::{CodeSource, LoginSession};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for implementing collaborators and running the workflow
    pub use crate::{
        ActivationCount, CodeSource, CodeSourceError, Context, LoginOutcome, LoginSession,
        Orchestrator, RevoxConfig, RevoxError, RunReport, SessionError, VerificationCode,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
