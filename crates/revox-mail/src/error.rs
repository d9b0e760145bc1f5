//! Mailbox errors

use revox_core::CodeSourceError;
use thiserror::Error;

/// Errors while reading the verification mailbox
#[derive(Debug, Error)]
pub enum MailError {
    /// TLS connector could not be built
    #[error("tls setup failed: {0}")]
    Tls(#[from] native_tls::Error),

    /// Server unreachable or handshake failed
    #[error("cannot connect to {host}:{port}: {source}")]
    Connect {
        /// IMAP host
        host: String,
        /// IMAP port
        port: u16,
        /// Underlying error
        #[source]
        source: imap::Error,
    },

    /// Credentials rejected
    #[error("login rejected: {0}")]
    Login(#[source] imap::Error),

    /// Any later IMAP command failed
    #[error("imap command failed: {0}")]
    Imap(#[from] imap::Error),

    /// Message body is not valid MIME
    #[error("cannot parse message: {0}")]
    Parse(#[from] mailparse::MailParseError),

    /// Blocking worker panicked or was cancelled
    #[error("mailbox task failed: {0}")]
    Task(String),
}

impl From<MailError> for CodeSourceError {
    fn from(err: MailError) -> Self {
        match err {
            e @ (MailError::Tls(_) | MailError::Connect { .. }) => Self::Connect(e.to_string()),
            e @ MailError::Login(_) => Self::Authentication(e.to_string()),
            e @ (MailError::Imap(_) | MailError::Parse(_) | MailError::Task(_)) => {
                Self::Fetch(e.to_string())
            }
        }
    }
}
