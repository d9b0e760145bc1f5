//! Revox Mail - verification codes from an IMAP mailbox
//!
//! Implements [`revox_core::CodeSource`]:
//! - [`ImapCodeSource`]: TLS IMAP lookup on the blocking pool
//! - [`extract`]: message parsing and newest-code selection

#![warn(unreachable_pub)]

pub mod error;
pub mod extract;
pub mod imap_source;

pub use error::MailError;
pub use extract::{extract_code, latest_code, MailMessage};
pub use imap_source::{subject_query, ImapCodeSource, MailboxSettings};
