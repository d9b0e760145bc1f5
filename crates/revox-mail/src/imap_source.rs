//! IMAP-backed [`CodeSource`]
//!
//! Each fetch opens a fresh TLS connection, searches the configured folder
//! read-only for messages whose subject carries the marker, and returns the
//! code from the newest one. The `imap` client is blocking, so the whole
//! exchange runs on the blocking pool.

use crate::error::MailError;
use crate::extract::{latest_code, MailMessage};
use async_trait::async_trait;
use revox_core::{CodeSource, CodeSourceError, EmailConfig, Secret, VerificationCode};
use std::net::TcpStream;
use std::sync::Arc;

type TlsSession = imap::Session<native_tls::TlsStream<TcpStream>>;

/// Connection and lookup settings for one mailbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxSettings {
    /// IMAP host
    pub host: String,
    /// IMAP TLS port
    pub port: u16,
    /// IMAP user
    pub login: String,
    /// IMAP password
    pub password: Secret,
    /// Folder to examine
    pub mailbox: String,
    /// Subject substring identifying verification emails
    pub subject_marker: String,
}

impl From<&EmailConfig> for MailboxSettings {
    fn from(config: &EmailConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            login: config.login.clone(),
            password: config.password.clone(),
            mailbox: config.mailbox.clone(),
            subject_marker: config.subject_marker.clone(),
        }
    }
}

/// Verification code source reading an IMAP mailbox
#[derive(Debug, Clone)]
pub struct ImapCodeSource {
    settings: Arc<MailboxSettings>,
}

impl ImapCodeSource {
    /// Create a source from explicit settings
    #[must_use]
    pub fn new(settings: MailboxSettings) -> Self {
        Self {
            settings: Arc::new(settings),
        }
    }

    /// Create a source from the email section of the configuration
    #[must_use]
    pub fn from_config(config: &EmailConfig) -> Self {
        Self::new(MailboxSettings::from(config))
    }

    /// Settings in use
    #[inline]
    #[must_use]
    pub fn settings(&self) -> &MailboxSettings {
        &self.settings
    }
}

#[async_trait]
impl CodeSource for ImapCodeSource {
    async fn fetch_latest(&self) -> Result<VerificationCode, CodeSourceError> {
        let settings = Arc::clone(&self.settings);
        let code = tokio::task::spawn_blocking(move || fetch_blocking(&settings))
            .await
            .map_err(|e| MailError::Task(e.to_string()))??;
        Ok(code)
    }
}

/// IMAP `SEARCH` criterion matching the subject marker
#[must_use]
pub fn subject_query(marker: &str) -> String {
    let escaped = marker.replace('\\', "\\\\").replace('"', "\\\"");
    format!("SUBJECT \"{escaped}\"")
}

fn fetch_blocking(settings: &MailboxSettings) -> Result<VerificationCode, MailError> {
    let tls = native_tls::TlsConnector::builder().build()?;
    let client = imap::connect(
        (settings.host.as_str(), settings.port),
        settings.host.as_str(),
        &tls,
    )
    .map_err(|source| MailError::Connect {
        host: settings.host.clone(),
        port: settings.port,
        source,
    })?;

    let mut session = client
        .login(&settings.login, settings.password.expose())
        .map_err(|(e, _client)| MailError::Login(e))?;

    let result = read_messages(&mut session, settings);
    if let Err(e) = session.logout() {
        tracing::warn!(error = %e, "IMAP logout failed");
    }

    let messages = result?;
    let code = latest_code(&messages, &settings.subject_marker);
    if code.is_empty() {
        tracing::info!(found = messages.len(), "No verification message found");
    } else {
        tracing::debug!(code = %code, "Verification code found");
    }
    Ok(code)
}

fn read_messages(
    session: &mut TlsSession,
    settings: &MailboxSettings,
) -> Result<Vec<MailMessage>, MailError> {
    let mailbox = session.examine(&settings.mailbox)?;
    tracing::info!(
        mailbox = %settings.mailbox,
        exists = mailbox.exists,
        "Mailbox opened"
    );
    if mailbox.exists == 0 {
        return Ok(Vec::new());
    }

    let mut ids: Vec<u32> = session
        .search(subject_query(&settings.subject_marker))?
        .into_iter()
        .collect();
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    ids.sort_unstable();

    let sequence = ids
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(",");
    let fetches = session.fetch(sequence, "RFC822")?;

    let mut messages = Vec::with_capacity(fetches.len());
    for fetch in fetches.iter() {
        let Some(body) = fetch.body() else {
            continue;
        };
        match MailMessage::parse(body) {
            Ok(message) => messages.push(message),
            Err(e) => tracing::warn!(seq = fetch.message, error = %e, "Skipping unreadable message"),
        }
    }
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn settings_follow_config() {
        let config = EmailConfig {
            login: "codes@example.com".into(),
            password: Secret::new("hunter2"),
            host: "imap.example.com".into(),
            ..EmailConfig::default()
        };
        let source = ImapCodeSource::from_config(&config);

        assert_eq!(source.settings().host, "imap.example.com");
        assert_eq!(source.settings().port, 993);
        assert_eq!(source.settings().mailbox, "INBOX");
        assert_eq!(source.settings().password.expose(), "hunter2");
        assert_eq!(source.settings().subject_marker, config.subject_marker);
    }

    #[test]
    fn subject_query_quotes_marker() {
        assert_eq!(
            subject_query("Verification code for Unity ID"),
            r#"SUBJECT "Verification code for Unity ID""#
        );
        assert_eq!(subject_query(r#"say "hi"\"#), r#"SUBJECT "say \"hi\"\\""#);
    }

    #[tokio::test]
    async fn unreachable_server_is_connect_error() {
        let source = ImapCodeSource::new(MailboxSettings {
            host: "127.0.0.1".into(),
            port: 1,
            login: "user".into(),
            password: Secret::new("pass"),
            mailbox: "INBOX".into(),
            subject_marker: "marker".into(),
        });

        let err = source.fetch_latest().await.unwrap_err();
        assert!(matches!(err, CodeSourceError::Connect(_)), "{err:?}");
    }
}
