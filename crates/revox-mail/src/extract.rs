//! Verification code extraction from raw messages

use crate::error::MailError;
use mailparse::{MailHeaderMap, ParsedMail};
use once_cell::sync::Lazy;
use regex::Regex;
use revox_core::VerificationCode;

static CODE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"code is ([0-9]+)").expect("code pattern is a valid regex"));

/// The parts of a message the code lookup needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    /// Decoded subject
    pub subject: String,
    /// `Date` header as unix seconds; undated messages sort first
    pub date: i64,
    /// Plain-text body, falling back to HTML
    pub text_body: String,
}

impl MailMessage {
    /// Parse an RFC 822 message
    ///
    /// # Errors
    /// Malformed MIME structure.
    pub fn parse(raw: &[u8]) -> Result<Self, MailError> {
        let parsed = mailparse::parse_mail(raw)?;
        let subject = parsed.headers.get_first_value("Subject").unwrap_or_default();
        let date = parsed
            .headers
            .get_first_value("Date")
            .and_then(|value| mailparse::dateparse(&value).ok())
            .unwrap_or(i64::MIN);
        let text_body = find_text(&parsed, "text/plain")
            .or_else(|| find_text(&parsed, "text/html"))
            .unwrap_or_default();

        Ok(Self {
            subject,
            date,
            text_body,
        })
    }
}

fn find_text(part: &ParsedMail<'_>, mimetype: &str) -> Option<String> {
    if part.subparts.is_empty() {
        if part.ctype.mimetype.eq_ignore_ascii_case(mimetype) {
            return part.get_body().ok();
        }
        return None;
    }
    part.subparts.iter().find_map(|sub| find_text(sub, mimetype))
}

/// First `code is NNN` match in a body; empty when absent
#[must_use]
pub fn extract_code(body: &str) -> VerificationCode {
    CODE_PATTERN
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| VerificationCode::new(m.as_str()))
        .unwrap_or_default()
}

/// Code from the newest message whose subject contains `marker`
///
/// Ties on date go to the message listed last.
#[must_use]
pub fn latest_code(messages: &[MailMessage], marker: &str) -> VerificationCode {
    messages
        .iter()
        .filter(|m| m.subject.contains(marker))
        .max_by_key(|m| m.date)
        .map(|m| extract_code(&m.text_body))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use revox_core::DEFAULT_SUBJECT_MARKER;

    fn raw(subject: &str, date: &str, body: &str) -> Vec<u8> {
        format!(
            "From: accounts@unity3d.com\r\nSubject: {subject}\r\nDate: {date}\r\n\
             Content-Type: text/plain; charset=utf-8\r\n\r\n{body}\r\n"
        )
        .into_bytes()
    }

    fn message(subject: &str, date: &str, body: &str) -> MailMessage {
        MailMessage::parse(&raw(subject, date, body)).unwrap()
    }

    #[test]
    fn parse_plain_message() {
        let msg = message(
            DEFAULT_SUBJECT_MARKER,
            "Tue, 05 Oct 2021 10:00:00 +0000",
            "Your code is 482913",
        );
        assert_eq!(msg.subject, DEFAULT_SUBJECT_MARKER);
        assert_eq!(msg.date, 1_633_428_000);
        assert!(msg.text_body.contains("482913"));
    }

    #[test]
    fn parse_multipart_prefers_plain_text() {
        let raw = b"Subject: Verification code for Unity ID\r\n\
Date: Tue, 05 Oct 2021 10:00:00 +0000\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/alternative; boundary=\"sep\"\r\n\
\r\n\
--sep\r\n\
Content-Type: text/html; charset=utf-8\r\n\
\r\n\
<p>Your code is 111111</p>\r\n\
--sep\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
Your code is 222222\r\n\
--sep--\r\n";
        let msg = MailMessage::parse(raw).unwrap();
        assert_eq!(extract_code(&msg.text_body).as_str(), "222222");
    }

    #[test]
    fn extract_code_requires_phrase() {
        assert_eq!(extract_code("Your code is 482913.").as_str(), "482913");
        assert!(extract_code("Your code: 482913").is_empty());
        assert!(extract_code("").is_empty());
    }

    #[test]
    fn latest_matching_message_wins() {
        let messages = vec![
            message(
                DEFAULT_SUBJECT_MARKER,
                "Tue, 05 Oct 2021 10:00:00 +0000",
                "Your code is 100000",
            ),
            message(
                DEFAULT_SUBJECT_MARKER,
                "Tue, 05 Oct 2021 10:05:00 +0000",
                "Your code is 200000",
            ),
            message(
                DEFAULT_SUBJECT_MARKER,
                "Tue, 05 Oct 2021 09:55:00 +0000",
                "Your code is 300000",
            ),
        ];
        assert_eq!(latest_code(&messages, DEFAULT_SUBJECT_MARKER).as_str(), "200000");
    }

    #[test]
    fn unrelated_subjects_ignored() {
        let messages = vec![
            message(
                DEFAULT_SUBJECT_MARKER,
                "Tue, 05 Oct 2021 10:00:00 +0000",
                "Your code is 100000",
            ),
            message(
                "Your invoice",
                "Tue, 05 Oct 2021 11:00:00 +0000",
                "Order code is 999999",
            ),
        ];
        assert_eq!(latest_code(&messages, DEFAULT_SUBJECT_MARKER).as_str(), "100000");
    }

    #[test]
    fn no_matching_message_is_empty() {
        let messages = vec![message(
            "Newsletter",
            "Tue, 05 Oct 2021 10:00:00 +0000",
            "code is 1",
        )];
        assert!(latest_code(&messages, DEFAULT_SUBJECT_MARKER).is_empty());
        assert!(latest_code(&[], DEFAULT_SUBJECT_MARKER).is_empty());
    }
}
