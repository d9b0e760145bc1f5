//! Verification code delivered by email

use std::fmt;

/// Numeric code from the latest verification email
///
/// An empty code means no matching email has arrived yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct VerificationCode(String);

impl VerificationCode {
    /// Wrap a code string
    #[inline]
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Code not available yet
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether no code was found
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Code text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VerificationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VerificationCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl From<String> for VerificationCode {
    fn from(code: String) -> Self {
        Self(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_code_is_empty() {
        assert!(VerificationCode::empty().is_empty());
        assert!(VerificationCode::new("  ").is_empty());
        assert!(!VerificationCode::new("482913").is_empty());
    }
}
