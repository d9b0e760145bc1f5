//! Login outcome produced once per login attempt

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of submitting credentials to the portal
///
/// Anything the portal shows that cannot be classified as one of the
/// other variants is reported as [`LoginOutcome::Failure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoginOutcome {
    /// Signed in, the account pages are reachable
    Success,
    /// Credentials rejected or the page could not be classified
    Failure,
    /// The portal asks for the emailed verification code
    TwoFactorRequired,
}

impl LoginOutcome {
    /// Stable lowercase name, used in structured logs
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::TwoFactorRequired => "two_factor_required",
        }
    }
}

impl fmt::Display for LoginOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_display() {
        assert_eq!(LoginOutcome::Success.to_string(), "success");
        assert_eq!(
            LoginOutcome::TwoFactorRequired.to_string(),
            "two_factor_required"
        );
    }
}
