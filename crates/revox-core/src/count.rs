//! Activation count read from the portal's subscription page

use serde::{Deserialize, Serialize};
use std::fmt;

/// Literal prefix of the activations label, e.g. `"Total 3, of 5 seats"`
pub const LABEL_PREFIX: &str = "Total";

/// Number of active license seats visible on the portal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActivationCount(u32);

impl ActivationCount {
    /// No active seats
    pub const ZERO: Self = Self(0);

    /// Wrap a raw count
    #[inline]
    #[must_use]
    pub const fn new(count: u32) -> Self {
        Self(count)
    }

    /// Raw count
    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Whether nothing is left to revoke
    #[inline]
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Extract the count from the activations status label
    ///
    /// Takes the text before the first comma (the whole label when there is
    /// none), strips [`LABEL_PREFIX`] and surrounding whitespace, and parses
    /// the rest. Anything unparseable counts as zero.
    #[must_use]
    pub fn parse_label(label: &str) -> Self {
        let head = label.split_once(',').map_or(label, |(head, _)| head).trim();
        let digits = head.strip_prefix(LABEL_PREFIX).unwrap_or(head).trim();

        Self(digits.parse().unwrap_or(0))
    }
}

impl From<u32> for ActivationCount {
    fn from(count: u32) -> Self {
        Self(count)
    }
}

impl fmt::Display for ActivationCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
