use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::scoring;

/// Attempt budget per item.
pub const MAX_ATTEMPTS: u8 = 5;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AttemptError {
    #[error("attempt number must be between 1 and {MAX_ATTEMPTS}, got {0}")]
    OutOfRange(u8),
}

//
// ─── ATTEMPT NUMBER ────────────────────────────────────────────────────────────
//

/// One-based attempt slot within an item, always in `1..=MAX_ATTEMPTS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct AttemptNumber(u8);

impl AttemptNumber {
    pub const FIRST: AttemptNumber = AttemptNumber(1);
    pub const LAST: AttemptNumber = AttemptNumber(MAX_ATTEMPTS);

    /// # Errors
    ///
    /// Returns `AttemptError::OutOfRange` outside `1..=MAX_ATTEMPTS`.
    pub fn new(value: u8) -> Result<Self, AttemptError> {
        if (1..=MAX_ATTEMPTS).contains(&value) {
            Ok(Self(value))
        } else {
            Err(AttemptError::OutOfRange(value))
        }
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    /// Zero-based slot index, handy for fixed-size arrays.
    #[must_use]
    pub fn index(self) -> usize {
        usize::from(self.0 - 1)
    }

    #[must_use]
    pub fn is_last(self) -> bool {
        self == Self::LAST
    }

    #[must_use]
    pub fn next(self) -> Option<Self> {
        Self::new(self.0 + 1).ok()
    }

    pub fn all() -> impl Iterator<Item = AttemptNumber> {
        (1..=MAX_ATTEMPTS).map(AttemptNumber)
    }
}

impl TryFrom<u8> for AttemptNumber {
    type Error = AttemptError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AttemptNumber> for u8 {
    fn from(value: AttemptNumber) -> Self {
        value.0
    }
}

impl fmt::Display for AttemptNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ─── ATTEMPT ───────────────────────────────────────────────────────────────────
//

/// One recorded pronunciation try for an item.
///
/// `item` is the expected keyword; together with the session id and `number`
/// it addresses the slot the attempt occupies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub item: String,
    pub number: AttemptNumber,
    pub transcript: String,
    pub matched: bool,
    pub recorded_at: DateTime<Utc>,
}

impl Attempt {
    /// Score a transcript against the expected keyword and build the attempt.
    #[must_use]
    pub fn scored(
        item: impl Into<String>,
        number: AttemptNumber,
        transcript: impl Into<String>,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        let item = item.into();
        let transcript = transcript.into();
        let matched = scoring::matches(&transcript, &item);
        Self {
            item,
            number,
            transcript,
            matched,
            recorded_at,
        }
    }

    /// Rehydrate an attempt whose outcome was decided earlier.
    #[must_use]
    pub fn from_persisted(
        item: String,
        number: AttemptNumber,
        transcript: String,
        matched: bool,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            item,
            number,
            transcript,
            matched,
            recorded_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn attempt_number_bounds() {
        assert!(AttemptNumber::new(0).is_err());
        assert!(AttemptNumber::new(6).is_err());
        assert_eq!(AttemptNumber::new(5).unwrap(), AttemptNumber::LAST);
        assert_eq!(AttemptNumber::LAST.next(), None);
        assert_eq!(AttemptNumber::FIRST.next().unwrap().value(), 2);
        assert_eq!(AttemptNumber::all().count(), usize::from(MAX_ATTEMPTS));
    }

    #[test]
    fn scored_attempt_records_match() {
        let attempt = Attempt::scored("गेहूं", AttemptNumber::FIRST, "यह गेहूं है", fixed_now());
        assert!(attempt.matched);

        let miss = Attempt::scored("गेहूं", AttemptNumber::FIRST, "no match here", fixed_now());
        assert!(!miss.matched);
    }
}
