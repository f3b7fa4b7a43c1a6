//! Keyword scoring for transcripts.
//!
//! The match policy is intentionally lenient and asymmetric:
//! - a single-token keyword matches when it occurs anywhere in the transcript,
//!   including inside a longer word;
//! - a multi-token keyword matches when every token occurs somewhere in the
//!   transcript, in any order and not necessarily adjacent.

use std::collections::BTreeMap;

use crate::model::{Attempt, AttemptNumber, ItemResult, QualityBucket};

/// Trim and lowercase (Unicode-aware).
#[must_use]
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Decide whether `transcript` contains the `expected` keyword.
///
/// Returns `false` when either side is empty after trimming.
///
/// # Examples
///
/// ```
/// # use qa_core::scoring::matches;
/// assert!(matches("यह गेहूं है", "गेहूं"));
/// assert!(matches("I am growing ash in my gourd field", "Ash Gourd"));
/// assert!(!matches("", "okra"));
/// ```
#[must_use]
pub fn matches(transcript: &str, expected: &str) -> bool {
    let transcript = normalize(transcript);
    let expected = normalize(expected);
    if transcript.is_empty() || expected.is_empty() {
        return false;
    }

    let tokens: Vec<&str> = expected.split_whitespace().collect();
    match tokens.as_slice() {
        [single] => transcript.contains(single),
        many => many.iter().all(|token| transcript.contains(token)),
    }
}

/// Aggregate the attempts recorded for one item.
///
/// Attempts are deduplicated by slot; when a slot appears twice the later
/// entry in `attempts` wins.
#[must_use]
pub fn aggregate(keyword: &str, attempts: &[Attempt]) -> ItemResult {
    let mut slots: BTreeMap<AttemptNumber, bool> = BTreeMap::new();
    for attempt in attempts.iter().filter(|a| a.item == keyword) {
        slots.insert(attempt.number, attempt.matched);
    }

    let attempts_made = u8::try_from(slots.len()).unwrap_or(u8::MAX);
    let correct = slots.values().filter(|matched| **matched).count();
    let correct = u8::try_from(correct).unwrap_or(u8::MAX);
    ItemResult::new(keyword, correct, attempts_made)
}

/// Item counts per quality bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BucketCounts {
    pub well_pronounced: usize,
    pub moderate: usize,
    pub poor: usize,
}

impl BucketCounts {
    #[must_use]
    pub fn tally<'a, I>(results: I) -> Self
    where
        I: IntoIterator<Item = &'a ItemResult>,
    {
        let mut counts = Self::default();
        for result in results {
            match result.bucket() {
                QualityBucket::WellPronounced => counts.well_pronounced += 1,
                QualityBucket::Moderate => counts.moderate += 1,
                QualityBucket::Poor => counts.poor += 1,
            }
        }
        counts
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.well_pronounced + self.moderate + self.poor
    }
}
