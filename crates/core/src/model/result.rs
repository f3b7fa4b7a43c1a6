use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::attempt::MAX_ATTEMPTS;

//
// ─── QUALITY BUCKET ────────────────────────────────────────────────────────────
//

/// Tri-level pronunciation quality derived from an item's correct-attempt count.
///
/// Thresholds are fixed: 3 or more is `WellPronounced`, exactly 2 is `Moderate`,
/// 0 or 1 is `Poor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityBucket {
    WellPronounced,
    Moderate,
    Poor,
}

impl QualityBucket {
    #[must_use]
    pub fn from_correct_count(correct: u8) -> Self {
        match correct {
            3.. => QualityBucket::WellPronounced,
            2 => QualityBucket::Moderate,
            _ => QualityBucket::Poor,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QualityBucket::WellPronounced => "well_pronounced",
            QualityBucket::Moderate => "moderate",
            QualityBucket::Poor => "poor",
        }
    }
}

impl fmt::Display for QualityBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── RATIO CONVENTION ──────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown ratio convention: {0} (expected `attempts-made` or `fixed-budget`)")]
pub struct RatioConventionError(String);

/// Denominator used when rendering an item's result ratio.
///
/// Chosen once per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RatioConvention {
    /// `correct/attempts_made`; attempts never made are omitted.
    #[default]
    AttemptsMade,
    /// `correct/5`; attempts never made count as not detected.
    FixedBudget,
}

impl FromStr for RatioConvention {
    type Err = RatioConventionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "attempts-made" | "attempts_made" => Ok(Self::AttemptsMade),
            "fixed-budget" | "fixed_budget" | "fixed" => Ok(Self::FixedBudget),
            other => Err(RatioConventionError(other.to_string())),
        }
    }
}

impl fmt::Display for RatioConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RatioConvention::AttemptsMade => f.write_str("attempts-made"),
            RatioConvention::FixedBudget => f.write_str("fixed-budget"),
        }
    }
}

//
// ─── ITEM RESULT ───────────────────────────────────────────────────────────────
//

/// Aggregate outcome of all attempts recorded for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemResult {
    keyword: String,
    correct_count: u8,
    attempts_made: u8,
}

impl ItemResult {
    /// Counts are clamped so `correct_count <= attempts_made <= MAX_ATTEMPTS`.
    #[must_use]
    pub fn new(keyword: impl Into<String>, correct_count: u8, attempts_made: u8) -> Self {
        let attempts_made = attempts_made.min(MAX_ATTEMPTS);
        Self {
            keyword: keyword.into(),
            correct_count: correct_count.min(attempts_made),
            attempts_made,
        }
    }

    #[must_use]
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    #[must_use]
    pub fn correct_count(&self) -> u8 {
        self.correct_count
    }

    #[must_use]
    pub fn attempts_made(&self) -> u8 {
        self.attempts_made
    }

    #[must_use]
    pub fn bucket(&self) -> QualityBucket {
        QualityBucket::from_correct_count(self.correct_count)
    }

    #[must_use]
    pub fn denominator(&self, convention: RatioConvention) -> u8 {
        match convention {
            RatioConvention::AttemptsMade => self.attempts_made,
            RatioConvention::FixedBudget => MAX_ATTEMPTS,
        }
    }

    /// Render `"{correct}/{denominator}"` under the given convention.
    #[must_use]
    pub fn ratio(&self, convention: RatioConvention) -> String {
        format!("{}/{}", self.correct_count, self.denominator(convention))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_boundaries() {
        assert_eq!(QualityBucket::from_correct_count(0), QualityBucket::Poor);
        assert_eq!(QualityBucket::from_correct_count(1), QualityBucket::Poor);
        assert_eq!(QualityBucket::from_correct_count(2), QualityBucket::Moderate);
        for correct in 3..=5 {
            assert_eq!(
                QualityBucket::from_correct_count(correct),
                QualityBucket::WellPronounced
            );
        }
    }

    #[test]
    fn ratio_follows_convention() {
        let result = ItemResult::new("गेहूं", 2, 3);
        assert_eq!(result.ratio(RatioConvention::AttemptsMade), "2/3");
        assert_eq!(result.ratio(RatioConvention::FixedBudget), "2/5");
        assert_eq!(result.bucket().as_str(), "moderate");
    }

    #[test]
    fn correct_never_exceeds_attempts() {
        let result = ItemResult::new("x", 4, 2);
        assert_eq!(result.correct_count(), 2);
        assert_eq!(result.attempts_made(), 2);
    }

    #[test]
    fn parses_convention() {
        assert_eq!(
            "fixed-budget".parse::<RatioConvention>().unwrap(),
            RatioConvention::FixedBudget
        );
        assert_eq!(
            " Attempts-Made ".parse::<RatioConvention>().unwrap(),
            RatioConvention::AttemptsMade
        );
        assert!("half".parse::<RatioConvention>().is_err());
    }
}
