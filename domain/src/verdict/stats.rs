//! Agreement statistics
//!
//! Statistics over judge scores are always derived here rather than trusting
//! the arbiter LLM's arithmetic. [`compute_agreement_stats`] is a pure
//! function with no shared state.

use crate::error::DomainError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How tightly the judge scores cluster, derived solely from numeric spread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AgreementLevel {
    /// Spread 0-1
    Strong,
    /// Spread 2
    Moderate,
    /// Spread 3-4
    Weak,
}

impl AgreementLevel {
    /// Classify a spread value
    pub fn from_spread(spread: u8) -> Self {
        match spread {
            0 | 1 => AgreementLevel::Strong,
            2 => AgreementLevel::Moderate,
            _ => AgreementLevel::Weak,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgreementLevel::Strong => "strong",
            AgreementLevel::Moderate => "moderate",
            AgreementLevel::Weak => "weak",
        }
    }
}

impl std::fmt::Display for AgreementLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Deterministic agreement statistics over a set of judge scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgreementStats {
    /// Arithmetic mean, rounded to 1 decimal
    pub mean_score: f64,
    /// Median score (even count: round-half-up of the two middle values)
    pub median_score: u8,
    /// Max score minus min score
    pub spread: u8,
    /// Classification of the spread
    pub agreement_level: AgreementLevel,
}

/// Compute agreement statistics from judge scores
///
/// Requires at least 2 scores. For an even count, the median is the
/// arithmetic mean of the two middle values rounded half up
/// (`[2, 3]` → median 3).
///
/// # Example
///
/// ```
/// use tribunal_domain::{AgreementLevel, compute_agreement_stats};
///
/// let stats = compute_agreement_stats(&[3, 4, 5]).unwrap();
/// assert_eq!(stats.mean_score, 4.0);
/// assert_eq!(stats.median_score, 4);
/// assert_eq!(stats.spread, 2);
/// assert_eq!(stats.agreement_level, AgreementLevel::Moderate);
/// ```
pub fn compute_agreement_stats(scores: &[u8]) -> Result<AgreementStats, DomainError> {
    if scores.len() < 2 {
        return Err(DomainError::TooFewScores(scores.len()));
    }

    let mut sorted = scores.to_vec();
    sorted.sort_unstable();

    let sum: u32 = sorted.iter().map(|&s| u32::from(s)).sum();
    let mean_score = (f64::from(sum) / sorted.len() as f64 * 10.0).round() / 10.0;

    let median_score = if sorted.len() % 2 == 0 {
        let mid1 = sorted[sorted.len() / 2 - 1];
        let mid2 = sorted[sorted.len() / 2];
        // f64::round rounds halves away from zero, i.e. half up on [1, 5].
        // Summing in f64 keeps this total over the full u8 domain.
        ((f64::from(mid1) + f64::from(mid2)) / 2.0).round() as u8
    } else {
        sorted[sorted.len() / 2]
    };

    let spread = sorted[sorted.len() - 1] - sorted[0];

    Ok(AgreementStats {
        mean_score,
        median_score,
        spread,
        agreement_level: AgreementLevel::from_spread(spread),
    })
}
