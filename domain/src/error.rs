//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("cannot compute agreement stats with {0} score(s)")]
    TooFewScores(usize),

    #[error("score {0} outside valid range 1-5")]
    ScoreOutOfRange(u8),

    #[error("judge verdict contains no item reviews")]
    NoItemReviews,

    #[error("consensus final score {final_score} outside judge range [{min}, {max}]")]
    FinalScoreOutOfRange { final_score: u8, min: u8, max: u8 },

    #[error("improvements list must contain 1-5 entries, got {0}")]
    InvalidImprovementCount(usize),

    #[error("rubric text is empty")]
    EmptyRubric,

    #[error("rubric missing scoring anchors: {0}")]
    MissingScoringAnchors(String),

    #[error("no calibration examples for {0}")]
    MissingCalibration(String),
}

impl DomainError {
    /// Check whether this error is the hard consensus range violation
    pub fn is_range_violation(&self) -> bool {
        matches!(self, DomainError::FinalScoreOutOfRange { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_violation_display() {
        let error = DomainError::FinalScoreOutOfRange {
            final_score: 2,
            min: 4,
            max: 5,
        };
        assert_eq!(
            error.to_string(),
            "consensus final score 2 outside judge range [4, 5]"
        );
        assert!(error.is_range_violation());
    }

    #[test]
    fn test_is_range_violation_check() {
        assert!(!DomainError::TooFewScores(1).is_range_violation());
        assert!(!DomainError::NoItemReviews.is_range_violation());
    }
}
