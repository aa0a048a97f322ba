//! Consensus verdict types
//!
//! The [`ConsensusVerdict`] schema (`consensus_output`) is sent to the
//! arbiter LLM as its structured output contract. The numeric agreement
//! fields inside [`Agreement`] are requested from the model only so the
//! schema stays complete; the arbiter use case overwrites them with
//! deterministically computed values before the verdict leaves the pipeline.

use super::stats::{AgreementLevel, AgreementStats};
use crate::error::DomainError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Per-rater overall scores; `None` for a judge that did not complete
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RaterScores {
    /// Score from Rater A, null if the judge failed
    pub rater_a: Option<u8>,
    /// Score from Rater B, null if the judge failed
    pub rater_b: Option<u8>,
    /// Score from Rater C, null if the judge failed
    pub rater_c: Option<u8>,
}

/// Agreement block of the consensus verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Agreement {
    /// Per-rater overall scores
    pub scores: RaterScores,
    /// Arithmetic mean of judge scores, rounded to 1 decimal
    pub mean_score: f64,
    /// Median of judge scores
    #[schemars(range(min = 1, max = 5))]
    pub median_score: u8,
    /// Max score minus min score across judges
    #[schemars(range(min = 0, max = 4))]
    pub spread: u8,
    /// strong = spread 0-1, moderate = spread 2, weak = spread 3-4
    pub agreement_level: AgreementLevel,
    /// Why judges differed, referencing their calibration perspectives
    pub disagreement_analysis: String,
}

/// Final reconciled grade from the consensus arbiter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConsensusVerdict {
    /// Reconciled final score; MUST be within [min(judge scores), max(judge scores)]
    #[schemars(range(min = 1, max = 5))]
    pub final_score: u8,
    /// 3-5 sentence synthesis of judge rationales, not new document analysis
    pub rationale: String,
    /// Agreement statistics and disagreement analysis
    pub agreement: Agreement,
    /// Consolidated improvement suggestions from all judges, deduplicated
    #[schemars(length(min = 1, max = 5))]
    pub improvements: Vec<String>,
}

impl ConsensusVerdict {
    /// Overwrite the LLM-authored numeric fields with deterministic values
    ///
    /// Only the qualitative synthesis (rationale, disagreement analysis,
    /// improvements) survives from the model output.
    pub fn with_computed_stats(mut self, scores: RaterScores, stats: &AgreementStats) -> Self {
        self.agreement.scores = scores;
        self.agreement.mean_score = stats.mean_score;
        self.agreement.median_score = stats.median_score;
        self.agreement.spread = stats.spread;
        self.agreement.agreement_level = stats.agreement_level;
        self
    }

    /// Enforce the hard range invariant against the judge scores
    pub fn ensure_score_in_range(&self, judge_scores: &[u8]) -> Result<(), DomainError> {
        let min = judge_scores.iter().copied().min().unwrap_or(1);
        let max = judge_scores.iter().copied().max().unwrap_or(5);
        if self.final_score < min || self.final_score > max {
            return Err(DomainError::FinalScoreOutOfRange {
                final_score: self.final_score,
                min,
                max,
            });
        }
        Ok(())
    }

    /// Validate structural constraints beyond what deserialization enforces
    pub fn validate(&self) -> Result<(), DomainError> {
        if !(1..=5).contains(&self.final_score) {
            return Err(DomainError::ScoreOutOfRange(self.final_score));
        }
        if self.improvements.is_empty() || self.improvements.len() > 5 {
            return Err(DomainError::InvalidImprovementCount(self.improvements.len()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verdict::stats::compute_agreement_stats;

    fn consensus(final_score: u8) -> ConsensusVerdict {
        ConsensusVerdict {
            final_score,
            rationale: "Judges agreed the plan is solid.".to_string(),
            agreement: Agreement {
                scores: RaterScores::default(),
                mean_score: 0.0,
                median_score: 1,
                spread: 0,
                agreement_level: AgreementLevel::Strong,
                disagreement_analysis: "Minor differences in emphasis.".to_string(),
            },
            improvements: vec!["Add quantitative targets.".to_string()],
        }
    }

    #[test]
    fn test_range_invariant_accepts_bounds() {
        assert!(consensus(4).ensure_score_in_range(&[4, 5]).is_ok());
        assert!(consensus(5).ensure_score_in_range(&[4, 5]).is_ok());
    }

    #[test]
    fn test_range_invariant_rejects_below_min() {
        let err = consensus(2).ensure_score_in_range(&[4, 5]).unwrap_err();
        assert_eq!(
            err,
            DomainError::FinalScoreOutOfRange {
                final_score: 2,
                min: 4,
                max: 5
            }
        );
        // 3 is also outside [4, 5], even though it is a valid score
        assert!(consensus(3).ensure_score_in_range(&[4, 5]).is_err());
    }

    #[test]
    fn test_stats_overwrite_keeps_qualitative_fields() {
        let stats = compute_agreement_stats(&[3, 4, 5]).unwrap();
        let scores = RaterScores {
            rater_a: Some(3),
            rater_b: Some(4),
            rater_c: Some(5),
        };
        let verdict = consensus(4).with_computed_stats(scores, &stats);

        assert_eq!(verdict.agreement.mean_score, 4.0);
        assert_eq!(verdict.agreement.median_score, 4);
        assert_eq!(verdict.agreement.spread, 2);
        assert_eq!(verdict.agreement.agreement_level, AgreementLevel::Moderate);
        assert_eq!(verdict.agreement.scores.rater_b, Some(4));
        assert_eq!(
            verdict.agreement.disagreement_analysis,
            "Minor differences in emphasis."
        );
        assert_eq!(verdict.rationale, "Judges agreed the plan is solid.");
    }

    #[test]
    fn test_validate_improvement_count() {
        let mut verdict = consensus(3);
        verdict.improvements.clear();
        assert_eq!(
            verdict.validate(),
            Err(DomainError::InvalidImprovementCount(0))
        );

        verdict.improvements = vec!["a".into(); 6];
        assert_eq!(
            verdict.validate(),
            Err(DomainError::InvalidImprovementCount(6))
        );
    }

    #[test]
    fn test_missing_rater_serializes_as_null() {
        let scores = RaterScores {
            rater_a: Some(4),
            rater_b: None,
            rater_c: Some(3),
        };
        let json = serde_json::to_value(scores).unwrap();
        assert!(json["rater_b"].is_null());
        assert_eq!(json["rater_a"], 4);
    }
}
