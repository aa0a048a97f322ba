//! Judge verdict types
//!
//! A [`JudgeVerdict`] is the complete evaluation from a single judge persona:
//! one [`ItemReview`] per action item plus an overall score. These types
//! derive [`schemars::JsonSchema`] because their schema is sent verbatim to
//! the LLM API as the structured output contract (`log_review`).

use crate::error::DomainError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Evaluation of a single action item within a proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ItemReview {
    /// Stable ID of the action item being reviewed
    pub item_id: i64,
    /// Brief, constructive feedback (1-3 sentences)
    pub comment: String,
    /// Score from 1 (poor) to 5 (excellent)
    #[schemars(range(min = 1, max = 5))]
    pub score: u8,
}

impl ItemReview {
    pub fn new(item_id: i64, comment: impl Into<String>, score: u8) -> Self {
        Self {
            item_id,
            comment: comment.into(),
            score,
        }
    }

    /// Validate the score range
    pub fn validate(&self) -> Result<(), DomainError> {
        if !(1..=5).contains(&self.score) {
            return Err(DomainError::ScoreOutOfRange(self.score));
        }
        Ok(())
    }
}

/// Complete evaluation from a single judge (`log_review` format)
///
/// Produced exactly once per successful judge invocation and owned by the
/// orchestrator for the duration of a run. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct JudgeVerdict {
    /// Proposal identifier from the current request
    pub proposal_id: i64,
    /// Persona ID of the evaluator (1=A, 2=B, 3=C)
    pub evaluator_id: i64,
    /// Persona name of the evaluator
    pub evaluator_name: String,
    /// One review per action item
    #[schemars(length(min = 1))]
    pub items: Vec<ItemReview>,
    /// Overall assessment score 1-5
    #[schemars(range(min = 1, max = 5))]
    pub overall_score: u8,
}

impl JudgeVerdict {
    /// Validate item presence and all score ranges
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.items.is_empty() {
            return Err(DomainError::NoItemReviews);
        }
        for item in &self.items {
            item.validate()?;
        }
        if !(1..=5).contains(&self.overall_score) {
            return Err(DomainError::ScoreOutOfRange(self.overall_score));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(overall: u8) -> JudgeVerdict {
        JudgeVerdict {
            proposal_id: 1,
            evaluator_id: 1,
            evaluator_name: "Rater A".to_string(),
            items: vec![ItemReview::new(1, "Clear and actionable.", overall)],
            overall_score: overall,
        }
    }

    #[test]
    fn test_valid_verdict() {
        assert!(verdict(4).validate().is_ok());
    }

    #[test]
    fn test_overall_score_out_of_range() {
        let v = JudgeVerdict {
            overall_score: 6,
            ..verdict(4)
        };
        assert_eq!(v.validate(), Err(DomainError::ScoreOutOfRange(6)));
    }

    #[test]
    fn test_empty_items_rejected() {
        let v = JudgeVerdict {
            items: vec![],
            ..verdict(3)
        };
        assert_eq!(v.validate(), Err(DomainError::NoItemReviews));
    }

    #[test]
    fn test_item_score_out_of_range() {
        let v = JudgeVerdict {
            items: vec![ItemReview::new(1, "bad", 0)],
            ..verdict(3)
        };
        assert_eq!(v.validate(), Err(DomainError::ScoreOutOfRange(0)));
    }

    #[test]
    fn test_serde_round_trip() {
        let v = verdict(5);
        let json = serde_json::to_string(&v).unwrap();
        let back: JudgeVerdict = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }
}
