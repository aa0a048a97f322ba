//! Rubric and calibration example value objects
//!
//! Both are loaded once by the infrastructure layer and treated as immutable
//! configuration for the lifetime of the process.

use crate::error::DomainError;
use crate::run::RaterId;
use std::collections::BTreeMap;

/// The five scoring anchor labels every rubric must define
pub const SCORING_ANCHORS: [&str; 5] = ["Poor", "Weak", "Adequate", "Strong", "Excellent"];

/// Validated shared rubric text, used as the judge system prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rubric(String);

impl Rubric {
    /// Validate and wrap rubric text
    ///
    /// Rejects empty text and text missing any of the five scoring anchors.
    pub fn new(text: impl Into<String>) -> Result<Self, DomainError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(DomainError::EmptyRubric);
        }

        let missing: Vec<&str> = SCORING_ANCHORS
            .iter()
            .copied()
            .filter(|anchor| !text.contains(anchor))
            .collect();
        if !missing.is_empty() {
            return Err(DomainError::MissingScoringAnchors(missing.join(", ")));
        }

        Ok(Self(text))
    }

    pub fn text(&self) -> &str {
        &self.0
    }
}

/// Per-persona few-shot calibration examples, keyed by rater
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalibrationSet {
    examples: BTreeMap<RaterId, String>,
}

impl CalibrationSet {
    /// Build a calibration set; every rater in the roster must be covered
    pub fn new(examples: BTreeMap<RaterId, String>) -> Result<Self, DomainError> {
        for rater in RaterId::ALL {
            match examples.get(&rater) {
                Some(text) if !text.trim().is_empty() => {}
                _ => return Err(DomainError::MissingCalibration(rater.label().to_string())),
            }
        }
        Ok(Self { examples })
    }

    pub fn for_rater(&self, rater: RaterId) -> &str {
        // new() guarantees every roster entry is present
        self.examples
            .get(&rater)
            .map(String::as_str)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RUBRIC: &str = "Score each item: 1 Poor, 2 Weak, 3 Adequate, 4 Strong, 5 Excellent.";

    #[test]
    fn test_valid_rubric() {
        let rubric = Rubric::new(RUBRIC).unwrap();
        assert_eq!(rubric.text(), RUBRIC);
    }

    #[test]
    fn test_empty_rubric_rejected() {
        assert_eq!(Rubric::new("  \n"), Err(DomainError::EmptyRubric));
    }

    #[test]
    fn test_missing_anchors_listed() {
        let err = Rubric::new("Score from Poor to Excellent.").unwrap_err();
        assert_eq!(
            err,
            DomainError::MissingScoringAnchors("Weak, Adequate, Strong".to_string())
        );
    }

    #[test]
    fn test_calibration_requires_full_roster() {
        let mut examples = BTreeMap::new();
        examples.insert(RaterId::RaterA, "## Example 1".to_string());
        examples.insert(RaterId::RaterB, "## Example 1".to_string());

        let err = CalibrationSet::new(examples.clone()).unwrap_err();
        assert_eq!(err, DomainError::MissingCalibration("Rater C".to_string()));

        examples.insert(RaterId::RaterC, "## Example 1".to_string());
        let set = CalibrationSet::new(examples).unwrap();
        assert_eq!(set.for_rater(RaterId::RaterB), "## Example 1");
    }

    #[test]
    fn test_blank_calibration_rejected() {
        let mut examples = BTreeMap::new();
        for rater in RaterId::ALL {
            examples.insert(rater, "content".to_string());
        }
        examples.insert(RaterId::RaterA, "   ".to_string());
        assert!(CalibrationSet::new(examples).is_err());
    }
}
