//! Domain layer for tribunal
//!
//! This crate contains the core grading entities and pure logic.
//! It has no dependencies on infrastructure or async concerns.
//!
//! # Core Concepts
//!
//! ## Judges
//!
//! Three fixed evaluator personas ([`RaterId`]) independently score the same
//! proposal against a shared rubric, each calibrated with a different human
//! rater's examples. Every successful evaluation produces a [`JudgeVerdict`].
//!
//! ## Consensus
//!
//! An arbiter reconciles the judge verdicts into one [`ConsensusVerdict`].
//! Agreement statistics are always computed here, deterministically
//! ([`compute_agreement_stats`]); LLM arithmetic is never trusted.

pub mod error;
pub mod prompt;
pub mod rubric;
pub mod run;
pub mod verdict;

// Re-export commonly used types
pub use error::DomainError;
pub use prompt::PromptTemplate;
pub use rubric::{CalibrationSet, Rubric, SCORING_ANCHORS};
pub use run::{GradingRun, JudgeRunState, JudgeStatus, Phase, ProposalRef, RaterId, StatePatch};
pub use verdict::{
    Agreement, AgreementLevel, AgreementStats, ConsensusVerdict, ItemReview, JudgeVerdict,
    RaterScores, compute_agreement_stats,
};
