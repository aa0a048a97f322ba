//! Verdict types produced by judges and the consensus arbiter

mod consensus;
mod judge;
mod stats;

pub use consensus::{Agreement, ConsensusVerdict, RaterScores};
pub use judge::{ItemReview, JudgeVerdict};
pub use stats::{AgreementLevel, AgreementStats, compute_agreement_stats};
