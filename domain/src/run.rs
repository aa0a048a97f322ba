//! Grading run entities
//!
//! A [`GradingRun`] is the aggregate root for one pipeline execution. It is
//! created at run start, mutated only by the orchestrator, and handed to the
//! caller (or discarded) at a terminal phase. [`StatePatch`] is the partial
//! snapshot shape emitted progressively while the run advances.

use crate::verdict::{ConsensusVerdict, JudgeVerdict};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Phase of a grading run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Run created, nothing started yet
    Idle,
    /// Judges evaluating in parallel
    Evaluating,
    /// Arbiter reconciling judge verdicts
    Consensus,
    /// Terminal: consensus produced
    Done,
    /// Terminal: run failed
    Error,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Evaluating => "evaluating",
            Phase::Consensus => "consensus",
            Phase::Done => "done",
            Phase::Error => "error",
        }
    }

    /// Terminal phases accept no further transitions or emissions
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Done | Phase::Error)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fixed judge roster: three calibrated evaluator personas
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RaterId {
    RaterA,
    RaterB,
    RaterC,
}

impl RaterId {
    /// Roster in evaluation order
    pub const ALL: [RaterId; 3] = [RaterId::RaterA, RaterId::RaterB, RaterId::RaterC];

    pub fn as_str(&self) -> &'static str {
        match self {
            RaterId::RaterA => "rater_a",
            RaterId::RaterB => "rater_b",
            RaterId::RaterC => "rater_c",
        }
    }

    /// Numeric persona ID passed to the judge prompt (1=A, 2=B, 3=C)
    pub fn evaluator_id(&self) -> i64 {
        match self {
            RaterId::RaterA => 1,
            RaterId::RaterB => 2,
            RaterId::RaterC => 3,
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            RaterId::RaterA => "Rater A",
            RaterId::RaterB => "Rater B",
            RaterId::RaterC => "Rater C",
        }
    }

    /// Persona nickname used in the arbiter prompt
    pub fn persona(&self) -> &'static str {
        match self {
            RaterId::RaterA => "The Professor",
            RaterId::RaterB => "The Editor",
            RaterId::RaterC => "The Practitioner",
        }
    }
}

impl std::fmt::Display for RaterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of a single judge within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JudgeStatus {
    Pending,
    Running,
    Done,
    Error,
}

impl JudgeStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JudgeStatus::Done | JudgeStatus::Error)
    }
}

/// Per-judge mutable record, owned exclusively by the orchestrator
///
/// Transitions to exactly one terminal state (`Done` or `Error`) and never
/// regresses. Judges never see each other's state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeRunState {
    pub status: JudgeStatus,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JudgeVerdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl JudgeRunState {
    /// Initial placeholder while the judge call is in flight
    pub fn running(rater: RaterId) -> Self {
        Self {
            status: JudgeStatus::Running,
            label: rater.label().to_string(),
            result: None,
            error: None,
            latency_ms: None,
        }
    }

    /// Terminal success state
    pub fn done(rater: RaterId, result: JudgeVerdict, latency_ms: u64) -> Self {
        Self {
            status: JudgeStatus::Done,
            label: rater.label().to_string(),
            result: Some(result),
            error: None,
            latency_ms: Some(latency_ms),
        }
    }

    /// Terminal failure state with a sanitized, user-safe message
    pub fn failed(rater: RaterId, error: impl Into<String>, latency_ms: u64) -> Self {
        Self {
            status: JudgeStatus::Error,
            label: rater.label().to_string(),
            result: None,
            error: Some(error.into()),
            latency_ms: Some(latency_ms),
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == JudgeStatus::Done && self.result.is_some()
    }
}

/// Identifying metadata of the proposal being graded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalRef {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub items: Vec<String>,
    pub was_truncated: bool,
}

/// Aggregate root for one grading run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingRun {
    pub phase: Phase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposal: Option<ProposalRef>,
    pub judges: BTreeMap<RaterId, JudgeRunState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consensus: Option<ConsensusVerdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub was_truncated: bool,
}

/// Best-effort partial snapshot emitted while a run progresses
///
/// The caller may merge patches itself; the orchestrator does not assume
/// emission ordering reaches the caller synchronously.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposal: Option<ProposalRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub judges: Option<BTreeMap<RaterId, JudgeRunState>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consensus: Option<ConsensusVerdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub was_truncated: Option<bool>,
}

impl StatePatch {
    pub fn phase(phase: Phase) -> Self {
        Self {
            phase: Some(phase),
            ..Default::default()
        }
    }

    pub fn judges(judges: BTreeMap<RaterId, JudgeRunState>) -> Self {
        Self {
            judges: Some(judges),
            ..Default::default()
        }
    }

    pub fn with_judges(mut self, judges: BTreeMap<RaterId, JudgeRunState>) -> Self {
        self.judges = Some(judges);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_was_truncated(mut self, was_truncated: bool) -> Self {
        self.was_truncated = Some(was_truncated);
        self
    }
}
