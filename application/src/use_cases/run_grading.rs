//! Grading orchestrator
//!
//! Top-level state machine for one grading run:
//! `idle → evaluating → consensus → done`, with `error` absorbing from any
//! phase. Validates input, screens content safety, fans out to the three
//! judges in parallel, degrades gracefully on a single judge failure,
//! invokes the consensus arbiter, and emits progressive state snapshots
//! throughout.
//!
//! Failure-message policy: any error surfaced through emitted state comes
//! from a small fixed set of generic, user-safe strings. The underlying
//! exception detail goes to the operational log only (key=value, never raw
//! proposal content).

use crate::ports::llm_gateway::LlmGateway;
use crate::ports::state_sink::StateSink;
use crate::use_cases::run_consensus::{ConsensusError, ConsensusInput, RunConsensusUseCase};
use crate::use_cases::run_judge::{JudgeError, JudgeInput, RunJudgeUseCase};
use crate::use_cases::screen_content::ScreenContentUseCase;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tribunal_domain::{
    GradingRun, JudgeRunState, JudgeVerdict, Phase, PromptTemplate, ProposalRef, RaterId,
    CalibrationSet, Rubric, StatePatch,
};

/// Maximum number of action items evaluated per run; extras are dropped
/// and the truncation is surfaced to the caller.
pub const MAX_ACTION_ITEMS: usize = 20;

/// Timeout handed to each judge by the orchestrator
pub const ORCHESTRATOR_JUDGE_TIMEOUT: Duration = Duration::from_secs(60);

// User-safe messages; raw error detail never reaches emitted state.
pub const MSG_NO_ITEMS: &str = "No items provided. At least 1 item is required for evaluation.";
pub const MSG_CONTENT_REJECTED: &str =
    "This proposal contains inappropriate content or invalid formatting. Please review and try again.";
pub const MSG_SAFETY_UNAVAILABLE: &str = "Unable to verify content safety. Please try again.";
pub const MSG_JUDGE_FAILED: &str = "Judge evaluation failed.";
pub const MSG_JUDGE_TIMEOUT: &str = "Judge evaluation timed out.";
pub const MSG_CONSENSUS_FAILED: &str = "Consensus arbitration failed. Please try again.";

/// Errors that terminate a grading run
#[derive(Error, Debug)]
pub enum GradingError {
    #[error("{}", MSG_NO_ITEMS)]
    NoItems,

    /// Screener checked the content and rejected it
    #[error("{}", MSG_CONTENT_REJECTED)]
    ContentRejected,

    /// Screener could not check the content (infrastructure failure)
    #[error("{}", MSG_SAFETY_UNAVAILABLE)]
    SafetyCheckUnavailable,

    /// Hard floor: consensus is undefined below 2 judge verdicts
    #[error("Fewer than 2 judges succeeded ({failed} failed). Cannot form consensus.")]
    TooFewJudges { failed: usize },

    /// Arbiter failure, including range-violation errors
    #[error(transparent)]
    Consensus(#[from] ConsensusError),

    #[error("grading run cancelled")]
    Cancelled,
}

/// Input parameters for a grading run
#[derive(Debug, Clone)]
pub struct GradingInput {
    pub proposal_id: i64,
    pub proposal_title: Option<String>,
    pub items: Vec<String>,
}

/// Use case: run the complete grading pipeline
pub struct RunGradingUseCase<G: LlmGateway + 'static> {
    gateway: Arc<G>,
    rubric: Rubric,
    calibration: CalibrationSet,
    judge_timeout: Duration,
    cancellation_token: Option<CancellationToken>,
}

impl<G: LlmGateway + 'static> RunGradingUseCase<G> {
    pub fn new(gateway: Arc<G>, rubric: Rubric, calibration: CalibrationSet) -> Self {
        Self {
            gateway,
            rubric,
            calibration,
            judge_timeout: ORCHESTRATOR_JUDGE_TIMEOUT,
            cancellation_token: None,
        }
    }

    /// Override the per-judge timeout
    pub fn with_judge_timeout(mut self, timeout: Duration) -> Self {
        self.judge_timeout = timeout;
        self
    }

    /// Set a cancellation token for cooperative abandonment
    ///
    /// Once cancelled, no further state emissions occur; results of
    /// in-flight calls are discarded.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Execute the pipeline, emitting progressive state through `sink`
    pub async fn execute(
        &self,
        input: GradingInput,
        sink: &dyn StateSink,
    ) -> Result<GradingRun, GradingError> {
        let run_started = Instant::now();

        let mut items = input.items;
        let was_truncated = items.len() > MAX_ACTION_ITEMS;
        items.truncate(MAX_ACTION_ITEMS);

        if items.is_empty() {
            error!(proposal_id = input.proposal_id, "grading run rejected: no items");
            self.emit(sink, StatePatch::phase(Phase::Error).with_error(MSG_NO_ITEMS));
            return Err(GradingError::NoItems);
        }

        self.screen_content(input.proposal_id, &items, sink).await?;
        self.check_cancelled()?;

        info!(
            proposal_id = input.proposal_id,
            action_items = items.len(),
            was_truncated,
            "grading run started"
        );

        let items_text = PromptTemplate::format_items(&items);

        // Single-writer judge map: tasks hand their settlement back through
        // join_next and only the orchestrator writes each rater's partition.
        let mut judges: BTreeMap<RaterId, JudgeRunState> = RaterId::ALL
            .iter()
            .map(|&rater| (rater, JudgeRunState::running(rater)))
            .collect();

        self.emit(
            sink,
            StatePatch::phase(Phase::Evaluating)
                .with_judges(judges.clone())
                .with_was_truncated(was_truncated),
        );

        let mut join_set = JoinSet::new();
        for rater in RaterId::ALL {
            let gateway = Arc::clone(&self.gateway);
            let rubric = self.rubric.clone();
            let judge_input = JudgeInput {
                proposal_id: input.proposal_id,
                rater,
                items_text: items_text.clone(),
                calibration_examples: self.calibration.for_rater(rater).to_string(),
                timeout: Some(self.judge_timeout),
            };

            join_set.spawn(async move {
                let started = Instant::now();
                let result = RunJudgeUseCase::new(gateway, rubric).execute(judge_input).await;
                (rater, result, started.elapsed().as_millis() as u64)
            });
        }

        loop {
            let settled = if let Some(token) = &self.cancellation_token {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        join_set.abort_all();
                        return Err(GradingError::Cancelled);
                    }
                    settled = join_set.join_next() => settled,
                }
            } else {
                join_set.join_next().await
            };

            let Some(settled) = settled else { break };

            match settled {
                Ok((rater, Ok(judge_result), latency_ms)) => {
                    info!(
                        rater = %rater,
                        overall_score = judge_result.result.overall_score,
                        latency_ms,
                        tier = judge_result.tier.number(),
                        total_tokens = judge_result.usage.total_tokens,
                        "judge completed"
                    );
                    judges.insert(
                        rater,
                        JudgeRunState::done(rater, judge_result.result, latency_ms),
                    );
                }
                Ok((rater, Err(judge_error), latency_ms)) => {
                    error!(
                        rater = %rater,
                        latency_ms,
                        error = %judge_error,
                        "judge failed"
                    );
                    judges.insert(
                        rater,
                        JudgeRunState::failed(rater, sanitize_judge_error(&judge_error), latency_ms),
                    );
                }
                Err(join_error) => {
                    warn!(error = %join_error, "judge task join error");
                    continue;
                }
            }

            self.check_cancelled()?;
            self.emit(sink, StatePatch::judges(judges.clone()));
        }

        // A panicked task leaves its judge without a settlement
        for (rater, state) in judges.iter_mut() {
            if !state.status.is_terminal() {
                *state = JudgeRunState::failed(*rater, MSG_JUDGE_FAILED, 0);
            }
        }

        let verdicts: BTreeMap<RaterId, JudgeVerdict> = judges
            .iter()
            .filter_map(|(rater, state)| {
                state
                    .is_done()
                    .then(|| state.result.clone().map(|verdict| (*rater, verdict)))
                    .flatten()
            })
            .collect();
        let failed = RaterId::ALL.len() - verdicts.len();

        if verdicts.len() < 2 {
            let err = GradingError::TooFewJudges { failed };
            error!(proposal_id = input.proposal_id, failed, "grading run failed: too few judges");
            self.emit(
                sink,
                StatePatch::phase(Phase::Error)
                    .with_judges(judges.clone())
                    .with_error(err.to_string()),
            );
            return Err(err);
        }

        self.check_cancelled()?;
        self.emit(
            sink,
            StatePatch::phase(Phase::Consensus).with_judges(judges.clone()),
        );

        let consensus_result = RunConsensusUseCase::new(Arc::clone(&self.gateway))
            .execute(ConsensusInput {
                verdicts,
                missing_judge_count: failed,
            })
            .await;

        self.check_cancelled()?;

        match consensus_result {
            Ok(consensus) => {
                let run = GradingRun {
                    phase: Phase::Done,
                    proposal: Some(ProposalRef {
                        id: input.proposal_id,
                        title: input.proposal_title,
                        items,
                        was_truncated,
                    }),
                    judges,
                    consensus: Some(consensus.result),
                    error: None,
                    was_truncated,
                };

                self.emit(
                    sink,
                    StatePatch {
                        phase: Some(Phase::Done),
                        proposal: run.proposal.clone(),
                        judges: Some(run.judges.clone()),
                        consensus: run.consensus.clone(),
                        error: None,
                        was_truncated: Some(was_truncated),
                    },
                );

                info!(
                    proposal_id = input.proposal_id,
                    total_latency_ms = run_started.elapsed().as_millis() as u64,
                    judges_succeeded = RaterId::ALL.len() - failed,
                    judges_failed = failed,
                    "grading run completed"
                );

                Ok(run)
            }
            Err(consensus_error) => {
                error!(
                    proposal_id = input.proposal_id,
                    error = %consensus_error,
                    "consensus failed"
                );
                self.emit(
                    sink,
                    StatePatch::phase(Phase::Error)
                        .with_judges(judges)
                        .with_error(MSG_CONSENSUS_FAILED),
                );
                Err(GradingError::Consensus(consensus_error))
            }
        }
    }

    /// Screen the concatenated item text before any grading call
    async fn screen_content(
        &self,
        proposal_id: i64,
        items: &[String],
        sink: &dyn StateSink,
    ) -> Result<(), GradingError> {
        self.check_cancelled()?;

        let screener = ScreenContentUseCase::new(Arc::clone(&self.gateway));
        let text = items.join("\n\n");

        match screener.execute(&text).await {
            Ok(result) if result.is_safe => {
                info!(
                    proposal_id,
                    latency_ms = result.latency_ms,
                    "content safety check passed"
                );
                Ok(())
            }
            Ok(result) => {
                // Raw classifier reason is logged, never surfaced
                warn!(
                    proposal_id,
                    latency_ms = result.latency_ms,
                    reason = result.reason.as_deref().unwrap_or("unknown"),
                    "content safety check blocked proposal"
                );
                self.emit(
                    sink,
                    StatePatch::phase(Phase::Error).with_error(MSG_CONTENT_REJECTED),
                );
                Err(GradingError::ContentRejected)
            }
            Err(gateway_error) => {
                error!(
                    proposal_id,
                    error = %gateway_error,
                    "content safety check unavailable"
                );
                self.emit(
                    sink,
                    StatePatch::phase(Phase::Error).with_error(MSG_SAFETY_UNAVAILABLE),
                );
                Err(GradingError::SafetyCheckUnavailable)
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation_token
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }

    fn check_cancelled(&self) -> Result<(), GradingError> {
        if self.is_cancelled() {
            Err(GradingError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Emit a snapshot unless the run has been cancelled
    fn emit(&self, sink: &dyn StateSink, patch: StatePatch) {
        if !self.is_cancelled() {
            sink.emit(patch);
        }
    }
}

/// Map judge-layer errors to the fixed set of user-safe strings
fn sanitize_judge_error(error: &JudgeError) -> &'static str {
    match error {
        JudgeError::Timeout { .. } => MSG_JUDGE_TIMEOUT,
        JudgeError::Extraction(_) | JudgeError::InvalidVerdict(_) => MSG_JUDGE_FAILED,
    }
}
