//! Single judge evaluation
//!
//! Formats one judge persona's prompts (shared rubric as the system prompt,
//! calibration examples plus the numbered proposal items as the user prompt)
//! and drives the structured output extractor under a bounded timeout.
//! Timeout expiry surfaces as a judge-local error; sibling judges are
//! unaffected.

use crate::ports::llm_gateway::LlmGateway;
use crate::structured_output::{InvokeOptions, StructuredInvokeResult, StructuredOutputError, invoke_structured};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use tribunal_domain::{DomainError, JudgeVerdict, PromptTemplate, RaterId, Rubric};

/// Default timeout for one judge evaluation
pub const DEFAULT_JUDGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Output token ceiling sized for per-item commentary plus one overall score
const JUDGE_MAX_OUTPUT_TOKENS: u32 = 4000;

/// Schema name matching the rubric's tool call name
const JUDGE_SCHEMA_NAME: &str = "log_review";

/// Errors from a judge evaluation
#[derive(Error, Debug)]
pub enum JudgeError {
    /// The deadline elapsed; the in-flight call was dropped
    #[error("judge evaluation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// All extraction tiers failed; carries the attempt history
    #[error(transparent)]
    Extraction(#[from] StructuredOutputError),

    /// The extracted verdict violated a domain constraint
    #[error("judge verdict failed validation: {0}")]
    InvalidVerdict(#[from] DomainError),
}

/// Input parameters for a single judge evaluation
#[derive(Debug, Clone)]
pub struct JudgeInput {
    pub proposal_id: i64,
    pub rater: RaterId,
    /// Pre-formatted numbered action items (shared across judges)
    pub items_text: String,
    /// Pre-formatted few-shot calibration examples for this persona
    pub calibration_examples: String,
    /// Timeout override (default [`DEFAULT_JUDGE_TIMEOUT`])
    pub timeout: Option<Duration>,
}

/// Use case: run one judge evaluation with structured output and a timeout
pub struct RunJudgeUseCase<G: LlmGateway> {
    gateway: Arc<G>,
    rubric: Rubric,
}

impl<G: LlmGateway> RunJudgeUseCase<G> {
    pub fn new(gateway: Arc<G>, rubric: Rubric) -> Self {
        Self { gateway, rubric }
    }

    /// Execute the judge evaluation
    ///
    /// # Errors
    ///
    /// [`JudgeError::Timeout`] on deadline expiry; extractor errors propagate
    /// unchanged with their tier attempt history.
    pub async fn execute(
        &self,
        input: JudgeInput,
    ) -> Result<StructuredInvokeResult<JudgeVerdict>, JudgeError> {
        let timeout = input.timeout.unwrap_or(DEFAULT_JUDGE_TIMEOUT);

        let user_prompt = PromptTemplate::judge_user(
            input.proposal_id,
            input.rater,
            &input.items_text,
            &input.calibration_examples,
        );

        debug!(
            rater = %input.rater,
            proposal_id = input.proposal_id,
            timeout_ms = timeout.as_millis() as u64,
            "starting judge evaluation"
        );

        let options = InvokeOptions {
            system: self.rubric.text().to_string(),
            user: user_prompt,
            max_output_tokens: Some(JUDGE_MAX_OUTPUT_TOKENS),
            schema_name: Some(JUDGE_SCHEMA_NAME.to_string()),
        };

        // The in-flight extraction is dropped on expiry; no timer survives
        // any exit path.
        let extraction =
            tokio::time::timeout(timeout, invoke_structured::<JudgeVerdict>(&*self.gateway, options))
                .await
                .map_err(|_| JudgeError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                })?;

        let result = extraction?;
        result.result.validate()?;
        Ok(result)
    }
}
