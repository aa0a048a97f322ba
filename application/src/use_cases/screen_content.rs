//! Content safety screening with zero-shot classification
//!
//! Screens submitted proposal text before it enters the grading pipeline.
//! This is the ONLY point where untrusted user input is validated before
//! reaching the LLM-based pipeline; every other input (rubric, calibration
//! examples, system prompts) is controlled configuration.
//!
//! Two rejection paths end in `is_safe: false`:
//! 1. the hosting platform's own content filter rejects the call, or
//! 2. our classifier answers UNSAFE, or anything that is not clearly SAFE
//!    (unexpected output is treated as unsafe, fail closed).
//!
//! All other gateway errors (network, auth, rate limit) are re-thrown; this
//! component must not mask infrastructure failures as content violations.

use crate::ports::llm_gateway::{GatewayError, LlmGateway, LlmRequest, OutputFormat};
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;
use tribunal_domain::PromptTemplate;

/// Output token ceiling for the classification call. Must leave room for a
/// reasoning model's internal tokens plus the one-word visible answer.
const SAFETY_MAX_OUTPUT_TOKENS: u32 = 256;

/// Result of a content safety check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentSafetyResult {
    /// Whether the text is safe to process
    pub is_safe: bool,
    /// Human-readable reason if flagged as unsafe
    pub reason: Option<String>,
    /// Latency of the safety check in milliseconds
    pub latency_ms: u64,
}

/// Use case: screen proposal text for injection attempts and policy violations
pub struct ScreenContentUseCase<G: LlmGateway> {
    gateway: Arc<G>,
}

impl<G: LlmGateway> ScreenContentUseCase<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }

    /// Classify the given text as SAFE or UNSAFE
    ///
    /// # Errors
    ///
    /// Returns the gateway error unchanged for non-safety API failures.
    pub async fn execute(&self, text: &str) -> Result<ContentSafetyResult, GatewayError> {
        let started = Instant::now();

        let request = LlmRequest {
            instructions: PromptTemplate::safety_instructions().to_string(),
            input: PromptTemplate::safety_classifier(text),
            output_format: OutputFormat::Text,
            max_output_tokens: SAFETY_MAX_OUTPUT_TOKENS,
        };

        let response = match self.gateway.invoke(request).await {
            Ok(response) => response,
            Err(error) if error.is_content_filter() => {
                return Ok(ContentSafetyResult {
                    is_safe: false,
                    reason: Some("platform content filter violation".to_string()),
                    latency_ms: elapsed_ms(started),
                });
            }
            Err(error) => return Err(error),
        };

        let latency_ms = elapsed_ms(started);
        let raw = response.output_text.trim();
        let upper = raw.to_uppercase();

        // UNSAFE first: tolerate trailing reasoning text after either verdict
        if upper == "UNSAFE" || upper.starts_with("UNSAFE") {
            return Ok(ContentSafetyResult {
                is_safe: false,
                reason: Some("content flagged by safety classifier".to_string()),
                latency_ms,
            });
        }

        if upper == "SAFE" || upper.starts_with("SAFE") {
            return Ok(ContentSafetyResult {
                is_safe: true,
                reason: None,
                latency_ms,
            });
        }

        // Anything else is treated as unsafe, fail closed
        warn!(
            output = %truncate(raw, 100),
            "unexpected safety classifier output"
        );
        Ok(ContentSafetyResult {
            is_safe: false,
            reason: Some(format!(
                "unexpected classifier response: {}",
                truncate(raw, 50)
            )),
            latency_ms,
        })
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
