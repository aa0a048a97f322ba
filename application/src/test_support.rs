//! Shared fakes for use-case tests

use crate::ports::llm_gateway::{
    GatewayError, LlmGateway, LlmRequest, LlmResponse, OutputFormat, ResponseStatus, TokenUsage,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Gateway fake that replays a scripted queue of responses in call order
pub struct ScriptedGateway {
    script: Mutex<VecDeque<Result<LlmResponse, GatewayError>>>,
    requests: Mutex<Vec<LlmRequest>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl ScriptedGateway {
    pub fn new(script: Vec<Result<LlmResponse, GatewayError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    /// Delay every response; used to trip timeouts
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn completed(output_text: &str) -> LlmResponse {
        Self::completed_with_usage(
            output_text,
            TokenUsage {
                input_tokens: 10,
                output_tokens: 5,
                total_tokens: 15,
            },
        )
    }

    pub fn completed_with_usage(output_text: &str, usage: TokenUsage) -> LlmResponse {
        LlmResponse {
            status: ResponseStatus::Completed,
            output_text: output_text.to_string(),
            usage,
            incomplete_details: None,
        }
    }

    pub fn incomplete(details: &str) -> LlmResponse {
        LlmResponse {
            status: ResponseStatus::Incomplete,
            output_text: String::new(),
            usage: TokenUsage::default(),
            incomplete_details: Some(details.to_string()),
        }
    }
}

#[async_trait]
impl LlmGateway for ScriptedGateway {
    async fn invoke(&self, request: LlmRequest) -> Result<LlmResponse, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("ScriptedGateway script exhausted"))
    }
}

/// Gateway fake that routes each request through a closure
///
/// Needed where calls arrive concurrently in nondeterministic order
/// (orchestrator fan-out), so responses must be matched to the request
/// content instead of the call sequence.
pub struct FnGateway<F> {
    respond: F,
    requests: Mutex<Vec<LlmRequest>>,
    calls: AtomicUsize,
}

impl<F> FnGateway<F>
where
    F: Fn(&LlmRequest) -> Result<LlmResponse, GatewayError> + Send + Sync,
{
    pub fn new(respond: F) -> Self {
        Self {
            respond,
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of recorded requests targeting the given schema name
    pub fn schema_request_count(&self, schema_name: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| match &r.output_format {
                OutputFormat::JsonSchema { name, .. } => name == schema_name,
                _ => false,
            })
            .count()
    }
}

#[async_trait]
impl<F> LlmGateway for FnGateway<F>
where
    F: Fn(&LlmRequest) -> Result<LlmResponse, GatewayError> + Send + Sync,
{
    async fn invoke(&self, request: LlmRequest) -> Result<LlmResponse, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let response = (self.respond)(&request);
        self.requests.lock().unwrap().push(request);
        response
    }
}

/// Serialized judge verdict as the LLM would return it
pub fn judge_verdict_json(proposal_id: i64, evaluator_id: i64, overall_score: u8) -> String {
    serde_json::json!({
        "proposal_id": proposal_id,
        "evaluator_id": evaluator_id,
        "evaluator_name": format!("Rater {}", (b'A' + (evaluator_id - 1) as u8) as char),
        "items": [
            { "item_id": 1, "comment": "Clear objective.", "score": overall_score }
        ],
        "overall_score": overall_score
    })
    .to_string()
}

/// Serialized consensus verdict as the arbiter LLM would return it
///
/// Deliberately carries wrong numeric agreement fields so tests can assert
/// they get overwritten.
pub fn consensus_json(final_score: u8) -> String {
    serde_json::json!({
        "final_score": final_score,
        "rationale": "Judges broadly agreed on the plan's strengths.",
        "agreement": {
            "scores": { "rater_a": 1, "rater_b": 1, "rater_c": 1 },
            "mean_score": 1.0,
            "median_score": 1,
            "spread": 0,
            "agreement_level": "strong",
            "disagreement_analysis": "Rater A weighted metric specificity more heavily."
        },
        "improvements": ["Add quantitative milestones."]
    })
    .to_string()
}
