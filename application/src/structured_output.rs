//! Structured output extraction with a 3-tier fallback ladder
//!
//! Output-constraint support is inconsistent across LLM deployments and
//! drifts over time, so extraction never couples correctness to the
//! strongest mode alone. Three strategies are attempted strictly in order,
//! each a full independent gateway call:
//!
//! 1. JSON Schema strict mode: server-side schema-validated generation
//! 2. JSON Schema non-strict mode: same schema without the strict flag
//! 3. JSON object mode: generic JSON, enforced purely client-side
//!
//! Every tier's output is parsed and validated in-process regardless of what
//! the server claims to enforce. The first success wins and reports which
//! tier it was; exhaustion raises [`StructuredOutputError`] with the full
//! attempt history. Callers must not retry tiers themselves.

use crate::ports::llm_gateway::{LlmGateway, LlmRequest, OutputFormat, TokenUsage};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default output token ceiling. Set high because reasoning models burn
/// internal chain-of-thought tokens against this limit.
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 16_000;

/// One strategy level in the fallback ladder
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Tier {
    /// JSON Schema strict mode
    Strict,
    /// JSON Schema non-strict mode
    Relaxed,
    /// JSON object mode + client-side schema validation
    JsonFallback,
}

impl Tier {
    /// Ladder in attempt order
    pub const LADDER: [Tier; 3] = [Tier::Strict, Tier::Relaxed, Tier::JsonFallback];

    pub fn number(&self) -> u8 {
        match self {
            Tier::Strict => 1,
            Tier::Relaxed => 2,
            Tier::JsonFallback => 3,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Tier::Strict => "JSON Schema strict",
            Tier::Relaxed => "JSON Schema non-strict",
            Tier::JsonFallback => "JSON object + runtime validation",
        }
    }

    fn output_format(&self, schema_name: &str, schema: &serde_json::Value) -> OutputFormat {
        match self {
            Tier::Strict => OutputFormat::JsonSchema {
                name: schema_name.to_string(),
                schema: schema.clone(),
                strict: true,
            },
            Tier::Relaxed => OutputFormat::JsonSchema {
                name: schema_name.to_string(),
                schema: schema.clone(),
                strict: false,
            },
            Tier::JsonFallback => OutputFormat::JsonObject,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Record of one tier attempt, kept for diagnostics
#[derive(Debug, Clone)]
pub struct TierAttempt {
    pub tier: Tier,
    pub success: bool,
    pub error: Option<String>,
    pub duration: Duration,
}

/// Raised when every tier of the fallback ladder has failed
#[derive(Error, Debug, Clone)]
#[error("all {} structured output tiers failed: {final_error}", attempts.len())]
pub struct StructuredOutputError {
    /// Ordered per-tier attempt history
    pub attempts: Vec<TierAttempt>,
    /// Error of the last attempted tier
    pub final_error: String,
}

impl StructuredOutputError {
    /// Formatted attempt-by-attempt summary for logs
    pub fn summary(&self) -> String {
        let lines: Vec<String> = self
            .attempts
            .iter()
            .map(|a| {
                format!(
                    "  tier {} ({}): {} in {}ms{}",
                    a.tier.number(),
                    a.tier.name(),
                    if a.success { "success" } else { "failed" },
                    a.duration.as_millis(),
                    a.error
                        .as_deref()
                        .map(|e| format!(" - {e}"))
                        .unwrap_or_default(),
                )
            })
            .collect();

        format!(
            "structured output failed after {} attempts:\n{}\n\nfinal error: {}",
            self.attempts.len(),
            lines.join("\n"),
            self.final_error
        )
    }
}

/// Options for a structured extraction call
#[derive(Debug, Clone)]
pub struct InvokeOptions {
    /// System prompt
    pub system: String,
    /// User message
    pub user: String,
    /// Output token ceiling (default [`DEFAULT_MAX_OUTPUT_TOKENS`])
    pub max_output_tokens: Option<u32>,
    /// Schema name for json_schema mode (default "output")
    pub schema_name: Option<String>,
}

/// Successful extraction: validated payload plus which tier produced it
///
/// The tier is surfaced so callers can alert on drift toward weaker tiers.
/// Usage covers the successful call only.
#[derive(Debug, Clone)]
pub struct StructuredInvokeResult<T> {
    pub result: T,
    pub tier: Tier,
    pub usage: TokenUsage,
}

/// Invoke the gateway with structured output and 3-tier fallback
pub async fn invoke_structured<T>(
    gateway: &dyn LlmGateway,
    options: InvokeOptions,
) -> Result<StructuredInvokeResult<T>, StructuredOutputError>
where
    T: DeserializeOwned + JsonSchema,
{
    let schema_name = options.schema_name.as_deref().unwrap_or("output");
    let max_output_tokens = options.max_output_tokens.unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS);

    let mut schema = schemars::schema_for!(T).to_value();
    // The $schema meta-field is not required by the API and trips some deployments
    if let Some(obj) = schema.as_object_mut() {
        obj.remove("$schema");
    }

    let validator = match jsonschema::validator_for(&schema) {
        Ok(v) => v,
        Err(e) => {
            return Err(StructuredOutputError {
                attempts: Vec::new(),
                final_error: format!("schema failed to compile: {e}"),
            });
        }
    };

    let mut attempts: Vec<TierAttempt> = Vec::with_capacity(Tier::LADDER.len());
    let mut final_error = String::from("unknown error");

    for tier in Tier::LADDER {
        let started = Instant::now();
        let request = LlmRequest {
            instructions: options.system.clone(),
            input: options.user.clone(),
            output_format: tier.output_format(schema_name, &schema),
            max_output_tokens,
        };

        match attempt_tier::<T>(gateway, request, &validator).await {
            Ok((result, usage)) => {
                attempts.push(TierAttempt {
                    tier,
                    success: true,
                    error: None,
                    duration: started.elapsed(),
                });
                if tier != Tier::Strict {
                    warn!(
                        tier = tier.number(),
                        schema = schema_name,
                        "structured output fell back below strict mode"
                    );
                }
                info!(
                    tier = tier.number(),
                    schema = schema_name,
                    total_tokens = usage.total_tokens,
                    "structured output succeeded"
                );
                return Ok(StructuredInvokeResult { result, tier, usage });
            }
            Err(error) => {
                debug!(
                    tier = tier.number(),
                    schema = schema_name,
                    error = %error,
                    "structured output tier failed"
                );
                attempts.push(TierAttempt {
                    tier,
                    success: false,
                    error: Some(error.clone()),
                    duration: started.elapsed(),
                });
                final_error = error;
            }
        }
    }

    Err(StructuredOutputError {
        attempts,
        final_error,
    })
}

/// Attempt a single tier: call, status check, parse, validate, deserialize
async fn attempt_tier<T: DeserializeOwned>(
    gateway: &dyn LlmGateway,
    request: LlmRequest,
    validator: &jsonschema::Validator,
) -> Result<(T, TokenUsage), String> {
    let response = gateway
        .invoke(request)
        .await
        .map_err(|e| format!("gateway call failed: {e}"))?;

    if !response.status.is_completed() {
        let details = response
            .incomplete_details
            .as_deref()
            .map(|d| format!(": {d}"))
            .unwrap_or_default();
        return Err(format!(
            "response status \"{}\"{details}",
            response.status.as_str()
        ));
    }

    if response.output_text.is_empty() {
        return Err("empty output text".to_string());
    }

    let parsed: serde_json::Value = serde_json::from_str(&response.output_text).map_err(|e| {
        format!(
            "JSON parse failed: {e}. Content (first 200 chars): {}",
            truncate(&response.output_text, 200)
        )
    })?;

    if !validator.is_valid(&parsed) {
        let errors: Vec<String> = validator
            .iter_errors(&parsed)
            .take(5)
            .map(|e| e.to_string())
            .collect();
        return Err(format!("schema validation failed: {}", errors.join("; ")));
    }

    let result: T =
        serde_json::from_value(parsed).map_err(|e| format!("deserialization failed: {e}"))?;

    Ok((result, response.usage))
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedGateway;
    use crate::ports::llm_gateway::GatewayError;

    #[derive(Debug, PartialEq, serde::Deserialize, JsonSchema)]
    struct Sample {
        label: String,
        #[schemars(range(min = 1, max = 5))]
        score: u8,
    }

    fn reject(message: &str) -> Result<crate::ports::llm_gateway::LlmResponse, GatewayError> {
        Err(GatewayError::RequestFailed {
            status: Some(500),
            message: message.to_string(),
        })
    }

    #[tokio::test]
    async fn test_first_tier_success() {
        let gateway = ScriptedGateway::new(vec![Ok(ScriptedGateway::completed(
            r#"{"label":"ok","score":4}"#,
        ))]);

        let result = invoke_structured::<Sample>(
            &gateway,
            InvokeOptions {
                system: "sys".to_string(),
                user: "user".to_string(),
                max_output_tokens: None,
                schema_name: Some("sample".to_string()),
            },
        )
        .await
        .unwrap();

        assert_eq!(result.tier, Tier::Strict);
        assert_eq!(result.result.score, 4);
        assert_eq!(gateway.call_count(), 1);

        // Tier 1 sends a strict json_schema constraint
        let requests = gateway.requests();
        match &requests[0].output_format {
            OutputFormat::JsonSchema { name, strict, .. } => {
                assert_eq!(name, "sample");
                assert!(strict);
            }
            other => panic!("unexpected output format: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_falls_through_to_third_tier() {
        let gateway = ScriptedGateway::new(vec![
            reject("strict not supported"),
            reject("non-strict rejected"),
            Ok(ScriptedGateway::completed(r#"{"label":"ok","score":2}"#)),
        ]);

        let result = invoke_structured::<Sample>(
            &gateway,
            InvokeOptions {
                system: "sys".to_string(),
                user: "user".to_string(),
                max_output_tokens: None,
                schema_name: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(result.tier, Tier::JsonFallback);
        assert_eq!(result.result.label, "ok");
        assert_eq!(gateway.call_count(), 3);
        assert_eq!(
            gateway.requests()[2].output_format,
            OutputFormat::JsonObject
        );
    }

    #[tokio::test]
    async fn test_all_tiers_fail() {
        let gateway = ScriptedGateway::new(vec![
            reject("a"),
            reject("b"),
            reject("c"),
        ]);

        let err = invoke_structured::<Sample>(
            &gateway,
            InvokeOptions {
                system: "sys".to_string(),
                user: "user".to_string(),
                max_output_tokens: None,
                schema_name: None,
            },
        )
        .await
        .unwrap_err();

        assert_eq!(err.attempts.len(), 3);
        assert!(err.attempts.iter().all(|a| !a.success));
        assert!(err.final_error.contains("c"));
        assert_eq!(gateway.call_count(), 3);
        assert!(err.summary().contains("tier 3"));
    }

    #[tokio::test]
    async fn test_schema_invalid_payload_falls_through() {
        // Tier 1 returns JSON that parses but violates the score range
        let gateway = ScriptedGateway::new(vec![
            Ok(ScriptedGateway::completed(r#"{"label":"bad","score":9}"#)),
            Ok(ScriptedGateway::completed(r#"{"label":"ok","score":3}"#)),
        ]);

        let result = invoke_structured::<Sample>(
            &gateway,
            InvokeOptions {
                system: "sys".to_string(),
                user: "user".to_string(),
                max_output_tokens: None,
                schema_name: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(result.tier, Tier::Relaxed);
        assert_eq!(result.result.score, 3);
    }

    #[tokio::test]
    async fn test_non_terminal_status_is_failure() {
        let gateway = ScriptedGateway::new(vec![
            Ok(ScriptedGateway::incomplete("max_output_tokens reached")),
            Ok(ScriptedGateway::completed("")),
            Ok(ScriptedGateway::completed("not json at all")),
        ]);

        let err = invoke_structured::<Sample>(
            &gateway,
            InvokeOptions {
                system: "sys".to_string(),
                user: "user".to_string(),
                max_output_tokens: None,
                schema_name: None,
            },
        )
        .await
        .unwrap_err();

        assert_eq!(err.attempts.len(), 3);
        assert!(err.attempts[0]
            .error
            .as_deref()
            .unwrap()
            .contains("incomplete"));
        assert!(err.attempts[1].error.as_deref().unwrap().contains("empty"));
        assert!(err.attempts[2]
            .error
            .as_deref()
            .unwrap()
            .contains("JSON parse failed"));
    }

    #[tokio::test]
    async fn test_usage_comes_from_successful_call_only() {
        let gateway = ScriptedGateway::new(vec![
            reject("down"),
            Ok(ScriptedGateway::completed_with_usage(
                r#"{"label":"ok","score":5}"#,
                TokenUsage {
                    input_tokens: 100,
                    output_tokens: 50,
                    total_tokens: 150,
                },
            )),
        ]);

        let result = invoke_structured::<Sample>(
            &gateway,
            InvokeOptions {
                system: "sys".to_string(),
                user: "user".to_string(),
                max_output_tokens: None,
                schema_name: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(result.tier, Tier::Relaxed);
        assert_eq!(result.usage.total_tokens, 150);
    }
}
