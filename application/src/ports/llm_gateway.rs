//! LLM gateway port
//!
//! Defines the narrow, normalized interface for the LLM API boundary.
//! Call sites never branch on SDK- or vendor-specific response variants:
//! every adapter maps its wire format into [`LlmResponse`] and its failures
//! into [`GatewayError`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur at the LLM API boundary
#[derive(Error, Debug, Clone)]
pub enum GatewayError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("request failed: {message}")]
    RequestFailed { status: Option<u16>, message: String },

    #[error("request timed out")]
    Timeout,

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl GatewayError {
    /// Whether this error is the hosting platform's own content-filter
    /// rejection: a 400-class status whose message carries a known
    /// filter-violation marker.
    pub fn is_content_filter(&self) -> bool {
        match self {
            GatewayError::RequestFailed {
                status: Some(status),
                message,
            } => {
                (400..500).contains(status)
                    && (message.contains("content_filter")
                        || message.contains("ResponsibleAIPolicyViolation"))
            }
            _ => false,
        }
    }
}

/// Output-format constraint requested from the LLM API
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputFormat {
    /// Plain text, no constraint
    Text,
    /// Generic JSON output, no schema enforcement server-side
    JsonObject,
    /// Schema-validated generation; `strict` requests hard conformance
    JsonSchema {
        name: String,
        schema: serde_json::Value,
        strict: bool,
    },
}

/// One request to the LLM API
#[derive(Debug, Clone)]
pub struct LlmRequest {
    /// System prompt / instructions
    pub instructions: String,
    /// User input
    pub input: String,
    /// Output-format constraint
    pub output_format: OutputFormat,
    /// Output token ceiling (reasoning tokens count against it)
    pub max_output_tokens: u32,
}

/// Terminal status of an LLM API response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Completed,
    Incomplete,
    #[serde(untagged)]
    Other(String),
}

impl ResponseStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, ResponseStatus::Completed)
    }

    pub fn as_str(&self) -> &str {
        match self {
            ResponseStatus::Completed => "completed",
            ResponseStatus::Incomplete => "incomplete",
            ResponseStatus::Other(s) => s,
        }
    }
}

/// Token usage reported by the LLM API
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

/// Normalized LLM API response
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub status: ResponseStatus,
    pub output_text: String,
    pub usage: TokenUsage,
    /// Detail supplied by the API when `status` is not terminal
    pub incomplete_details: Option<String>,
}

/// Gateway for LLM communication
///
/// This port is the sole suspension point of the grading pipeline.
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Issue one blocking request/response call
    async fn invoke(&self, request: LlmRequest) -> Result<LlmResponse, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_filter_detection() {
        let filtered = GatewayError::RequestFailed {
            status: Some(400),
            message: "content_filter triggered by input".to_string(),
        };
        assert!(filtered.is_content_filter());

        let policy = GatewayError::RequestFailed {
            status: Some(400),
            message: "ResponsibleAIPolicyViolation: blocked".to_string(),
        };
        assert!(policy.is_content_filter());
    }

    #[test]
    fn test_non_filter_errors_not_matched() {
        let rate_limited = GatewayError::RequestFailed {
            status: Some(429),
            message: "rate limit exceeded".to_string(),
        };
        assert!(!rate_limited.is_content_filter());

        let server_side = GatewayError::RequestFailed {
            status: Some(500),
            message: "content_filter mention in a 500 body".to_string(),
        };
        assert!(!server_side.is_content_filter());

        assert!(!GatewayError::Timeout.is_content_filter());
        assert!(!GatewayError::Connection("refused".to_string()).is_content_filter());
    }

    #[test]
    fn test_response_status() {
        assert!(ResponseStatus::Completed.is_completed());
        assert!(!ResponseStatus::Incomplete.is_completed());
        assert_eq!(
            ResponseStatus::Other("in_progress".to_string()).as_str(),
            "in_progress"
        );
    }
}
