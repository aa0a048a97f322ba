//! Responses API adapter
//!
//! Implements the [`LlmGateway`] port against the OpenAI Responses API as
//! hosted on Azure (`https://{resource}.openai.azure.com/openai/v1/responses`).
//! The deployment targets reasoning models, which constrains the request
//! body: `max_output_tokens` (not `max_completion_tokens`), and no
//! `temperature` or `top_p` parameters.
//!
//! Failed HTTP responses keep the status code and body text in
//! [`GatewayError::RequestFailed`]; the content safety screener inspects
//! both to recognize the platform's own filter rejections.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use tribunal_application::{
    GatewayError, LlmGateway, LlmRequest, LlmResponse, OutputFormat, ResponseStatus, TokenUsage,
};

/// Default HTTP timeout; individual use cases apply tighter deadlines
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(120);

/// Errors constructing the adapter (not per-request failures)
#[derive(Error, Debug)]
pub enum GatewaySetupError {
    #[error("API key environment variable {0} is not set")]
    MissingApiKey(String),

    #[error("API key contains characters not valid in an HTTP header")]
    InvalidApiKey,

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Responses API adapter for the [`LlmGateway`] port
#[derive(Debug, Clone)]
pub struct ResponsesGateway {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl ResponsesGateway {
    /// Create with explicit configuration
    pub fn with_config(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GatewaySetupError> {
        let api_key = api_key.into();
        let base_url = base_url.into();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut auth_value = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|_| GatewaySetupError::InvalidApiKey)?;
        auth_value.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_value);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    /// Create by reading the API key from the given environment variable
    pub fn from_env(
        api_key_env: &str,
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GatewaySetupError> {
        let api_key = std::env::var(api_key_env)
            .map_err(|_| GatewaySetupError::MissingApiKey(api_key_env.to_string()))?;
        Self::with_config(api_key, base_url, model, timeout)
    }

    fn responses_url(&self) -> String {
        format!("{}/responses", self.base_url)
    }
}

// =============================================================================
// API TYPES
// =============================================================================

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    instructions: &'a str,
    input: &'a str,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<TextConfig>,
}

#[derive(Serialize)]
struct TextConfig {
    format: FormatSpec,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum FormatSpec {
    JsonObject,
    JsonSchema {
        name: String,
        schema: serde_json::Value,
        strict: bool,
    },
}

impl TextConfig {
    fn from_output_format(format: OutputFormat) -> Option<TextConfig> {
        match format {
            OutputFormat::Text => None,
            OutputFormat::JsonObject => Some(TextConfig {
                format: FormatSpec::JsonObject,
            }),
            OutputFormat::JsonSchema {
                name,
                schema,
                strict,
            } => Some(TextConfig {
                format: FormatSpec::JsonSchema {
                    name,
                    schema,
                    strict,
                },
            }),
        }
    }
}

#[derive(Deserialize)]
struct ApiResponse {
    status: Option<ResponseStatus>,
    /// SDK-style convenience field; not all deployments emit it
    output_text: Option<String>,
    output: Option<Vec<OutputItem>>,
    usage: Option<ApiUsage>,
    incomplete_details: Option<IncompleteDetails>,
}

#[derive(Deserialize)]
struct OutputItem {
    #[serde(rename = "type")]
    kind: Option<String>,
    content: Option<Vec<ContentPart>>,
}

#[derive(Deserialize)]
struct ContentPart {
    #[serde(rename = "type")]
    kind: Option<String>,
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiUsage {
    input_tokens: Option<u64>,
    output_tokens: Option<u64>,
    total_tokens: Option<u64>,
}

#[derive(Deserialize)]
struct IncompleteDetails {
    reason: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct ApiError {
    message: Option<String>,
    code: Option<String>,
}

/// Collect the visible output text from a parsed response
///
/// Prefers the convenience `output_text` field; otherwise concatenates the
/// `output_text` content parts of message items, skipping reasoning items.
fn extract_output_text(body: &ApiResponse) -> String {
    if let Some(text) = &body.output_text {
        if !text.is_empty() {
            return text.clone();
        }
    }

    body.output
        .iter()
        .flatten()
        .filter(|item| item.kind.as_deref() == Some("message"))
        .flat_map(|item| item.content.iter().flatten())
        .filter(|part| part.kind.as_deref() == Some("output_text"))
        .filter_map(|part| part.text.as_deref())
        .collect()
}

/// Compose the failure message from an error response body
///
/// Keeps the API error code in the message so downstream checks (content
/// filter detection) can match on it; falls back to the raw body.
fn error_message(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(error) = parsed.error {
            let message = error.message.unwrap_or_default();
            return match error.code {
                Some(code) if !code.is_empty() => format!("{code}: {message}"),
                _ => message,
            };
        }
    }
    body.to_string()
}

fn map_transport_error(error: reqwest::Error) -> GatewayError {
    if error.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Connection(error.to_string())
    }
}

#[async_trait]
impl LlmGateway for ResponsesGateway {
    async fn invoke(&self, request: LlmRequest) -> Result<LlmResponse, GatewayError> {
        let api_request = ApiRequest {
            model: &self.model,
            instructions: &request.instructions,
            input: &request.input,
            max_output_tokens: request.max_output_tokens,
            text: TextConfig::from_output_format(request.output_format),
        };

        debug!(
            model = %self.model,
            max_output_tokens = api_request.max_output_tokens,
            "sending responses api request"
        );

        let response = self
            .client
            .post(self.responses_url())
            .json(&api_request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(map_transport_error)?;

        if !status.is_success() {
            return Err(GatewayError::RequestFailed {
                status: Some(status.as_u16()),
                message: error_message(&body),
            });
        }

        let parsed: ApiResponse = serde_json::from_str(&body)
            .map_err(|e| GatewayError::InvalidResponse(format!("malformed response body: {e}")))?;

        let response_status = parsed
            .status
            .clone()
            .ok_or_else(|| GatewayError::InvalidResponse("missing status field".to_string()))?;

        let usage = parsed
            .usage
            .as_ref()
            .map(|u| TokenUsage {
                input_tokens: u.input_tokens.unwrap_or(0),
                output_tokens: u.output_tokens.unwrap_or(0),
                total_tokens: u.total_tokens.unwrap_or(0),
            })
            .unwrap_or_default();

        let output_text = extract_output_text(&parsed);

        Ok(LlmResponse {
            status: response_status,
            output_text,
            usage,
            incomplete_details: parsed.incomplete_details.and_then(|d| d.reason),
        })
    }
}
