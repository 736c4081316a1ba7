//! Anthropic Messages API provider over `reqwest`.
//!
//! Speaks the `/v1/messages` endpoint directly. HTTP statuses and API
//! error types are classified into [`ProviderError`] tags by
//! [`classify_status`].

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::agent::config::AgentConfig;
use crate::agent::message::{ChatRequest, ChatResponse, Role, TokenUsage};
use crate::agent::provider::LlmProvider;
use crate::error::ProviderError;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 1024;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Anthropic Claude provider.
pub struct AnthropicProvider {
    http: Client,
    api_key: String,
    endpoint: String,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    message: String,
}

impl AnthropicProvider {
    /// Creates a new provider from agent configuration.
    #[must_use]
    pub fn new(config: &AgentConfig) -> Self {
        let base = config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/');
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http,
            api_key: config.api_key.clone(),
            endpoint: format!("{base}/v1/messages"),
        }
    }

    fn build_body(request: &ChatRequest) -> MessagesRequest<'_> {
        let messages = request
            .messages
            .iter()
            .filter_map(|m| {
                let role = match m.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                    Role::System => return None,
                };
                Some(WireMessage {
                    role,
                    content: &m.content,
                })
            })
            .collect();

        MessagesRequest {
            model: &request.model,
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system: request.system_text(),
            messages,
            temperature: request.temperature,
        }
    }

    fn parse_response(body: MessagesResponse) -> ChatResponse {
        let content = body
            .content
            .into_iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text)
            .collect::<Vec<_>>()
            .join("");
        let usage = body.usage.map_or_else(TokenUsage::default, |u| TokenUsage {
            prompt_tokens: u.input_tokens,
            completion_tokens: u.output_tokens,
            total_tokens: u.input_tokens.saturating_add(u.output_tokens),
        });
        ChatResponse {
            content,
            usage,
            finish_reason: body.stop_reason,
        }
    }
}

/// Classifies a non-success HTTP status and optional API error type.
///
/// `529`, `503`, and any `overloaded_error` body mean the model is
/// overloaded. Rate limits, request timeouts, conflicts, and other
/// server errors are transient. Everything else, authentication
/// included, is fatal.
pub fn classify_status(
    status: u16,
    error_type: Option<&str>,
    message: String,
    model: &str,
) -> ProviderError {
    if error_type == Some("overloaded_error") || matches!(status, 503 | 529) {
        return ProviderError::Overloaded {
            model: model.to_string(),
            message,
        };
    }
    let status_code = Some(status);
    match status {
        408 | 409 | 429 | 500..=599 => ProviderError::Transient {
            message,
            status: status_code,
        },
        _ => ProviderError::Fatal {
            message,
            status: status_code,
        },
    }
}

fn classify_transport(err: &reqwest::Error) -> ProviderError {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        ProviderError::transient(err.to_string())
    } else if err.is_decode() {
        ProviderError::fatal(format!("malformed response: {err}"))
    } else {
        ProviderError::transient(err.to_string())
    }
}

impl std::fmt::Debug for AnthropicProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicProvider")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let body = Self::build_body(request);

        let response = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|e| format!("{status} (response body unreadable: {e})"));
            let parsed = serde_json::from_str::<ErrorEnvelope>(&text).ok();
            let error_type = parsed.as_ref().map(|e| e.error.kind.as_str());
            let message = parsed
                .as_ref()
                .map_or_else(|| text.clone(), |e| e.error.message.clone());
            return Err(classify_status(
                status.as_u16(),
                error_type,
                message,
                &request.model,
            ));
        }

        // A body cut off mid-transfer is a network failure; only a body
        // that arrived whole and does not parse is malformed.
        let bytes = response.bytes().await.map_err(|e| ProviderError::Transient {
            message: format!("failed to read response body: {e}"),
            status: Some(status.as_u16()),
        })?;
        let parsed: MessagesResponse = serde_json::from_slice(&bytes)
            .map_err(|e| ProviderError::fatal(format!("malformed response: {e}")))?;

        Ok(Self::parse_response(parsed))
    }
}
