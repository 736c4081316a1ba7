//! Pluggable LLM provider trait.
//!
//! Implementations translate provider-agnostic [`ChatRequest`]/[`ChatResponse`]
//! into provider-specific calls and classify every failure as a
//! [`ProviderError`]. Retry, fallback, and timeouts live above this layer
//! in the model client.

use async_trait::async_trait;

use super::message::{ChatRequest, ChatResponse};
use crate::error::ProviderError;

/// Trait for LLM provider backends.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., `"openai"`, `"anthropic"`).
    fn name(&self) -> &'static str;

    /// Executes one chat completion request, without retrying.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Overloaded`] when the model reports
    /// overload, [`ProviderError::Transient`] for failures worth retrying,
    /// and [`ProviderError::Fatal`] otherwise.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError>;
}
