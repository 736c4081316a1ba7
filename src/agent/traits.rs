//! Agent trait definition.
//!
//! Both agents (subcall, synthesizer) implement this trait. An agent fixes
//! the system prompt and sampling settings; the model client picks the
//! model and owns retries.

use super::message::{ChatRequest, system_message, user_message};

/// Trait implemented by all agents in the system.
pub trait Agent: Send + Sync {
    /// Agent name for logging and identification.
    fn name(&self) -> &'static str;

    /// System prompt that defines the agent's role and behavior.
    fn system_prompt(&self) -> &str;

    /// Sampling temperature (0.0 = deterministic).
    fn temperature(&self) -> f32 {
        0.0
    }

    /// Maximum tokens for the response.
    fn max_tokens(&self) -> u32 {
        2048
    }

    /// Builds the request sent to `model` for one user message.
    fn build_request(&self, model: &str, user_msg: &str) -> ChatRequest {
        ChatRequest {
            model: model.to_string(),
            messages: vec![system_message(self.system_prompt()), user_message(user_msg)],
            temperature: Some(self.temperature()),
            max_tokens: Some(self.max_tokens()),
        }
    }
}
