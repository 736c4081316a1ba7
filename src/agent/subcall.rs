//! Subcall agent that answers the question for a single chunk.

use super::config::AgentConfig;
use super::traits::Agent;

/// Agent that answers the question from one chunk's articles.
///
/// The collector fans out one request per chunk through this agent.
pub struct SubcallAgent {
    max_tokens: u32,
    system_prompt: String,
}

impl SubcallAgent {
    /// Creates a new subcall agent with the given configuration and system prompt.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            max_tokens: config.answer_max_tokens,
            system_prompt,
        }
    }
}

impl Agent for SubcallAgent {
    fn name(&self) -> &'static str {
        "subcall"
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}
