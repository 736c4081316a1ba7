//! Model client with primary/fallback models and retry with backoff.
//!
//! Every request goes to the primary model first. An overload report
//! switches to the fallback model immediately, without waiting. Transient
//! failures are retried on the same model with exponential backoff.
//! Fatal failures and malformed responses are returned at once.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::config::AgentConfig;
use super::message::ChatResponse;
use super::outcome::{ChunkAnswer, ModelTier};
use super::prompt::build_subcall_prompt;
use super::provider::LlmProvider;
use super::subcall::SubcallAgent;
use super::traits::Agent;
use crate::chunking::Chunk;
use crate::error::{AgentError, ProviderError};

/// Upper bound on a single backoff delay.
pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Why one model could not produce an answer.
enum TierFailure {
    /// The model reported overload.
    Overloaded { message: String },
    /// Terminal failure for this request.
    Failed(AgentError),
}

/// Sends requests through an [`LlmProvider`] with fallback and retry.
///
/// Shared across collector tasks behind an `Arc`. Answers are cached per
/// request content, so asking the same chunk the same question twice in a
/// run issues one model call.
pub struct ModelClient {
    provider: Arc<dyn LlmProvider>,
    subcall: SubcallAgent,
    primary_model: String,
    fallback_model: String,
    max_retries: u32,
    timeout: Duration,
    backoff_base: Duration,
    word_budget: usize,
    cache: Mutex<HashMap<u64, ChunkAnswer>>,
}

impl ModelClient {
    /// Creates a client using `subcall_prompt` as the per-chunk system prompt.
    pub fn new(provider: Arc<dyn LlmProvider>, config: &AgentConfig, subcall_prompt: String) -> Self {
        Self {
            provider,
            subcall: SubcallAgent::new(config, subcall_prompt),
            primary_model: config.primary_model.clone(),
            fallback_model: config.fallback_model.clone(),
            max_retries: config.max_retries.max(1),
            timeout: config.timeout,
            backoff_base: config.backoff_base,
            word_budget: config.word_budget,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Asks `question` of one chunk's articles.
    ///
    /// # Errors
    ///
    /// - [`AgentError::ModelOverloaded`] if both models report overload
    /// - [`AgentError::ChunkTransient`] if transient failures outlast the retries
    /// - [`AgentError::ChunkFailed`] on a fatal failure or empty response
    pub async fn query(&self, chunk: &Chunk, question: &str) -> Result<ChunkAnswer, AgentError> {
        let user_msg = build_subcall_prompt(question, chunk, self.word_budget);
        debug!(
            chunk = chunk.index,
            articles = chunk.articles.len(),
            prompt_chars = user_msg.len(),
            "querying chunk"
        );
        self.complete(&self.subcall, &user_msg).await
    }

    /// Runs `agent` on `user_msg` with fallback and retry.
    ///
    /// # Errors
    ///
    /// Same as [`ModelClient::query`].
    pub async fn complete(&self, agent: &dyn Agent, user_msg: &str) -> Result<ChunkAnswer, AgentError> {
        let key = cache_key(agent, user_msg);
        if let Some(hit) = self.cached(key) {
            debug!(agent = agent.name(), "answer served from cache");
            return Ok(hit);
        }

        let (response, tier, model) = match self.run_model(agent, user_msg, &self.primary_model).await {
            Ok(response) => (response, ModelTier::Primary, &self.primary_model),
            Err(TierFailure::Failed(e)) => return Err(e),
            Err(TierFailure::Overloaded { message }) => {
                warn!(
                    agent = agent.name(),
                    primary = %self.primary_model,
                    fallback = %self.fallback_model,
                    reason = %message,
                    "primary model overloaded, switching to fallback"
                );
                match self.run_model(agent, user_msg, &self.fallback_model).await {
                    Ok(response) => (response, ModelTier::Fallback, &self.fallback_model),
                    Err(TierFailure::Failed(e)) => return Err(e),
                    Err(TierFailure::Overloaded { .. }) => {
                        return Err(AgentError::ModelOverloaded {
                            model: self.fallback_model.clone(),
                        });
                    }
                }
            }
        };

        let answer = ChunkAnswer {
            text: response.content.trim().to_string(),
            model_used: tier,
            model: model.clone(),
            usage: response.usage,
        };
        info!(
            agent = agent.name(),
            model = %answer.model,
            tier = %tier,
            tokens = answer.usage.total_tokens,
            "model answered"
        );

        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, answer.clone());
        }
        Ok(answer)
    }

    fn cached(&self, key: u64) -> Option<ChunkAnswer> {
        self.cache.lock().ok().and_then(|c| c.get(&key).cloned())
    }

    /// Attempts one model until success, overload, or a terminal failure.
    async fn run_model(
        &self,
        agent: &dyn Agent,
        user_msg: &str,
        model: &str,
    ) -> Result<ChatResponse, TierFailure> {
        let request = agent.build_request(model, user_msg);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let outcome = match tokio::time::timeout(self.timeout, self.provider.chat(&request)).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::transient(format!(
                    "no response within {}s",
                    self.timeout.as_secs_f64()
                ))),
            };

            match outcome {
                Ok(response) if response.content.trim().is_empty() => {
                    return Err(TierFailure::Failed(AgentError::ChunkFailed {
                        model: model.to_string(),
                        message: "model returned an empty response".to_string(),
                    }));
                }
                Ok(response) => return Ok(response),
                Err(ProviderError::Overloaded { message, .. }) => {
                    return Err(TierFailure::Overloaded { message });
                }
                Err(e @ ProviderError::Fatal { .. }) => {
                    warn!(agent = agent.name(), model, error = %e, "request failed, not retrying");
                    return Err(TierFailure::Failed(AgentError::ChunkFailed {
                        model: model.to_string(),
                        message: e.to_string(),
                    }));
                }
                Err(e @ ProviderError::Transient { .. }) => {
                    if attempt >= self.max_retries {
                        warn!(agent = agent.name(), model, attempt, error = %e, "retries exhausted");
                        return Err(TierFailure::Failed(AgentError::ChunkTransient {
                            attempts: attempt,
                            model: model.to_string(),
                            message: e.to_string(),
                        }));
                    }
                    let delay = self.backoff_delay(attempt);
                    warn!(
                        agent = agent.name(),
                        model,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "transient failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Delay before the retry that follows failed attempt number `attempt`.
    ///
    /// Doubles from the configured base and never exceeds [`MAX_BACKOFF`].
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.backoff_base
            .saturating_mul(1u32 << exponent)
            .min(MAX_BACKOFF)
    }
}

fn cache_key(agent: &dyn Agent, user_msg: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    agent.name().hash(&mut hasher);
    agent.system_prompt().hash(&mut hasher);
    user_msg.hash(&mut hasher);
    hasher.finish()
}

impl std::fmt::Debug for ModelClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelClient")
            .field("provider", &self.provider.name())
            .field("primary_model", &self.primary_model)
            .field("fallback_model", &self.fallback_model)
            .field("max_retries", &self.max_retries)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
