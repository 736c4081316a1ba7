//! Query pipeline configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::chunking::{DEFAULT_MAX_CHUNK_SIZE, SizeUnit};
use crate::error::AgentError;

/// Default provider name.
const DEFAULT_PROVIDER: &str = "anthropic";
/// Default primary model for the Anthropic provider.
const DEFAULT_ANTHROPIC_PRIMARY: &str = "claude-sonnet-4-20250514";
/// Default fallback model for the Anthropic provider.
const DEFAULT_ANTHROPIC_FALLBACK: &str = "claude-3-5-sonnet-20241022";
/// Default primary model for OpenAI-compatible providers.
const DEFAULT_OPENAI_PRIMARY: &str = "gpt-4.1";
/// Default fallback model for OpenAI-compatible providers.
const DEFAULT_OPENAI_FALLBACK: &str = "gpt-4.1-mini";
/// Default final answer word budget.
const DEFAULT_WORD_BUDGET: usize = 500;
/// Default attempts per model before a transient failure becomes terminal.
const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default per-attempt request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 120;
/// Default first backoff delay; doubles on each retry.
const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);
/// Default bound on concurrent chunk requests.
const DEFAULT_MAX_CONCURRENCY: usize = 4;
/// Default max tokens for a per-chunk answer.
const DEFAULT_ANSWER_MAX_TOKENS: u32 = 1500;
/// Default max tokens for the merge request.
const DEFAULT_SYNTHESIS_MAX_TOKENS: u32 = 2048;

/// Configuration for the query pipeline.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// LLM provider name (`anthropic` or `openai`).
    pub provider: String,
    /// API key for the provider.
    pub api_key: String,
    /// Optional base URL override (for proxies or compatible APIs).
    pub base_url: Option<String>,
    /// Model tried first for every request.
    pub primary_model: String,
    /// Model used when the primary reports it is overloaded.
    pub fallback_model: String,
    /// Maximum chunk size, measured in `size_unit`.
    pub max_chunk_size: usize,
    /// Unit for chunk sizes.
    pub size_unit: SizeUnit,
    /// Hard ceiling on final answer length in words.
    pub word_budget: usize,
    /// Attempts per model before a transient failure is terminal.
    pub max_retries: u32,
    /// Timeout for each individual attempt.
    pub timeout: Duration,
    /// Delay before the first retry; doubles per retry, capped at 30s.
    pub backoff_base: Duration,
    /// Maximum concurrent chunk requests (1 = sequential).
    pub max_concurrency: usize,
    /// Maximum tokens for per-chunk answers.
    pub answer_max_tokens: u32,
    /// Maximum tokens for the merge request.
    pub synthesis_max_tokens: u32,
    /// Directory containing prompt template files.
    ///
    /// When set, system prompts are loaded from markdown files in this
    /// directory, falling back to compiled-in defaults for any missing
    /// files.
    pub prompt_dir: Option<PathBuf>,
    /// Minimum delay between API requests per task.
    ///
    /// Applied after acquiring a worker slot. `Duration::ZERO` (default)
    /// disables it.
    pub request_delay: Duration,
}

impl AgentConfig {
    /// Creates a new builder for `AgentConfig`.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key is found.
    pub fn from_env() -> Result<Self, AgentError> {
        Self::builder().from_env().build()
    }
}

/// Builder for [`AgentConfig`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    primary_model: Option<String>,
    fallback_model: Option<String>,
    max_chunk_size: Option<usize>,
    size_unit: Option<SizeUnit>,
    word_budget: Option<usize>,
    max_retries: Option<u32>,
    timeout: Option<Duration>,
    backoff_base: Option<Duration>,
    max_concurrency: Option<usize>,
    answer_max_tokens: Option<u32>,
    synthesis_max_tokens: Option<u32>,
    prompt_dir: Option<PathBuf>,
    request_delay: Option<Duration>,
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

impl AgentConfigBuilder {
    /// Populates unset fields from environment variables.
    ///
    /// The API key is looked up under `DOCQA_API_KEY` first, then the
    /// provider's conventional variable.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = std::env::var("DOCQA_PROVIDER").ok();
        }
        if self.api_key.is_none() {
            let vendor_var = match self.provider.as_deref() {
                Some("openai") => "OPENAI_API_KEY",
                _ => "ANTHROPIC_API_KEY",
            };
            self.api_key = std::env::var("DOCQA_API_KEY")
                .or_else(|_| std::env::var(vendor_var))
                .ok()
                .filter(|k| !k.trim().is_empty());
        }
        if self.base_url.is_none() {
            self.base_url = std::env::var("DOCQA_BASE_URL").ok();
        }
        if self.primary_model.is_none() {
            self.primary_model = std::env::var("DOCQA_PRIMARY_MODEL").ok();
        }
        if self.fallback_model.is_none() {
            self.fallback_model = std::env::var("DOCQA_FALLBACK_MODEL").ok();
        }
        if self.max_chunk_size.is_none() {
            self.max_chunk_size = env_parse("DOCQA_MAX_CHUNK_SIZE");
        }
        if self.size_unit.is_none() {
            self.size_unit = env_parse("DOCQA_SIZE_UNIT");
        }
        if self.word_budget.is_none() {
            self.word_budget = env_parse("DOCQA_WORD_BUDGET");
        }
        if self.max_retries.is_none() {
            self.max_retries = env_parse("DOCQA_MAX_RETRIES");
        }
        if self.timeout.is_none() {
            self.timeout = env_parse("DOCQA_TIMEOUT_SECS").map(Duration::from_secs);
        }
        if self.max_concurrency.is_none() {
            self.max_concurrency = env_parse("DOCQA_MAX_CONCURRENCY");
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = std::env::var("DOCQA_PROMPT_DIR").ok().map(PathBuf::from);
        }
        self
    }

    /// Sets the LLM provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the primary model.
    #[must_use]
    pub fn primary_model(mut self, model: impl Into<String>) -> Self {
        self.primary_model = Some(model.into());
        self
    }

    /// Sets the fallback model.
    #[must_use]
    pub fn fallback_model(mut self, model: impl Into<String>) -> Self {
        self.fallback_model = Some(model.into());
        self
    }

    /// Sets the maximum chunk size.
    #[must_use]
    pub const fn max_chunk_size(mut self, n: usize) -> Self {
        self.max_chunk_size = Some(n);
        self
    }

    /// Sets the chunk size unit.
    #[must_use]
    pub const fn size_unit(mut self, unit: SizeUnit) -> Self {
        self.size_unit = Some(unit);
        self
    }

    /// Sets the final answer word budget.
    #[must_use]
    pub const fn word_budget(mut self, n: usize) -> Self {
        self.word_budget = Some(n);
        self
    }

    /// Sets the attempts per model.
    #[must_use]
    pub const fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = Some(n);
        self
    }

    /// Sets the per-attempt timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets the first backoff delay.
    #[must_use]
    pub const fn backoff_base(mut self, delay: Duration) -> Self {
        self.backoff_base = Some(delay);
        self
    }

    /// Sets the maximum concurrency.
    #[must_use]
    pub const fn max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = Some(n);
        self
    }

    /// Sets the per-chunk answer max tokens.
    #[must_use]
    pub const fn answer_max_tokens(mut self, n: u32) -> Self {
        self.answer_max_tokens = Some(n);
        self
    }

    /// Sets the merge request max tokens.
    #[must_use]
    pub const fn synthesis_max_tokens(mut self, n: u32) -> Self {
        self.synthesis_max_tokens = Some(n);
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Sets the minimum delay between API requests per task.
    #[must_use]
    pub const fn request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = Some(delay);
        self
    }

    /// Builds the [`AgentConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key was set.
    pub fn build(self) -> Result<AgentConfig, AgentError> {
        let api_key = self.api_key.ok_or(AgentError::ApiKeyMissing)?;
        let provider = self
            .provider
            .unwrap_or_else(|| DEFAULT_PROVIDER.to_string());
        let (default_primary, default_fallback) = if provider == "openai" {
            (DEFAULT_OPENAI_PRIMARY, DEFAULT_OPENAI_FALLBACK)
        } else {
            (DEFAULT_ANTHROPIC_PRIMARY, DEFAULT_ANTHROPIC_FALLBACK)
        };

        Ok(AgentConfig {
            provider,
            api_key,
            base_url: self.base_url,
            primary_model: self
                .primary_model
                .unwrap_or_else(|| default_primary.to_string()),
            fallback_model: self
                .fallback_model
                .unwrap_or_else(|| default_fallback.to_string()),
            max_chunk_size: self.max_chunk_size.unwrap_or(DEFAULT_MAX_CHUNK_SIZE),
            size_unit: self.size_unit.unwrap_or_default(),
            word_budget: self.word_budget.unwrap_or(DEFAULT_WORD_BUDGET),
            max_retries: self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES).max(1),
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            backoff_base: self.backoff_base.unwrap_or(DEFAULT_BACKOFF_BASE),
            max_concurrency: self
                .max_concurrency
                .unwrap_or(DEFAULT_MAX_CONCURRENCY)
                .max(1),
            answer_max_tokens: self
                .answer_max_tokens
                .unwrap_or(DEFAULT_ANSWER_MAX_TOKENS),
            synthesis_max_tokens: self
                .synthesis_max_tokens
                .unwrap_or(DEFAULT_SYNTHESIS_MAX_TOKENS),
            prompt_dir: self.prompt_dir,
            request_delay: self.request_delay.unwrap_or(Duration::ZERO),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = AgentConfig::builder()
            .api_key("test-key")
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.provider, "anthropic");
        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.primary_model, DEFAULT_ANTHROPIC_PRIMARY);
        assert_eq!(config.fallback_model, DEFAULT_ANTHROPIC_FALLBACK);
        assert_eq!(config.word_budget, 500);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert_eq!(config.max_chunk_size, DEFAULT_MAX_CHUNK_SIZE);
        assert_eq!(config.size_unit, SizeUnit::Chars);
    }

    #[test]
    fn test_builder_missing_api_key() {
        let result = AgentConfig::builder().build();
        assert!(matches!(result, Err(AgentError::ApiKeyMissing)));
    }

    #[test]
    fn test_openai_model_defaults() {
        let config = AgentConfig::builder()
            .api_key("k")
            .provider("openai")
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.primary_model, DEFAULT_OPENAI_PRIMARY);
        assert_eq!(config.fallback_model, DEFAULT_OPENAI_FALLBACK);
    }

    #[test]
    fn test_builder_custom_values() {
        let config = AgentConfig::builder()
            .api_key("key")
            .primary_model("model-a")
            .fallback_model("model-b")
            .max_chunk_size(5000)
            .size_unit(SizeUnit::Tokens)
            .word_budget(250)
            .max_concurrency(0)
            .max_retries(0)
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.primary_model, "model-a");
        assert_eq!(config.fallback_model, "model-b");
        assert_eq!(config.max_chunk_size, 5000);
        assert_eq!(config.size_unit, SizeUnit::Tokens);
        assert_eq!(config.word_budget, 250);
        // Zero would stall the pool or skip the request entirely
        assert_eq!(config.max_concurrency, 1);
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }
}
