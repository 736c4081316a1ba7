//! Orchestrator for the plan, fan-out, collect, synthesize pipeline.
//!
//! Coordinates the full query: plan chunks → query every chunk
//! concurrently → collect ordered results → synthesize the final answer.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::info;

use super::collector::{CollectOptions, collect};
use super::config::AgentConfig;
use super::model_client::ModelClient;
use super::outcome::FinalAnswer;
use super::prompt::PromptSet;
use super::provider::LlmProvider;
use super::synthesizer::{Synthesizer, SynthesizerAgent};
use crate::chunking::{Chunk, plan_with_unit};
use crate::core::ArticleRecord;
use crate::error::AgentError;

/// Longest accepted question, in bytes.
const MAX_QUESTION_LEN: usize = 10_000;

/// Orchestrates the chunked question-answering workflow.
pub struct Orchestrator {
    client: Arc<ModelClient>,
    config: AgentConfig,
    prompts: PromptSet,
    cancel: CancellationToken,
}

impl Orchestrator {
    /// Creates a new orchestrator with the given provider and configuration.
    ///
    /// Loads prompt templates from the directory specified in
    /// [`AgentConfig::prompt_dir`], falling back to compiled-in defaults.
    pub fn new(provider: Arc<dyn LlmProvider>, config: AgentConfig) -> Self {
        let prompts = PromptSet::load(config.prompt_dir.as_deref());
        Self::with_prompts(provider, config, prompts)
    }

    /// Creates an orchestrator with an explicit prompt set.
    pub fn with_prompts(
        provider: Arc<dyn LlmProvider>,
        config: AgentConfig,
        prompts: PromptSet,
    ) -> Self {
        let client = Arc::new(ModelClient::new(provider, &config, prompts.subcall.clone()));
        Self {
            client,
            config,
            prompts,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that cancels chunk requests and the merge when fired.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Plans chunks for `articles` with the configured budget and unit.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::EmptyCorpus`] if `articles` is empty.
    pub fn plan(&self, articles: Vec<ArticleRecord>) -> Result<Vec<Chunk>, AgentError> {
        plan_with_unit(articles, self.config.max_chunk_size, self.config.size_unit)
    }

    /// Executes the full query pipeline.
    ///
    /// # Steps
    ///
    /// 1. Plan whole-article chunks
    /// 2. Fan out one model request per chunk
    /// 3. Collect results in chunk order
    /// 4. Synthesize the final answer within the word budget
    ///
    /// # Errors
    ///
    /// - [`AgentError::Orchestration`] for an empty or oversized question
    /// - [`AgentError::EmptyCorpus`] if there are no articles
    /// - [`AgentError::AllChunksFailed`] if no chunk produced an answer
    pub async fn query(
        &self,
        articles: Vec<ArticleRecord>,
        question: &str,
    ) -> Result<FinalAnswer, AgentError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AgentError::Orchestration {
                message: "Question cannot be empty".to_string(),
            });
        }
        if question.len() > MAX_QUESTION_LEN {
            return Err(AgentError::Orchestration {
                message: format!(
                    "Question exceeds maximum length ({} bytes, max {MAX_QUESTION_LEN})",
                    question.len()
                ),
            });
        }

        let start = Instant::now();
        let article_count = articles.len();
        let chunks = self.plan(articles)?;
        info!(
            articles = article_count,
            chunks = chunks.len(),
            oversized = chunks.iter().filter(|c| c.oversized).count(),
            max_chunk_size = self.config.max_chunk_size,
            unit = %self.config.size_unit,
            "planned chunks"
        );

        let options = CollectOptions {
            max_concurrency: self.config.max_concurrency,
            request_delay: self.config.request_delay,
        };
        let results = collect(
            Arc::from(chunks),
            question,
            &self.client,
            options,
            &self.cancel,
        )
        .await?;

        let agent = SynthesizerAgent::new(&self.config, self.prompts.synthesizer.clone());
        let mut answer = Synthesizer::new(&self.client, agent)
            .with_cancellation(self.cancel.clone())
            .synthesize(&results, question, self.config.word_budget)
            .await?;

        answer.technical_summary.elapsed = start.elapsed();
        info!(
            words = answer.technical_summary.word_count,
            mode = %answer.technical_summary.synthesis_mode,
            truncated = answer.technical_summary.truncated,
            tokens = answer.technical_summary.total_tokens,
            elapsed_ms = u64::try_from(answer.technical_summary.elapsed.as_millis()).unwrap_or(u64::MAX),
            "query complete"
        );
        Ok(answer)
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("client", &self.client)
            .field("config", &self.config)
            .field("prompts", &self.prompts)
            .finish_non_exhaustive()
    }
}
