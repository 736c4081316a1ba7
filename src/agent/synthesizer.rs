//! Synthesis of chunk answers into one budgeted final answer.
//!
//! A single successful chunk is used as-is. Several are merged through the
//! synthesizer agent; a merge that overruns the word budget is re-requested
//! once with an explicit reminder. If merging fails, the chunk answers are
//! concatenated verbatim and the summary says so. Whatever path is taken,
//! the final text is cut to the budget at a sentence boundary.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::config::AgentConfig;
use super::message::TokenUsage;
use super::model_client::ModelClient;
use super::outcome::{
    ChunkAnswer, ChunkResult, FinalAnswer, ModelTier, SynthesisInput, SynthesisMode,
    TechnicalSummary,
};
use super::prompt::{PartialAnswer, build_budget_reminder_prompt, build_synthesizer_prompt};
use super::traits::Agent;
use crate::core::{has_citation, truncate_to_word_budget, word_count};
use crate::error::AgentError;

/// Agent that merges partial answers into a final response.
pub struct SynthesizerAgent {
    max_tokens: u32,
    system_prompt: String,
}

impl SynthesizerAgent {
    /// Creates a new synthesizer agent with the given configuration and system prompt.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            max_tokens: config.synthesis_max_tokens,
            system_prompt,
        }
    }
}

impl Agent for SynthesizerAgent {
    fn name(&self) -> &'static str {
        "synthesizer"
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

/// Separator between chunk answers in the concatenation fallback.
const CONCAT_SEPARATOR: &str = "\n\n";

/// Turns ordered chunk results into a [`FinalAnswer`].
pub struct Synthesizer<'a> {
    client: &'a ModelClient,
    agent: SynthesizerAgent,
    cancel: Option<CancellationToken>,
}

/// Text and bookkeeping produced before truncation.
struct Draft {
    text: String,
    mode: SynthesisMode,
    model: Option<ModelTier>,
    error: Option<String>,
    rerequested: bool,
    usage: TokenUsage,
}

impl<'a> Synthesizer<'a> {
    /// Creates a synthesizer that merges through `client`.
    pub const fn new(client: &'a ModelClient, agent: SynthesizerAgent) -> Self {
        Self {
            client,
            agent,
            cancel: None,
        }
    }

    /// Abandons merge requests when `token` fires.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Produces the final answer for `question` within `word_budget` words.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::AllChunksFailed`] when `results` holds no
    /// success. Merge failures do not error; they fall back to
    /// concatenation.
    pub async fn synthesize(
        &self,
        results: &[ChunkResult],
        question: &str,
        word_budget: usize,
    ) -> Result<FinalAnswer, AgentError> {
        let input = SynthesisInput::from_results(results);
        let mut summary = TechnicalSummary::from_results(results, word_budget);

        if input.successes.is_empty() {
            return Err(AgentError::AllChunksFailed {
                total: results.len(),
                reasons: summary.failure_reasons(),
            });
        }
        if !input.failures.is_empty() {
            info!(
                excluded = input.failures.len(),
                "synthesizing without failed chunks"
            );
        }

        let draft = if let [only] = input.successes.as_slice() {
            Draft {
                text: only.answer_text.clone().unwrap_or_default(),
                mode: SynthesisMode::Single,
                model: None,
                error: None,
                rerequested: false,
                usage: TokenUsage::default(),
            }
        } else {
            self.merge(&input, question, word_budget).await
        };

        let truncation = truncate_to_word_budget(&draft.text, word_budget);
        if truncation.truncated {
            warn!(
                words = word_count(&draft.text),
                budget = word_budget,
                "answer truncated to word budget"
            );
        }

        summary.synthesis_mode = draft.mode;
        summary.synthesis_model = draft.model;
        summary.synthesis_failed = draft.mode == SynthesisMode::Concatenated;
        summary.synthesis_error = draft.error;
        summary.budget_rerequested = draft.rerequested;
        summary.truncated = truncation.truncated;
        summary.word_count = word_count(&truncation.text);
        summary.total_tokens = summary.total_tokens.saturating_add(draft.usage.total_tokens);

        Ok(FinalAnswer {
            citations_present: has_citation(&truncation.text),
            text: truncation.text,
            technical_summary: summary,
        })
    }

    async fn merge(&self, input: &SynthesisInput<'_>, question: &str, word_budget: usize) -> Draft {
        let partials: Vec<PartialAnswer<'_>> = input
            .successes
            .iter()
            .map(|r| PartialAnswer {
                chunk_index: r.chunk_index,
                text: r.answer_text.as_deref().unwrap_or_default(),
            })
            .collect();
        let merge_prompt = build_synthesizer_prompt(question, &partials, word_budget);

        let merged = match self.ask(&merge_prompt).await {
            Ok(answer) => answer,
            Err(e) => {
                let error = AgentError::SynthesisFailed {
                    message: e.to_string(),
                };
                warn!(error = %error, "merge failed, concatenating chunk answers");
                let text = partials
                    .iter()
                    .map(|p| p.text.trim())
                    .collect::<Vec<_>>()
                    .join(CONCAT_SEPARATOR);
                return Draft {
                    text,
                    mode: SynthesisMode::Concatenated,
                    model: None,
                    error: Some(error.to_string()),
                    rerequested: false,
                    usage: TokenUsage::default(),
                };
            }
        };

        let mut usage = merged.usage;
        let words = word_count(&merged.text);
        if words <= word_budget {
            return Draft {
                text: merged.text,
                mode: SynthesisMode::Merged,
                model: Some(merged.model_used),
                error: None,
                rerequested: false,
                usage,
            };
        }

        info!(words, budget = word_budget, "merged answer over budget, re-requesting once");
        let reminder = build_budget_reminder_prompt(&merge_prompt, &merged.text, words, word_budget);
        let (text, model) = match self.ask(&reminder).await {
            Ok(shorter) => {
                usage.accumulate(&shorter.usage);
                (shorter.text, shorter.model_used)
            }
            Err(e) => {
                warn!(error = %e, "budget re-request failed, keeping first merge");
                (merged.text, merged.model_used)
            }
        };

        Draft {
            text,
            mode: SynthesisMode::Merged,
            model: Some(model),
            error: None,
            rerequested: true,
            usage,
        }
    }

    async fn ask(&self, user_msg: &str) -> Result<ChunkAnswer, AgentError> {
        match &self.cancel {
            Some(token) => tokio::select! {
                biased;
                () = token.cancelled() => Err(AgentError::Cancelled),
                result = self.client.complete(&self.agent, user_msg) => result,
            },
            None => self.client.complete(&self.agent, user_msg).await,
        }
    }
}
