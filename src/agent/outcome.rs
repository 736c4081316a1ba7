//! Result types produced by the query pipeline.
//!
//! A [`ChunkResult`] records what happened to one chunk; the synthesizer
//! folds the ordered results into a [`FinalAnswer`] whose
//! [`TechnicalSummary`] reports every chunk, failures included.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::message::TokenUsage;
use crate::chunking::Chunk;

/// Which configured model produced an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    /// The primary model.
    Primary,
    /// The fallback model, used after the primary reported overload.
    Fallback,
}

impl fmt::Display for ModelTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Primary => "primary",
            Self::Fallback => "fallback",
        })
    }
}

/// Successful answer from one model request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkAnswer {
    /// Answer text.
    pub text: String,
    /// Tier that produced the text.
    pub model_used: ModelTier,
    /// Concrete model identifier.
    pub model: String,
    /// Tokens consumed by the successful attempt.
    pub usage: TokenUsage,
}

/// Terminal state of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStatus {
    /// The chunk produced an answer.
    Success,
    /// Every attempt failed, or the run was cancelled first.
    Failed,
}

/// Outcome of querying one chunk.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkResult {
    /// Index of the chunk in the plan.
    pub chunk_index: usize,
    /// Terminal state.
    pub status: ChunkStatus,
    /// Tier that answered, on success.
    pub model_used: Option<ModelTier>,
    /// Model identifier that answered, on success.
    pub model: Option<String>,
    /// Answer text, on success.
    pub answer_text: Option<String>,
    /// Failure description, on failure.
    pub error_detail: Option<String>,
    /// Number of articles in the chunk.
    pub article_count: usize,
    /// Estimated chunk size in the plan's unit.
    pub estimated_size: usize,
    /// Whether the chunk held a single over-budget article.
    pub oversized: bool,
    /// Tokens consumed.
    pub usage: TokenUsage,
}

impl ChunkResult {
    /// Records a successful answer for `chunk`.
    pub fn success(chunk: &Chunk, answer: ChunkAnswer) -> Self {
        Self {
            chunk_index: chunk.index,
            status: ChunkStatus::Success,
            model_used: Some(answer.model_used),
            model: Some(answer.model),
            answer_text: Some(answer.text),
            error_detail: None,
            article_count: chunk.articles.len(),
            estimated_size: chunk.estimated_size,
            oversized: chunk.oversized,
            usage: answer.usage,
        }
    }

    /// Records a failure for `chunk`.
    pub fn failure(chunk: &Chunk, detail: impl Into<String>) -> Self {
        Self {
            chunk_index: chunk.index,
            status: ChunkStatus::Failed,
            model_used: None,
            model: None,
            answer_text: None,
            error_detail: Some(detail.into()),
            article_count: chunk.articles.len(),
            estimated_size: chunk.estimated_size,
            oversized: chunk.oversized,
            usage: TokenUsage::default(),
        }
    }

    /// Whether the chunk produced an answer.
    pub fn is_success(&self) -> bool {
        self.status == ChunkStatus::Success
    }
}

/// Successful chunk results in chunk order, plus the failures that were
/// excluded from merging.
#[derive(Debug, Clone)]
pub struct SynthesisInput<'a> {
    /// Successful results, ascending by chunk index.
    pub successes: Vec<&'a ChunkResult>,
    /// Failed results, ascending by chunk index.
    pub failures: Vec<&'a ChunkResult>,
}

impl<'a> SynthesisInput<'a> {
    /// Splits results into successes and failures, both in chunk order.
    pub fn from_results(results: &'a [ChunkResult]) -> Self {
        let mut ordered: Vec<&ChunkResult> = results.iter().collect();
        ordered.sort_by_key(|r| r.chunk_index);
        let (successes, failures) = ordered.into_iter().partition(|r| r.is_success());
        Self {
            successes,
            failures,
        }
    }
}

/// How the final answer text was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SynthesisMode {
    /// One chunk succeeded; its answer was used directly.
    Single,
    /// Several answers were merged by the model.
    Merged,
    /// Merging failed; answers were concatenated verbatim.
    Concatenated,
}

impl fmt::Display for SynthesisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Single => "single",
            Self::Merged => "merged",
            Self::Concatenated => "concatenated",
        })
    }
}

/// Per-chunk line of the technical summary.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkReport {
    /// Chunk index.
    pub index: usize,
    /// Terminal state.
    pub status: ChunkStatus,
    /// Tier that answered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_used: Option<ModelTier>,
    /// Model identifier that answered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Articles in the chunk.
    pub articles: usize,
    /// Estimated size.
    pub estimated_size: usize,
    /// Oversized singleton flag.
    pub oversized: bool,
    /// Failure reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&ChunkResult> for ChunkReport {
    fn from(r: &ChunkResult) -> Self {
        Self {
            index: r.chunk_index,
            status: r.status,
            model_used: r.model_used,
            model: r.model.clone(),
            articles: r.article_count,
            estimated_size: r.estimated_size,
            oversized: r.oversized,
            error: r.error_detail.clone(),
        }
    }
}

/// Diagnostics accompanying a final answer.
#[derive(Debug, Clone, Serialize)]
pub struct TechnicalSummary {
    /// Chunks planned.
    pub chunks_total: usize,
    /// Chunks that produced an answer.
    pub chunks_succeeded: usize,
    /// Chunks that failed or were cancelled.
    pub chunks_failed: usize,
    /// One entry per chunk, in chunk order.
    pub chunks: Vec<ChunkReport>,
    /// How the answer text was produced.
    pub synthesis_mode: SynthesisMode,
    /// Tier that produced the merged answer, if a merge ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synthesis_model: Option<ModelTier>,
    /// Why merging failed, when it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synthesis_error: Option<String>,
    /// Merge failed and answers were concatenated.
    pub synthesis_failed: bool,
    /// The merge was re-requested once for exceeding the budget.
    pub budget_rerequested: bool,
    /// The answer was cut to fit the budget.
    pub truncated: bool,
    /// Words in the final answer.
    pub word_count: usize,
    /// Configured word budget.
    pub word_budget: usize,
    /// Tokens consumed across chunk and merge requests.
    pub total_tokens: u32,
    /// Wall-clock time for the whole query.
    #[serde(serialize_with = "serialize_duration")]
    pub elapsed: Duration,
}

impl TechnicalSummary {
    /// Builds the chunk-level part of the summary from ordered results.
    ///
    /// Synthesis fields start at their neutral values.
    pub fn from_results(results: &[ChunkResult], word_budget: usize) -> Self {
        let mut chunks: Vec<ChunkReport> = results.iter().map(ChunkReport::from).collect();
        chunks.sort_by_key(|c| c.index);
        let chunks_succeeded = results.iter().filter(|r| r.is_success()).count();
        let mut usage = TokenUsage::default();
        for r in results {
            usage.accumulate(&r.usage);
        }

        Self {
            chunks_total: results.len(),
            chunks_succeeded,
            chunks_failed: results.len() - chunks_succeeded,
            chunks,
            synthesis_mode: SynthesisMode::Single,
            synthesis_model: None,
            synthesis_error: None,
            synthesis_failed: false,
            budget_rerequested: false,
            truncated: false,
            word_count: 0,
            word_budget,
            total_tokens: usage.total_tokens,
            elapsed: Duration::ZERO,
        }
    }

    /// Failure descriptions, one per failed chunk.
    pub fn failure_reasons(&self) -> Vec<String> {
        self.chunks
            .iter()
            .filter(|c| c.status == ChunkStatus::Failed)
            .map(|c| {
                format!(
                    "chunk {}: {}",
                    c.index + 1,
                    c.error.as_deref().unwrap_or("unknown error")
                )
            })
            .collect()
    }
}

/// The user-facing result of a query.
#[derive(Debug, Clone, Serialize)]
pub struct FinalAnswer {
    /// Answer text, never longer than the word budget.
    pub text: String,
    /// Whether the text contains at least one citation.
    pub citations_present: bool,
    /// Diagnostics.
    pub technical_summary: TechnicalSummary,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn serialize_duration<S>(d: &Duration, s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    s.serialize_f64(d.as_secs_f64())
}
