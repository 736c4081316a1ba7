//! Concurrent per-chunk fan-out with ordered collection.
//!
//! Each chunk is queried on its own task behind a semaphore that bounds
//! concurrency. Handles are awaited in chunk order, so the result list is
//! ordered by chunk index no matter which request finishes first. Every
//! chunk yields exactly one [`ChunkResult`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::model_client::ModelClient;
use super::outcome::ChunkResult;
use crate::chunking::Chunk;
use crate::error::AgentError;

/// Worker pool settings for [`collect`].
#[derive(Debug, Clone, Copy)]
pub struct CollectOptions {
    /// Maximum chunk requests in flight (1 = sequential).
    pub max_concurrency: usize,
    /// Pause after acquiring a worker slot, before the request.
    pub request_delay: Duration,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            request_delay: Duration::ZERO,
        }
    }
}

/// Detail recorded for chunks abandoned by cancellation.
pub const CANCELLED_DETAIL: &str = "cancelled";

/// Queries every chunk and gathers one result per chunk, in chunk order.
///
/// Failures are recorded per chunk and never abort the run. When `cancel`
/// fires, requests in flight and not yet started are abandoned and their
/// chunks recorded as failed with detail [`CANCELLED_DETAIL`].
///
/// # Errors
///
/// Returns [`AgentError::AllChunksFailed`] when no chunk succeeded.
pub async fn collect(
    chunks: Arc<[Chunk]>,
    question: &str,
    client: &Arc<ModelClient>,
    options: CollectOptions,
    cancel: &CancellationToken,
) -> Result<Vec<ChunkResult>, AgentError> {
    let semaphore = Arc::new(Semaphore::new(options.max_concurrency.max(1)));
    let question: Arc<str> = Arc::from(question);
    let mut handles = Vec::with_capacity(chunks.len());

    for position in 0..chunks.len() {
        let sem = Arc::clone(&semaphore);
        let client = Arc::clone(client);
        let chunks_ref = Arc::clone(&chunks);
        let q = Arc::clone(&question);
        let token = cancel.clone();
        let request_delay = options.request_delay;

        let handle = tokio::spawn(async move {
            let chunk = &chunks_ref[position];
            let work = async {
                let _permit = sem.acquire().await.map_err(|e| AgentError::Orchestration {
                    message: format!("Semaphore acquire failed: {e}"),
                })?;
                if !request_delay.is_zero() {
                    tokio::time::sleep(request_delay).await;
                }
                client.query(chunk, &q).await
            };

            let start = Instant::now();
            let outcome = tokio::select! {
                biased;
                () = token.cancelled() => Err(AgentError::Cancelled),
                result = work => result,
            };

            match outcome {
                Ok(answer) => {
                    debug!(
                        chunk = chunk.index,
                        elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
                        "chunk answered"
                    );
                    ChunkResult::success(chunk, answer)
                }
                Err(AgentError::Cancelled) => ChunkResult::failure(chunk, CANCELLED_DETAIL),
                Err(e) => {
                    warn!(chunk = chunk.index, error = %e, "chunk failed");
                    ChunkResult::failure(chunk, e.to_string())
                }
            }
        });

        handles.push(handle);
    }

    let mut results = Vec::with_capacity(handles.len());
    for (position, handle) in handles.into_iter().enumerate() {
        match handle.await {
            Ok(result) => results.push(result),
            Err(e) => results.push(ChunkResult::failure(
                &chunks[position],
                format!("Task join failed: {e}"),
            )),
        }
    }

    debug_assert_eq!(results.len(), chunks.len(), "one result per chunk");

    let succeeded = results.iter().filter(|r| r.is_success()).count();
    info!(
        chunks = results.len(),
        succeeded,
        failed = results.len() - succeeded,
        "collected chunk answers"
    );

    if succeeded == 0 {
        let reasons = results
            .iter()
            .map(|r| {
                format!(
                    "chunk {}: {}",
                    r.chunk_index + 1,
                    r.error_detail.as_deref().unwrap_or("unknown error")
                )
            })
            .collect();
        return Err(AgentError::AllChunksFailed {
            total: results.len(),
            reasons,
        });
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::config::AgentConfig;
    use crate::agent::message::{ChatRequest, ChatResponse, TokenUsage};
    use crate::agent::outcome::ChunkStatus;
    use crate::agent::provider::LlmProvider;
    use crate::core::ArticleRecord;
    use crate::error::ProviderError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers with the first article title; titles starting with "FAIL"
    /// fail fatally, and earlier chunks take longer to answer.
    struct TitleEcho {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl TitleEcho {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    fn first_title(request: &ChatRequest) -> String {
        request
            .messages
            .last()
            .and_then(|m| m.content.split("Title: ").nth(1))
            .and_then(|rest| rest.lines().next())
            .unwrap_or_default()
            .to_string()
    }

    #[async_trait]
    impl LlmProvider for TitleEcho {
        fn name(&self) -> &'static str {
            "echo"
        }

        async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let title = first_title(request);
            let n: u64 = title.trim_start_matches(|c: char| !c.is_ascii_digit()).parse().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(100 * (10 - n.min(9)))).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if title.starts_with("FAIL") {
                return Err(ProviderError::fatal(format!("refused {title}")));
            }
            Ok(ChatResponse {
                content: format!("answer for {title}"),
                usage: TokenUsage::default(),
                finish_reason: None,
            })
        }
    }

    fn chunks(titles: &[&str]) -> Arc<[Chunk]> {
        titles
            .iter()
            .enumerate()
            .map(|(index, title)| Chunk {
                index,
                articles: vec![ArticleRecord::new(*title, "P", "2024-01-01", "body")],
                estimated_size: 204,
                oversized: false,
            })
            .collect()
    }

    fn client(provider: &Arc<TitleEcho>) -> Arc<ModelClient> {
        let config = AgentConfig::builder()
            .api_key("test")
            .build()
            .unwrap_or_else(|_| unreachable!());
        let provider: Arc<dyn LlmProvider> = provider.clone();
        Arc::new(ModelClient::new(provider, &config, "rules".to_string()))
    }

    fn options(max_concurrency: usize) -> CollectOptions {
        CollectOptions {
            max_concurrency,
            request_delay: Duration::ZERO,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_in_chunk_order() {
        let provider = Arc::new(TitleEcho::new());
        let results = collect(
            chunks(&["A1", "A2", "A3", "A4"]),
            "q?",
            &client(&provider),
            options(4),
            &CancellationToken::new(),
        )
        .await
        .unwrap_or_else(|_| unreachable!());

        let order: Vec<usize> = results.iter().map(|r| r.chunk_index).collect();
        assert_eq!(order, vec![0, 1, 2, 3]);
        assert_eq!(results[0].answer_text.as_deref(), Some("answer for A1"));
        assert_eq!(results[3].answer_text.as_deref(), Some("answer for A4"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_bounded() {
        let provider = Arc::new(TitleEcho::new());
        let titles: Vec<String> = (1..=8).map(|i| format!("A{i}")).collect();
        let refs: Vec<&str> = titles.iter().map(String::as_str).collect();
        let results = collect(
            chunks(&refs),
            "q?",
            &client(&provider),
            options(2),
            &CancellationToken::new(),
        )
        .await
        .unwrap_or_else(|_| unreachable!());
        assert_eq!(results.len(), 8);
        assert!(provider.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_failure_recorded() {
        let provider = Arc::new(TitleEcho::new());
        let results = collect(
            chunks(&["A1", "FAIL2", "A3", "FAIL4", "A5"]),
            "q?",
            &client(&provider),
            options(3),
            &CancellationToken::new(),
        )
        .await
        .unwrap_or_else(|_| unreachable!());

        let statuses: Vec<ChunkStatus> = results.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![
                ChunkStatus::Success,
                ChunkStatus::Failed,
                ChunkStatus::Success,
                ChunkStatus::Failed,
                ChunkStatus::Success,
            ]
        );
        assert!(
            results[1]
                .error_detail
                .as_deref()
                .is_some_and(|d| d.contains("refused FAIL2"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_failed() {
        let provider = Arc::new(TitleEcho::new());
        let result = collect(
            chunks(&["FAIL1", "FAIL2"]),
            "q?",
            &client(&provider),
            options(2),
            &CancellationToken::new(),
        )
        .await;
        assert!(matches!(
            result,
            Err(AgentError::AllChunksFailed { total: 2, ref reasons }) if reasons.len() == 2
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_start() {
        let provider = Arc::new(TitleEcho::new());
        let token = CancellationToken::new();
        token.cancel();
        let result = collect(
            chunks(&["A1", "A2"]),
            "q?",
            &client(&provider),
            options(1),
            &token,
        )
        .await;
        match result {
            Err(AgentError::AllChunksFailed { reasons, .. }) => {
                assert!(reasons.iter().all(|r| r.ends_with(CANCELLED_DETAIL)));
            }
            other => unreachable!("unexpected {other:?}"),
        }
    }
}
