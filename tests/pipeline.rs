//! End-to-end pipeline tests against a scripted provider.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use docqa::agent::{
    AgentConfig, ChatRequest, ChatResponse, ChunkStatus, LlmProvider, ModelTier, Orchestrator,
    PromptSet, SynthesisMode, TokenUsage,
};
use docqa::core::{ArticleRecord, word_count};
use docqa::error::{AgentError, ProviderError};

const CHUNK_RULES: &str = "CHUNK RULES";
const MERGE_RULES: &str = "MERGE RULES";

type Script = dyn Fn(&Call) -> Result<String, ProviderError> + Send + Sync;

/// One observed request.
#[derive(Debug, Clone)]
struct Call {
    model: String,
    merge: bool,
    title: String,
    user: String,
}

/// Answers every request through a closure and records what it saw.
struct Scripted {
    script: Box<Script>,
    calls: Mutex<Vec<Call>>,
}

impl Scripted {
    fn new(
        script: impl Fn(&Call) -> Result<String, ProviderError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            script: Box::new(script),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<Call> {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn merge_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.merge).collect()
    }
}

#[async_trait]
impl LlmProvider for Scripted {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let user = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        let call = Call {
            model: request.model.clone(),
            merge: request
                .system_text()
                .is_some_and(|s| s.contains(MERGE_RULES)),
            title: user
                .split("Title: ")
                .nth(1)
                .and_then(|rest| rest.lines().next())
                .unwrap_or_default()
                .to_string(),
            user,
        };
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(call.clone());

        (self.script)(&call).map(|content| ChatResponse {
            content,
            usage: TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            },
            finish_reason: Some("stop".to_string()),
        })
    }
}

fn cited(title: &str) -> String {
    format!("{title} reported the vote (Title: \"{title}\", Publication: \"Gazette\", Date: \"2024-03-01\").")
}

/// Articles sized so each one fills its own chunk.
fn articles(titles: &[&str]) -> Vec<ArticleRecord> {
    titles
        .iter()
        .map(|t| ArticleRecord::new(*t, "Gazette", "2024-03-01", "x".repeat(300)))
        .collect()
}

fn orchestrator(provider: &Arc<Scripted>, word_budget: usize) -> Orchestrator {
    let config = AgentConfig::builder()
        .api_key("test")
        .primary_model("primary")
        .fallback_model("fallback")
        .max_chunk_size(600)
        .word_budget(word_budget)
        .max_concurrency(2)
        .build()
        .unwrap_or_else(|_| unreachable!());
    let prompts = PromptSet {
        subcall: CHUNK_RULES.to_string(),
        synthesizer: MERGE_RULES.to_string(),
    };
    let provider: Arc<dyn LlmProvider> = provider.clone();
    Orchestrator::with_prompts(provider, config, prompts)
}

#[tokio::test]
async fn test_two_chunks_are_merged() {
    let provider = Scripted::new(|call| {
        if call.merge {
            Ok(format!("Merged. {}", cited("Alpha")))
        } else {
            Ok(cited(&call.title))
        }
    });

    let answer = orchestrator(&provider, 500)
        .query(articles(&["Alpha", "Beta"]), "What happened at the vote?")
        .await
        .unwrap_or_else(|_| unreachable!());

    let summary = &answer.technical_summary;
    assert_eq!(summary.chunks_total, 2);
    assert_eq!(summary.chunks_succeeded, 2);
    assert_eq!(summary.synthesis_mode, SynthesisMode::Merged);
    assert_eq!(summary.synthesis_model, Some(ModelTier::Primary));
    assert!(!summary.synthesis_failed);
    assert!(answer.citations_present);
    assert!(answer.text.starts_with("Merged."));
    // 2 chunk calls + 1 merge, 15 tokens each
    assert_eq!(summary.total_tokens, 45);

    let merges = provider.merge_calls();
    assert_eq!(merges.len(), 1);
    let merge_prompt = &merges[0].user;
    let alpha = merge_prompt.find("Alpha reported").unwrap_or(usize::MAX);
    let beta = merge_prompt.find("Beta reported").unwrap_or(usize::MAX);
    assert!(alpha < beta, "partial answers keep chunk order");
}

#[tokio::test]
async fn test_overloaded_primary_falls_back() {
    let provider = Scripted::new(|call| {
        if call.model == "primary" {
            return Err(ProviderError::Overloaded {
                model: "primary".to_string(),
                message: "overloaded_error".to_string(),
            });
        }
        if call.merge {
            Ok(cited("Alpha"))
        } else {
            Ok(cited(&call.title))
        }
    });

    let answer = orchestrator(&provider, 500)
        .query(articles(&["Alpha", "Beta"]), "What happened?")
        .await
        .unwrap_or_else(|_| unreachable!());

    let summary = &answer.technical_summary;
    assert_eq!(summary.chunks_succeeded, 2);
    for chunk in &summary.chunks {
        assert_eq!(chunk.model_used, Some(ModelTier::Fallback));
        assert_eq!(chunk.model.as_deref(), Some("fallback"));
    }
    assert_eq!(summary.synthesis_model, Some(ModelTier::Fallback));

    // One primary attempt per request, never retried
    let primary_calls = provider
        .calls()
        .iter()
        .filter(|c| c.model == "primary")
        .count();
    assert_eq!(primary_calls, 3);
}

#[tokio::test]
async fn test_partial_failure_excludes_failed_chunks() {
    let provider = Scripted::new(|call| {
        if call.merge {
            return Ok(cited("A1"));
        }
        if call.title.starts_with("Bad") {
            return Err(ProviderError::Fatal {
                message: "invalid request".to_string(),
                status: Some(400),
            });
        }
        Ok(cited(&call.title))
    });

    let answer = orchestrator(&provider, 500)
        .query(
            articles(&["A1", "Bad2", "A3", "Bad4", "A5"]),
            "What happened?",
        )
        .await
        .unwrap_or_else(|_| unreachable!());

    let summary = &answer.technical_summary;
    assert_eq!(summary.chunks_total, 5);
    assert_eq!(summary.chunks_succeeded, 3);
    assert_eq!(summary.chunks_failed, 2);

    let statuses: Vec<ChunkStatus> = summary.chunks.iter().map(|c| c.status).collect();
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
        summary.chunks[1]
            .error
            .as_deref()
            .is_some_and(|e| e.contains("invalid request"))
    );

    let merges = provider.merge_calls();
    assert_eq!(merges.len(), 1);
    assert!(merges[0].user.contains("A5 reported"));
    assert!(!merges[0].user.contains("Bad2"));
}

#[tokio::test]
async fn test_merge_failure_concatenates() {
    let provider = Scripted::new(|call| {
        if call.merge {
            Err(ProviderError::fatal("merge refused"))
        } else {
            Ok(cited(&call.title))
        }
    });

    let answer = orchestrator(&provider, 500)
        .query(articles(&["Alpha", "Beta"]), "What happened?")
        .await
        .unwrap_or_else(|_| unreachable!());

    let summary = &answer.technical_summary;
    assert!(summary.synthesis_failed);
    assert_eq!(summary.synthesis_mode, SynthesisMode::Concatenated);
    assert!(
        summary
            .synthesis_error
            .as_deref()
            .is_some_and(|e| e.contains("merge refused"))
    );
    assert_eq!(answer.text, format!("{}\n\n{}", cited("Alpha"), cited("Beta")));
    assert!(answer.citations_present);
}

#[tokio::test]
async fn test_all_chunks_failed() {
    let provider = Scripted::new(|_| Err(ProviderError::fatal("unauthorized")));

    let result = orchestrator(&provider, 500)
        .query(articles(&["A", "B", "C"]), "What happened?")
        .await;

    match result {
        Err(AgentError::AllChunksFailed { total, reasons }) => {
            assert_eq!(total, 3);
            assert_eq!(reasons.len(), 3);
            assert!(reasons.iter().all(|r| r.contains("unauthorized")));
        }
        other => unreachable!("unexpected result: {other:?}"),
    }
    assert!(provider.merge_calls().is_empty());
}

#[tokio::test]
async fn test_single_success_skips_merge() {
    let provider = Scripted::new(|call| Ok(cited(&call.title)));

    let answer = orchestrator(&provider, 500)
        .query(articles(&["Only"]), "What happened?")
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(provider.calls().len(), 1);
    assert_eq!(answer.text, cited("Only"));
    assert_eq!(
        answer.technical_summary.synthesis_mode,
        SynthesisMode::Single
    );
}

#[tokio::test]
async fn test_long_merge_is_bounded() {
    let long = format!("{} {}", "word ".repeat(80), cited("Alpha"));
    let provider = Scripted::new(move |call| {
        if call.merge {
            Ok(long.clone())
        } else {
            Ok(cited(&call.title))
        }
    });

    let answer = orchestrator(&provider, 20)
        .query(articles(&["Alpha", "Beta"]), "What happened?")
        .await
        .unwrap_or_else(|_| unreachable!());

    let summary = &answer.technical_summary;
    assert!(summary.budget_rerequested);
    assert!(summary.truncated);
    assert!(word_count(&answer.text) <= 20);
    assert_eq!(summary.word_count, word_count(&answer.text));
    assert_eq!(provider.merge_calls().len(), 2);
}

fn server_error(message: &str) -> ProviderError {
    ProviderError::Transient {
        message: message.to_string(),
        status: Some(500),
    }
}

#[tokio::test(start_paused = true)]
async fn test_transient_chunks_fail_after_retries() {
    let provider = Scripted::new(|call| {
        if call.merge {
            return Ok(cited("A1"));
        }
        if call.title.starts_with("Flaky") {
            return Err(server_error("internal server error"));
        }
        Ok(cited(&call.title))
    });

    let start = tokio::time::Instant::now();
    let answer = orchestrator(&provider, 500)
        .query(
            articles(&["A1", "Flaky2", "A3", "Flaky4", "A5"]),
            "What happened?",
        )
        .await
        .unwrap_or_else(|_| unreachable!());

    let summary = &answer.technical_summary;
    assert_eq!(summary.chunks_succeeded, 3);
    assert_eq!(summary.chunks_failed, 2);
    for index in [1, 3] {
        let chunk = &summary.chunks[index];
        assert_eq!(chunk.status, ChunkStatus::Failed);
        let error = chunk.error.as_deref().unwrap_or_default();
        assert!(
            error.contains("gave up after 3 attempts on primary"),
            "chunk {index}: {error}"
        );
        assert!(error.contains("internal server error"), "chunk {index}: {error}");
    }

    // Retried on the same model, never handed to the fallback
    let flaky: Vec<Call> = provider
        .calls()
        .into_iter()
        .filter(|c| c.title.starts_with("Flaky"))
        .collect();
    assert_eq!(flaky.len(), 6);
    assert!(flaky.iter().all(|c| c.model == "primary"));

    // Backoff of 1s then 2s before the third attempt
    assert!(start.elapsed() >= std::time::Duration::from_secs(3));

    let merges = provider.merge_calls();
    assert_eq!(merges.len(), 1);
    assert!(!merges[0].user.contains("Flaky"));
}

#[tokio::test(start_paused = true)]
async fn test_transient_merge_failure_concatenates() {
    let provider = Scripted::new(|call| {
        if call.merge {
            Err(server_error("upstream reset"))
        } else {
            Ok(cited(&call.title))
        }
    });

    let answer = orchestrator(&provider, 500)
        .query(articles(&["Alpha", "Beta"]), "What happened?")
        .await
        .unwrap_or_else(|_| unreachable!());

    let summary = &answer.technical_summary;
    assert!(summary.synthesis_failed);
    assert_eq!(summary.synthesis_mode, SynthesisMode::Concatenated);
    let error = summary.synthesis_error.as_deref().unwrap_or_default();
    assert!(error.starts_with("synthesis failed"), "{error}");
    assert!(error.contains("gave up after 3 attempts on primary"), "{error}");
    assert_eq!(provider.merge_calls().len(), 3);
    assert_eq!(answer.text, format!("{}\n\n{}", cited("Alpha"), cited("Beta")));
}
