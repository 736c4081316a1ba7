//! Property tests for the word budget.

use std::sync::Arc;

use async_trait::async_trait;
use docqa::agent::{
    AgentConfig, ChatRequest, ChatResponse, FinalAnswer, LlmProvider, Orchestrator, PromptSet,
    TokenUsage,
};
use docqa::core::{ArticleRecord, truncate_to_word_budget, word_count};
use docqa::error::ProviderError;
use proptest::prelude::*;

const MERGE_RULES: &str = "MERGE RULES";

/// Sentences of plain words, each ended by a terminator or nothing.
fn prose() -> impl Strategy<Value = String> {
    let sentence = (
        prop::collection::vec("[A-Za-z]{1,10}", 1..15),
        prop_oneof![Just("."), Just("!"), Just("?"), Just("")],
    )
        .prop_map(|(words, end)| format!("{}{end}", words.join(" ")));
    prop::collection::vec(sentence, 1..20).prop_map(|s| s.join(" "))
}

/// Answers chunk requests and merge requests with fixed texts.
struct Fixed {
    chunk_text: String,
    merge_text: String,
    fail_merge: bool,
}

#[async_trait]
impl LlmProvider for Fixed {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let merge = request
            .system_text()
            .is_some_and(|s| s.contains(MERGE_RULES));
        let content = match (merge, self.fail_merge) {
            (true, true) => return Err(ProviderError::fatal("merge refused")),
            (true, false) => self.merge_text.clone(),
            (false, _) => self.chunk_text.clone(),
        };
        Ok(ChatResponse {
            content,
            usage: TokenUsage::default(),
            finish_reason: None,
        })
    }
}

fn answer(provider: Fixed, chunks: usize, word_budget: usize) -> FinalAnswer {
    let config = AgentConfig::builder()
        .api_key("test")
        .max_chunk_size(600)
        .word_budget(word_budget)
        .build()
        .unwrap_or_else(|_| unreachable!());
    let prompts = PromptSet {
        subcall: "CHUNK RULES".to_string(),
        synthesizer: MERGE_RULES.to_string(),
    };
    let orchestrator = Orchestrator::with_prompts(Arc::new(provider), config, prompts);
    let articles: Vec<ArticleRecord> = (0..chunks)
        .map(|i| ArticleRecord::new(format!("Article {i}"), "P", "D", "x".repeat(300)))
        .collect();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap_or_else(|_| unreachable!());
    runtime
        .block_on(orchestrator.query(articles, "What happened?"))
        .unwrap_or_else(|_| unreachable!())
}

proptest! {
    #[test]
    fn truncation_never_exceeds_budget(text in prose(), budget in 0usize..150) {
        let result = truncate_to_word_budget(&text, budget);
        prop_assert!(word_count(&result.text) <= budget);
        prop_assert!(text.starts_with(&result.text));
        prop_assert_eq!(result.truncated, word_count(&text) > budget);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn final_answer_never_exceeds_budget(
        chunk_text in prose(),
        merge_text in prose(),
        fail_merge in any::<bool>(),
        chunks in 1usize..4,
        budget in 1usize..120,
    ) {
        let provider = Fixed { chunk_text, merge_text, fail_merge };
        let answer = answer(provider, chunks, budget);
        let words = word_count(&answer.text);
        prop_assert!(words <= budget, "{} words over budget {}", words, budget);
        prop_assert_eq!(answer.technical_summary.word_count, words);
    }
}
