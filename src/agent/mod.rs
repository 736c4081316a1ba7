//! Chunked question answering over an article corpus.
//!
//! Fans a question out across whole-article chunks and synthesizes the
//! per-chunk answers into one cited, length-bounded response. Uses a
//! pluggable provider abstraction backed by Anthropic or
//! OpenAI-compatible APIs.
//!
//! # Architecture
//!
//! ```text
//! Question + articles → Orchestrator
//!   ├── Chunk planner (greedy, whole articles only)
//!   ├── Collector → N concurrent chunk requests via ModelClient
//!   │   └── primary model → fallback on overload, backoff on transient errors
//!   ├── Ordered Vec<ChunkResult>
//!   └── Synthesizer → FinalAnswer within the word budget
//! ```

pub mod client;
pub mod collector;
pub mod config;
pub mod message;
pub mod model_client;
pub mod orchestrator;
pub mod outcome;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod subcall;
pub mod synthesizer;
pub mod traits;

// Re-export key types
pub use client::create_provider;
pub use collector::{CollectOptions, collect};
pub use config::AgentConfig;
pub use message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
pub use model_client::ModelClient;
pub use orchestrator::Orchestrator;
pub use outcome::{
    ChunkAnswer, ChunkReport, ChunkResult, ChunkStatus, FinalAnswer, ModelTier, SynthesisInput,
    SynthesisMode, TechnicalSummary,
};
pub use prompt::PromptSet;
pub use provider::LlmProvider;
pub use subcall::SubcallAgent;
pub use synthesizer::{Synthesizer, SynthesizerAgent};
pub use traits::Agent;
