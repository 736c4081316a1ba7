//! # docqa
//!
//! Ask questions of a folder of Word documents and get one cited,
//! length-bounded answer.
//!
//! Articles are extracted from every `.docx` file, grouped into
//! whole-article chunks that fit a per-request budget, and sent to a
//! language model concurrently. Overloaded models fall back to a second
//! model; transient failures back off and retry. The per-chunk answers are
//! merged into a final answer that never exceeds the word budget.
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use docqa::agent::{AgentConfig, Orchestrator, create_provider};
//! use docqa::extract::load_corpus;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let corpus = load_corpus(Path::new("data"))?;
//! let config = AgentConfig::from_env()?;
//! let provider = create_provider(&config)?;
//! let answer = Orchestrator::new(provider, config)
//!     .query(corpus.articles, "What did the council decide?")
//!     .await?;
//! assert!(answer.technical_summary.word_count <= answer.technical_summary.word_budget);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod chunking;
pub mod cli;
pub mod core;
pub mod error;
pub mod extract;
pub mod report;

pub use error::{Error, Result};
