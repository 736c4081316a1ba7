//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::chunking::SizeUnit;

/// Default directory scanned for `.docx` files.
pub const DEFAULT_DATA_DIR: &str = "data";
/// Default directory for saved reports.
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// docqa: ask questions of a folder of Word documents.
///
/// Extracts articles from every `.docx` file, asks the question of each
/// batch of articles, and merges the answers into one cited response
/// within a word budget.
#[derive(Parser, Debug)]
#[command(name = "docqa")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity on stderr (-v info, -vv debug).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a question about the documents in the data directory.
    ///
    /// Requires an API key (`ANTHROPIC_API_KEY`, `OPENAI_API_KEY`, or
    /// `DOCQA_API_KEY`). The answer is printed and saved as a timestamped
    /// Word report in the output directory.
    #[command(after_help = r#"Examples:
  docqa ask "What did the articles say about water rates?"
  docqa ask "Who funded the stadium?" --data-dir ./clippings --word-budget 300
  docqa ask "Summarize coverage of the strike" --max-chunk-size 60000 --concurrency 2
  docqa ask "..." --provider openai --primary-model gpt-4.1
  docqa --format json ask "Which council members voted no?" --no-report | jq .technical_summary
"#)]
    Ask {
        /// The question to answer.
        question: String,

        /// Directory containing `.docx` files.
        #[arg(short, long, env = "DOCQA_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
        data_dir: PathBuf,

        /// Directory for the saved Word report.
        #[arg(short, long, env = "DOCQA_OUTPUT_DIR", default_value = DEFAULT_OUTPUT_DIR)]
        output_dir: PathBuf,

        /// Do not save a Word report.
        #[arg(long)]
        no_report: bool,

        /// LLM provider (anthropic, openai).
        #[arg(long)]
        provider: Option<String>,

        /// Model tried first for every request.
        #[arg(long)]
        primary_model: Option<String>,

        /// Model used when the primary is overloaded.
        #[arg(long)]
        fallback_model: Option<String>,

        /// Maximum chunk size, measured in `--size-unit`.
        #[arg(long)]
        max_chunk_size: Option<usize>,

        /// Unit for chunk sizes (chars, tokens).
        #[arg(long)]
        size_unit: Option<SizeUnit>,

        /// Maximum length of the final answer in words.
        #[arg(short, long)]
        word_budget: Option<usize>,

        /// Attempts per model before a transient failure is final.
        #[arg(long)]
        max_retries: Option<u32>,

        /// Timeout for each model request, in seconds.
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Maximum concurrent chunk requests.
        #[arg(long)]
        concurrency: Option<usize>,

        /// Minimum delay between requests per worker, in milliseconds.
        #[arg(long)]
        request_delay_ms: Option<u64>,

        /// Directory containing prompt template files.
        #[arg(long, env = "DOCQA_PROMPT_DIR")]
        prompt_dir: Option<PathBuf>,
    },

    /// Show how the documents would be chunked, without calling a model.
    #[command(after_help = r#"Examples:
  docqa plan
  docqa plan --data-dir ./clippings --max-chunk-size 30000 --size-unit tokens
  docqa --format json plan | jq '.chunks[] | select(.oversized)'
"#)]
    Plan {
        /// Directory containing `.docx` files.
        #[arg(short, long, env = "DOCQA_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
        data_dir: PathBuf,

        /// Maximum chunk size, measured in `--size-unit`.
        #[arg(long)]
        max_chunk_size: Option<usize>,

        /// Unit for chunk sizes (chars, tokens).
        #[arg(long)]
        size_unit: Option<SizeUnit>,
    },

    /// Write the default prompt templates for customization.
    ///
    /// Existing files are left untouched.
    #[command(after_help = r#"Examples:
  docqa init-prompts                   # ~/.config/docqa/prompts
  docqa init-prompts --dir ./prompts
"#)]
    InitPrompts {
        /// Target directory (defaults to `~/.config/docqa/prompts`).
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}
