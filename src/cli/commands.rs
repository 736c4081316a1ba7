//! CLI command implementations.
//!
//! Contains the business logic for each CLI command.

// Allow certain patterns that improve readability in CLI output formatting
#![allow(clippy::format_push_string)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Local;
use serde::Serialize;
use tracing::{info, warn};

use crate::agent::{AgentConfig, FinalAnswer, Orchestrator, PromptSet, create_provider};
use crate::chunking::{DEFAULT_MAX_CHUNK_SIZE, SizeUnit, plan_with_unit};
use crate::cli::output::OutputFormat;
use crate::cli::parser::{Cli, Commands};
use crate::error::{CommandError, Result};
use crate::extract::{Corpus, DocumentSummary, load_corpus};
use crate::report::{Report, SYNTHESIS_FAILED_NOTE, summary_lines, write_report};

/// Parameters for the ask command.
#[derive(Debug, Clone)]
pub struct AskParams<'a> {
    /// The question to answer.
    pub question: &'a str,
    /// Directory containing `.docx` files.
    pub data_dir: &'a Path,
    /// Directory for the saved report.
    pub output_dir: &'a Path,
    /// Skip writing the report.
    pub no_report: bool,
    /// LLM provider override.
    pub provider: Option<&'a str>,
    /// Primary model override.
    pub primary_model: Option<&'a str>,
    /// Fallback model override.
    pub fallback_model: Option<&'a str>,
    /// Chunk size budget override.
    pub max_chunk_size: Option<usize>,
    /// Chunk size unit override.
    pub size_unit: Option<SizeUnit>,
    /// Word budget override.
    pub word_budget: Option<usize>,
    /// Attempts per model override.
    pub max_retries: Option<u32>,
    /// Per-request timeout override, in seconds.
    pub timeout_secs: Option<u64>,
    /// Concurrency override.
    pub concurrency: Option<usize>,
    /// Per-worker request spacing, in milliseconds.
    pub request_delay_ms: Option<u64>,
    /// Prompt template directory.
    pub prompt_dir: Option<&'a Path>,
}

/// JSON shape of a successful `ask`.
#[derive(Debug, Serialize)]
struct AskOutput<'a> {
    question: &'a str,
    #[serde(flatten)]
    answer: &'a FinalAnswer,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<String>,
    documents: &'a [DocumentSummary],
}

/// Executes the CLI command.
///
/// # Arguments
///
/// * `cli` - Parsed CLI arguments.
///
/// # Returns
///
/// Result with output string on success.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);

    match &cli.command {
        Commands::Ask {
            question,
            data_dir,
            output_dir,
            no_report,
            provider,
            primary_model,
            fallback_model,
            max_chunk_size,
            size_unit,
            word_budget,
            max_retries,
            timeout_secs,
            concurrency,
            request_delay_ms,
            prompt_dir,
        } => {
            let params = AskParams {
                question,
                data_dir,
                output_dir,
                no_report: *no_report,
                provider: provider.as_deref(),
                primary_model: primary_model.as_deref(),
                fallback_model: fallback_model.as_deref(),
                max_chunk_size: *max_chunk_size,
                size_unit: *size_unit,
                word_budget: *word_budget,
                max_retries: *max_retries,
                timeout_secs: *timeout_secs,
                concurrency: *concurrency,
                request_delay_ms: *request_delay_ms,
                prompt_dir: prompt_dir.as_deref(),
            };
            cmd_ask(&params, format)
        }
        Commands::Plan {
            data_dir,
            max_chunk_size,
            size_unit,
        } => cmd_plan(data_dir, *max_chunk_size, *size_unit, format),
        Commands::InitPrompts { dir } => cmd_init_prompts(dir.as_deref(), format),
    }
}

/// Builds the pipeline configuration from the environment plus CLI overrides.
fn build_config(params: &AskParams<'_>) -> Result<AgentConfig> {
    let mut builder = AgentConfig::builder();
    if let Some(provider) = params.provider {
        builder = builder.provider(provider);
    }
    builder = builder.from_env();
    if let Some(model) = params.primary_model {
        builder = builder.primary_model(model);
    }
    if let Some(model) = params.fallback_model {
        builder = builder.fallback_model(model);
    }
    if let Some(n) = params.max_chunk_size {
        builder = builder.max_chunk_size(n);
    }
    if let Some(unit) = params.size_unit {
        builder = builder.size_unit(unit);
    }
    if let Some(n) = params.word_budget {
        builder = builder.word_budget(n);
    }
    if let Some(n) = params.max_retries {
        builder = builder.max_retries(n);
    }
    if let Some(secs) = params.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    if let Some(n) = params.concurrency {
        builder = builder.max_concurrency(n);
    }
    if let Some(ms) = params.request_delay_ms {
        builder = builder.request_delay(Duration::from_millis(ms));
    }
    if let Some(dir) = params.prompt_dir {
        builder = builder.prompt_dir(dir);
    }

    let config = builder
        .build()
        .map_err(|e| CommandError::ExecutionFailed(format!("Configuration error: {e}")))?;

    if config.word_budget == 0 {
        return Err(CommandError::InvalidArgument("word budget must be at least 1".to_string()).into());
    }
    if config.max_chunk_size == 0 {
        return Err(
            CommandError::InvalidArgument("max chunk size must be at least 1".to_string()).into(),
        );
    }
    Ok(config)
}

/// Answers a question over the corpus and optionally saves a report.
fn cmd_ask(params: &AskParams<'_>, format: OutputFormat) -> Result<String> {
    if params.question.trim().is_empty() {
        return Err(CommandError::InvalidArgument("question cannot be empty".to_string()).into());
    }

    let corpus = load_corpus(params.data_dir)?;
    info!(
        documents = corpus.documents.len(),
        articles = corpus.articles.len(),
        chars = corpus.total_chars(),
        "corpus loaded"
    );

    let config = build_config(params)?;
    let provider = create_provider(&config)
        .map_err(|e| CommandError::ExecutionFailed(format!("Provider creation failed: {e}")))?;

    let orchestrator = Orchestrator::new(provider, config);
    let cancel = orchestrator.cancellation_token();

    // Create tokio runtime as sync/async bridge
    let rt = tokio::runtime::Runtime::new().map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}"))
    })?;

    let Corpus {
        articles,
        documents,
    } = corpus;
    let result = rt.block_on(async {
        let interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, cancelling outstanding requests");
                interrupt.cancel();
            }
        });
        orchestrator.query(articles, params.question).await
    });

    let answer =
        result.map_err(|e| CommandError::ExecutionFailed(format!("Query failed: {e}")))?;

    let report_path = if params.no_report {
        None
    } else {
        let report = Report {
            question: params.question.trim(),
            answer: &answer,
            generated_at: Local::now(),
        };
        let path = write_report(params.output_dir, &report)?;
        info!(path = %path.display(), "report saved");
        Some(path)
    };

    match format {
        OutputFormat::Text => Ok(format_answer_text(&answer, report_path.as_deref())),
        OutputFormat::Json => {
            let output = AskOutput {
                question: params.question.trim(),
                answer: &answer,
                report: report_path.map(|p| p.to_string_lossy().into_owned()),
                documents: &documents,
            };
            serde_json::to_string_pretty(&output).map_err(|e| {
                CommandError::OutputFormat(format!("JSON serialization failed: {e}")).into()
            })
        }
    }
}

fn format_answer_text(answer: &FinalAnswer, report_path: Option<&Path>) -> String {
    let mut output = String::new();
    if answer.technical_summary.synthesis_failed {
        output.push_str(SYNTHESIS_FAILED_NOTE);
        output.push_str("\n\n");
    }
    output.push_str(answer.text.trim_end());
    output.push_str("\n\n---\n");
    for line in summary_lines(&answer.technical_summary) {
        output.push_str(&line);
        output.push('\n');
    }
    if !answer.citations_present {
        output.push_str("Note: the answer contains no article citations\n");
    }
    if let Some(path) = report_path {
        output.push_str(&format!("Report saved to: {}\n", path.display()));
    }
    output
}

/// Shows the chunk plan for the corpus without calling a model.
fn cmd_plan(
    data_dir: &Path,
    max_chunk_size: Option<usize>,
    size_unit: Option<SizeUnit>,
    format: OutputFormat,
) -> Result<String> {
    let max_chunk_size = max_chunk_size
        .or_else(|| env_parse("DOCQA_MAX_CHUNK_SIZE"))
        .unwrap_or(DEFAULT_MAX_CHUNK_SIZE);
    let unit = size_unit
        .or_else(|| env_parse("DOCQA_SIZE_UNIT"))
        .unwrap_or_default();
    if max_chunk_size == 0 {
        return Err(
            CommandError::InvalidArgument("max chunk size must be at least 1".to_string()).into(),
        );
    }

    let corpus = load_corpus(data_dir)?;
    let documents = corpus.documents.clone();
    let total_chars = corpus.total_chars();
    let article_count = corpus.articles.len();
    let chunks = plan_with_unit(corpus.articles, max_chunk_size, unit)?;

    match format {
        OutputFormat::Text => {
            let mut output = format!(
                "Documents: {} | Articles: {article_count} | Characters: {total_chars}\n",
                documents.len()
            );
            for doc in &documents {
                match &doc.error {
                    Some(err) => output.push_str(&format!("  {} (skipped: {err})\n", doc.name)),
                    None => output.push_str(&format!("  {} ({} articles)\n", doc.name, doc.articles)),
                }
            }
            output.push_str(&format!(
                "\nChunks: {} (max {max_chunk_size} {unit})\n",
                chunks.len()
            ));
            for chunk in &chunks {
                output.push_str(&format!(
                    "  Chunk {}: {} article(s), ~{} {unit}{}\n",
                    chunk.index + 1,
                    chunk.articles.len(),
                    chunk.estimated_size,
                    if chunk.oversized { " [oversized]" } else { "" }
                ));
            }
            Ok(output)
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "documents": documents,
                "articles": article_count,
                "total_chars": total_chars,
                "max_chunk_size": max_chunk_size,
                "size_unit": unit,
                "chunks": chunks.iter().map(|c| serde_json::json!({
                    "index": c.index,
                    "articles": c.articles.len(),
                    "titles": c.articles.iter().map(|a| a.title.as_str()).collect::<Vec<_>>(),
                    "estimated_size": c.estimated_size,
                    "oversized": c.oversized,
                })).collect::<Vec<_>>(),
            });
            Ok(format.to_json(&json))
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Writes the default prompt templates to disk.
fn cmd_init_prompts(dir: Option<&Path>, format: OutputFormat) -> Result<String> {
    let target_dir = dir
        .map(PathBuf::from)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| {
            CommandError::ExecutionFailed(
                "Could not determine home directory for default prompt path".to_string(),
            )
        })?;

    let written = PromptSet::write_defaults(&target_dir).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write prompt templates: {e}"))
    })?;

    match format {
        OutputFormat::Text => {
            if written.is_empty() {
                Ok(format!(
                    "All prompt templates already exist in: {}\n",
                    target_dir.display()
                ))
            } else {
                let mut output = format!(
                    "Wrote {} prompt template(s) to: {}\n",
                    written.len(),
                    target_dir.display()
                );
                for path in &written {
                    output.push_str(&format!(
                        "  {}\n",
                        path.file_name()
                            .and_then(|n| n.to_str())
                            .unwrap_or("unknown")
                    ));
                }
                output.push_str("\nEdit these files to customize the system prompts.\n");
                Ok(output)
            }
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "directory": target_dir.to_string_lossy(),
                "written": written.iter().map(|p| p.to_string_lossy().into_owned()).collect::<Vec<_>>(),
                "count": written.len()
            });
            Ok(format.to_json(&json))
        }
    }
}
