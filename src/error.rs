//! Error types for docqa.
//!
//! Library layers return their own `thiserror` enums; [`Error`] unifies
//! them for the CLI. Model calls surface a tagged [`ProviderError`] so the
//! model client can decide between backoff, fallback, and giving up by
//! matching on the tag instead of inspecting messages.

use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error for CLI commands.
#[derive(Debug, Error)]
pub enum Error {
    /// Query pipeline failure.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// Document extraction failure.
    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// Report writing failure.
    #[error(transparent)]
    Report(#[from] ReportError),

    /// Command execution failure.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// I/O failure outside the other layers.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome tag of a single failed provider call.
///
/// Every provider maps its transport and API errors onto exactly one of
/// these classes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The model is overloaded or unavailable. Triggers an immediate
    /// switch to the fallback model, never a backoff.
    #[error("model '{model}' is overloaded: {message}")]
    Overloaded {
        /// Model identifier that reported the overload.
        model: String,
        /// Provider message.
        message: String,
    },

    /// Network failure, timeout, rate limit, or server hiccup. Retried
    /// with exponential backoff.
    #[error("transient failure{}: {message}", status_suffix(.status))]
    Transient {
        /// Error description.
        message: String,
        /// HTTP status, when one was received.
        status: Option<u16>,
    },

    /// Authentication failure, invalid request, or malformed response.
    /// Never retried.
    #[error("request failed{}: {message}", status_suffix(.status))]
    Fatal {
        /// Error description.
        message: String,
        /// HTTP status, when one was received.
        status: Option<u16>,
    },
}

#[allow(clippy::ref_option)]
fn status_suffix(status: &Option<u16>) -> String {
    status.map_or_else(String::new, |s| format!(" (HTTP {s})"))
}

impl ProviderError {
    /// Creates a transient error without an HTTP status.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
            status: None,
        }
    }

    /// Creates a fatal error without an HTTP status.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal {
            message: message.into(),
            status: None,
        }
    }
}

/// Errors from the chunked query pipeline.
#[derive(Debug, Clone, Error)]
pub enum AgentError {
    /// No API key was configured.
    #[error(
        "API key not found. Set ANTHROPIC_API_KEY (or OPENAI_API_KEY for the openai provider), \
         or DOCQA_API_KEY"
    )]
    ApiKeyMissing,

    /// Unknown provider name.
    #[error("unsupported provider: {name}")]
    UnsupportedProvider {
        /// Requested provider name.
        name: String,
    },

    /// There are no articles to question.
    #[error("no articles were extracted; there is nothing to question")]
    EmptyCorpus,

    /// Transient failures persisted through every retry.
    #[error("gave up after {attempts} attempts on {model}: {message}")]
    ChunkTransient {
        /// Attempts made against the last model tried.
        attempts: u32,
        /// Model identifier.
        model: String,
        /// Last failure description.
        message: String,
    },

    /// The fallback model was overloaded too.
    #[error("model '{model}' is overloaded and no further fallback is available")]
    ModelOverloaded {
        /// Model identifier that reported the overload.
        model: String,
    },

    /// Non-retryable failure for a single request.
    #[error("request to {model} failed: {message}")]
    ChunkFailed {
        /// Model identifier.
        model: String,
        /// Failure description.
        message: String,
    },

    /// Every chunk failed; nothing can be synthesized.
    #[error("all {total} chunk(s) failed: {}", .reasons.join("; "))]
    AllChunksFailed {
        /// Number of chunks attempted.
        total: usize,
        /// Per-chunk failure descriptions.
        reasons: Vec<String>,
    },

    /// The merge request failed after retries.
    #[error("synthesis failed: {message}")]
    SynthesisFailed {
        /// Failure description.
        message: String,
    },

    /// The run was cancelled before the request completed.
    #[error("cancelled")]
    Cancelled,

    /// Pipeline wiring failure (task join, invalid input).
    #[error("orchestration error: {message}")]
    Orchestration {
        /// Error description.
        message: String,
    },
}

/// Errors from reading Word documents.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The data directory does not exist.
    #[error("data directory '{}' not found", .path.display())]
    DirectoryNotFound {
        /// Missing directory.
        path: PathBuf,
    },

    /// The data directory contains no usable `.docx` files.
    #[error("no .docx files found in '{}'", .path.display())]
    NoDocuments {
        /// Searched directory.
        path: PathBuf,
    },

    /// The file is not a readable zip container.
    #[error("error reading Word document '{}': {message}", .path.display())]
    Archive {
        /// Offending file.
        path: PathBuf,
        /// Container error.
        message: String,
    },

    /// The main document part could not be parsed.
    #[error("malformed document XML in '{}': {message}", .path.display())]
    Xml {
        /// Offending file.
        path: PathBuf,
        /// Parser error.
        message: String,
    },

    /// I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from writing the answer report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The zip container could not be written.
    #[error("failed to write report archive: {0}")]
    Archive(String),
}

impl From<zip::result::ZipError> for ReportError {
    fn from(e: zip::result::ZipError) -> Self {
        Self::Archive(e.to_string())
    }
}

/// Errors from CLI command handling.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Command could not run to completion.
    #[error("{0}")]
    ExecutionFailed(String),

    /// Output could not be formatted.
    #[error("output formatting failed: {0}")]
    OutputFormat(String),

    /// Argument value was rejected.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
