//! Corpus loading from a directory of Word documents.
//!
//! Every `.docx` file in the directory is extracted in file-name order and
//! the articles are concatenated into one sequence. Unreadable files are
//! logged and skipped so one corrupt document does not sink the run.

pub mod docx;

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::core::ArticleRecord;
use crate::error::ExtractError;

pub use docx::{Paragraph, extract_articles, group_articles, parse_paragraphs};

/// Per-document extraction outcome.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    /// File name.
    pub name: String,
    /// Articles extracted (0 when skipped).
    pub articles: usize,
    /// Why the file was skipped, if it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Articles from every document in a directory.
#[derive(Debug, Clone, Serialize)]
pub struct Corpus {
    /// All articles, documents in file-name order.
    pub articles: Vec<ArticleRecord>,
    /// One entry per `.docx` file found.
    pub documents: Vec<DocumentSummary>,
}

impl Corpus {
    /// Total body characters across all articles.
    pub fn total_chars(&self) -> usize {
        self.articles.iter().map(ArticleRecord::body_chars).sum()
    }
}

/// Loads and concatenates articles from every `.docx` file in `dir`.
///
/// Word lock files (`~$*.docx`) are ignored.
///
/// # Errors
///
/// Returns [`ExtractError::DirectoryNotFound`] if `dir` does not exist and
/// [`ExtractError::NoDocuments`] if it holds no `.docx` files. A directory
/// whose documents yield no articles is not an error here; the chunk
/// planner reports it as an empty corpus.
pub fn load_corpus(dir: &Path) -> Result<Corpus, ExtractError> {
    if !dir.is_dir() {
        return Err(ExtractError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }

    let files = list_documents(dir)?;
    if files.is_empty() {
        return Err(ExtractError::NoDocuments {
            path: dir.to_path_buf(),
        });
    }

    let mut articles = Vec::new();
    let mut documents = Vec::with_capacity(files.len());

    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        match extract_articles(&path) {
            Ok(found) => {
                info!(document = %name, articles = found.len(), "processed document");
                documents.push(DocumentSummary {
                    name,
                    articles: found.len(),
                    error: None,
                });
                articles.extend(found);
            }
            Err(e) => {
                warn!(document = %name, error = %e, "could not process document, skipping");
                documents.push(DocumentSummary {
                    name,
                    articles: 0,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    Ok(Corpus {
        articles,
        documents,
    })
}

fn list_documents(dir: &Path) -> Result<Vec<PathBuf>, ExtractError> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_docx(path))
        .collect();
    files.sort();
    Ok(files)
}

fn is_docx(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    name.ends_with(".docx") && !name.starts_with("~$")
}
