//! Greedy whole-article chunk planner.
//!
//! [`plan`] is a pure function of the articles and the budget: no I/O, no
//! configuration reads, fully deterministic.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{ARTICLE_OVERHEAD_CHARS, CHARS_PER_TOKEN};
use crate::core::ArticleRecord;
use crate::error::AgentError;

/// Unit in which chunk sizes and the budget are measured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeUnit {
    /// Characters.
    #[default]
    Chars,
    /// Estimated tokens ([`CHARS_PER_TOKEN`] characters each, rounded up).
    Tokens,
}

impl SizeUnit {
    /// Converts a character count into this unit.
    pub const fn from_chars(self, chars: usize) -> usize {
        match self {
            Self::Chars => chars,
            Self::Tokens => chars.div_ceil(CHARS_PER_TOKEN),
        }
    }

    /// Returns the string representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Chars => "chars",
            Self::Tokens => "tokens",
        }
    }
}

impl fmt::Display for SizeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SizeUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "chars" | "characters" => Ok(Self::Chars),
            "tokens" => Ok(Self::Tokens),
            other => Err(format!("unknown size unit '{other}' (expected chars or tokens)")),
        }
    }
}

/// A group of whole articles submitted together in one model request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// Position in the plan (0-based).
    pub index: usize,
    /// Articles in input order.
    pub articles: Vec<ArticleRecord>,
    /// Estimated size in the plan's unit.
    pub estimated_size: usize,
    /// Single article larger than the budget, passed through whole.
    pub oversized: bool,
}

/// Estimated request size of one article: body plus fixed header overhead.
pub fn estimate_article_size(article: &ArticleRecord, unit: SizeUnit) -> usize {
    unit.from_chars(article.body_chars() + ARTICLE_OVERHEAD_CHARS)
}

/// Plans chunks with sizes measured in characters.
///
/// See [`plan_with_unit`].
pub fn plan(articles: Vec<ArticleRecord>, max_chunk_size: usize) -> Result<Vec<Chunk>, AgentError> {
    plan_with_unit(articles, max_chunk_size, SizeUnit::Chars)
}

/// Partitions `articles` into ordered chunks of at most `max_chunk_size`.
///
/// Articles accumulate into the current chunk while the running estimate
/// stays within budget; the article that would overflow starts the next
/// chunk. An article that alone exceeds the budget becomes an oversized
/// singleton chunk rather than being cut.
///
/// # Errors
///
/// Returns [`AgentError::EmptyCorpus`] if `articles` is empty.
pub fn plan_with_unit(
    articles: Vec<ArticleRecord>,
    max_chunk_size: usize,
    unit: SizeUnit,
) -> Result<Vec<Chunk>, AgentError> {
    if articles.is_empty() {
        return Err(AgentError::EmptyCorpus);
    }

    let mut chunks: Vec<Chunk> = Vec::new();
    let mut current: Vec<ArticleRecord> = Vec::new();
    let mut current_size = 0usize;

    for article in articles {
        let size = estimate_article_size(&article, unit);

        if size > max_chunk_size {
            close_chunk(&mut chunks, &mut current, &mut current_size, false);
            current.push(article);
            current_size = size;
            close_chunk(&mut chunks, &mut current, &mut current_size, true);
            continue;
        }

        if !current.is_empty() && current_size + size > max_chunk_size {
            close_chunk(&mut chunks, &mut current, &mut current_size, false);
        }
        current.push(article);
        current_size += size;
    }
    close_chunk(&mut chunks, &mut current, &mut current_size, false);

    Ok(chunks)
}

fn close_chunk(
    chunks: &mut Vec<Chunk>,
    current: &mut Vec<ArticleRecord>,
    current_size: &mut usize,
    oversized: bool,
) {
    if current.is_empty() {
        return;
    }
    chunks.push(Chunk {
        index: chunks.len(),
        articles: std::mem::take(current),
        estimated_size: std::mem::take(current_size),
        oversized,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds an article whose estimated char size is exactly `size`.
    fn article(title: &str, size: usize) -> ArticleRecord {
        let body = "x".repeat(size.saturating_sub(ARTICLE_OVERHEAD_CHARS));
        ArticleRecord::new(title, "Herald", "2024-01-01", body)
    }

    fn titles(chunk: &Chunk) -> Vec<&str> {
        chunk.articles.iter().map(|a| a.title.as_str()).collect()
    }

    #[test]
    fn test_empty_corpus() {
        let result = plan(Vec::new(), 1000);
        assert!(matches!(result, Err(AgentError::EmptyCorpus)));
    }

    #[test]
    fn test_three_articles_two_fit() {
        let articles = vec![article("A1", 400), article("A2", 400), article("A3", 400)];
        let chunks = plan(articles, 800).unwrap_or_else(|_| unreachable!());
        assert_eq!(chunks.len(), 2);
        assert_eq!(titles(&chunks[0]), vec!["A1", "A2"]);
        assert_eq!(titles(&chunks[1]), vec!["A3"]);
        assert_eq!(chunks[0].estimated_size, 800);
        assert_eq!(chunks[1].estimated_size, 400);
        assert!(!chunks[0].oversized);
    }

    #[test]
    fn test_oversized_singleton() {
        let articles = vec![article("A1", 300), article("BIG", 5000), article("A3", 300)];
        let chunks = plan(articles, 1000).unwrap_or_else(|_| unreachable!());
        assert_eq!(chunks.len(), 3);
        assert_eq!(titles(&chunks[1]), vec!["BIG"]);
        assert!(chunks[1].oversized);
        assert_eq!(chunks[1].estimated_size, 5000);
        assert!(!chunks[0].oversized);
        assert!(!chunks[2].oversized);
        // The oversized body is passed through whole
        assert_eq!(chunks[1].articles[0].body.len(), 5000 - ARTICLE_OVERHEAD_CHARS);
    }

    #[test]
    fn test_indices_sequential() {
        let articles = (0..7).map(|i| article(&format!("A{i}"), 500)).collect();
        let chunks = plan(articles, 1000).unwrap_or_else(|_| unreachable!());
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.index, i);
            assert!(!c.articles.is_empty());
        }
        assert_eq!(chunks.len(), 4);
    }

    #[test]
    fn test_exact_budget_fits() {
        let articles = vec![article("A1", 500), article("A2", 500)];
        let chunks = plan(articles, 1000).unwrap_or_else(|_| unreachable!());
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_token_unit() {
        // 800 chars = 200 tokens each
        let articles = vec![article("A1", 800), article("A2", 800), article("A3", 800)];
        let chunks =
            plan_with_unit(articles, 400, SizeUnit::Tokens).unwrap_or_else(|_| unreachable!());
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].estimated_size, 400);
    }

    #[test]
    fn test_zero_budget_all_singletons() {
        let articles = vec![article("A1", 300), article("A2", 300)];
        let chunks = plan(articles, 0).unwrap_or_else(|_| unreachable!());
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.oversized && c.articles.len() == 1));
    }

    #[test]
    fn test_size_unit_parse() {
        assert_eq!("chars".parse::<SizeUnit>(), Ok(SizeUnit::Chars));
        assert_eq!("TOKENS".parse::<SizeUnit>(), Ok(SizeUnit::Tokens));
        assert!("bytes".parse::<SizeUnit>().is_err());
        assert_eq!(SizeUnit::Tokens.from_chars(9), 3);
    }
}
