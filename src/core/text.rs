//! Word counting, budget truncation, and citation detection.
//!
//! Words are Unicode word segments (UAX #29), so punctuation and
//! whitespace never count toward the budget.

use std::sync::LazyLock;

use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

/// Parenthesised citation carrying at least a `Title:` field.
static CITATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\(\s*title:\s*[^)]+\)").unwrap_or_else(|_| unreachable!("static pattern"))
});

/// Result of enforcing a word budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Truncation {
    /// Text within budget.
    pub text: String,
    /// Whether anything was cut.
    pub truncated: bool,
}

/// Counts words in `text`.
pub fn word_count(text: &str) -> usize {
    text.unicode_words().count()
}

/// Returns `true` if `text` contains at least one `(Title: ...)` citation.
pub fn has_citation(text: &str) -> bool {
    CITATION_PATTERN.is_match(text)
}

/// Cuts `text` down to at most `budget` words.
///
/// Keeps the longest prefix of whole sentences that fits. When even the
/// first sentence is over budget, cuts at the last word boundary that
/// fits instead.
pub fn truncate_to_word_budget(text: &str, budget: usize) -> Truncation {
    if word_count(text) <= budget {
        return Truncation {
            text: text.to_string(),
            truncated: false,
        };
    }

    let mut end = 0;
    let mut words = 0;
    for (idx, sentence) in text.split_sentence_bound_indices() {
        let n = word_count(sentence);
        if words + n > budget {
            break;
        }
        words += n;
        end = idx + sentence.len();
    }

    if words == 0 {
        end = text
            .unicode_word_indices()
            .nth(budget)
            .map_or(text.len(), |(idx, _)| idx);
    }

    Truncation {
        text: text[..end].trim_end().to_string(),
        truncated: true,
    }
}
