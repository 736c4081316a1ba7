//! Core domain types shared by every layer.
//!
//! Articles are produced by the extractor and consumed by the chunk
//! planner; the text helpers enforce the answer word budget and check
//! citation presence.

pub mod article;
pub mod text;

pub use article::ArticleRecord;
pub use text::{Truncation, has_citation, truncate_to_word_budget, word_count};
