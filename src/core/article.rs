//! Article records extracted from source documents.

use serde::{Deserialize, Serialize};

/// A single article extracted from a Word document.
///
/// Immutable once extracted. `source` records the document the article
/// came from; it is attribution metadata only and never influences
/// chunk boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    /// Article headline.
    pub title: String,
    /// Publication name (empty when unknown).
    pub publication: String,
    /// Publication date as written in the source (empty when unknown).
    pub date: String,
    /// Full article text.
    pub body: String,
    /// File name of the originating document.
    #[serde(default)]
    pub source: String,
}

impl ArticleRecord {
    /// Creates a record without source attribution.
    pub fn new(
        title: impl Into<String>,
        publication: impl Into<String>,
        date: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            publication: publication.into(),
            date: date.into(),
            body: body.into(),
            source: String::new(),
        }
    }

    /// Sets the originating document.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Body length in characters (not bytes).
    pub fn body_chars(&self) -> usize {
        self.body.chars().count()
    }

    /// Citation label in the format the model is asked to use.
    ///
    /// Omits the publication or date when the source did not carry one.
    pub fn citation(&self) -> String {
        let mut parts = vec![format!("Title: \"{}\"", self.title)];
        if !self.publication.is_empty() {
            parts.push(format!("Publication: \"{}\"", self.publication));
        }
        if !self.date.is_empty() {
            parts.push(format!("Date: {}", self.date));
        }
        format!("({})", parts.join(", "))
    }
}
