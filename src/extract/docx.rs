//! Article extraction from `.docx` files.
//!
//! A `.docx` file is a zip container; the body lives in
//! `word/document.xml`. Each paragraph styled as a heading starts a new
//! article whose body is every following paragraph up to the next heading.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use regex::Regex;
use zip::ZipArchive;

use crate::core::ArticleRecord;
use crate::error::ExtractError;

/// Path of the main document part inside the container.
const DOCUMENT_PART: &str = "word/document.xml";

/// Leading body lines inspected for publication/date metadata.
const METADATA_SCAN_LINES: usize = 4;

/// Longest line accepted as an unlabelled publication name.
const MAX_PUBLICATION_LEN: usize = 80;

static LABELLED_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:date|published|publication date|load-date)\s*:\s*(.+)$")
        .unwrap_or_else(|_| unreachable!("static pattern"))
});

static LABELLED_PUBLICATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:publication|source|publisher)\s*:\s*(.+)$")
        .unwrap_or_else(|_| unreachable!("static pattern"))
});

static BARE_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)^(?:
            (?:(?:mon|tues|wednes|thurs|fri|satur|sun)day,?\s+)?
            (?:jan|feb|mar|apr|may|jun|jul|aug|sep|sept|oct|nov|dec)[a-z]*\.?\s+\d{1,2},?\s+\d{4}
            (?:\s+(?:mon|tues|wednes|thurs|fri|satur|sun)day)?
          | \d{4}-\d{2}-\d{2}
          | \d{1,2}/\d{1,2}/\d{2,4}
        )$",
    )
    .unwrap_or_else(|_| unreachable!("static pattern"))
});

/// A paragraph from the document body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paragraph {
    /// Paragraph style id (e.g. `Heading1`), if any.
    pub style: Option<String>,
    /// Concatenated run text.
    pub text: String,
}

impl Paragraph {
    /// Whether this paragraph starts a new article.
    pub fn is_heading(&self) -> bool {
        self.style
            .as_deref()
            .is_some_and(|s| s.starts_with("Heading") || s == "Title")
    }
}

/// Extracts all articles from a `.docx` file.
///
/// Records carry the file name as their source.
///
/// # Errors
///
/// Returns [`ExtractError::Archive`] if the file is not a readable
/// Word container and [`ExtractError::Xml`] if the document part is
/// malformed.
pub fn extract_articles(path: &Path) -> Result<Vec<ArticleRecord>, ExtractError> {
    let archive_err = |message: String| ExtractError::Archive {
        path: path.to_path_buf(),
        message,
    };

    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file).map_err(|e| archive_err(e.to_string()))?;
    let mut part = archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| archive_err(format!("{DOCUMENT_PART}: {e}")))?;

    let mut bytes = Vec::new();
    part.read_to_end(&mut bytes)?;
    let xml = String::from_utf8_lossy(&bytes);

    let paragraphs = parse_paragraphs(&xml).map_err(|message| ExtractError::Xml {
        path: path.to_path_buf(),
        message,
    })?;

    let source = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(group_articles(&paragraphs, &source))
}

/// Parses WordprocessingML into paragraphs.
///
/// Text comes from `w:t` runs; inside a run `w:tab` becomes a tab and
/// `w:br`/`w:cr` a newline. Tab stops declared in paragraph properties
/// are not text.
pub fn parse_paragraphs(xml: &str) -> Result<Vec<Paragraph>, String> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current: Option<Paragraph> = None;
    let mut in_run = false;
    let mut in_text = false;

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:p" => current = Some(Paragraph::default()),
                b"w:r" => in_run = true,
                b"w:t" => in_text = true,
                b"w:pStyle" => set_style(&mut current, &e)?,
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:p" => paragraphs.push(Paragraph::default()),
                b"w:pStyle" => set_style(&mut current, &e)?,
                b"w:tab" if in_run => push_text(&mut current, "\t"),
                b"w:br" | b"w:cr" if in_run => push_text(&mut current, "\n"),
                _ => {}
            },
            Event::Text(t) if in_text => {
                let text = t.unescape().map_err(|e| e.to_string())?;
                push_text(&mut current, &text);
            }
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:r" => in_run = false,
                b"w:p" => {
                    if let Some(p) = current.take() {
                        paragraphs.push(p);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

fn set_style(current: &mut Option<Paragraph>, e: &BytesStart<'_>) -> Result<(), String> {
    let Some(p) = current.as_mut() else {
        return Ok(());
    };
    if let Some(attr) = e.try_get_attribute("w:val").map_err(|e| e.to_string())? {
        let value = attr.unescape_value().map_err(|e| e.to_string())?;
        p.style = Some(value.into_owned());
    }
    Ok(())
}

fn push_text(current: &mut Option<Paragraph>, text: &str) {
    if let Some(p) = current.as_mut() {
        p.text.push_str(text);
    }
}

/// Groups paragraphs into articles at heading boundaries.
///
/// Paragraphs before the first heading have no title and are dropped, as
/// are articles whose body ends up empty.
pub fn group_articles(paragraphs: &[Paragraph], source: &str) -> Vec<ArticleRecord> {
    let mut articles = Vec::new();
    let mut title: Option<&str> = None;
    let mut body: Vec<&str> = Vec::new();

    for p in paragraphs {
        if p.is_heading() {
            if let Some(t) = title {
                push_article(&mut articles, t, &body, source);
            }
            title = Some(p.text.trim());
            body.clear();
        } else {
            body.push(&p.text);
        }
    }
    if let Some(t) = title {
        push_article(&mut articles, t, &body, source);
    }

    articles
}

fn push_article(articles: &mut Vec<ArticleRecord>, title: &str, lines: &[&str], source: &str) {
    if title.is_empty() {
        return;
    }
    let (publication, date, consumed) = split_metadata(lines);
    let body = lines[consumed..].join("\n").trim().to_string();
    if body.is_empty() {
        return;
    }
    articles.push(ArticleRecord::new(title, publication, date, body).with_source(source));
}

/// Reads publication/date metadata from the leading body lines.
///
/// Returns the publication, the date, and how many lines were consumed.
fn split_metadata(lines: &[&str]) -> (String, String, usize) {
    let mut publication = String::new();
    let mut date = String::new();
    let mut consumed = 0;

    // Leading blank lines are skipped, not treated as the end of metadata.
    let mut idx = 0;
    let mut scanned = 0;
    while idx < lines.len() && scanned < METADATA_SCAN_LINES {
        let line = lines[idx].trim();
        idx += 1;
        if line.is_empty() {
            continue;
        }
        scanned += 1;

        if let Some(cap) = LABELLED_DATE.captures(line) {
            date = cap[1].trim().to_string();
        } else if let Some(cap) = LABELLED_PUBLICATION.captures(line) {
            publication = cap[1].trim().to_string();
        } else if date.is_empty() && BARE_DATE.is_match(line) {
            date = line.to_string();
        } else if publication.is_empty()
            && date.is_empty()
            && line.chars().count() <= MAX_PUBLICATION_LEN
            && !line.ends_with('.')
            && next_non_empty(lines, idx).is_some_and(|next| BARE_DATE.is_match(next))
        {
            publication = line.to_string();
        } else {
            break;
        }
        consumed = idx;
    }

    (publication, date, consumed)
}

fn next_non_empty<'a>(lines: &[&'a str], from: usize) -> Option<&'a str> {
    lines[from..]
        .iter()
        .map(|l| l.trim())
        .find(|l| !l.is_empty())
}
