//! Minimal WordprocessingML writer.
//!
//! Produces a `.docx` container holding the question, the answer, and the
//! technical summary. Only the parts Word needs to open the file are
//! written: content types, package relationships, styles, and the main
//! document.

use std::fmt::Write as _;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use quick_xml::escape::escape;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use super::summary_lines;
use crate::agent::FinalAnswer;
use crate::error::ReportError;

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/></Types>"#;

const PACKAGE_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:pPr><w:spacing w:after="120"/></w:pPr></w:style><w:style w:type="paragraph" w:styleId="Title"><w:name w:val="Title"/><w:basedOn w:val="Normal"/><w:rPr><w:b/><w:sz w:val="40"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/><w:pPr><w:spacing w:before="240"/></w:pPr><w:rPr><w:b/><w:sz w:val="32"/></w:rPr></w:style></w:styles>"#;

const WORD_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// Note placed above a concatenated answer.
pub const SYNTHESIS_FAILED_NOTE: &str = "Automatic synthesis failed. The answers from each \
     batch of articles are shown below as returned, without merging.";

/// Everything needed to render one report.
#[derive(Debug, Clone, Copy)]
pub struct Report<'a> {
    /// The question asked.
    pub question: &'a str,
    /// The answer and its diagnostics.
    pub answer: &'a FinalAnswer,
    /// When the answer was produced.
    pub generated_at: DateTime<Local>,
}

/// Timestamped report file name, e.g. `docqa_20240115_093000.docx`.
pub fn report_file_name(at: &DateTime<Local>) -> String {
    format!("docqa_{}.docx", at.format("%Y%m%d_%H%M%S"))
}

/// Writes `report` into `dir` and returns the file path.
///
/// # Errors
///
/// Returns [`ReportError`] if the directory cannot be created or the
/// archive cannot be written.
pub fn write_report(dir: &Path, report: &Report<'_>) -> Result<PathBuf, ReportError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(report_file_name(&report.generated_at));
    let file = std::fs::File::create(&path)?;

    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default();
    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES_XML.to_string()),
        ("_rels/.rels", PACKAGE_RELS_XML.to_string()),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS_XML.to_string()),
        ("word/styles.xml", STYLES_XML.to_string()),
        ("word/document.xml", document_xml(report)),
    ];
    for (name, content) in &parts {
        zip.start_file(*name, options)?;
        zip.write_all(content.as_bytes())?;
    }
    zip.finish()?;

    Ok(path)
}

/// Renders the main document part.
pub fn document_xml(report: &Report<'_>) -> String {
    let mut body = String::new();
    push_paragraph(&mut body, Some("Title"), "Document Question Report");

    push_paragraph(&mut body, Some("Heading1"), "Question");
    push_paragraph(&mut body, None, report.question);

    push_paragraph(&mut body, Some("Heading1"), "Answer");
    if report.answer.technical_summary.synthesis_failed {
        push_paragraph(&mut body, None, SYNTHESIS_FAILED_NOTE);
    }
    for line in report.answer.text.lines().filter(|l| !l.trim().is_empty()) {
        push_paragraph(&mut body, None, line.trim());
    }

    push_paragraph(&mut body, Some("Heading1"), "Technical Summary");
    for line in summary_lines(&report.answer.technical_summary) {
        push_paragraph(&mut body, None, &line);
    }

    push_paragraph(&mut body, None, &"_".repeat(60));
    push_italic_paragraph(
        &mut body,
        &format!(
            "Generated on: {}",
            report.generated_at.format("%Y-%m-%d %H:%M:%S")
        ),
    );

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <w:document xmlns:w=\"{WORD_NS}\"><w:body>{body}<w:sectPr/></w:body></w:document>"
    )
}

fn push_paragraph(out: &mut String, style: Option<&str>, text: &str) {
    out.push_str("<w:p>");
    if let Some(style) = style {
        let _ = write!(out, "<w:pPr><w:pStyle w:val=\"{style}\"/></w:pPr>");
    }
    let _ = write!(
        out,
        "<w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>",
        escape(text)
    );
}

fn push_italic_paragraph(out: &mut String, text: &str) {
    let _ = write!(
        out,
        "<w:p><w:r><w:rPr><w:i/></w:rPr><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>",
        escape(text)
    );
}
