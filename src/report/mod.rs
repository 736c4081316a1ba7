//! Answer reports.
//!
//! Saves each answer as a timestamped Word document and renders the
//! technical summary as plain lines shared by the report and the CLI.

pub mod docx;

pub use docx::{Report, SYNTHESIS_FAILED_NOTE, document_xml, report_file_name, write_report};

use crate::agent::{ChunkStatus, SynthesisMode, TechnicalSummary};

/// Renders a technical summary as human-readable lines.
pub fn summary_lines(summary: &TechnicalSummary) -> Vec<String> {
    let mut lines = vec![format!(
        "Chunks: {} total, {} succeeded, {} failed",
        summary.chunks_total, summary.chunks_succeeded, summary.chunks_failed
    )];

    let synthesis = match (summary.synthesis_mode, summary.synthesis_model) {
        (SynthesisMode::Merged, Some(tier)) => format!("merged by the {tier} model"),
        (SynthesisMode::Merged, None) => "merged".to_string(),
        (SynthesisMode::Single, _) => "single chunk answer used directly".to_string(),
        (SynthesisMode::Concatenated, _) => "failed; chunk answers concatenated".to_string(),
    };
    lines.push(format!("Synthesis: {synthesis}"));
    if let Some(ref error) = summary.synthesis_error {
        lines.push(format!("Synthesis error: {error}"));
    }
    if summary.budget_rerequested {
        lines.push("Merged answer exceeded the word budget and was re-requested once".to_string());
    }

    lines.push(format!(
        "Words: {} of {}{}",
        summary.word_count,
        summary.word_budget,
        if summary.truncated { " (truncated)" } else { "" }
    ));
    lines.push(format!("Tokens: {}", summary.total_tokens));
    lines.push(format!("Elapsed: {:.1}s", summary.elapsed.as_secs_f64()));

    for chunk in &summary.chunks {
        let size = if chunk.oversized {
            format!("{} (oversized)", chunk.estimated_size)
        } else {
            chunk.estimated_size.to_string()
        };
        let line = match chunk.status {
            ChunkStatus::Success => format!(
                "Chunk {}: success via {} model {} ({} articles, size {size})",
                chunk.index + 1,
                chunk
                    .model_used
                    .map_or_else(|| "unknown".to_string(), |t| t.to_string()),
                chunk.model.as_deref().unwrap_or("unknown"),
                chunk.articles,
            ),
            ChunkStatus::Failed => format!(
                "Chunk {}: failed ({} articles, size {size}): {}",
                chunk.index + 1,
                chunk.articles,
                chunk.error.as_deref().unwrap_or("unknown error"),
            ),
        };
        lines.push(line);
    }

    lines
}
