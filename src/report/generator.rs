//! Report export.
//!
//! Writes laid-out documents and validated records to disk, and formats the
//! plain-text history listing.

use crate::history::HISTORY_CAPACITY;
use crate::models::EvaluationRecord;
use crate::report::layout::Document;
use crate::report::pdf::render_pdf;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Where an export lands.
///
/// An explicit `output` wins; if it names an existing directory the
/// suggested filename is placed inside it. Otherwise the file goes into
/// `output_dir`.
pub fn resolve_output_path(output: Option<&Path>, output_dir: &Path, filename: &str) -> PathBuf {
    match output {
        Some(path) if path.is_dir() => path.join(filename),
        Some(path) => path.to_path_buf(),
        None => output_dir.join(filename),
    }
}

/// The JSON counterpart of a suggested PDF filename.
pub fn json_filename(pdf_filename: &str) -> String {
    match pdf_filename.strip_suffix(".pdf") {
        Some(stem) => format!("{stem}.json"),
        None => format!("{pdf_filename}.json"),
    }
}

/// Render the document and write the PDF bytes to `path`.
pub fn write_pdf_report(doc: &Document, path: &Path) -> Result<()> {
    write_bytes(path, &render_pdf(doc))
}

/// Generate a JSON report.
pub fn generate_json_report(record: &EvaluationRecord) -> Result<String> {
    serde_json::to_string_pretty(record).map_err(Into::into)
}

/// Write a JSON report to a file.
pub fn write_json_report(record: &EvaluationRecord, path: &Path) -> Result<()> {
    let content = generate_json_report(record)?;
    write_bytes(path, content.as_bytes())
}

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(bytes)?;

    Ok(())
}

/// Plain-text listing of stored evaluations, newest first.
pub fn generate_history_listing(entries: &[EvaluationRecord]) -> String {
    if entries.is_empty() {
        return "No saved evaluations yet.\n".to_string();
    }

    let mut listing = String::new();
    listing.push_str(&format!(
        "Saved evaluations ({} of {}):\n\n",
        entries.len(),
        HISTORY_CAPACITY
    ));

    for (i, entry) in entries.iter().enumerate() {
        listing.push_str(&format!(
            "  [{}] {} ({})\n      {} | Score: {}\n",
            i,
            entry.project_name,
            entry.grant_name,
            entry.timestamp.format("%Y-%m-%d %H:%M UTC"),
            entry.display_total()
        ));
    }

    listing.push('\n');
    listing.push_str("Re-render one with --from-history <INDEX>.\n");

    listing
}
