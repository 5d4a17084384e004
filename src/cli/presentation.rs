//! CLI presentation: text and JSON renderings of command results.

use crate::archive::{EntryInfo, ExtractReport, VerifyReport};
use crate::error::ApiError;
use crate::pipeline::BuildReport;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use serde::Serialize;
use std::path::Path;

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ApiError::ConfigError(format!("Failed to render JSON: {}", e)))
}

pub fn format_build_report_text(report: &BuildReport) -> String {
    let stats = &report.stats;
    let mut out = format!(
        "Archive written: {}\n  Root: {}\n  Blocks: {}\n  Archive bytes: {}\n  Folders: {}\n  Files: {}\n  Data bytes: {}\n  Leaves: {}\n  Interims: {} file, {} folder",
        report.archive.path.display(),
        report.root,
        report.archive.blocks,
        report.archive.bytes,
        stats.folders,
        stats.files,
        stats.bytes,
        stats.leaves,
        stats.file_interims,
        stats.folder_interims,
    );
    if let Some(ref audit) = report.audit_log {
        out.push_str(&format!("\n  Audit log: {}", audit.display()));
    }
    if let Some(ref store) = report.store {
        out.push_str(&format!("\n  Block store kept at: {}", store.display()));
    }
    if !report.skipped.is_empty() {
        out.push_str(&format!("\n\nSkipped ({}):", report.skipped.len()));
        for skipped in &report.skipped {
            out.push_str(&format!("\n  - {}: {}", skipped.path.display(), skipped.reason));
        }
    }
    out
}

pub fn format_build_report_json(report: &BuildReport) -> Result<String, ApiError> {
    to_json(report)
}

pub fn format_verify_report_text(path: &Path, report: &VerifyReport) -> String {
    let roots: Vec<String> = report.roots.iter().map(|r| r.to_string()).collect();
    let mut out = format!(
        "{}: {}\n  Roots: {}\n  Blocks: {}\n  Duplicate blocks: {}\n  Unreachable blocks: {}\n  Data bytes: {}",
        if report.is_valid() {
            "Verification passed"
        } else {
            "Verification failed"
        },
        path.display(),
        if roots.is_empty() {
            "-".to_string()
        } else {
            roots.join(", ")
        },
        report.blocks,
        report.duplicate_blocks,
        report.unreachable_blocks,
        report.total_size,
    );

    let problems = [
        ("Corrupt blocks", &report.corrupt_blocks),
        ("Missing blocks", &report.missing_blocks),
        ("Size mismatches", &report.size_mismatches),
    ];
    for (label, ids) in problems {
        if !ids.is_empty() {
            out.push_str(&format!("\n\n{} ({}):", label, ids.len()));
            for id in ids {
                out.push_str(&format!("\n  - {}", id));
            }
        }
    }
    out
}

pub fn format_verify_report_json(report: &VerifyReport) -> Result<String, ApiError> {
    let out = serde_json::json!({
        "valid": report.is_valid(),
        "report": report,
    });
    to_json(&out)
}

pub fn format_entries_table(entries: &[EntryInfo]) -> String {
    if entries.is_empty() {
        return "Archive root has no entries.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Name", "Kind", "Size", "Links", "ContentId"]);
    for entry in entries {
        table.add_row(vec![
            entry.name.clone(),
            format!("{:?}", entry.kind),
            entry.size.to_string(),
            entry.links.to_string(),
            entry.id.to_string(),
        ]);
    }
    table.to_string()
}

pub fn format_entries_json(entries: &[EntryInfo]) -> Result<String, ApiError> {
    to_json(entries)
}

pub fn format_extract_report(dest: &Path, report: &ExtractReport) -> String {
    format!(
        "Extracted to {}\n  Files: {}\n  Directories: {}\n  Bytes: {}",
        dest.display(),
        report.files,
        report.directories,
        report.bytes
    )
}
