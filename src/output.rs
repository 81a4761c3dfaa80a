//! CLI output formatting.
//!
//! Every diagnostic names the logical id or file it is about, so a line can
//! be traced back to the notebook directory without extra context.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! Posts
//! hiking: 2024-01-01-hiking.md + hiking.ipynb
//!
//! Unmatched
//!     orphan: missing notebook (found 2024-03-05-orphan.md)
//!
//! Ambiguous
//!     trip: 2024-01-01-trip.md and 2024-02-01-trip.md
//! ```
//!
//! ## Convert
//!
//! ```text
//! Unmatched pair, orphan: missing notebook (found 2024-03-05-orphan.md)
//! Ambiguous front matter, trip: 2024-01-01-trip.md and 2024-02-01-trip.md
//!     Image: ./assets/images/hiking_1_0.png (5120 bytes)
//! Written 1834 bytes to ./_posts/2024-01-01-hiking.md
//! ```
//!
//! # Architecture
//!
//! `format_*` functions return lines and do no I/O; `print_*` wrappers write
//! them to stdout.

use crate::convert::{ConvertEvent, RunSummary};
use crate::naming::FileKind;
use crate::scan::{Incomplete, ScanReport};

const INDENT: &str = "    ";

/// `"missing notebook"`, `"missing front matter and notebook"`.
fn describe_missing(missing: &[FileKind]) -> String {
    let labels: Vec<&str> = missing.iter().map(|k| k.label()).collect();
    format!("missing {}", labels.join(" and "))
}

/// One-line description of an incomplete candidate, without its prefix.
fn unmatched_line(logical_id: &str, present: Option<&str>, missing: &[FileKind]) -> String {
    match present {
        Some(file) => format!("{}: {} (found {})", logical_id, describe_missing(missing), file),
        None => format!("{}: {}", logical_id, describe_missing(missing)),
    }
}

/// `"trip: 2024-01-01-trip.md and 2024-02-01-trip.md"`.
fn ambiguous_line(logical_id: &str, front_matter: &[String]) -> String {
    format!("{}: {}", logical_id, front_matter.join(" and "))
}

// ============================================================================
// check
// ============================================================================

/// Format the scan report shown by `check`.
pub fn format_scan_report(report: &ScanReport) -> Vec<String> {
    let mut lines = Vec::new();

    lines.push("Posts".to_string());
    if report.matches.is_empty() {
        lines.push(format!("{INDENT}(none)"));
    }
    for post in &report.matches {
        lines.push(format!(
            "{}: {} + {}",
            post.logical_id, post.front_matter, post.notebook
        ));
    }

    if !report.unmatched.is_empty() {
        lines.push(String::new());
        lines.push("Unmatched".to_string());
        for incomplete in &report.unmatched {
            lines.push(format!("{INDENT}{}", incomplete_line(incomplete)));
        }
    }

    if !report.ambiguous.is_empty() {
        lines.push(String::new());
        lines.push("Ambiguous".to_string());
        for ambiguous in &report.ambiguous {
            lines.push(format!(
                "{INDENT}{}",
                ambiguous_line(&ambiguous.logical_id, &ambiguous.front_matter)
            ));
        }
    }

    lines
}

fn incomplete_line(incomplete: &Incomplete) -> String {
    unmatched_line(
        &incomplete.partial.logical_id,
        incomplete.present(),
        &incomplete.missing,
    )
}

/// Print the scan report to stdout.
pub fn print_scan_report(report: &ScanReport) {
    for line in format_scan_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// convert
// ============================================================================

/// Format a single conversion event as display lines.
pub fn format_convert_event(event: &ConvertEvent) -> Vec<String> {
    match event {
        ConvertEvent::Unmatched {
            logical_id,
            present,
            missing,
        } => vec![format!(
            "Unmatched pair, {}",
            unmatched_line(logical_id, present.as_deref(), missing)
        )],
        ConvertEvent::Ambiguous {
            logical_id,
            front_matter,
        } => vec![format!(
            "Ambiguous front matter, {}",
            ambiguous_line(logical_id, front_matter)
        )],
        ConvertEvent::ImageWritten { path, bytes, .. } => {
            vec![format!("{INDENT}Image: {} ({} bytes)", path.display(), bytes)]
        }
        ConvertEvent::PostWritten { path, bytes, .. } => {
            vec![format!("Written {} bytes to {}", bytes, path.display())]
        }
        ConvertEvent::RenderSkipped {
            logical_id,
            notebook,
            error,
        } => vec![
            format!("Skipped {} ({})", logical_id, notebook),
            format!("{INDENT}{error}"),
        ],
    }
}

/// Print a conversion event to stdout.
pub fn print_convert_event(event: &ConvertEvent) {
    for line in format_convert_event(event) {
        println!("{}", line);
    }
}

pub fn format_summary(summary: &RunSummary) -> String {
    format!("Converted {}", summary)
}
