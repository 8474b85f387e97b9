//! Output formatting and styling module.
//!
//! All human-readable CLI output goes through [`OutputFormatter`] so that
//! styling stays consistent.

use colored::*;
use std::collections::BTreeMap;
use std::path::Path;

use crate::classifier::NestMapping;
use crate::report::{NestOutcome, NestReport};

pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Prints a table of file counts per group with a total row.
    pub fn summary_table(group_counts: &BTreeMap<String, usize>, total_files: usize) {
        Self::header("SUMMARY");

        let width = group_counts
            .keys()
            .map(|name| name.len())
            .max()
            .unwrap_or(0)
            .max(5); // "Group"

        println!(
            "{:<width$} | {}",
            "Group".bold(),
            "Files".bold(),
            width = width
        );
        println!("{}", "-".repeat(width + 10));

        for (group, count) in group_counts {
            println!(
                "{:<width$} | {} {}",
                group,
                count.to_string().green(),
                plural(*count),
                width = width
            );
        }

        println!("{}", "-".repeat(width + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total_files.to_string().green().bold(),
            plural(total_files),
            width = width
        );
    }

    /// Prints what a run would do without doing it.
    pub fn plan(root: &Path, mapping: &NestMapping) {
        Self::dry_run_notice(&format!("Analyzing contents of: {}", root.display()));

        if mapping.is_empty() {
            Self::info("No files found to nest.");
            return;
        }

        for (source, group) in mapping.iter() {
            let name = source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            println!(" - {}", name);
            println!("   → Would move to {}/", group);
        }

        Self::summary_table(&mapping.group_counts(), mapping.len());
        if mapping.skipped > 0 {
            Self::info(&format!("{} files left in place (not eligible)", mapping.skipped));
        }
        Self::success("Dry run complete. No files were modified.");
    }

    /// Prints the result of a completed run.
    pub fn report(report: &NestReport) {
        if let Some(archive) = &report.backup {
            Self::success(&format!("Backup written to {}", archive.display()));
        }

        let mut counts = BTreeMap::new();
        for moved in &report.moved {
            *counts.entry(moved.group.clone()).or_insert(0) += 1;
        }
        if !counts.is_empty() {
            Self::summary_table(&counts, report.moved.len());
        }

        if !report.failed.is_empty() {
            Self::header("FAILED");
            for failure in &report.failed {
                Self::error(&format!("{}: {}", failure.source.display(), failure.error));
            }
        }

        println!();
        println!(
            "Processed {} {} ({} moved, {} failed, {} skipped, {} already nested)",
            report.processed(),
            plural(report.processed()),
            report.moved.len(),
            report.failed.len(),
            report.skipped,
            report.already_nested
        );
        if report.deferred > 0 {
            Self::info(&format!(
                "{} files deferred by the move limit; run again to continue",
                report.deferred
            ));
        }

        match report.outcome() {
            NestOutcome::Succeeded => Self::success("Nesting complete!"),
            NestOutcome::SucceededWithFailures { failed } => Self::warning(&format!(
                "Nesting complete with {} {} that could not be moved",
                failed,
                plural(failed)
            )),
            NestOutcome::Cancelled { failed: 0 } => {
                Self::warning("Nesting cancelled; files already moved stay in their folders")
            }
            NestOutcome::Cancelled { failed } => Self::warning(&format!(
                "Nesting cancelled after {} {} could not be moved; files already moved stay in their folders",
                failed,
                plural(failed)
            )),
        }
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}
