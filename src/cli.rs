//! Command-line interface module for birdnest.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing
//! - Merging command-line flags with the configuration file
//! - Interactive selection of the root directory
//! - Running or previewing the nest and printing the result

use clap::Parser;
use dialoguer::Input;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crate::classifier::NestMapping;
use crate::config::{ConflictPolicy, FileConfig, Overrides};
use crate::engine::Nest;
use crate::error::{NestError, NestResult};
use crate::output::OutputFormatter;
use crate::progress::{BarProgress, NoProgress, ProgressSink};
use crate::report::NestReport;

/// Exit code for a run that failed before changing anything.
pub const EXIT_ABORTED: u8 = 1;
/// Exit code for a run with per-file failures under `--strict`.
pub const EXIT_PARTIAL: u8 = 2;
/// Exit code for a run stopped by Ctrl-C, following the shell's 128 + SIGINT.
pub const EXIT_CANCELLED: u8 = 130;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "birdnest",
    version,
    about = "Nest files that share a name prefix into sub-folders"
)]
pub struct Cli {
    /// Directory to organize. Prompts for one when omitted.
    #[arg(value_hint = clap::ValueHint::DirPath)]
    pub root: Option<PathBuf>,

    /// Text separating the group prefix from the rest of the file name [default: _]
    #[arg(short, long)]
    pub separator: Option<String>,

    /// Only nest files with this extension (repeatable)
    #[arg(short = 't', long = "type", value_name = "EXT", action = clap::ArgAction::Append)]
    pub types: Vec<String>,

    /// Write a zip backup of the directory before moving anything
    #[arg(short, long)]
    pub backup: bool,

    /// Also pick up files one sub-directory level down
    #[arg(short, long)]
    pub recursive: bool,

    /// What to do when the destination file already exists [default: skip]
    #[arg(long, value_enum)]
    pub on_conflict: Option<ConflictPolicy>,

    /// Move at most this many files
    #[arg(long)]
    pub limit: Option<usize>,

    /// Show what would be moved without changing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Exit with a non-zero status when any file fails to move
    #[arg(long)]
    pub strict: bool,

    /// Print the final report as JSON
    #[arg(long)]
    pub json: bool,

    /// Configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            separator: self.separator.clone(),
            file_types: self.types.clone(),
            recursive: self.recursive,
            backup: self.backup,
            on_conflict: self.on_conflict,
            limit: self.limit,
            strict: self.strict,
        }
    }
}

/// What a CLI invocation produced.
#[derive(Debug)]
pub enum CliOutcome {
    /// Dry run: the mapping that would be applied.
    Planned(NestMapping),
    /// Real run.
    Nested { report: NestReport, strict: bool },
}

impl CliOutcome {
    /// Process exit code for this outcome.
    ///
    /// A cancelled run is never reported as success, strict or not.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliOutcome::Nested { report, .. } if report.cancelled => EXIT_CANCELLED,
            CliOutcome::Nested { report, strict: true } if !report.failed.is_empty() => {
                EXIT_PARTIAL
            }
            _ => 0,
        }
    }
}

/// Runs birdnest against `root` with the options in `cli`.
///
/// Loads the configuration file, applies the command-line overrides, then
/// either prints the plan (dry run) or performs the nest and prints the report.
///
/// # Errors
///
/// Returns an error if nothing was changed: bad configuration, invalid root,
/// failed backup, or a group directory that could not be created.
///
/// # Examples
///
/// ```no_run
/// use birdnest::cli::{Cli, run_cli};
/// use clap::Parser;
/// use std::path::Path;
///
/// let cli = Cli::parse_from(["birdnest", "--dry-run"]);
/// match run_cli(&cli, Path::new("/path/to/directory"), None) {
///     Ok(outcome) => std::process::exit(outcome.exit_code().into()),
///     Err(e) => eprintln!("Error: {}", e),
/// }
/// ```
pub fn run_cli(cli: &Cli, root: &Path, cancel: Option<Arc<AtomicBool>>) -> NestResult<CliOutcome> {
    let config = FileConfig::load(cli.config.as_deref())?;
    let (settings, filters) = config.resolve(root.to_path_buf(), cli.overrides())?;
    let strict = settings.strict;

    let mut nest = Nest::new(settings, filters)?;
    if let Some(flag) = cancel {
        nest = nest.with_cancel_flag(flag);
    }

    if cli.dry_run {
        let mapping = nest.map_results()?;
        if cli.json {
            print_json(&plan_json(&mapping));
        } else {
            OutputFormatter::plan(nest.root(), &mapping);
        }
        return Ok(CliOutcome::Planned(mapping));
    }

    if !cli.json {
        OutputFormatter::info(&format!("Nesting contents of: {}", nest.root().display()));
    }
    let progress: Box<dyn ProgressSink> = if cli.json {
        Box::new(NoProgress)
    } else {
        Box::new(BarProgress::new())
    };
    let report = nest.run(progress.as_ref())?;

    if cli.json {
        print_json(&serde_json::json!({
            "outcome": report.outcome(),
            "report": &report,
        }));
    } else {
        OutputFormatter::report(&report);
    }

    Ok(CliOutcome::Nested { report, strict })
}

fn plan_json(mapping: &NestMapping) -> serde_json::Value {
    let entries: Vec<_> = mapping
        .iter()
        .map(|(source, group)| serde_json::json!({ "source": source, "group": group }))
        .collect();
    serde_json::json!({
        "dry_run": true,
        "groups": mapping.groups().collect::<Vec<_>>(),
        "files": entries,
        "skipped": mapping.skipped,
        "already_nested": mapping.already_nested,
    })
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => OutputFormatter::error(&format!("Could not serialize report: {}", e)),
    }
}

/// Asks the user for the directory to organize.
///
/// # Errors
///
/// Returns an error when the prompt is cancelled or cannot be shown; nothing
/// has been changed at that point.
pub fn prompt_for_root() -> NestResult<PathBuf> {
    let cwd = std::env::current_dir().unwrap_or_default();
    let input: String = Input::new()
        .with_prompt("Directory to nest")
        .with_initial_text(cwd.to_string_lossy().into_owned())
        .validate_with(|input: &String| -> Result<(), String> {
            if Path::new(input.trim()).is_dir() {
                Ok(())
            } else {
                Err(format!("{} is not a directory", input.trim()))
            }
        })
        .interact_text()
        .map_err(|e| NestError::NoRootSelected(e.to_string()))?;
    Ok(PathBuf::from(input.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_command_line() {
        let cli = Cli::parse_from([
            "birdnest",
            "/data",
            "-s",
            "-",
            "-t",
            ".txt",
            "--type",
            "csv",
            "--backup",
            "--on-conflict",
            "rename",
            "--limit",
            "5",
            "-vv",
        ]);

        assert_eq!(cli.root, Some(PathBuf::from("/data")));
        assert_eq!(cli.verbose, 2);
        let overrides = cli.overrides();
        assert_eq!(overrides.separator.as_deref(), Some("-"));
        assert_eq!(overrides.file_types, vec![".txt", "csv"]);
        assert!(overrides.backup);
        assert_eq!(overrides.on_conflict, Some(ConflictPolicy::Rename));
        assert_eq!(overrides.limit, Some(5));
    }

    #[test]
    fn test_defaults_leave_overrides_empty() {
        let cli = Cli::parse_from(["birdnest"]);
        assert!(cli.root.is_none());
        let overrides = cli.overrides();
        assert!(overrides.separator.is_none());
        assert!(overrides.file_types.is_empty());
        assert!(!overrides.backup);
    }

    fn report_with_one_failure() -> NestReport {
        let mut report = NestReport::new(PathBuf::from("/data"));
        report.failed.push(crate::report::FailedMove {
            source: PathBuf::from("/data/a_1.txt"),
            error: crate::error::MoveError::NoFileName(PathBuf::from("/data/a_1.txt")),
        });
        report
    }

    #[test]
    fn test_exit_codes() {
        let lenient = CliOutcome::Nested {
            report: report_with_one_failure(),
            strict: false,
        };
        assert_eq!(lenient.exit_code(), 0);

        let strict = CliOutcome::Nested {
            report: report_with_one_failure(),
            strict: true,
        };
        assert_eq!(strict.exit_code(), EXIT_PARTIAL);

        let clean = CliOutcome::Nested {
            report: NestReport::new(PathBuf::from("/data")),
            strict: true,
        };
        assert_eq!(clean.exit_code(), 0);

        assert_eq!(CliOutcome::Planned(NestMapping::default()).exit_code(), 0);
    }

    #[test]
    fn test_cancelled_run_exit_code() {
        let mut cancelled = NestReport::new(PathBuf::from("/data"));
        cancelled.cancelled = true;
        let lenient = CliOutcome::Nested {
            report: cancelled,
            strict: false,
        };
        assert_eq!(lenient.exit_code(), EXIT_CANCELLED);

        let mut cancelled_with_failure = report_with_one_failure();
        cancelled_with_failure.cancelled = true;
        let strict = CliOutcome::Nested {
            report: cancelled_with_failure,
            strict: true,
        };
        assert_eq!(strict.exit_code(), EXIT_CANCELLED);
    }
}
