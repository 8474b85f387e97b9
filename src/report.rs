//! Results of a nesting run.

use serde::{Serialize, Serializer};
use std::fmt::Display;
use std::path::PathBuf;

use crate::error::MoveError;

/// A file that reached its group directory.
#[derive(Debug, Clone, Serialize)]
pub struct MovedFile {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub group: String,
}

/// A file that could not be moved.
#[derive(Debug, Serialize)]
pub struct FailedMove {
    pub source: PathBuf,
    #[serde(rename = "reason", serialize_with = "serialize_display")]
    pub error: MoveError,
}

fn serialize_display<S, T>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Display,
{
    serializer.collect_str(value)
}

/// How a completed run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NestOutcome {
    /// Every mapped file was moved.
    Succeeded,
    /// The batch finished but some files failed.
    SucceededWithFailures { failed: usize },
    /// Cancellation stopped the batch; completed moves stay in place.
    Cancelled { failed: usize },
}

/// Everything a run did.
#[derive(Debug, Default, Serialize)]
pub struct NestReport {
    pub root: PathBuf,
    /// Archive written before the run, when backup is enabled.
    pub backup: Option<PathBuf>,
    pub moved: Vec<MovedFile>,
    pub failed: Vec<FailedMove>,
    /// Scanned files that were not eligible for nesting.
    pub skipped: usize,
    /// Files found already inside their group directory.
    pub already_nested: usize,
    /// Group directories created by this run.
    pub groups_created: Vec<String>,
    /// Group directories that already existed.
    pub groups_reused: usize,
    /// Eligible files left in place because the move limit was reached.
    pub deferred: usize,
    pub cancelled: bool,
}

impl NestReport {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            ..Default::default()
        }
    }

    pub fn outcome(&self) -> NestOutcome {
        if self.cancelled {
            NestOutcome::Cancelled {
                failed: self.failed.len(),
            }
        } else if self.failed.is_empty() {
            NestOutcome::Succeeded
        } else {
            NestOutcome::SucceededWithFailures {
                failed: self.failed.len(),
            }
        }
    }

    /// Files the mover attempted, successful or not.
    pub fn processed(&self) -> usize {
        self.moved.len() + self.failed.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.outcome() == NestOutcome::Succeeded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_distinguishes_failures_and_cancellation() {
        let mut report = NestReport::new(PathBuf::from("/data"));
        assert_eq!(report.outcome(), NestOutcome::Succeeded);

        report.failed.push(FailedMove {
            source: PathBuf::from("/data/proj_beta.txt"),
            error: MoveError::DestinationExists(PathBuf::from("/data/proj/proj_beta.txt")),
        });
        assert_eq!(
            report.outcome(),
            NestOutcome::SucceededWithFailures { failed: 1 }
        );
        assert_eq!(report.processed(), 1);

        report.cancelled = true;
        assert_eq!(report.outcome(), NestOutcome::Cancelled { failed: 1 });
        assert!(!report.is_complete_success());
    }

    #[test]
    fn test_report_serializes_reasons_as_text() {
        let mut report = NestReport::new(PathBuf::from("/data"));
        report.failed.push(FailedMove {
            source: PathBuf::from("/data/proj_beta.txt"),
            error: MoveError::DestinationExists(PathBuf::from("/data/proj/proj_beta.txt")),
        });

        let json = serde_json::to_value(&report).expect("serialization failed");
        assert_eq!(
            json["failed"][0]["reason"],
            "destination already exists: /data/proj/proj_beta.txt"
        );
        assert_eq!(json["skipped"], 0);
    }
}
