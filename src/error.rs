//! Error types for nesting runs.
//!
//! [`NestError`] aborts a run before any file is moved. [`MoveError`] is
//! recorded against a single file while the rest of the batch continues.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::backup::BackupError;
use crate::config::ConfigError;

/// Errors that stop a nesting run before any file is moved.
#[derive(Debug, Error)]
pub enum NestError {
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    /// The root cannot be read, or a group directory cannot be created.
    #[error("Cannot access {}: {source}", .path.display())]
    FilesystemAccess {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Backup(#[from] BackupError),

    /// The interactive prompt was cancelled or could not be shown.
    #[error("No directory selected: {0}")]
    NoRootSelected(String),
}

impl NestError {
    pub(crate) fn access(path: impl Into<PathBuf>, source: io::Error) -> Self {
        NestError::FilesystemAccess {
            path: path.into(),
            source,
        }
    }
}

/// Failure to relocate one file.
#[derive(Debug, Error)]
pub enum MoveError {
    /// The destination already holds a file and the conflict policy is `skip`.
    #[error("destination already exists: {}", .0.display())]
    DestinationExists(PathBuf),

    #[error("file has no name component: {}", .0.display())]
    NoFileName(PathBuf),

    #[error("failed to move to {}: {source}", .destination.display())]
    Io {
        destination: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result type for nesting runs.
pub type NestResult<T> = Result<T, NestError>;
