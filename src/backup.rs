//! Pre-run backup of the root directory.
//!
//! When backup is enabled the whole root is archived before anything is
//! scanned or moved. A failed backup aborts the run.

use chrono::Local;
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;
use zip::ZipWriter;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;

/// Errors raised while writing a backup archive.
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("Cannot back up {}: it has no parent directory to hold the archive", .0.display())]
    NoParent(PathBuf),

    #[error("Backup of {} failed: {source}", .root.display())]
    Io {
        root: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Backup archive {} could not be written: {source}", .archive.display())]
    Archive {
        archive: PathBuf,
        #[source]
        source: ZipError,
    },

    /// Raised by backups that are not archive based.
    #[error("Backup failed: {0}")]
    Other(String),
}

/// Produces a restorable snapshot of a directory.
pub trait Backup {
    /// Snapshots `root` and returns the location of the snapshot.
    fn backup(&self, root: &Path) -> Result<PathBuf, BackupError>;
}

/// Writes `<root-name>_backup_<timestamp>.zip` next to the root.
///
/// The archive is placed outside the root so that it never becomes a
/// nesting candidate itself.
#[derive(Debug, Default, Clone)]
pub struct ZipBackup {
    destination: Option<PathBuf>,
}

impl ZipBackup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes archives into `dir` instead of the root's parent.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            destination: Some(dir.into()),
        }
    }

    fn archive_path(&self, root: &Path) -> Result<PathBuf, BackupError> {
        let dir = match &self.destination {
            Some(dir) => dir.clone(),
            None => root
                .parent()
                .ok_or_else(|| BackupError::NoParent(root.to_path_buf()))?
                .to_path_buf(),
        };
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| BackupError::NoParent(root.to_path_buf()))?;
        let timestamp = Local::now().format("%Y%m%d-%H%M%S");
        Ok(dir.join(format!("{}_backup_{}.zip", name, timestamp)))
    }

    fn write_archive(&self, root: &Path, archive: &Path) -> Result<(), BackupError> {
        let io_error = |source: io::Error| BackupError::Io {
            root: root.to_path_buf(),
            source,
        };
        let zip_error = |source: ZipError| BackupError::Archive {
            archive: archive.to_path_buf(),
            source,
        };

        let file = File::create(archive).map_err(io_error)?;
        let mut zip = ZipWriter::new(BufWriter::new(file));
        let options = SimpleFileOptions::default();

        for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
            let entry = entry.map_err(|e| io_error(io::Error::from(e)))?;
            if entry.depth() == 0 {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            if entry.file_type().is_dir() {
                zip.add_directory(name, options).map_err(zip_error)?;
            } else if entry.file_type().is_file() {
                let len = entry
                    .metadata()
                    .map_err(|e| io_error(io::Error::from(e)))?
                    .len();
                let options = options.large_file(needs_zip64(len));
                zip.start_file(name, options).map_err(zip_error)?;
                let mut source = File::open(entry.path()).map_err(io_error)?;
                io::copy(&mut source, &mut zip).map_err(io_error)?;
            }
        }

        zip.finish().map_err(zip_error)?;
        Ok(())
    }
}

/// Entries of 4 GiB and more need zip64 headers.
fn needs_zip64(len: u64) -> bool {
    len >= u64::from(u32::MAX)
}

impl Backup for ZipBackup {
    fn backup(&self, root: &Path) -> Result<PathBuf, BackupError> {
        let archive = self.archive_path(root)?;
        log::info!("backing up {} to {}", root.display(), archive.display());

        if let Err(e) = self.write_archive(root, &archive) {
            let _ = fs::remove_file(&archive);
            return Err(e);
        }
        Ok(archive)
    }
}
