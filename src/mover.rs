//! Relocation of classified files into their group directories.
//!
//! Group directories are created before the first move. Files are then moved
//! one at a time; a failure is recorded against the file and the batch
//! continues. Moves that cross filesystems fall back to a staged copy so the
//! source is only removed once the destination is complete.

use std::ffi::OsStr;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::classifier::NestMapping;
use crate::config::{ConflictPolicy, STAGING_SUFFIX};
use crate::error::{MoveError, NestError, NestResult};
use crate::progress::ProgressSink;
use crate::report::{FailedMove, MovedFile, NestReport};

/// Creates `path` as a directory unless it already is one.
///
/// Returns `Ok(true)` when the directory was created by this call. An
/// existing directory is left untouched. An existing non-directory is an
/// error.
pub fn ensure_dir(path: &Path) -> io::Result<bool> {
    match fs::create_dir(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(false),
        Err(e) => Err(e),
    }
}

/// Picks the final destination path for `file_name` inside `dir`.
///
/// # Errors
///
/// Returns `MoveError::DestinationExists` under [`ConflictPolicy::Skip`] when
/// the name is taken.
pub fn resolve_destination(
    dir: &Path,
    file_name: impl AsRef<OsStr>,
    policy: ConflictPolicy,
) -> Result<PathBuf, MoveError> {
    let file_name = file_name.as_ref();
    let destination = dir.join(file_name);
    if !occupied(&destination) {
        return Ok(destination);
    }

    match policy {
        ConflictPolicy::Skip => Err(MoveError::DestinationExists(destination)),
        ConflictPolicy::Overwrite => Ok(destination),
        ConflictPolicy::Rename => {
            let path = Path::new(file_name);
            let stem = path.file_stem().unwrap_or(file_name);

            let mut n = 1;
            loop {
                let mut name = stem.to_os_string();
                name.push(format!(" ({})", n));
                if let Some(extension) = path.extension() {
                    name.push(".");
                    name.push(extension);
                }
                let candidate = dir.join(name);
                if !occupied(&candidate) {
                    return Ok(candidate);
                }
                n += 1;
            }
        }
    }
}

fn occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Moves `source` to `destination`.
///
/// Uses a plain rename. When the rename fails because the two paths are on
/// different filesystems, copies to a staging file next to the destination,
/// syncs it, carries over the modification time, renames it into place and
/// only then removes the source.
pub fn relocate(source: &Path, destination: &Path) -> io::Result<()> {
    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            log::debug!(
                "{} crosses filesystems, copying instead of renaming",
                source.display()
            );
            copy_then_remove(source, destination)
        }
        Err(e) => Err(e),
    }
}

fn copy_then_remove(source: &Path, destination: &Path) -> io::Result<()> {
    let staging = staging_path(destination);
    if let Err(e) = write_staged_copy(source, &staging, destination) {
        let _ = fs::remove_file(&staging);
        return Err(e);
    }
    fs::remove_file(source)
}

fn write_staged_copy(source: &Path, staging: &Path, destination: &Path) -> io::Result<()> {
    fs::copy(source, staging)?;
    let file = OpenOptions::new().write(true).open(staging)?;
    if let Ok(modified) = fs::metadata(source)?.modified() {
        file.set_modified(modified)?;
    }
    file.sync_all()?;
    fs::rename(staging, destination)
}

fn staging_path(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    destination.with_file_name(format!(".{}{}", name, STAGING_SUFFIX))
}

/// Moves a single file into `group_dir`, keeping its file name.
pub fn move_file(
    source: &Path,
    group_dir: &Path,
    policy: ConflictPolicy,
) -> Result<PathBuf, MoveError> {
    let file_name = source
        .file_name()
        .ok_or_else(|| MoveError::NoFileName(source.to_path_buf()))?;

    let destination = resolve_destination(group_dir, file_name, policy)?;
    relocate(source, &destination).map_err(|e| MoveError::Io {
        destination: destination.clone(),
        source: e,
    })?;
    Ok(destination)
}

/// Applies a [`NestMapping`] to the filesystem.
pub struct Mover {
    root: PathBuf,
    policy: ConflictPolicy,
    limit: Option<usize>,
    cancel: Option<Arc<AtomicBool>>,
}

impl Mover {
    pub fn new(root: impl Into<PathBuf>, policy: ConflictPolicy) -> Self {
        Self {
            root: root.into(),
            policy,
            limit: None,
            cancel: None,
        }
    }

    /// Stops after `limit` files have been attempted.
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// No further moves start once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Creates every group directory the mapping needs.
    ///
    /// # Errors
    ///
    /// Fails on the first directory that cannot be created, before any
    /// file has moved.
    pub fn ensure_group_dirs(
        &self,
        mapping: &NestMapping,
        report: &mut NestReport,
    ) -> NestResult<()> {
        for group in mapping.groups() {
            let dir = self.root.join(group);
            let created = ensure_dir(&dir).map_err(|e| NestError::access(&dir, e))?;
            if created {
                log::info!("created directory {}", dir.display());
                report.groups_created.push(group.to_string());
            } else {
                report.groups_reused += 1;
            }
        }
        Ok(())
    }

    /// Creates the group directories, then moves every mapped file.
    ///
    /// Per-file failures land in `report.failed`; only directory creation
    /// errors are returned.
    pub fn nest(
        &self,
        mapping: &NestMapping,
        progress: &dyn ProgressSink,
        report: &mut NestReport,
    ) -> NestResult<()> {
        self.ensure_group_dirs(mapping, report)?;

        let total = self.limit.map_or(mapping.len(), |l| l.min(mapping.len()));
        report.deferred = mapping.len() - total;
        progress.start(total as u64);

        for (source, group) in mapping.iter().take(total) {
            if self.is_cancelled() {
                log::warn!("cancelled, leaving remaining files in place");
                report.cancelled = true;
                break;
            }

            match move_file(source, &self.root.join(group), self.policy) {
                Ok(destination) => {
                    log::debug!("{} -> {}", source.display(), destination.display());
                    report.moved.push(MovedFile {
                        source: source.to_path_buf(),
                        destination,
                        group: group.to_string(),
                    });
                }
                Err(error) => {
                    log::warn!("could not move {}: {}", source.display(), error);
                    report.failed.push(FailedMove {
                        source: source.to_path_buf(),
                        error,
                    });
                }
            }
            progress.advance(source);
        }

        progress.finish();
        Ok(())
    }
}
