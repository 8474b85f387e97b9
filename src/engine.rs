//! The nesting pipeline: optional backup, scan, classify, move.

use std::fs;
use std::path::{self, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crate::backup::{Backup, ZipBackup};
use crate::classifier::{Classifier, NestMapping};
use crate::config::{CompiledFilters, NestSettings};
use crate::error::{NestError, NestResult};
use crate::mover::Mover;
use crate::progress::ProgressSink;
use crate::report::NestReport;
use crate::scanner;

/// A configured nesting run over one root directory.
///
/// # Examples
///
/// ```no_run
/// use birdnest::config::{CompiledFilters, NestSettings};
/// use birdnest::engine::Nest;
/// use birdnest::progress::NoProgress;
///
/// let settings = NestSettings::new("/path/to/inbox").with_separator("_");
/// let nest = Nest::new(settings, CompiledFilters::default()).unwrap();
/// let report = nest.run(&NoProgress).unwrap();
/// println!("moved {} files", report.moved.len());
/// ```
pub struct Nest {
    settings: NestSettings,
    classifier: Classifier,
    backup: Box<dyn Backup>,
    cancel: Option<Arc<AtomicBool>>,
}

impl Nest {
    /// Validates the settings and prepares a run.
    ///
    /// An existing root is canonicalized, which resolves `.`, `..` and
    /// symlinks. A root that does not exist yet is only made absolute; the
    /// run reports it as missing.
    ///
    /// # Errors
    ///
    /// Returns `NestError::Configuration` for an invalid separator, and
    /// `NestError::FilesystemAccess` if the root cannot be made absolute.
    pub fn new(mut settings: NestSettings, filters: CompiledFilters) -> NestResult<Self> {
        settings.validate()?;
        settings.root = resolve_root(&settings.root)?;
        let classifier = Classifier::new(&settings, filters);

        Ok(Self {
            settings,
            classifier,
            backup: Box::new(ZipBackup::new()),
            cancel: None,
        })
    }

    /// Replaces the default zip backup.
    pub fn with_backup(mut self, backup: impl Backup + 'static) -> Self {
        self.backup = Box::new(backup);
        self
    }

    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn root(&self) -> &Path {
        &self.settings.root
    }

    pub fn settings(&self) -> &NestSettings {
        &self.settings
    }

    /// Lists the files under the root that the classifier will look at.
    pub fn parse_directory(&self) -> NestResult<Vec<PathBuf>> {
        scanner::scan(&self.settings.root, self.settings.recursive)
    }

    /// Builds the mapping without touching the filesystem.
    pub fn map_results(&self) -> NestResult<NestMapping> {
        let candidates = self.parse_directory()?;
        Ok(self.classifier.map_results(candidates))
    }

    /// Runs the whole pipeline.
    ///
    /// # Errors
    ///
    /// Any error returned here means no file was moved: an invalid root, a
    /// failed backup, or a group directory that could not be created.
    /// Failures of individual moves are reported in the returned
    /// [`NestReport`] instead.
    pub fn run(&self, progress: &dyn ProgressSink) -> NestResult<NestReport> {
        let root = &self.settings.root;
        scanner::validate_root(root)?;

        let mut report = NestReport::new(root.clone());
        if self.settings.backup {
            report.backup = Some(self.backup.backup(root)?);
        }

        let mapping = self.map_results()?;
        report.skipped = mapping.skipped;
        report.already_nested = mapping.already_nested;
        log::info!(
            "{} files to nest into {} groups under {} ({} skipped)",
            mapping.len(),
            mapping.groups().count(),
            root.display(),
            mapping.skipped
        );

        let mut mover = Mover::new(root.clone(), self.settings.on_conflict)
            .with_limit(self.settings.limit);
        if let Some(flag) = &self.cancel {
            mover = mover.with_cancel_flag(Arc::clone(flag));
        }
        mover.nest(&mapping, progress, &mut report)?;

        Ok(report)
    }
}

fn resolve_root(root: &Path) -> NestResult<PathBuf> {
    match fs::canonicalize(root) {
        Ok(resolved) => Ok(resolved),
        Err(e) => {
            log::debug!("could not canonicalize {}: {}", root.display(), e);
            path::absolute(root).map_err(|e| NestError::access(root, e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::BackupError;
    use crate::config::ConfigError;
    use crate::progress::NoProgress;
    use tempfile::TempDir;

    struct FailingBackup;

    impl Backup for FailingBackup {
        fn backup(&self, _root: &Path) -> Result<PathBuf, BackupError> {
            Err(BackupError::Other("disk full".to_string()))
        }
    }

    #[test]
    fn test_new_rejects_empty_separator() {
        let settings = NestSettings::new("/data").with_separator("");
        let result = Nest::new(settings, CompiledFilters::default());
        assert!(matches!(
            result,
            Err(NestError::Configuration(ConfigError::EmptySeparator))
        ));
    }

    #[test]
    fn test_relative_root_made_absolute() {
        let nest = Nest::new(NestSettings::new("inbox"), CompiledFilters::default()).unwrap();
        assert!(nest.root().is_absolute());
    }

    #[test]
    fn test_parent_dir_root_resolved() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().join("inbox");
        fs::create_dir_all(root.join("child")).unwrap();
        fs::write(root.join("proj_alpha.txt"), "a").unwrap();

        let settings = NestSettings::new(root.join("child").join("..")).with_backup(true);
        let nest = Nest::new(settings, CompiledFilters::default()).unwrap();
        assert_eq!(nest.root(), fs::canonicalize(&root).unwrap().as_path());

        let report = nest.run(&NoProgress).expect("run failed");
        let archive = report.backup.expect("backup missing");
        let name = archive.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("inbox_backup_"));
        assert!(root.join("proj").join("proj_alpha.txt").exists());
    }

    #[test]
    fn test_run_nests_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::write(root.join("proj_alpha.txt"), "a").unwrap();
        fs::write(root.join("proj_beta.txt"), "b").unwrap();
        fs::write(root.join("misc.txt"), "m").unwrap();

        let nest = Nest::new(NestSettings::new(root), CompiledFilters::default()).unwrap();
        let report = nest.run(&NoProgress).unwrap();

        assert!(report.is_complete_success());
        assert_eq!(report.moved.len(), 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.groups_created, vec!["proj".to_string()]);
        assert!(report.backup.is_none());
        assert!(root.join("misc.txt").exists());
    }

    #[test]
    fn test_failed_backup_aborts_before_changes() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::write(root.join("proj_alpha.txt"), "a").unwrap();

        let settings = NestSettings::new(root).with_backup(true);
        let nest = Nest::new(settings, CompiledFilters::default())
            .unwrap()
            .with_backup(FailingBackup);
        let result = nest.run(&NoProgress);

        assert!(matches!(result, Err(NestError::Backup(_))));
        assert!(root.join("proj_alpha.txt").exists());
        assert!(!root.join("proj").exists());
    }

    #[test]
    fn test_backup_skipped_when_disabled() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::write(root.join("proj_alpha.txt"), "a").unwrap();

        let nest = Nest::new(NestSettings::new(root), CompiledFilters::default())
            .unwrap()
            .with_backup(FailingBackup);

        assert!(nest.run(&NoProgress).is_ok());
    }

    #[test]
    fn test_missing_root_fails() {
        let nest = Nest::new(
            NestSettings::new("/non/existent/path"),
            CompiledFilters::default(),
        )
        .unwrap();
        let result = nest.run(&NoProgress);
        assert!(matches!(result, Err(NestError::FilesystemAccess { .. })));
    }
}
