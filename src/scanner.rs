//! Directory listing for nesting candidates.
//!
//! Lists the regular files directly under the root, or one directory level
//! deeper when recursive scanning is on. Symbolic links are never followed.
//! Eligibility is decided later by the classifier.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{NestError, NestResult};

/// Checks that `root` exists and is a directory.
pub fn validate_root(root: &Path) -> NestResult<()> {
    let metadata = fs::metadata(root).map_err(|e| NestError::access(root, e))?;
    if !metadata.is_dir() {
        return Err(NestError::access(
            root,
            io::Error::new(io::ErrorKind::NotADirectory, "root is not a directory"),
        ));
    }
    Ok(())
}

/// Lists candidate files under `root`, sorted by file name.
///
/// # Errors
///
/// Fails with `NestError::FilesystemAccess` if the root itself cannot be read.
/// Unreadable sub-directories in recursive mode are logged and skipped.
pub fn scan(root: &Path, recursive: bool) -> NestResult<Vec<PathBuf>> {
    validate_root(root)?;

    let max_depth = if recursive { 2 } else { 1 };
    let walker = WalkDir::new(root)
        .follow_links(false)
        .max_depth(max_depth)
        .sort_by_file_name();

    let mut files = Vec::new();
    for item in walker {
        let entry = match item {
            Ok(entry) => entry,
            Err(err) => {
                if err.depth() == 0 {
                    return Err(NestError::access(root, io::Error::from(err)));
                }
                log::warn!("skipping unreadable entry under {}: {}", root.display(), err);
                continue;
            }
        };

        if entry.depth() == 0 || !entry.file_type().is_file() {
            continue;
        }
        files.push(entry.into_path());
    }

    log::debug!("scanned {} files under {}", files.len(), root.display());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_scan_top_level_only() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::write(root.join("b_file.txt"), "b").unwrap();
        fs::write(root.join("a_file.txt"), "a").unwrap();
        fs::create_dir(root.join("sub")).unwrap();
        fs::write(root.join("sub").join("c_file.txt"), "c").unwrap();

        let files = scan(root, false).expect("scan failed");
        assert_eq!(files, vec![root.join("a_file.txt"), root.join("b_file.txt")]);
    }

    #[test]
    fn test_scan_recursive_descends_one_level() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::write(root.join("a_file.txt"), "a").unwrap();
        fs::create_dir_all(root.join("sub").join("deeper")).unwrap();
        fs::write(root.join("sub").join("c_file.txt"), "c").unwrap();
        fs::write(root.join("sub").join("deeper").join("d_file.txt"), "d").unwrap();

        let files = scan(root, true).expect("scan failed");
        assert!(files.contains(&root.join("a_file.txt")));
        assert!(files.contains(&root.join("sub").join("c_file.txt")));
        assert!(!files.contains(&root.join("sub").join("deeper").join("d_file.txt")));
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_scan_missing_root() {
        let result = scan(Path::new("/non/existent/path"), false);
        assert!(matches!(result, Err(NestError::FilesystemAccess { .. })));
    }

    #[test]
    fn test_scan_root_is_a_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let file = temp_dir.path().join("plain.txt");
        fs::write(&file, "x").unwrap();

        let result = scan(&file, false);
        assert!(matches!(result, Err(NestError::FilesystemAccess { .. })));
    }
}
