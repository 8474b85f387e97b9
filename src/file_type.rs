//! File type filtering by extension.
//!
//! A filter is either "any type" or a set of accepted extensions. Extensions
//! are normalized so that `.txt`, `txt` and `TXT` all mean the same thing.
//! Multi-part extensions such as `.tar.gz` match on the end of the file name.
//! Files without an extension are identified by their content through the
//! `infer` crate.
//!
//! # Examples
//!
//! ```
//! use birdnest::file_type::FileTypeFilter;
//!
//! let filter = FileTypeFilter::new(&[".txt".to_string(), "CSV".to_string()]).unwrap();
//! assert!(filter.accepts_extension("txt"));
//! assert!(filter.accepts_extension("csv"));
//! assert!(!filter.accepts_extension("png"));
//!
//! let archives = FileTypeFilter::new(&[".tar.gz".to_string()]).unwrap();
//! assert!(archives.matches(std::path::Path::new("logs_jan.tar.gz")));
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use crate::config::ConfigError;

/// Set of accepted file extensions. An empty set accepts every file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileTypeFilter {
    extensions: BTreeSet<String>,
}

impl FileTypeFilter {
    /// A filter that accepts every file.
    pub fn any() -> Self {
        Self::default()
    }

    /// Builds a filter from user-supplied extensions.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidFileType` for an entry that is empty after
    /// stripping the leading dot, or that contains a path separator or whitespace.
    pub fn new(entries: &[String]) -> Result<Self, ConfigError> {
        let extensions = entries
            .iter()
            .map(|entry| normalize_extension(entry))
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(Self { extensions })
    }

    /// Returns true if this filter accepts every file.
    pub fn is_any(&self) -> bool {
        self.extensions.is_empty()
    }

    /// Returns true if `extension` (without the dot, any case) is accepted.
    pub fn accepts_extension(&self, extension: &str) -> bool {
        self.is_any() || self.extensions.contains(&extension.to_lowercase())
    }

    /// Returns true if the file at `path` is of an accepted type.
    ///
    /// The end of the file name decides, so `logs.tar.gz` matches both `gz`
    /// and `tar.gz`. A file with no extension is sniffed; unreadable or
    /// unrecognized content does not match.
    pub fn matches(&self, path: &Path) -> bool {
        if self.is_any() {
            return true;
        }

        match path.extension() {
            Some(_) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_lowercase())
                    .unwrap_or_default();
                self.extensions
                    .iter()
                    .any(|ext| has_extension(&name, ext))
            }
            None => match infer::get_from_path(path) {
                Ok(Some(kind)) => self.accepts_extension(kind.extension()),
                Ok(None) => false,
                Err(e) => {
                    log::debug!("could not sniff type of {}: {}", path.display(), e);
                    false
                }
            },
        }
    }

    /// The accepted extensions, sorted.
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }
}

/// `name` ends with `.{extension}` and has a stem before it.
fn has_extension(name: &str, extension: &str) -> bool {
    name.strip_suffix(extension)
        .and_then(|rest| rest.strip_suffix('.'))
        .is_some_and(|stem| !stem.is_empty())
}

fn normalize_extension(entry: &str) -> Result<String, ConfigError> {
    let trimmed = entry.trim().trim_start_matches('.');
    if trimmed.is_empty()
        || trimmed.ends_with('.')
        || trimmed.contains("..")
        || trimmed.contains(['/', '\\', '\0'])
        || trimmed.chars().any(char::is_whitespace)
    {
        return Err(ConfigError::InvalidFileType(entry.to_string()));
    }
    Ok(trimmed.to_lowercase())
}
