//! Grouping of files by name prefix.
//!
//! A file named `proj_alpha.txt` with separator `_` belongs to the group
//! `proj`. Only the first separator counts: `a_b_c.txt` belongs to `a`.
//!
//! [`Classifier::eligibility`] is the one place that decides whether a file
//! takes part in nesting.
//!
//! # Examples
//!
//! ```
//! use birdnest::classifier::classify;
//!
//! assert_eq!(classify("proj_alpha.txt", "_"), Some("proj"));
//! assert_eq!(classify("a_b_c.txt", "_"), Some("a"));
//! assert_eq!(classify("misc.txt", "_"), None);
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::config::{CompiledFilters, NestSettings};
use crate::file_type::FileTypeFilter;

/// Returns the part of `file_name` before the first `separator`, or `None`
/// when the separator does not occur.
pub fn classify<'a>(file_name: &'a str, separator: &str) -> Option<&'a str> {
    file_name.split_once(separator).map(|(group, _)| group)
}

/// Like [`classify`] for a name that may not be valid UTF-8.
///
/// The name is searched as encoded bytes, so only the group prefix has to be
/// UTF-8. Returns `Err(Eligibility::NonUtf8Name)` when it is not.
fn classify_os<'a>(
    file_name: &'a OsStr,
    separator: &str,
) -> Result<Option<&'a str>, Eligibility> {
    if let Some(name) = file_name.to_str() {
        return Ok(classify(name, separator));
    }
    if separator.is_empty() {
        return Ok(Some(""));
    }

    let bytes = file_name.as_encoded_bytes();
    let Some(at) = bytes
        .windows(separator.len())
        .position(|window| window == separator.as_bytes())
    else {
        return Ok(None);
    };
    std::str::from_utf8(&bytes[..at])
        .map(Some)
        .map_err(|_| Eligibility::NonUtf8Name)
}

/// Why a file was or was not accepted for nesting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    /// The file moves into the named group.
    Eligible(String),
    /// The name does not contain the separator.
    NoSeparator,
    /// The name starts with the separator, so the group would be empty.
    EmptyGroup,
    /// The group would be `.` or `..`.
    ReservedGroup,
    /// The file type filter rejected the file.
    TypeMismatch,
    /// Exclusion rules or the hidden-file rule rejected the file.
    Excluded,
    /// The group prefix of the file name is not valid UTF-8.
    NonUtf8Name,
    /// The file already sits in its group directory.
    AlreadyNested,
}

/// Source path to group name, built once per run.
#[derive(Debug, Clone, Default)]
pub struct NestMapping {
    entries: BTreeMap<PathBuf, String>,
    groups: BTreeSet<String>,
    /// Files seen by the scanner that are not part of the mapping.
    pub skipped: usize,
    /// Files already inside their group directory.
    pub already_nested: usize,
}

impl NestMapping {
    fn insert(&mut self, source: PathBuf, group: String) {
        self.groups.insert(group.clone());
        self.entries.insert(source, group);
    }

    /// Distinct group names, sorted.
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(String::as_str)
    }

    /// Mapped files in source path order.
    pub fn iter(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.entries
            .iter()
            .map(|(source, group)| (source.as_path(), group.as_str()))
    }

    pub fn group_of(&self, source: &Path) -> Option<&str> {
        self.entries.get(source).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of files per group, for summaries.
    pub fn group_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for group in self.entries.values() {
            *counts.entry(group.clone()).or_insert(0) += 1;
        }
        counts
    }
}

/// Decides eligibility and builds the [`NestMapping`].
#[derive(Debug, Clone)]
pub struct Classifier {
    root: PathBuf,
    separator: String,
    file_types: FileTypeFilter,
    filters: CompiledFilters,
}

impl Classifier {
    pub fn new(settings: &NestSettings, filters: CompiledFilters) -> Self {
        Self {
            root: settings.root.clone(),
            separator: settings.separator.clone(),
            file_types: settings.file_types.clone(),
            filters,
        }
    }

    /// Applies every eligibility rule to one scanned path.
    ///
    /// The checks that only look at the name run first, so the file is only
    /// read when the type filter needs to sniff an extension-less file.
    pub fn eligibility(&self, path: &Path) -> Eligibility {
        let Some(file_name) = path.file_name() else {
            return Eligibility::NoSeparator;
        };

        let group = match classify_os(file_name, &self.separator) {
            Err(ineligible) => return ineligible,
            Ok(None) => return Eligibility::NoSeparator,
            Ok(Some("")) => return Eligibility::EmptyGroup,
            Ok(Some("." | "..")) => return Eligibility::ReservedGroup,
            Ok(Some(group)) => group,
        };

        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        if !self.filters.should_include(relative) {
            return Eligibility::Excluded;
        }

        if path.parent() == Some(self.root.join(group).as_path()) {
            return Eligibility::AlreadyNested;
        }

        if !self.file_types.matches(path) {
            return Eligibility::TypeMismatch;
        }

        Eligibility::Eligible(group.to_string())
    }

    /// Builds the mapping from scanned paths.
    ///
    /// Ineligible paths are counted, never reported individually.
    pub fn map_results<I>(&self, candidates: I) -> NestMapping
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut mapping = NestMapping::default();
        for path in candidates {
            match self.eligibility(&path) {
                Eligibility::Eligible(group) => mapping.insert(path, group),
                Eligibility::AlreadyNested => mapping.already_nested += 1,
                Eligibility::NonUtf8Name => {
                    log::warn!(
                        "skipping {}: group name is not valid UTF-8",
                        path.display()
                    );
                    mapping.skipped += 1;
                }
                other => {
                    log::debug!("skipping {} ({:?})", path.display(), other);
                    mapping.skipped += 1;
                }
            }
        }
        mapping
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExcludeRules, FilterRules};

    fn classifier(separator: &str, types: &[&str]) -> Classifier {
        let types: Vec<String> = types.iter().map(|t| t.to_string()).collect();
        let settings = NestSettings::new("/data")
            .with_separator(separator)
            .with_file_types(FileTypeFilter::new(&types).unwrap());
        Classifier::new(&settings, CompiledFilters::default())
    }

    #[test]
    fn test_classify_first_occurrence_only() {
        assert_eq!(classify("a_b_c.txt", "_"), Some("a"));
        assert_eq!(classify("proj_alpha.txt", "_"), Some("proj"));
        assert_eq!(classify("2024 - report - final.pdf", " - "), Some("2024"));
        assert_eq!(classify("_leading.txt", "_"), Some(""));
        assert_eq!(classify("misc.txt", "_"), None);
    }

    #[test]
    fn test_eligibility_rules() {
        let c = classifier("_", &[]);
        assert_eq!(
            c.eligibility(Path::new("/data/proj_alpha.txt")),
            Eligibility::Eligible("proj".to_string())
        );
        assert_eq!(
            c.eligibility(Path::new("/data/misc.txt")),
            Eligibility::NoSeparator
        );
        assert_eq!(
            c.eligibility(Path::new("/data/_draft.txt")),
            Eligibility::EmptyGroup
        );
        assert_eq!(
            c.eligibility(Path::new("/data/.._escape.txt")),
            Eligibility::ReservedGroup
        );
        assert_eq!(
            c.eligibility(Path::new("/data/.hidden_file")),
            Eligibility::Eligible(".hidden".to_string())
        );
        assert_eq!(
            c.eligibility(Path::new("/data/.DS_Store")),
            Eligibility::Excluded
        );
        assert_eq!(
            c.eligibility(Path::new("/data/proj/proj_alpha.txt")),
            Eligibility::AlreadyNested
        );
    }

    #[test]
    fn test_type_filter_applies_after_separator_check() {
        let c = classifier("_", &[".txt"]);
        assert_eq!(
            c.eligibility(Path::new("/data/data_old.csv")),
            Eligibility::TypeMismatch
        );
        assert_eq!(
            c.eligibility(Path::new("/data/data_new.txt")),
            Eligibility::Eligible("data".to_string())
        );
    }

    #[test]
    fn test_exclusion_filters() {
        let settings = NestSettings::new("/data");
        let filters = CompiledFilters::new(FilterRules {
            exclude: ExcludeRules {
                extensions: vec!["part".to_string()],
                ..Default::default()
            },
            ..Default::default()
        })
        .unwrap();
        let c = Classifier::new(&settings, filters);

        assert_eq!(
            c.eligibility(Path::new("/data/movie_01.part")),
            Eligibility::Excluded
        );
    }

    #[test]
    fn test_map_results_groups_and_counts() {
        let c = classifier("_", &[]);
        let mapping = c.map_results(vec![
            PathBuf::from("/data/proj_alpha.txt"),
            PathBuf::from("/data/proj_beta.txt"),
            PathBuf::from("/data/notes_a_b.md"),
            PathBuf::from("/data/misc.txt"),
            PathBuf::from("/data/_orphan.txt"),
        ]);

        assert_eq!(mapping.len(), 3);
        assert_eq!(mapping.skipped, 2);
        assert_eq!(mapping.groups().collect::<Vec<_>>(), vec!["notes", "proj"]);
        assert_eq!(
            mapping.group_of(Path::new("/data/notes_a_b.md")),
            Some("notes")
        );
        assert_eq!(mapping.group_of(Path::new("/data/misc.txt")), None);
        assert_eq!(mapping.group_counts().get("proj"), Some(&2));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_names_grouped_by_utf8_prefix() {
        use std::ffi::OsString;
        use std::os::unix::ffi::OsStringExt;

        let c = classifier("_", &[]);
        let path = |bytes: &[u8]| PathBuf::from("/data").join(OsString::from_vec(bytes.to_vec()));
        let tail = path(b"proj_caf\xe9.txt");
        let head = path(b"caf\xe9_menu.txt");
        let none = path(b"caf\xe9.txt");

        assert_eq!(c.eligibility(&tail), Eligibility::Eligible("proj".to_string()));
        assert_eq!(c.eligibility(&head), Eligibility::NonUtf8Name);
        assert_eq!(c.eligibility(&none), Eligibility::NoSeparator);

        let mapping = c.map_results(vec![tail.clone(), head, none]);
        assert_eq!(mapping.group_of(&tail), Some("proj"));
        assert_eq!(mapping.skipped, 2);
    }

    #[test]
    fn test_multi_character_separator() {
        let c = classifier("--", &[]);
        let mapping = c.map_results(vec![
            PathBuf::from("/data/client--invoice--march.pdf"),
            PathBuf::from("/data/client-single.pdf"),
        ]);

        assert_eq!(mapping.len(), 1);
        assert_eq!(
            mapping.group_of(Path::new("/data/client--invoice--march.pdf")),
            Some("client")
        );
    }
}
