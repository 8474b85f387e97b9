//! Nesting settings and file filtering configuration.
//!
//! Settings come from a TOML file and are then overridden by command-line
//! flags. The `[nest]` table holds the nesting options; the `[filters]` table
//! holds exclusion rules that keep files out of the nest even when their name
//! contains the separator.
//!
//! # Configuration File Format
//!
//! ```toml
//! [nest]
//! separator = "_"
//! file_types = ["txt", "csv"]
//! recursive = false
//! backup = true
//! on_conflict = "rename"
//! limit = 500
//! strict = false
//!
//! [filters]
//! enable_hidden_files = true
//!
//! [filters.exclude]
//! filenames = [".DS_Store", "Thumbs.db"]
//! patterns = ["*.tmp"]
//! extensions = ["bak", "tmp"]
//! regex = []
//!
//! [filters.include]
//! patterns = []
//! ```

use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::file_type::FileTypeFilter;

/// Separator used when neither the config file nor the command line sets one.
pub const DEFAULT_SEPARATOR: &str = "_";

/// Name of the per-directory configuration file.
pub const LOCAL_CONFIG_FILE: &str = ".birdnestrc.toml";

/// Errors raised while loading or validating configuration.
///
/// All of these are detected before the root directory is touched.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),
    /// Invalid TOML syntax or structure.
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),
    /// Invalid glob pattern provided.
    #[error("Invalid glob pattern '{0}': expected *.ext or dir/**")]
    InvalidGlobPattern(String),
    /// Invalid regex pattern provided with the actual error reason.
    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidRegexPattern { pattern: String, reason: String },
    /// The separator is the empty string.
    #[error("Separator must not be empty")]
    EmptySeparator,
    /// The separator contains a character that cannot appear inside a file name.
    #[error("Invalid separator '{0}': must not contain a path separator or NUL")]
    InvalidSeparator(String),
    /// A file type filter entry is empty or malformed.
    #[error("Invalid file type '{0}': expected an extension such as .txt")]
    InvalidFileType(String),
    /// IO error while reading configuration.
    #[error("IO error reading configuration: {0}")]
    IoError(String),
}

/// What to do when the destination of a move already holds a file with the
/// same name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Leave the source in place and record the file as failed.
    #[default]
    Skip,
    /// Replace the existing destination file.
    Overwrite,
    /// Move under the first free name of the form `stem (n).ext`.
    Rename,
}

/// Full configuration file contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub nest: NestRules,
    #[serde(default)]
    pub filters: FilterRules,
}

/// The `[nest]` table. Every field is optional so that command-line flags can
/// fill the gaps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NestRules {
    pub separator: Option<String>,
    #[serde(default)]
    pub file_types: Vec<String>,
    #[serde(default)]
    pub recursive: bool,
    #[serde(default)]
    pub backup: bool,
    pub on_conflict: Option<ConflictPolicy>,
    pub limit: Option<usize>,
    #[serde(default)]
    pub strict: bool,
}

/// Root-level filter rules configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterRules {
    /// Whether hidden files (starting with ".") can be nested. Defaults to true.
    #[serde(default = "default_true")]
    pub enable_hidden_files: bool,

    /// Rules for excluding files.
    #[serde(default)]
    pub exclude: ExcludeRules,

    /// Rules for including files (whitelist, overrides exclude rules).
    #[serde(default)]
    pub include: IncludeRules,
}

impl Default for FilterRules {
    fn default() -> Self {
        Self {
            enable_hidden_files: true,
            exclude: ExcludeRules::default(),
            include: IncludeRules::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Rules for excluding files from nesting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludeRules {
    /// Exact filenames to exclude (e.g., ".DS_Store", "Thumbs.db").
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Glob patterns to exclude (e.g., "*.tmp").
    #[serde(default)]
    pub patterns: Vec<String>,

    /// File extensions to exclude (e.g., "bak", "tmp", "log").
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Regex patterns matched against the file name.
    #[serde(default)]
    pub regex: Vec<String>,
}

/// Rules for including files, overriding exclude rules (whitelist).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncludeRules {
    /// Glob patterns that override exclude rules.
    #[serde(default)]
    pub patterns: Vec<String>,
}

/// Command-line values that take precedence over the configuration file.
///
/// `None` and empty collections mean "not given on the command line".
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub separator: Option<String>,
    pub file_types: Vec<String>,
    pub recursive: bool,
    pub backup: bool,
    pub on_conflict: Option<ConflictPolicy>,
    pub limit: Option<usize>,
    pub strict: bool,
}

/// Validated settings handed to the nesting engine.
#[derive(Debug, Clone)]
pub struct NestSettings {
    pub root: PathBuf,
    pub separator: String,
    pub file_types: FileTypeFilter,
    pub recursive: bool,
    pub backup: bool,
    pub on_conflict: ConflictPolicy,
    /// Maximum number of files moved in one run. `None` moves everything.
    pub limit: Option<usize>,
    pub strict: bool,
}

impl NestSettings {
    /// Settings with defaults for everything except the root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            separator: DEFAULT_SEPARATOR.to_string(),
            file_types: FileTypeFilter::any(),
            recursive: false,
            backup: false,
            on_conflict: ConflictPolicy::default(),
            limit: None,
            strict: false,
        }
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn with_file_types(mut self, file_types: FileTypeFilter) -> Self {
        self.file_types = file_types;
        self
    }

    pub fn with_backup(mut self, backup: bool) -> Self {
        self.backup = backup;
        self
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.on_conflict = policy;
        self
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Checks the settings that can be verified without touching the disk.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_separator(&self.separator)
    }
}

/// Rejects separators that could never appear inside a single file name.
pub fn validate_separator(separator: &str) -> Result<(), ConfigError> {
    if separator.is_empty() {
        return Err(ConfigError::EmptySeparator);
    }
    if separator.contains(['/', '\\', '\0']) {
        return Err(ConfigError::InvalidSeparator(separator.to_string()));
    }
    Ok(())
}

impl FileConfig {
    /// Load configuration from a file, with fallback to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.birdnestrc.toml` in the current directory
    /// 3. Look for `~/.config/birdnest/config.toml` in home directory
    /// 4. Fall back to default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is explicitly provided but cannot be read,
    /// or if any discovered file fails to parse.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("birdnest")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
    }

    /// Merge with command-line overrides into validated settings.
    ///
    /// Scalar overrides replace file values; boolean flags can only switch an
    /// option on; file types given on the command line replace the file list.
    pub fn resolve(
        self,
        root: PathBuf,
        overrides: Overrides,
    ) -> Result<(NestSettings, CompiledFilters), ConfigError> {
        let nest = self.nest;
        let separator = overrides
            .separator
            .or(nest.separator)
            .unwrap_or_else(|| DEFAULT_SEPARATOR.to_string());
        validate_separator(&separator)?;

        let file_types = if overrides.file_types.is_empty() {
            nest.file_types
        } else {
            overrides.file_types
        };

        let settings = NestSettings {
            root,
            separator,
            file_types: FileTypeFilter::new(&file_types)?,
            recursive: overrides.recursive || nest.recursive,
            backup: overrides.backup || nest.backup,
            on_conflict: overrides.on_conflict.or(nest.on_conflict).unwrap_or_default(),
            limit: overrides.limit.or(nest.limit),
            strict: overrides.strict || nest.strict,
        };

        let filters = CompiledFilters::new(self.filters)?;
        Ok((settings, filters))
    }
}

/// Operating system metadata files that are never nested.
const SYSTEM_FILENAMES: &[&str] = &[".DS_Store", "Thumbs.db", "desktop.ini"];

/// Suffix of the staging files written during cross-device moves.
pub(crate) const STAGING_SUFFIX: &str = ".birdnest-partial";

/// Pre-compiled filter rules.
///
/// Glob and regex patterns are compiled once so that matching a file does
/// not reparse them.
#[derive(Debug, Clone, Default)]
pub struct CompiledFilters {
    skip_hidden_files: bool,
    exclude_filenames: HashSet<String>,
    exclude_extensions: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
    include_patterns: Vec<Pattern>,
}

fn compile_globs(patterns: &[String]) -> Result<Vec<Pattern>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
        })
        .collect()
}

impl CompiledFilters {
    /// Create compiled filters from filter rules.
    ///
    /// # Errors
    ///
    /// Returns an error if any glob or regex patterns are invalid.
    pub fn new(rules: FilterRules) -> Result<Self, ConfigError> {
        let exclude_patterns = compile_globs(&rules.exclude.patterns)?;
        let include_patterns = compile_globs(&rules.include.patterns)?;

        let exclude_regexes = rules
            .exclude
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            skip_hidden_files: !rules.enable_hidden_files,
            exclude_filenames: rules.exclude.filenames.into_iter().collect(),
            exclude_extensions: rules
                .exclude
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            exclude_patterns,
            exclude_regexes,
            include_patterns,
        })
    }

    /// Check if a file passes the filter rules.
    ///
    /// `file_path` is matched as given; callers pass the path relative to the
    /// root so that glob patterns behave the same wherever the root lives.
    ///
    /// Checks are performed in this order, with early termination:
    /// 1. Include patterns (whitelist) - if matched, always include
    /// 2. System metadata and staging files - always excluded
    /// 3. Hidden file filter - if hidden and disabled, exclude
    /// 4. Exact filename match - if matched, exclude
    /// 5. File extension match - if matched, exclude
    /// 6. Glob pattern match - if matched, exclude
    /// 7. Regex pattern match - if matched, exclude
    /// 8. Default: include
    pub fn should_include(&self, file_path: &Path) -> bool {
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if self.matches_any(&self.include_patterns, file_path) {
            return true;
        }

        if SYSTEM_FILENAMES.contains(&file_name.as_ref()) || file_name.ends_with(STAGING_SUFFIX)
        {
            return false;
        }

        if self.skip_hidden_files && file_name.starts_with('.') {
            return false;
        }

        if self.exclude_filenames.contains(file_name.as_ref()) {
            return false;
        }

        if let Some(ext) = file_path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            if self.exclude_extensions.contains(&ext_lower) {
                return false;
            }
        }

        if self.matches_any(&self.exclude_patterns, file_path) {
            return false;
        }

        !self
            .exclude_regexes
            .iter()
            .any(|regex| regex.is_match(&file_name))
    }

    fn matches_any(&self, patterns: &[Pattern], file_path: &Path) -> bool {
        patterns.iter().any(|pattern| pattern.matches_path(file_path))
    }
}
