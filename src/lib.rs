//! birdnest - nest files that share a name prefix into sub-folders
//!
//! Files named `<group><separator><rest>` are moved into a `<group>` directory
//! under the same root. The pipeline is an optional zip backup, a one-level
//! scan, classification by prefix, and the move itself.

pub mod backup;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod file_type;
pub mod mover;
pub mod output;
pub mod progress;
pub mod report;
pub mod scanner;

pub use backup::{Backup, BackupError, ZipBackup};
pub use classifier::{Classifier, Eligibility, NestMapping, classify};
pub use config::{CompiledFilters, ConfigError, ConflictPolicy, FileConfig, NestSettings};
pub use engine::Nest;
pub use error::{MoveError, NestError, NestResult};
pub use file_type::FileTypeFilter;
pub use report::{NestOutcome, NestReport};

/// Initializes `env_logger`. `RUST_LOG` still takes precedence.
pub fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}
