//! Progress reporting for the move phase.
//!
//! The mover reports one unit per file. Sinks cannot fail, so a broken
//! display never interrupts a run.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::path::Path;

/// Receives progress events while files are moved.
pub trait ProgressSink {
    /// Called once with the number of files about to be processed.
    fn start(&self, total: u64);
    /// Called after each file, whether it moved or failed.
    fn advance(&self, source: &Path);
    /// Called once when the move phase ends.
    fn finish(&self);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn start(&self, _total: u64) {}
    fn advance(&self, _source: &Path) {}
    fn finish(&self) {}
}

/// Terminal progress bar.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::hidden();
        // Template is a constant; fall back to the default style if it ever fails to parse.
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        bar.set_style(style);
        Self { bar }
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for BarProgress {
    fn start(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_draw_target(ProgressDrawTarget::stderr());
        self.bar.set_message("Moving files to destination folders");
    }

    fn advance(&self, source: &Path) {
        if let Some(name) = source.file_name() {
            self.bar.set_message(name.to_string_lossy().into_owned());
        }
        self.bar.inc(1);
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_progress_counts_files() {
        let progress = BarProgress::new();
        progress.start(3);
        progress.advance(Path::new("/data/proj_alpha.txt"));
        progress.advance(Path::new("/data/proj_beta.txt"));
        assert_eq!(progress.bar.position(), 2);
        assert_eq!(progress.bar.length(), Some(3));
        progress.finish();
    }
}
