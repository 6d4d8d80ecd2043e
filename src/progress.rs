//! Console progress for a traversal run.
//!
//! Per-archive lines go through the progress bar when it is drawn (so they
//! scroll above it) and straight to stdout otherwise. The bar's length grows
//! with the running total as nested archives are revealed.

use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

use crate::archive::ArchiveCandidate;
use crate::traverse::RunSummary;

const RULE_WIDTH: usize = 60;

/// Progress output for one traversal.
pub struct Reporter {
    bar: ProgressBar,
    quiet: bool,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter {
    /// Reporter drawing a bar on stderr when it's a terminal, plain lines otherwise.
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] Extracting [{bar:40.cyan/blue}] {pos}/{len} | {msg}")
        {
            bar.set_style(style.progress_chars("=>-"));
        }
        Self { bar, quiet: false }
    }

    /// Reporter that prints nothing.
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            quiet: true,
        }
    }

    fn line(&self, text: impl AsRef<str>) {
        if self.quiet {
            return;
        }
        if self.bar.is_hidden() {
            println!("{}", text.as_ref());
        } else {
            self.bar.println(text.as_ref());
        }
    }

    /// Print directly, bypassing the bar (used once it's cleared).
    fn plain(&self, text: impl AsRef<str>) {
        if !self.quiet {
            println!("{}", text.as_ref());
        }
    }

    pub fn nothing_to_do(&self, root: &Path) {
        self.bar.finish_and_clear();
        self.plain(format!("No archives found in {}, nothing to do", root.display()));
    }

    pub fn start(&self, total: usize) {
        self.line(format!("\nFound {} archives, starting extraction...", total));
        self.line("=".repeat(RULE_WIDTH));
        self.bar.set_length(total as u64);
    }

    /// Announce the archive at `position` (1-based) of the current `total`.
    pub fn begin(&self, position: usize, total: usize, candidate: &ArchiveCandidate) {
        let size_mb = std::fs::metadata(candidate.path())
            .map(|m| m.len() as f64 / (1024.0 * 1024.0))
            .unwrap_or(0.0);
        self.line(format!(
            "\n[{}/{}] Extracting: {} ({:.2} MB)",
            position,
            total,
            candidate.file_name(),
            size_mb
        ));
        self.line(format!("  Path: {}", candidate.path().display()));
        self.bar.set_message(candidate.file_name());
    }

    /// Run `f` with the bar cleared, so backend output can't tear it.
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        self.bar.suspend(f)
    }

    pub fn succeeded(&self, output_dir: &Path) {
        self.line(format!("  ✓ Extracted -> {}", output_dir.display()));
    }

    pub fn revealed(&self, candidate: &ArchiveCandidate) {
        self.line(format!("  → Found nested archive: {}", candidate.file_name()));
    }

    pub fn failed(&self, candidate: &ArchiveCandidate) {
        self.line(format!("  ✗ Failed: {}", candidate.file_name()));
    }

    pub fn progress(&self, summary: &RunSummary) {
        self.line(format!(
            "  Progress: {}/{} ({}%) | OK: {} | Failed: {}",
            summary.processed,
            summary.discovered,
            summary.percent(),
            summary.succeeded,
            summary.failed
        ));
        self.bar.set_length(summary.discovered as u64);
        self.bar.set_position(summary.processed as u64);
    }

    pub fn finish(&self, summary: &RunSummary) {
        self.bar.finish_and_clear();
        self.plain(format!("\n{}", "=".repeat(RULE_WIDTH)));
        self.plain("Extraction complete!");
        self.plain(format!("  Total:     {} archives", summary.processed));
        self.plain(format!("  Succeeded: {}", summary.succeeded));
        self.plain(format!("  Failed:    {}", summary.failed));
    }
}
