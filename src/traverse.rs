//! Recursive traversal engine.
//!
//! Nested archives are handled with a FIFO work queue instead of recursion:
//!
//! 1. Discover - walk the root for archive candidates and seed the queue
//! 2. Drain    - pop, extract into `<stem>_extracted`, mark visited, and on
//!               success rescan the output for newly revealed archives
//! 3. Report   - print the run summary once the queue is empty
//!
//! The visited set is keyed by absolute path, so every distinct path reaches
//! the extractor at most once and the queue always drains. The key is the
//! path rather than the content: an archive that keeps re-extracting a copy
//! of itself under fresh names is not detected.

use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::archive::{ArchiveCandidate, Extractor};
use crate::progress::Reporter;

/// Aggregate counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Archives discovered so far (initial scan plus everything revealed since)
    pub discovered: usize,
    /// Archives handed to the extractor
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Paths of archives that failed to extract, in processing order
    pub failed_archives: Vec<PathBuf>,
}

impl RunSummary {
    /// Integer percentage of processed vs. discovered (floor).
    pub fn percent(&self) -> usize {
        if self.discovered == 0 {
            0
        } else {
            self.processed * 100 / self.discovered
        }
    }
}

/// Result of popping one queue entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Extracted into the given directory
    Success(PathBuf),
    Failure,
    /// Path was already attempted earlier in the run
    Skipped,
}

/// Recursively find archive candidates under `dir`, in file-name order.
///
/// Symlinks are followed; a link cycle surfaces as an unreadable entry.
pub fn discover(dir: &Path, split_volumes: bool) -> Vec<ArchiveCandidate> {
    WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", dir.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| ArchiveCandidate::classify_with(entry.path(), split_volumes))
        .collect()
}

/// Identity used by the visited set.
fn visit_key(path: &Path) -> PathBuf {
    fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Queue-driven extraction of every archive under a root, nested ones included.
pub struct Traversal<'a> {
    extractor: &'a Extractor,
    password: Option<&'a str>,
    split_volumes: bool,
    queue: VecDeque<ArchiveCandidate>,
    visited: HashSet<PathBuf>,
    summary: RunSummary,
}

impl<'a> Traversal<'a> {
    /// `password` is passed to the extractor for every archive.
    pub fn new(extractor: &'a Extractor, password: Option<&'a str>) -> Self {
        Self {
            extractor,
            password,
            split_volumes: false,
            queue: VecDeque::new(),
            visited: HashSet::new(),
            summary: RunSummary::default(),
        }
    }

    /// Also treat `name.<ext>.001` as an archive.
    pub fn with_split_volumes(mut self, enabled: bool) -> Self {
        self.split_volumes = enabled;
        self
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Paths attempted so far (success or failure).
    pub fn visited(&self) -> &HashSet<PathBuf> {
        &self.visited
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    /// Scan `root` and seed the queue. Returns how many candidates were found.
    pub fn seed(&mut self, root: &Path) -> usize {
        let found = discover(root, self.split_volumes);
        let count = found.len();
        info!("Discovered {} archives under {}", count, root.display());
        self.summary.discovered += count;
        self.queue.extend(found);
        count
    }

    /// Pop and process the head of the queue; `None` once it's empty.
    pub fn step(&mut self, reporter: &Reporter) -> Option<Outcome> {
        let candidate = self.queue.pop_front()?;

        let key = visit_key(candidate.path());
        if self.visited.contains(&key) {
            debug!("Already visited, skipping: {}", candidate.path().display());
            return Some(Outcome::Skipped);
        }

        self.summary.processed += 1;
        reporter.begin(self.summary.processed, self.summary.discovered, &candidate);

        let output_dir = candidate.output_dir();
        let extractor = self.extractor;
        let password = self.password;
        let ok = reporter.suspend(|| extractor.extract(&candidate, &output_dir, password));

        // Terminal either way: never retried
        self.visited.insert(key);

        let outcome = if ok {
            self.summary.succeeded += 1;
            reporter.succeeded(&output_dir);
            self.enqueue_revealed(&output_dir, reporter);
            Outcome::Success(output_dir)
        } else {
            self.summary.failed += 1;
            self.summary
                .failed_archives
                .push(candidate.path().to_path_buf());
            reporter.failed(&candidate);
            Outcome::Failure
        };

        reporter.progress(&self.summary);
        Some(outcome)
    }

    /// Rescan a fresh output directory and append unvisited archives to the tail.
    fn enqueue_revealed(&mut self, output_dir: &Path, reporter: &Reporter) {
        for found in discover(output_dir, self.split_volumes) {
            if self.visited.contains(&visit_key(found.path())) {
                continue;
            }
            reporter.revealed(&found);
            self.summary.discovered += 1;
            self.queue.push_back(found);
        }
    }

    /// Seed from `root` and drain the queue to completion.
    pub fn run(&mut self, root: &Path, reporter: &Reporter) -> RunSummary {
        if self.seed(root) == 0 {
            reporter.nothing_to_do(root);
            return self.summary.clone();
        }

        reporter.start(self.summary.discovered);
        while self.step(reporter).is_some() {}
        reporter.finish(&self.summary);

        info!(
            "Run complete: {} processed, {} succeeded, {} failed",
            self.summary.processed, self.summary.succeeded, self.summary.failed
        );
        self.summary.clone()
    }
}

/// Extract every archive under `root`, nested ones included, with `password`.
pub fn traverse(
    root: &Path,
    extractor: &Extractor,
    password: Option<&str>,
    reporter: &Reporter,
) -> RunSummary {
    Traversal::new(extractor, password).run(root, reporter)
}
