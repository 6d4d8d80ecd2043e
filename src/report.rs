//! JSON report of a finished run.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::traverse::RunSummary;

/// What a run did, written with `--report`.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub root: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub summary: RunSummary,
}

impl RunReport {
    pub fn new(root: &Path, started_at: DateTime<Utc>, summary: RunSummary) -> Self {
        Self {
            root: root.to_path_buf(),
            started_at,
            finished_at: Utc::now(),
            summary,
        }
    }

    /// Write the report as pretty JSON, creating parent directories.
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize run report")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write run report: {}", path.display()))?;
        Ok(())
    }
}
