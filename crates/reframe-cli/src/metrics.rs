//! Per-stage run metrics, appended as JSON lines.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One timed stage of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    /// Stage label, e.g. `Re-rendering images`.
    pub operation: String,
    /// Strategy used by the stage, `-` for stages without one.
    pub setup: String,
    pub elapsed_ms: f64,
    /// Files in the stage's output directory afterwards.
    pub frames: usize,
    pub resolution: String,
    pub file_name: String,
}

pub struct MetricsLog {
    path: PathBuf,
}

impl MetricsLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Append one record, creating the file (and its directory) on first use.
    pub fn append(&self, record: &StageRecord) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let line = serde_json::to_string(record)?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open metrics file: {}", self.path.display()))?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}

/// Number of regular files directly inside `dir`, 0 if it cannot be read.
pub fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
                .count()
        })
        .unwrap_or(0)
}
