//! Durable per-loop run statistics.
//!
//! The stats file is a JSON array with one element per loop iteration,
//! consumed by an external visualizer; its shape is a compatibility
//! contract. Appending reads the existing array, pushes, and atomically
//! rewrites the whole file. The rewrite is O(n) in history size, which is
//! acceptable at a cadence of minutes per loop.

use crate::error::Result;
use crate::io::atomic_write;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStat {
    pub description: String,
    /// `HH:MM:SS`
    pub total_time: String,
    pub active_time: String,
    pub maintenance_time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopTotals {
    pub total_tasks: usize,
    pub total_task_time: String,
    pub total_active_time: String,
    pub total_maintenance_time: String,
}

/// One record per orchestration-loop iteration; never mutated after being
/// appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopSummary {
    #[serde(rename = "loop")]
    pub loop_count: u64,
    /// ISO-8601 wall-clock timestamp.
    pub timestamp: String,
    pub tasks: Vec<TaskStat>,
    pub totals: LoopTotals,
}

pub struct StatsStore {
    path: PathBuf,
}

impl StatsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Append `summary` to the stats array and rewrite the file atomically.
    pub fn append(&self, summary: &LoopSummary) -> Result<()> {
        let mut entries = self.entries();
        entries.push(serde_json::to_value(summary)?);
        let data = serde_json::to_string_pretty(&entries)?;
        atomic_write(&self.path, data.as_bytes())?;
        info!("saved loop stats to {}", self.path.display());
        Ok(())
    }

    /// The current stats array. A missing file, or one that no longer
    /// parses as a JSON array, starts a fresh history.
    pub fn entries(&self) -> Vec<serde_json::Value> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(_) => return Vec::new(),
        };
        match serde_json::from_str(&data) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    "stats file {} is not a valid JSON array ({e}), starting fresh",
                    self.path.display()
                );
                Vec::new()
            }
        }
    }
}
