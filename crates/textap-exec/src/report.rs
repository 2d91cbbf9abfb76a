//! Run report: per-stream counts plus wall-clock bounds.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamReport {
    pub name: String,
    pub new_files: usize,
    pub skipped_files: usize,
    pub records: u64,
    pub batches: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub started_ms: u64,
    pub finished_ms: u64,
    pub streams: Vec<StreamReport>,
}

impl RunReport {
    pub fn start() -> Self {
        Self {
            started_ms: now_millis(),
            finished_ms: 0,
            streams: Vec::new(),
        }
    }

    pub fn finish(mut self) -> Self {
        self.finished_ms = now_millis();
        self
    }

    pub fn total_records(&self) -> u64 {
        self.streams.iter().map(|s| s.records).sum()
    }

    pub fn total_new_files(&self) -> usize {
        self.streams.iter().map(|s| s.new_files).sum()
    }

    pub fn stream(&self, name: &str) -> Option<&StreamReport> {
        self.streams.iter().find(|s| s.name == name)
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
