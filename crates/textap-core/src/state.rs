//! Run state carried between invocations: the file ledger and the per-stream shapes.
//!
//! Document layout:
//! ```json
//! { "previously_seen_files": { "orders": ["<fingerprint>", "..."] },
//!   "schemas": { "orders": { "type": "object", "properties": { } } } }
//! ```
//! Any other top-level keys are kept as-is and written back unchanged.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::schema::Shape;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    /// Stream name → fingerprints of files already processed.
    #[serde(default)]
    pub previously_seen_files: BTreeMap<String, BTreeSet<String>>,

    /// Stream name → last emitted shape; the seed for the next run.
    #[serde(default)]
    pub schemas: BTreeMap<String, Shape>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a state document. Blank input is an empty state.
    pub fn from_json_str(src: &str) -> Result<Self> {
        if src.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(src).map_err(|e| Error::State(format!("invalid state document: {e}")))
    }

    pub fn from_value(v: Value) -> Result<Self> {
        if v.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(v).map_err(|e| Error::State(format!("invalid state document: {e}")))
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn has_seen(&self, stream: &str, fingerprint: &str) -> bool {
        self.previously_seen_files
            .get(stream)
            .is_some_and(|seen| seen.contains(fingerprint))
    }

    /// Record `fingerprint` as processed for `stream`. Returns false if it already was.
    pub fn mark_seen(&mut self, stream: &str, fingerprint: &str) -> bool {
        self.previously_seen_files
            .entry(stream.to_string())
            .or_default()
            .insert(fingerprint.to_string())
    }

    pub fn seen_count(&self, stream: &str) -> usize {
        self.previously_seen_files.get(stream).map_or(0, |s| s.len())
    }

    pub fn schema(&self, stream: &str) -> Option<&Shape> {
        self.schemas.get(stream)
    }

    pub fn set_schema(&mut self, stream: &str, shape: Shape) {
        self.schemas.insert(stream.to_string(), shape);
    }

    /// Copy `stream`'s ledger and shape from `other` into this state, leaving
    /// every other stream untouched.
    pub fn absorb_stream(&mut self, stream: &str, other: &RunState) {
        if let Some(seen) = other.previously_seen_files.get(stream) {
            self.previously_seen_files
                .entry(stream.to_string())
                .or_default()
                .extend(seen.iter().cloned());
        }
        if let Some(shape) = other.schemas.get(stream) {
            self.schemas.insert(stream.to_string(), shape.clone());
        }
    }
}
