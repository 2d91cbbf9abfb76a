//! State persistence to a local file.
//!
//! `StateFileSink` forwards everything to an inner sink and, after the inner
//! sink accepted a state, also writes it to `path` (temp file + rename, so a
//! crash leaves either the previous or the new state on disk).

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use textap_core::{Record, RunState, Shape};

use super::Sink;
use crate::error::{Error, Result};

pub struct StateFileSink<S: Sink> {
    inner: S,
    path: PathBuf,
}

impl<S: Sink> StateFileSink<S> {
    pub fn new(inner: S, path: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Sink> Sink for StateFileSink<S> {
    fn write_schema(&mut self, stream: &str, shape: &Shape, key_properties: &[String]) -> Result<()> {
        self.inner.write_schema(stream, shape, key_properties)
    }

    fn write_records(&mut self, stream: &str, records: &[Record]) -> Result<()> {
        self.inner.write_records(stream, records)
    }

    fn write_state(&mut self, state: &RunState) -> Result<()> {
        self.inner.write_state(state)?;
        save_state(&self.path, state)
    }
}

/// Read a state file. A missing file is an empty state.
pub fn load_state(path: &Path) -> Result<RunState> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(RunState::from_json_str(&text)
            .map_err(|e| e.with_context(format!("state file {}", path.display())))?),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(RunState::default()),
        Err(source) => Err(Error::Open {
            path: path.to_path_buf(),
            source,
        }),
    }
}

pub fn save_state(path: &Path, state: &RunState) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(state)?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, &bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writers::MemorySink;

    #[test]
    fn persists_each_state_after_inner_sink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        assert_eq!(load_state(&path).unwrap(), RunState::default());

        let mut sink = StateFileSink::new(MemorySink::new(), &path);
        let mut state = RunState::new();
        state.mark_seen("orders", "f1");
        state.set_schema("orders", Shape::empty_object());
        sink.write_state(&state).unwrap();

        assert_eq!(load_state(&path).unwrap(), state);
        assert!(!path.with_extension("tmp").exists());
        assert_eq!(sink.into_inner().states().len(), 1);
    }

    #[test]
    fn corrupt_state_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").unwrap();
        let err = load_state(&path).unwrap_err();
        assert!(err.to_string().contains("state file"));
    }
}
