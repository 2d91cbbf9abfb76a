//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use textap::core::{FileFormat, RunState, TapConfig};
use textap::exec::{RunReport, Tap};
use textap::io::writers::MemorySink;

pub fn write_file(dir: &Path, name: &str, body: &str) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
}

pub fn config(dirs: Vec<PathBuf>, format: FileFormat) -> TapConfig {
    TapConfig::new(dirs, format)
}

/// Run once into a fresh `MemorySink`.
pub fn run_once(cfg: &TapConfig, state: RunState) -> (MemorySink, RunReport) {
    let tap = Tap::new(cfg).unwrap();
    let mut sink = MemorySink::new();
    let report = tap.run(state, &mut sink).unwrap();
    (sink, report)
}
