//! Error context and suggestions.

mod common;

use std::path::PathBuf;

use common::config;
use textap::core::{Error, FileFormat};
use textap::exec::{ExecError, Tap};
use textap::io::config::load_config;

#[test]
fn error_with_context() {
    let base = Error::Config("batch_size must be positive".into());
    match base.with_context("config file tap.json") {
        Error::Context { context, .. } => assert_eq!(context, "config file tap.json"),
        other => panic!("expected Context variant, got {other:?}"),
    }
}

#[test]
fn log_format_requires_pattern() {
    let cfg = config(vec![PathBuf::from("/tmp/logs")], FileFormat::Log);
    let err = Tap::new(&cfg).err().unwrap();
    assert!(err.is_config());
    assert!(err.to_string().contains("log_pattern"));
}

#[test]
fn bad_pattern_suggestions() {
    let mut cfg = config(vec![PathBuf::from("/tmp/logs")], FileFormat::Log);
    cfg.log_pattern = Some("no groups here".into());
    let err = Tap::new(&cfg).err().unwrap();
    assert!(err.is_config());
    assert!(!err.suggestions().is_empty());
}

#[test]
fn missing_directory_is_a_ledger_error() {
    let root = tempfile::tempdir().unwrap();
    let cfg = config(vec![root.path().join("absent")], FileFormat::Jsonl);
    let tap = Tap::new(&cfg).unwrap();
    let mut sink = textap::io::writers::MemorySink::new();
    let err = tap.run(textap::core::RunState::new(), &mut sink).unwrap_err();
    assert!(matches!(err, ExecError::Ledger(_)));
    assert!(err.suggestions().iter().any(|s| s.contains("directory")));
    assert!(sink.events.is_empty());
}

#[test]
fn invalid_config_file_names_the_file() {
    let root = tempfile::tempdir().unwrap();
    let path = root.path().join("tap.json");
    std::fs::write(&path, r#"{"directories": ["/a"], "file_format": "csv", "batch_size": 0}"#).unwrap();
    let err = load_config(&path).unwrap_err();
    assert!(err.to_string().contains("tap.json"));
}
