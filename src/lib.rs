//! textap: incremental extraction of JSONL, CSV and regex-parsed log files
//! into a stream of Singer SCHEMA/RECORD/STATE messages.
//!
//! This package only re-exports the workspace crates so integration tests
//! and embedders can depend on a single name.

pub use textap_core as core;
pub use textap_exec as exec;
pub use textap_io as io;
