#![forbid(unsafe_code)]
//! textap-io: everything that touches files or the downstream consumer.
//!
//! - `ledger`: enumerate candidate files, fingerprint them, filter against `RunState`.
//! - `readers`: JSONL/CSV/log decoders → lazy `Decoded` streams.
//! - `writers`: the `Sink` trait plus Singer-message, in-memory and state-file sinks.
//! - `config`: load a `TapConfig` from a JSON or YAML file.

pub mod config;
pub mod error;
pub mod ledger;
pub mod readers;
pub mod writers;

pub use error::{Error, Result};
pub use ledger::{ContentLedger, FileEntry, StreamFiles};
pub use readers::{Decoded, Decoder, RecordStream};
pub use writers::Sink;
