#![forbid(unsafe_code)]
//! textap-exec: one run, start to finish.
//!
//! - `runtime`: `Tap` drives discover → infer (first decode pass) → emit (second pass).
//! - `emit`: per-stream schema → batches → checkpoint, in that order.
//! - `report`: what a run did, for logs and the CLI.

pub mod emit;
pub mod error;
pub mod report;
pub mod runtime;
pub mod source;

pub use error::ExecError;
pub use report::{RunReport, StreamReport};
pub use runtime::{Stream, Tap};
