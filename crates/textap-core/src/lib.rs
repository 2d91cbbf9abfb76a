#![forbid(unsafe_code)]
//! textap-core: shared kernel for the textap extractor.
//!
//! This crate contains only *pure* types and the schema unifier. There is
//! **no filesystem access** and **no logging** here.
//!
//! Crates that use this:
//! - textap-io: decodes files into `Record`s, fingerprints files into the `RunState` ledger.
//! - textap-exec: orchestrates a run over `TapConfig`, folding records into `Shape`s.

pub mod config;
pub mod error;
pub mod hash;
pub mod record;
pub mod schema;
pub mod state;

pub use config::{FileFormat, TapConfig};
pub use error::{Error, Result};
pub use record::Record;
pub use schema::{Kind, ObjectShape, Shape, ShapeBuilder};
pub use state::RunState;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
