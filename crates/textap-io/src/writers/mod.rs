//! Downstream sinks.
//!
//! The run calls a sink in a fixed order per stream: `write_schema` once,
//! `write_records` for every batch, then `write_state` for the checkpoint.
//! A sink must have handed data on (or failed) by the time a call returns.

pub mod memory;
pub mod singer;
pub mod state_file;

use textap_core::{Record, RunState, Shape};

use crate::error::Result;

pub use memory::{MemorySink, SinkEvent};
pub use singer::SingerWriter;
pub use state_file::StateFileSink;

pub trait Sink {
    fn write_schema(&mut self, stream: &str, shape: &Shape, key_properties: &[String]) -> Result<()>;

    fn write_records(&mut self, stream: &str, records: &[Record]) -> Result<()>;

    fn write_state(&mut self, state: &RunState) -> Result<()>;
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn write_schema(&mut self, stream: &str, shape: &Shape, key_properties: &[String]) -> Result<()> {
        (**self).write_schema(stream, shape, key_properties)
    }

    fn write_records(&mut self, stream: &str, records: &[Record]) -> Result<()> {
        (**self).write_records(stream, records)
    }

    fn write_state(&mut self, state: &RunState) -> Result<()> {
        (**self).write_state(state)
    }
}
