//! In-memory sink that records every call, in call order.

use textap_core::{Record, RunState, Shape};

use super::Sink;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Schema {
        stream: String,
        shape: Shape,
        key_properties: Vec<String>,
    },
    Records {
        stream: String,
        records: Vec<Record>,
    },
    State(RunState),
}

#[derive(Debug, Default)]
pub struct MemorySink {
    pub events: Vec<SinkEvent>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record written for `stream`, flattened across batches.
    pub fn records_for(&self, stream: &str) -> Vec<Record> {
        self.batches_for(stream).into_iter().flatten().cloned().collect()
    }

    pub fn batches_for(&self, stream: &str) -> Vec<&[Record]> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Records { stream: s, records } if s == stream => Some(records.as_slice()),
                _ => None,
            })
            .collect()
    }

    pub fn schema_for(&self, stream: &str) -> Option<&Shape> {
        self.events.iter().find_map(|e| match e {
            SinkEvent::Schema { stream: s, shape, .. } if s == stream => Some(shape),
            _ => None,
        })
    }

    pub fn states(&self) -> Vec<&RunState> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SinkEvent::State(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn last_state(&self) -> Option<&RunState> {
        self.states().last().copied()
    }
}

impl Sink for MemorySink {
    fn write_schema(&mut self, stream: &str, shape: &Shape, key_properties: &[String]) -> Result<()> {
        self.events.push(SinkEvent::Schema {
            stream: stream.to_string(),
            shape: shape.clone(),
            key_properties: key_properties.to_vec(),
        });
        Ok(())
    }

    fn write_records(&mut self, stream: &str, records: &[Record]) -> Result<()> {
        self.events.push(SinkEvent::Records {
            stream: stream.to_string(),
            records: records.to_vec(),
        });
        Ok(())
    }

    fn write_state(&mut self, state: &RunState) -> Result<()> {
        self.events.push(SinkEvent::State(state.clone()));
        Ok(())
    }
}
