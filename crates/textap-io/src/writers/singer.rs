//! Singer-style message writer: one JSON message per line.
//!
//! ```text
//! {"type":"SCHEMA","stream":"orders","schema":{...},"key_properties":[]}
//! {"type":"RECORD","stream":"orders","record":{"id":1}}
//! {"type":"STATE","value":{"previously_seen_files":{...},"schemas":{...}}}
//! ```

use std::io::{self, Write};

use serde::Serialize;
use serde_json::Value;
use textap_core::{Record, RunState, Shape};

use super::Sink;
use crate::error::Result;

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum Message<'a> {
    Schema {
        stream: &'a str,
        schema: Value,
        key_properties: &'a [String],
    },
    Record {
        stream: &'a str,
        record: &'a Record,
    },
    State {
        value: Value,
    },
}

pub struct SingerWriter<W: Write> {
    out: W,
}

impl SingerWriter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> SingerWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_message(&mut self, msg: &Message<'_>) -> Result<()> {
        serde_json::to_writer(&mut self.out, msg)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }
}

impl<W: Write> Sink for SingerWriter<W> {
    fn write_schema(&mut self, stream: &str, shape: &Shape, key_properties: &[String]) -> Result<()> {
        self.write_message(&Message::Schema {
            stream,
            schema: shape.to_document(),
            key_properties,
        })?;
        self.out.flush()?;
        Ok(())
    }

    fn write_records(&mut self, stream: &str, records: &[Record]) -> Result<()> {
        for record in records {
            self.write_message(&Message::Record { stream, record })?;
        }
        self.out.flush()?;
        Ok(())
    }

    fn write_state(&mut self, state: &RunState) -> Result<()> {
        self.write_message(&Message::State {
            value: state.to_value()?,
        })?;
        self.out.flush()?;
        Ok(())
    }
}
