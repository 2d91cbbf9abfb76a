//! Batch emission pipeline.
//!
//! Per stream the sink sees, strictly in this order:
//! 1. the stream's finalized schema (once),
//! 2. every record of every new file, files in display-name order, in
//!    batches of `batch_size` carried across file boundaries, the last one
//!    possibly short,
//! 3. a state checkpoint that covers this stream and every stream emitted
//!    before it, and nothing else.
//!
//! The checkpoint is built by copying the stream's ledger and shape from the
//! working state into the committed state, so ledger entries the discovery
//! pass already made for later streams never reach the sink early.

use textap_core::{Record, RunState};
use textap_io::Sink;
use tracing::{debug, info};

use crate::error::ExecError;
use crate::report::StreamReport;
use crate::runtime::Stream;
use crate::source::RecordSource;

pub struct BatchEmitter<'s, S: Sink + ?Sized> {
    sink: &'s mut S,
    batch_size: usize,
    key_properties: Vec<String>,
}

impl<'s, S: Sink + ?Sized> BatchEmitter<'s, S> {
    pub fn new(sink: &'s mut S, batch_size: usize, key_properties: Vec<String>) -> Self {
        Self {
            sink,
            batch_size: batch_size.max(1),
            key_properties,
        }
    }

    /// Schema, batches, then checkpoint for one stream.
    ///
    /// `committed` is advanced with this stream's entries from `working` only
    /// after the last batch was accepted.
    pub fn emit_stream(
        &mut self,
        stream: &Stream,
        source: &RecordSource<'_>,
        working: &RunState,
        committed: &mut RunState,
    ) -> Result<StreamReport, ExecError> {
        let name = stream.name.as_str();
        let mut report = StreamReport {
            name: name.to_string(),
            new_files: stream.files.len(),
            skipped_files: stream.skipped,
            ..Default::default()
        };

        info!("Writing schema for `{}`", name);
        self.sink
            .write_schema(name, &stream.shape, &self.key_properties)
            .map_err(|source| ExecError::Sink {
                stream: name.to_string(),
                what: "schema",
                source,
            })?;

        if !stream.files.is_empty() {
            info!("Extracting data from `{}`", name);
            let mut batch: Vec<Record> = Vec::with_capacity(self.batch_size);
            for file in &stream.files {
                let n = source.for_each_record(name, file, |rec| {
                    batch.push(rec);
                    if batch.len() >= self.batch_size {
                        self.flush(name, &mut batch, &mut report)?;
                    }
                    Ok(())
                })?;
                debug!(stream = name, file = %file.display_name, records = n, "file emitted");
                report.records += n;
            }
            self.flush(name, &mut batch, &mut report)?;
        }

        committed.absorb_stream(name, working);
        info!("Writing state for `{}`", name);
        self.write_state(committed)?;
        Ok(report)
    }

    pub fn write_state(&mut self, state: &RunState) -> Result<(), ExecError> {
        self.sink.write_state(state).map_err(ExecError::State)
    }

    fn flush(
        &mut self,
        stream: &str,
        batch: &mut Vec<Record>,
        report: &mut StreamReport,
    ) -> Result<(), ExecError> {
        if batch.is_empty() {
            return Ok(());
        }
        debug!(stream, size = batch.len(), "writing batch");
        self.sink
            .write_records(stream, batch)
            .map_err(|source| ExecError::Sink {
                stream: stream.to_string(),
                what: "records",
                source,
            })?;
        report.batches += 1;
        batch.clear();
        Ok(())
    }
}
