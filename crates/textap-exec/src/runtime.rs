//! Runtime: execute one run over a `TapConfig` and return a `RunReport`.
//!
//! Behavior:
//! - Builds the decoder once; a bad config fails before any file is read.
//! - Discovery runs the content ledger over every directory (streams sorted by name).
//! - Inference decodes every new file once and folds it into the stream's shape.
//! - Emission decodes every new file again and hands it to the sink in batches.
//!
//! The state passed in is owned for the whole run. Discovery marks fingerprints
//! in a working copy right away; checkpoints are cut from a separate committed
//! copy that only ever receives fully emitted streams.

use std::collections::BTreeMap;

use textap_core::{RunState, Shape, ShapeBuilder, TapConfig};
use textap_io::{ContentLedger, Decoder, FileEntry, Sink};
use tracing::info;

use crate::emit::BatchEmitter;
use crate::error::ExecError;
use crate::report::RunReport;
use crate::source::RecordSource;

/// One output stream for this run.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    pub name: String,
    /// New files only, sorted by display name.
    pub files: Vec<FileEntry>,
    pub skipped: usize,
    /// Final once `Tap::infer` has run.
    pub shape: Shape,
}

pub struct Tap<'c> {
    cfg: &'c TapConfig,
    decoder: Decoder,
}

impl<'c> Tap<'c> {
    pub fn new(cfg: &'c TapConfig) -> Result<Self, ExecError> {
        cfg.validate().map_err(|e| ExecError::Config(e.to_string()))?;
        let decoder = Decoder::from_config(cfg).map_err(|e| ExecError::Config(e.to_string()))?;
        Ok(Self { cfg, decoder })
    }

    pub fn config(&self) -> &TapConfig {
        self.cfg
    }

    fn source(&self) -> RecordSource<'_> {
        RecordSource::new(&self.decoder, self.cfg.rec_hash_keys)
    }

    /// Run the content ledger over every configured directory.
    pub fn discover(&self, state: &mut RunState) -> Result<Vec<Stream>, ExecError> {
        let found = ContentLedger::new(state, self.cfg.extension())
            .scan_all(&self.cfg.directories)
            .map_err(ExecError::Ledger)?;
        Ok(found
            .into_values()
            .map(|s| {
                let mut files = s.files;
                files.sort_by(|a, b| a.display_name.cmp(&b.display_name));
                Stream {
                    name: s.name,
                    files,
                    skipped: s.skipped,
                    shape: Shape::empty_object(),
                }
            })
            .collect())
    }

    /// First decode pass: fold every record of every new file into the
    /// stream's shape, seeded from `state`, and store the result back in `state`.
    pub fn infer(&self, streams: &mut [Stream], state: &mut RunState) -> Result<(), ExecError> {
        info!("Building schemas");
        let source = self.source();
        for stream in streams.iter_mut() {
            info!("Building schema for `{}`", stream.name);
            let seed = state.schema(&stream.name);
            if seed.is_some() {
                info!("Existing schema for `{}` will be used as seed schema", stream.name);
            }
            let mut builder = ShapeBuilder::new(seed);
            for file in &stream.files {
                source.for_each_record(&stream.name, file, |rec| {
                    builder.add_record(&rec);
                    Ok(())
                })?;
            }
            info!(
                "Schema for `{}` covers {} new records",
                stream.name,
                builder.records_seen()
            );
            stream.shape = builder.finish();
            state.set_schema(&stream.name, stream.shape.clone());
        }
        info!("Done building schemas");
        Ok(())
    }

    /// Discovery and inference only. Nothing is written anywhere; the
    /// returned shapes are what `run` would announce.
    pub fn infer_only(&self, mut state: RunState) -> Result<BTreeMap<String, Shape>, ExecError> {
        let mut streams = self.discover(&mut state)?;
        self.infer(&mut streams, &mut state)?;
        Ok(streams.into_iter().map(|s| (s.name, s.shape)).collect())
    }

    /// Full run: discover, infer, emit, final state. Returns what was emitted.
    pub fn run<S: Sink + ?Sized>(&self, state: RunState, sink: &mut S) -> Result<RunReport, ExecError> {
        let mut report = RunReport::start();
        info!(
            "Going to sync .{} files from {} directories",
            self.cfg.extension(),
            self.cfg.directories.len()
        );

        let mut committed = state.clone();
        let mut working = state;

        let mut streams = self.discover(&mut working)?;
        self.infer(&mut streams, &mut working)?;

        info!("Extracting data");
        let source = self.source();
        let mut emitter = BatchEmitter::new(sink, self.cfg.batch_size, self.cfg.key_properties());
        for stream in &streams {
            let stream_report = emitter.emit_stream(stream, &source, &working, &mut committed)?;
            info!(
                "Emitted {} records in {} batches for `{}`",
                stream_report.records, stream_report.batches, stream_report.name
            );
            report.streams.push(stream_report);
        }

        info!("Writing final state");
        emitter.write_state(&committed)?;

        let report = report.finish();
        info!(
            "Run complete: {} records from {} new files across {} streams",
            report.total_records(),
            report.total_new_files(),
            report.streams.len()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use std::path::Path;
    use textap_core::FileFormat;
    use textap_io::writers::{MemorySink, SinkEvent};

    fn write(dir: &Path, name: &str, body: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn bad_log_pattern_fails_before_io() {
        let mut cfg = TapConfig::new(vec!["/definitely/not/here".into()], FileFormat::Log);
        cfg.log_pattern = Some("(?P<x>".into());
        let err = Tap::new(&cfg).err().unwrap();
        assert!(err.is_config());
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_file_aborts_before_anything_is_emitted() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("orders");
        write(&dir, "a.jsonl", "{\"id\":1}\n");
        std::os::unix::fs::symlink(dir.join("gone.bin"), dir.join("x.jsonl")).unwrap();

        let cfg = TapConfig::new(vec![dir], FileFormat::Jsonl);
        let tap = Tap::new(&cfg).unwrap();
        let mut sink = MemorySink::new();
        let err = tap.run(RunState::new(), &mut sink).unwrap_err();
        assert!(matches!(err, ExecError::Ledger(textap_io::Error::Fingerprint { .. })));
        assert!(sink.events.is_empty());
    }

    #[test]
    fn streams_are_emitted_in_name_order_with_checkpoints() {
        let root = tempfile::tempdir().unwrap();
        let zeta = root.path().join("zeta");
        let alpha = root.path().join("alpha");
        write(&zeta, "1.jsonl", "{\"z\":1}\n");
        write(&alpha, "1.jsonl", "{\"a\":1}\n");

        let cfg = TapConfig::new(vec![zeta, alpha], FileFormat::Jsonl);
        let tap = Tap::new(&cfg).unwrap();
        let mut sink = MemorySink::new();
        let report = tap.run(RunState::new(), &mut sink).unwrap();

        let order: Vec<String> = sink
            .events
            .iter()
            .map(|e| match e {
                SinkEvent::Schema { stream, .. } => format!("schema:{stream}"),
                SinkEvent::Records { stream, .. } => format!("records:{stream}"),
                SinkEvent::State(_) => "state".to_string(),
            })
            .collect();
        assert_eq!(
            order,
            [
                "schema:alpha",
                "records:alpha",
                "state",
                "schema:zeta",
                "records:zeta",
                "state",
                "state"
            ]
        );
        assert_eq!(report.total_records(), 2);

        // first checkpoint must not know about zeta yet
        let first = sink.states()[0];
        assert_eq!(first.seen_count("alpha"), 1);
        assert_eq!(first.seen_count("zeta"), 0);
        assert!(first.schema("zeta").is_none());
        assert_eq!(sink.states()[2].seen_count("zeta"), 1);
    }

    #[test]
    fn hash_keys_are_attached_and_announced() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("events");
        write(&dir, "a.csv", "id,name\n1,x\n1,x\n2,y\n");

        let mut cfg = TapConfig::new(vec![dir], FileFormat::Csv);
        cfg.rec_hash_keys = true;
        let tap = Tap::new(&cfg).unwrap();
        let mut sink = MemorySink::new();
        tap.run(RunState::new(), &mut sink).unwrap();

        let recs = sink.records_for("events");
        assert_eq!(recs.len(), 3);
        let key = |i: usize| recs[i].get("_singer_gen_key").cloned().unwrap();
        assert_eq!(key(0), key(1));
        assert_ne!(key(0), key(2));

        match &sink.events[0] {
            SinkEvent::Schema { key_properties, shape, .. } => {
                assert_eq!(key_properties, &vec!["_singer_gen_key".to_string()]);
                assert!(shape.object().unwrap().is_required("_singer_gen_key"));
            }
            other => panic!("expected schema first, got {other:?}"),
        }
    }

    #[test]
    fn infer_only_leaves_no_trace() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("orders");
        write(&dir, "a.jsonl", "{\"id\":1}\n");
        let cfg = TapConfig::new(vec![dir], FileFormat::Jsonl);
        let tap = Tap::new(&cfg).unwrap();

        let shapes = tap.infer_only(RunState::new()).unwrap();
        assert_eq!(
            shapes["orders"].to_document(),
            json!({"type": "object", "properties": {"id": {"type": "integer"}}, "required": ["id"]})
        );
        // a real run afterwards still sees the file as new
        let mut sink = MemorySink::new();
        let report = tap.run(RunState::new(), &mut sink).unwrap();
        assert_eq!(report.total_new_files(), 1);
    }
}
