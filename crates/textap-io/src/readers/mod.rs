//! Format decoders. Each one turns a single file into a lazy, ordered,
//! finite stream of `Decoded` records; re-opening the file restarts the stream.

pub mod csv;
pub mod grok;
pub mod jsonl;
pub mod log;

use std::path::Path;

use textap_core::record::attach_key;
use textap_core::{FileFormat, Record, TapConfig};

use crate::error::Result;

pub use self::csv::CsvReader;
pub use self::jsonl::JsonlReader;
pub use self::log::{LogPattern, LogReader};

/// One decoded record plus the source text it came from, when the format has
/// a single line per record.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub record: Record,
    /// The line without its line ending. `None` for CSV rows.
    pub raw: Option<String>,
}

impl Decoded {
    /// The record, with `_singer_gen_key` added when `with_key` is set.
    pub fn into_record(self, with_key: bool) -> Record {
        if with_key {
            attach_key(self.record, self.raw.as_deref())
        } else {
            self.record
        }
    }
}

pub type RecordStream = Box<dyn Iterator<Item = Result<Decoded>>>;

/// Decoder for the run-wide format, chosen once from the config.
#[derive(Debug, Clone)]
pub enum Decoder {
    Jsonl,
    Csv { delimiter: u8 },
    Log(LogPattern),
}

impl Decoder {
    /// Build the decoder for `cfg.file_format`. Fails on an invalid log or
    /// grok pattern.
    pub fn from_config(cfg: &TapConfig) -> Result<Self> {
        Ok(match cfg.file_format {
            FileFormat::Jsonl => Decoder::Jsonl,
            FileFormat::Csv => Decoder::Csv {
                delimiter: cfg.csv_delimiter_byte(),
            },
            FileFormat::Log => match (cfg.grok_pattern.as_deref(), cfg.log_pattern.as_deref()) {
                (Some(expr), _) => Decoder::Log(LogPattern::from_grok(expr)?),
                (None, Some(pattern)) => Decoder::Log(LogPattern::new(pattern)?),
                (None, None) => {
                    return Err(textap_core::Error::Config(
                        "log_pattern or grok_pattern is required when file_format is \"log\"".into(),
                    )
                    .into())
                }
            },
        })
    }

    pub fn format(&self) -> FileFormat {
        match self {
            Decoder::Jsonl => FileFormat::Jsonl,
            Decoder::Csv { .. } => FileFormat::Csv,
            Decoder::Log(_) => FileFormat::Log,
        }
    }

    /// Open `path` and return its records in file order.
    pub fn open(&self, path: &Path) -> Result<RecordStream> {
        Ok(match self {
            Decoder::Jsonl => Box::new(JsonlReader::from_path(path)?),
            Decoder::Csv { delimiter } => Box::new(CsvReader::from_path(path, *delimiter)?),
            Decoder::Log(pattern) => Box::new(LogReader::from_path(path, pattern.clone())?),
        })
    }
}

/// Strip a trailing `\n` or `\r\n`.
pub(crate) fn trim_line_end(s: &str) -> &str {
    let s = s.strip_suffix('\n').unwrap_or(s);
    s.strip_suffix('\r').unwrap_or(s)
}
