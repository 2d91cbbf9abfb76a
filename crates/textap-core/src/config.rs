//! Run configuration. Parsed and validated once, then passed by reference.
//!
//! Example (JSON, the Singer convention):
//! ```json
//! { "directories": ["/data/orders/", "/data/refunds"],
//!   "file_format": "jsonl",
//!   "rec_hash_keys": true }
//! ```

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Records per `write_records` call unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Closed set of supported source formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    /// One JSON object per line.
    Jsonl,
    /// Delimited text with a header row.
    Csv,
    /// Free-form lines matched against `log_pattern` or `grok_pattern`.
    Log,
}

impl FileFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileFormat::Jsonl => "jsonl",
            FileFormat::Csv => "csv",
            FileFormat::Log => "log",
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TapConfig {
    /// Source directories; each one's base name is its stream name.
    pub directories: Vec<PathBuf>,

    pub file_format: FileFormat,

    /// Append a content-hash key field to every record.
    #[serde(default)]
    pub rec_hash_keys: bool,

    /// Regular expression with named groups. `log` needs this or `grok_pattern`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_pattern: Option<String>,

    /// Grok expression, e.g. `%{IP:client} %{WORD:method}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grok_pattern: Option<String>,

    /// Candidate file extension without the dot. Defaults to the format name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_extension: Option<String>,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csv_delimiter: Option<char>,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl TapConfig {
    /// Minimal config for `format` over `directories`; everything else defaulted.
    pub fn new(directories: Vec<PathBuf>, file_format: FileFormat) -> Self {
        Self {
            directories,
            file_format,
            rec_hash_keys: false,
            log_pattern: None,
            grok_pattern: None,
            file_extension: None,
            batch_size: DEFAULT_BATCH_SIZE,
            csv_delimiter: None,
        }
    }

    pub fn from_json_str(src: &str) -> Result<Self> {
        let cfg: TapConfig =
            serde_json::from_str(src).map_err(|e| Error::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml_str(src: &str) -> Result<Self> {
        let cfg: TapConfig =
            serde_yaml::from_str(src).map_err(|e| Error::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Checks cross-field requirements serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::Config("batch_size must be greater than zero".into()));
        }
        if self.file_format == FileFormat::Log {
            match (self.log_pattern.as_deref(), self.grok_pattern.as_deref()) {
                (None, None) => {
                    return Err(Error::Config(
                        "log_pattern or grok_pattern is required when file_format is \"log\""
                            .into(),
                    ))
                }
                (Some(_), Some(_)) => {
                    return Err(Error::Config(
                        "set only one of log_pattern and grok_pattern".into(),
                    ))
                }
                (Some(p), None) if p.trim().is_empty() => {
                    return Err(Error::Config("log_pattern must not be empty".into()))
                }
                (None, Some(p)) if p.trim().is_empty() => {
                    return Err(Error::Config("grok_pattern must not be empty".into()))
                }
                _ => {}
            }
        }
        if let Some(ext) = &self.file_extension {
            if ext.is_empty() || ext.starts_with('.') {
                return Err(Error::Config(format!(
                    "file_extension must be a bare extension like \"jsonl\", got {ext:?}"
                )));
            }
        }
        if let Some(d) = self.csv_delimiter {
            if !d.is_ascii() {
                return Err(Error::Config(format!(
                    "csv_delimiter must be a single ASCII character, got {d:?}"
                )));
            }
        }
        for dir in &self.directories {
            if dir.as_os_str().is_empty() {
                return Err(Error::Config("directories must not contain empty paths".into()));
            }
        }
        Ok(())
    }

    /// Extension a file must carry to be a candidate.
    pub fn extension(&self) -> &str {
        self.file_extension
            .as_deref()
            .unwrap_or_else(|| self.file_format.as_str())
    }

    pub fn csv_delimiter_byte(&self) -> u8 {
        // validate() guarantees ASCII
        self.csv_delimiter.map(|c| c as u8).unwrap_or(b',')
    }

    /// Key fields announced with every schema.
    pub fn key_properties(&self) -> Vec<String> {
        if self.rec_hash_keys {
            vec![crate::record::RECORD_KEY_FIELD.to_string()]
        } else {
            vec![]
        }
    }
}
