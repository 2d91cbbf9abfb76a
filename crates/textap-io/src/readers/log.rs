//! Pattern-parsed log reader → `Record`s.
//!
//! Every line yields one record: the named captures of `LogPattern` that took
//! part in the match become fields, followed by the raw line under
//! `_sdc_raw_log_line`. A line that does not match yields only the raw line.
//! Patterns come either as a plain regex with `(?P<name>...)` groups or as a
//! grok expression (see `grok`).

use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};

use regex::Regex;
use serde_json::Value;
use textap_core::record::RAW_LOG_LINE_FIELD;
use textap_core::Record;

use super::grok::{self, Capture};
use super::{trim_line_end, Decoded};
use crate::error::{Error, Result};

/// Compiled line pattern. Only named captures produce fields.
#[derive(Debug, Clone)]
pub struct LogPattern {
    regex: Regex,
    fields: Vec<Capture>,
}

impl LogPattern {
    /// Plain regex; every named group is a string field.
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern)?;
        let fields: Vec<Capture> = regex.capture_names().flatten().map(Capture::plain).collect();
        if fields.is_empty() {
            return Err(textap_core::Error::Config(format!(
                "log_pattern {pattern:?} has no named groups; use (?P<name>...)"
            ))
            .into());
        }
        Ok(Self { regex, fields })
    }

    /// Grok expression such as `%{IP:client} %{WORD:method}`.
    pub fn from_grok(expr: &str) -> Result<Self> {
        let mut expansion = grok::expand(expr)?;
        let regex = Regex::new(&expansion.regex)?;
        // pattern order, so fields come out in the order they appear
        let fields: Vec<Capture> = regex
            .capture_names()
            .flatten()
            .map(|group| {
                expansion
                    .captures
                    .remove(group)
                    .unwrap_or_else(|| Capture::plain(group))
            })
            .collect();
        if fields.is_empty() {
            return Err(textap_core::Error::Config(format!(
                "grok_pattern {expr:?} names no fields; use %{{NAME:field}}"
            ))
            .into());
        }
        Ok(Self { regex, fields })
    }

    /// Field names, in pattern order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|c| c.field.as_str())
    }

    pub fn parse_line(&self, line: &str) -> Record {
        let mut rec = Record::new();
        if let Some(caps) = self.regex.captures(line) {
            for capture in &self.fields {
                if let Some(m) = caps.name(&capture.group) {
                    rec.insert(capture.field.clone(), capture.value(m.as_str()));
                }
            }
        }
        rec.insert(RAW_LOG_LINE_FIELD.to_string(), Value::String(line.to_string()));
        rec
    }
}

pub struct LogReader<R: Read> {
    reader: BufReader<R>,
    pattern: LogPattern,
    path: PathBuf,
    line: u64,
    failed: bool,
}

impl LogReader<File> {
    pub fn from_path(path: &Path, pattern: LogPattern) -> Result<Self> {
        let f = File::open(path).map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_reader(f, path, pattern))
    }
}

impl<R: Read> LogReader<R> {
    pub fn from_reader(reader: R, path: impl Into<PathBuf>, pattern: LogPattern) -> Self {
        Self {
            reader: BufReader::new(reader),
            pattern,
            path: path.into(),
            line: 0,
            failed: false,
        }
    }

    pub fn next_record(&mut self) -> Result<Option<Decoded>> {
        let mut s = String::new();
        let n = match self.reader.read_line(&mut s) {
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                return Err(Error::decode(&self.path, self.line + 1, "line is not valid UTF-8"))
            }
            Err(e) => return Err(e.into()),
        };
        if n == 0 {
            return Ok(None);
        }
        self.line += 1;
        let line = trim_line_end(&s);
        Ok(Some(Decoded {
            record: self.pattern.parse_line(line),
            raw: Some(line.to_string()),
        }))
    }
}

impl<R: Read> Iterator for LogReader<R> {
    type Item = Result<Decoded>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.next_record().transpose();
        if matches!(item, Some(Err(_))) {
            self.failed = true;
        }
        item
    }
}
