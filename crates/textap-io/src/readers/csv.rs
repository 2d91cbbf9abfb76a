//! Streaming CSV reader → `Record`s.
//!
//! The first row is the header. Cells are typed one at a time: empty → null,
//! `true`/`false` → boolean, integer and float literals → numbers, anything
//! else stays a string. Rows with a different cell count than the header are
//! rejected rather than padded.

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde_json::{Number, Value};
use textap_core::Record;

use super::Decoded;
use crate::error::{Error, Result};

pub struct CsvReader<R: Read> {
    rdr: ::csv::Reader<R>,
    headers: Vec<String>,
    row: ::csv::StringRecord,
    path: PathBuf,
    failed: bool,
}

impl CsvReader<File> {
    pub fn from_path(path: &Path, delimiter: u8) -> Result<Self> {
        let file = File::open(path).map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file, path, delimiter)
    }
}

impl<R: Read> CsvReader<R> {
    pub fn from_reader(reader: R, path: impl Into<PathBuf>, delimiter: u8) -> Result<Self> {
        let path = path.into();
        let mut rdr = ::csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .delimiter(delimiter)
            .from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()
            .map_err(|e| csv_decode_error(&path, e))?
            .iter()
            .map(|s| s.to_string())
            .collect();

        let mut seen = HashSet::new();
        for h in &headers {
            if !seen.insert(h.as_str()) {
                return Err(Error::decode(&path, 1, format!("duplicate column name '{h}'")));
            }
        }

        Ok(Self {
            rdr,
            headers,
            row: ::csv::StringRecord::new(),
            path,
            failed: false,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Rows carry no raw text; their key comes from the typed record.
    pub fn next_record(&mut self) -> Result<Option<Decoded>> {
        let more = self
            .rdr
            .read_record(&mut self.row)
            .map_err(|e| csv_decode_error(&self.path, e))?;
        if !more {
            return Ok(None);
        }
        let mut rec = Record::new();
        for (name, cell) in self.headers.iter().zip(self.row.iter()) {
            rec.insert(name.clone(), infer_cell(cell));
        }
        Ok(Some(Decoded {
            record: rec,
            raw: None,
        }))
    }
}

impl<R: Read> Iterator for CsvReader<R> {
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

fn csv_decode_error(path: &Path, e: ::csv::Error) -> Error {
    let line = e.position().map(|p| p.line()).unwrap_or(0);
    Error::decode(path, line, e.to_string())
}

/// Type one cell.
pub fn infer_cell(cell: &str) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    if cell.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if cell.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if let Ok(i) = cell.parse::<i64>() {
        return Value::Number(i.into());
    }
    // JSON literals keep their exact text, so wide integers are not rounded.
    if let Ok(n) = cell.parse::<Number>() {
        return Value::Number(n);
    }
    // Rust also parses "inf"/"NaN"; those have no JSON number form and stay strings.
    if let Some(n) = cell.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(n);
    }
    Value::String(cell.to_string())
}
