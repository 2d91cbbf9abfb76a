//! Streaming NDJSON reader → `Record`s.
//!
//! Caveats:
//! - Blank lines are skipped.
//! - Every other line must be a JSON object; anything else is a decode error.
//! - The line text is kept next to the record, so keys can be derived from
//!   the exact source spelling.

use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};

use serde_json::Value;
use super::{trim_line_end, Decoded};
use crate::error::{Error, Result};

pub struct JsonlReader<R: Read> {
    reader: BufReader<R>,
    path: PathBuf,
    line: u64,
    failed: bool,
}

impl JsonlReader<File> {
    pub fn from_path(path: &Path) -> Result<Self> {
        let f = File::open(path).map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_reader(f, path))
    }
}

impl<R: Read> JsonlReader<R> {
    /// `path` is only used to label errors.
    pub fn from_reader(reader: R, path: impl Into<PathBuf>) -> Self {
        Self {
            reader: BufReader::new(reader),
            path: path.into(),
            line: 0,
            failed: false,
        }
    }

    pub fn next_record(&mut self) -> Result<Option<Decoded>> {
        let mut s = String::new();
        loop {
            s.clear();
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
            if s.trim().is_empty() {
                continue;
            }
            let v: Value = serde_json::from_str(&s)
                .map_err(|e| Error::decode(&self.path, self.line, e.to_string()))?;
            return match v {
                Value::Object(record) => {
                    let len = trim_line_end(&s).len();
                    s.truncate(len);
                    Ok(Some(Decoded {
                        record,
                        raw: Some(s),
                    }))
                }
                other => Err(Error::decode(
                    &self.path,
                    self.line,
                    format!("expected a JSON object, got {}", kind_name(&other)),
                )),
            };
        }
    }
}

impl<R: Read> Iterator for JsonlReader<R> {
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

fn kind_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use textap_core::Record;

    fn read_all(src: &str) -> Vec<Result<Record>> {
        JsonlReader::from_reader(src.as_bytes(), "mem.jsonl")
            .map(|r| r.map(|d| d.record))
            .collect()
    }

    #[test]
    fn reads_objects_in_order_and_skips_blank_lines() {
        let out = read_all("{\"id\":1}\n\n{\"id\":2,\"amt\":5.0}\r\n{\"id\":3}");
        let recs: Vec<Record> = out.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(recs.len(), 3);
        assert_eq!(recs[1].get("amt"), Some(&json!(5.0)));
        assert_eq!(recs[2].get("id"), Some(&json!(3)));
    }

    #[test]
    fn keeps_field_order() {
        let out = read_all("{\"z\":1,\"a\":2,\"m\":3}\n");
        let keys: Vec<&String> = out[0].as_ref().unwrap().keys().collect();
        assert_eq!(keys, ["z", "a", "m"]);
    }

    #[test]
    fn malformed_line_reports_position_and_stops() {
        let out = read_all("{\"id\":1}\n\n{oops\n{\"id\":3}\n");
        assert_eq!(out.len(), 2);
        match &out[1] {
            Err(Error::Decode { line, path, .. }) => {
                assert_eq!(*line, 3);
                assert_eq!(path, Path::new("mem.jsonl"));
            }
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn raw_text_is_the_line_without_its_ending() {
        let src = "{\"b\": 2, \"a\": 1.0}\r\n{\"a\":1}";
        let raws: Vec<Option<String>> = JsonlReader::from_reader(src.as_bytes(), "mem.jsonl")
            .map(|r| r.unwrap().raw)
            .collect();
        assert_eq!(
            raws,
            [Some("{\"b\": 2, \"a\": 1.0}".to_string()), Some("{\"a\":1}".to_string())]
        );
    }

    #[test]
    fn non_object_line_is_rejected() {
        let out = read_all("[1,2]\n");
        let err = out.into_iter().next().unwrap().unwrap_err();
        assert!(err.to_string().contains("expected a JSON object, got an array"));
    }
}
