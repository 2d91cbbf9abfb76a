//! Decoded records.

use serde_json::{Map, Value};

use crate::hash::{hash_bytes, record_key};

/// Ordered mapping of field name → value, in decoded order.
pub type Record = Map<String, Value>;

/// Synthetic identity field appended when `rec_hash_keys` is on.
pub const RECORD_KEY_FIELD: &str = "_singer_gen_key";

/// Field holding the unparsed line for `log` sources.
pub const RAW_LOG_LINE_FIELD: &str = "_sdc_raw_log_line";

/// Append the content-derived key field to `record`.
///
/// With `raw`, the key is the digest of that exact source text, so two lines
/// that decode to equal records but are spelled differently keep distinct
/// keys. Without it (CSV rows) the key is taken over the record's canonical
/// JSON. Either way the key is computed before the key field is added.
pub fn attach_key(mut record: Record, raw: Option<&str>) -> Record {
    let key = match raw {
        Some(text) => hash_bytes(text.as_bytes()).to_hex(),
        None => record_key(&record),
    };
    record.insert(RECORD_KEY_FIELD.to_string(), Value::String(key));
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(text: &str) -> Record {
        serde_json::from_str(text).unwrap()
    }

    fn key(r: &Record) -> &Value {
        &r[RECORD_KEY_FIELD]
    }

    #[test]
    fn raw_text_distinguishes_spellings() {
        let lines = [r#"{"a":1,"b":2}"#, r#"{"b":2,"a":1}"#, r#"{"a":1.0,"b":2}"#, r#"{"a":1.00,"b":2}"#];
        let keyed: Vec<Record> = lines.iter().map(|l| attach_key(rec(l), Some(*l))).collect();
        for i in 0..keyed.len() {
            for j in (i + 1)..keyed.len() {
                assert_ne!(key(&keyed[i]), key(&keyed[j]), "{} vs {}", lines[i], lines[j]);
            }
        }
        assert_eq!(key(&keyed[0]), &json!(hash_bytes(lines[0].as_bytes()).to_hex()));
    }

    #[test]
    fn rows_without_raw_text_use_canonical_json() {
        let a = attach_key(rec(r#"{"a":1,"b":"x"}"#), None);
        let b = attach_key(rec(r#"{"b":"x","a":1}"#), None);
        assert_eq!(key(&a), key(&b));
        // the key is appended last and does not feed into itself
        assert_eq!(a.keys().last().map(String::as_str), Some(RECORD_KEY_FIELD));
    }
}
