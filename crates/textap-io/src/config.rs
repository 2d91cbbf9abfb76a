//! Load a `TapConfig` from disk: `.yaml`/`.yml` as YAML, anything else as JSON.

use std::fs;
use std::path::Path;

use textap_core::TapConfig;

use crate::error::{Error, Result};

pub fn load_config(path: &Path) -> Result<TapConfig> {
    let src = fs::read_to_string(path).map_err(|source| Error::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let cfg = if is_yaml {
        TapConfig::from_yaml_str(&src)
    } else {
        TapConfig::from_json_str(&src)
    };
    Ok(cfg.map_err(|e| e.with_context(format!("config file {}", path.display())))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use textap_core::FileFormat;

    #[test]
    fn picks_parser_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("config.json");
        fs::write(&json, r#"{"directories": ["/a"], "file_format": "csv"}"#).unwrap();
        assert_eq!(load_config(&json).unwrap().file_format, FileFormat::Csv);

        let yaml = dir.path().join("config.yml");
        fs::write(&yaml, "directories:\n  - /a\nfile_format: jsonl\nbatch_size: 10\n").unwrap();
        let cfg = load_config(&yaml).unwrap();
        assert_eq!(cfg.file_format, FileFormat::Jsonl);
        assert_eq!(cfg.batch_size, 10);
    }

    #[test]
    fn missing_file_and_bad_config_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_config(&dir.path().join("nope.json")),
            Err(Error::Open { .. })
        ));

        let bad = dir.path().join("bad.json");
        fs::write(&bad, r#"{"file_format": "jsonl"}"#).unwrap();
        let err = load_config(&bad).unwrap_err();
        assert!(err.to_string().contains("config file"));
    }
}
