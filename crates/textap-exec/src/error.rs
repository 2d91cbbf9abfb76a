use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("file discovery failed: {0}")]
    Ledger(#[source] textap_io::Error),

    #[error("decoding {} for stream '{stream}' failed: {source}", path.display())]
    Decode {
        stream: String,
        path: PathBuf,
        #[source]
        source: textap_io::Error,
    },

    #[error("sink rejected {what} for stream '{stream}': {source}")]
    Sink {
        stream: String,
        what: &'static str,
        #[source]
        source: textap_io::Error,
    },

    #[error("state write failed: {0}")]
    State(#[source] textap_io::Error),
}

impl ExecError {
    /// True for failures raised before any file was touched.
    pub fn is_config(&self) -> bool {
        matches!(self, ExecError::Config(_))
    }

    /// Get suggestions for common errors.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            ExecError::Config(msg) if msg.contains("log_pattern") || msg.contains("log pattern") => vec![
                "Check log_pattern: it must compile and contain (?P<name>...) groups".into(),
                "Or set grok_pattern to %{NAME:field} references instead".into(),
            ],
            ExecError::Config(msg) if msg.contains("grok") => {
                vec!["Check grok_pattern: every %{NAME:field} must name a known pattern".into()]
            }
            ExecError::Ledger(_) => vec![
                "Check that every configured directory exists and is readable".into(),
            ],
            ExecError::Decode { .. } => vec![
                "Fix or move the malformed file; already-checkpointed streams will be skipped on retry".into(),
            ],
            ExecError::Sink { .. } | ExecError::State(_) => vec![
                "State was not advanced past the last checkpoint; re-run once the sink is healthy".into(),
            ],
            _ => vec![],
        }
    }
}
