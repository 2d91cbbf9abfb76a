use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid log pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("cannot list {}: {source}", path.display())]
    Enumerate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot fingerprint {}: {source}", path.display())]
    Fingerprint {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: {message}", path.display())]
    Decode {
        path: PathBuf,
        line: u64,
        message: String,
    },

    #[error("sink error: {0}")]
    Sink(String),

    #[error(transparent)]
    Core(#[from] textap_core::Error),
}

impl Error {
    pub(crate) fn decode(path: &std::path::Path, line: u64, message: impl Into<String>) -> Self {
        Error::Decode {
            path: path.to_path_buf(),
            line,
            message: message.into(),
        }
    }
}
