use thiserror::Error;

/// Canonical result for core.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("State error: {0}")]
    State(String),

    /// Error with context chain for better debugging
    #[error("Error in {context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    /// Add context to an error, creating an error chain.
    ///
    /// # Example
    /// ```rust,no_run
    /// use textap_core::error::Error;
    /// let err = Error::State("schemas must be an object".into());
    /// let err = err.with_context("while loading state.json");
    /// ```
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Error::Context {
            context: context.into(),
            source: Box::new(self) as Box<dyn std::error::Error + Send + Sync>,
        }
    }

    /// Get suggestions for common errors.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Error::Config(msg) => {
                if msg.contains("grok_pattern") && !msg.contains("log_pattern") {
                    vec!["Reference patterns as %{NAME:field}, optionally %{NAME:field:int}".into()]
                } else if msg.contains("log_pattern") {
                    vec![
                        "Set log_pattern to a regular expression with named groups, e.g. (?P<level>\\w+)".into(),
                        "Or set grok_pattern to an expression such as %{IP:client} %{GREEDYDATA:msg}".into(),
                        "log_pattern and grok_pattern are only read when file_format is \"log\"".into(),
                    ]
                } else if msg.contains("file_format") {
                    vec!["Supported formats: jsonl, csv, log".into()]
                } else if msg.contains("directories") {
                    vec!["List at least one source directory under \"directories\"".into()]
                } else {
                    vec![]
                }
            }
            Error::State(_) | Error::Schema(_) => {
                vec![
                    "Check that the state file was written by a previous run".into(),
                    "Delete the offending entry under \"schemas\" to re-infer it from scratch".into(),
                ]
            }
            _ => vec![],
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::State(e.to_string())
    }
}
