//! Huginn error types

/// Huginn error types.
///
/// The first three variants are the classification-path failure kinds.
/// `ScoringUnavailable` and `InvalidBatchInput` are fatal to the call that
/// raised them; `LoggingSinkFailure` is only ever observed inside the sink
/// fan-out and never returned from a classification call.
#[derive(Debug, thiserror::Error)]
pub enum HuginnError {
    #[error("scoring unavailable: {0}")]
    ScoringUnavailable(String),

    #[error("invalid batch input: {0}")]
    InvalidBatchInput(String),

    #[error("logging sink '{sink}' failed: {message}")]
    LoggingSinkFailure { sink: String, message: String },

    // Construction errors
    #[error("invalid category set: {0}")]
    InvalidCategories(String),

    #[error("invalid hypothesis template: {0}")]
    InvalidTemplate(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    // Client transport errors (huginn CLI -> huginnd)
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HuginnError {
    /// Shorthand for a sink failure.
    pub fn sink(sink: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::LoggingSinkFailure {
            sink: sink.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error must fail the operation that produced it.
    ///
    /// Sink failures are best-effort observability faults and are not fatal.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::LoggingSinkFailure { .. })
    }
}

/// Result type alias for Huginn operations
pub type Result<T> = std::result::Result<T, HuginnError>;
