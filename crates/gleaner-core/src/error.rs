use std::path::PathBuf;

use thiserror::Error;

/// Application-wide error types for Gleaner.
#[derive(Error, Debug)]
pub enum AppError {
    /// The document could not be obtained from its source.
    #[error("Failed to acquire document {source_id}: {reason}")]
    AcquisitionFailed { source_id: String, reason: String },

    /// The document's query mechanism faulted; a later lookup may succeed.
    #[error("Lookup error: {0}")]
    LookupError(String),

    /// The locator can never be answered by this document.
    #[error("Invalid locator: {0}")]
    InvalidLocator(String),

    /// A field postprocess step rejected its input.
    #[error("Postprocess error: {0}")]
    PostprocessError(String),

    /// A field schema failed to load or validate.
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// The assembled record could not be persisted.
    #[error("Failed to write record to {}: {reason}", .path.display())]
    SinkWrite { path: PathBuf, reason: String },

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// HTTP request failed (fetching a page).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true if repeating the operation may succeed.
    ///
    /// Only lookup faults qualify: a page that is still rendering can answer
    /// the same query later, while a malformed or unsupported locator cannot.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::LookupError(_))
    }
}
