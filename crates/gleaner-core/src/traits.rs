use std::future::Future;

use crate::error::AppError;
use crate::models::{Locator, Record};

/// Opens documents from a source identifier (usually a URL).
pub trait DocumentProvider: Send + Sync {
    type Document: Document;

    /// Acquire a live handle to the document at `source`.
    ///
    /// Failure here aborts the run before any field is extracted.
    fn open(&self, source: &str) -> impl Future<Output = Result<Self::Document, AppError>> + Send;
}

/// A live, exclusively-owned handle to one opened document.
pub trait Document: Send + Sync {
    /// Return the text of every element matching `locator`, in document order.
    ///
    /// Must re-query the live document on every call; an empty vector means
    /// the lookup succeeded and matched nothing.
    fn find(&self, locator: &Locator)
    -> impl Future<Output = Result<Vec<String>, AppError>> + Send;

    /// Release the handle. Consumes it, so a document is closed at most once.
    fn close(self) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// Persists an assembled record.
pub trait RecordSink: Send + Sync {
    fn write(&self, record: &Record) -> Result<(), AppError>;
}

/// A no-op RecordSink for use when persistence is not needed.
#[derive(Debug, Clone)]
pub struct NullSink;

impl RecordSink for NullSink {
    fn write(&self, _record: &Record) -> Result<(), AppError> {
        Ok(())
    }
}
