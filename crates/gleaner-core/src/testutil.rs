//! Test utilities: mock implementations of all core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::ExtractionConfig;
use crate::error::AppError;
use crate::models::{Locator, Record};
use crate::traits::{Document, DocumentProvider, RecordSink};

/// A 100ms bound polled every 10ms, so timeout paths finish quickly.
pub fn fast_config() -> ExtractionConfig {
    ExtractionConfig::new(Duration::from_millis(100)).with_poll_interval(Duration::from_millis(10))
}

// ---------------------------------------------------------------------------
// MockDocument
// ---------------------------------------------------------------------------

/// How a [`MockDocument`] answers lookups for one locator.
#[derive(Debug, Clone)]
pub enum Script {
    /// Always return these texts.
    Matches(Vec<String>),
    /// Always fail with a retryable lookup error.
    Error(String),
    /// Always fail because the locator can never be answered.
    Invalid(String),
    /// Fail as "still rendering" for the first `polls` lookups, then match.
    AfterPolls { polls: usize, matches: Vec<String> },
    /// Never resolve.
    Hang,
}

/// Mock document answering lookups from per-locator scripts.
///
/// Locators without a script match nothing.
#[derive(Clone, Default)]
pub struct MockDocument {
    scripts: Arc<Mutex<HashMap<Locator, Script>>>,
    calls: Arc<Mutex<HashMap<Locator, usize>>>,
    closed: Arc<Mutex<usize>>,
    close_error: Arc<Mutex<Option<AppError>>>,
}

impl MockDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, locator: Locator, script: Script) -> Self {
        self.scripts.lock().unwrap().insert(locator, script);
        self
    }

    pub fn with_close_error(self, error: AppError) -> Self {
        *self.close_error.lock().unwrap() = Some(error);
        self
    }

    pub fn find_calls(&self, locator: &Locator) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(locator)
            .copied()
            .unwrap_or(0)
    }

    pub fn close_count(&self) -> usize {
        *self.closed.lock().unwrap()
    }
}

impl Document for MockDocument {
    async fn find(&self, locator: &Locator) -> Result<Vec<String>, AppError> {
        let attempt = {
            let mut calls = self.calls.lock().unwrap();
            let n = calls.entry(locator.clone()).or_insert(0);
            *n += 1;
            *n
        };
        let script = self.scripts.lock().unwrap().get(locator).cloned();

        match script {
            None => Ok(vec![]),
            Some(Script::Matches(matches)) => Ok(matches),
            Some(Script::Error(msg)) => Err(AppError::LookupError(msg)),
            Some(Script::Invalid(msg)) => Err(AppError::InvalidLocator(msg)),
            Some(Script::AfterPolls { polls, matches }) => {
                if attempt > polls {
                    Ok(matches)
                } else {
                    Err(AppError::LookupError("document still rendering".into()))
                }
            }
            Some(Script::Hang) => std::future::pending().await,
        }
    }

    async fn close(self) -> Result<(), AppError> {
        *self.closed.lock().unwrap() += 1;
        match self.close_error.lock().unwrap().take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// MockDocumentProvider
// ---------------------------------------------------------------------------

/// Mock provider that hands out clones of one [`MockDocument`].
#[derive(Clone)]
pub struct MockDocumentProvider {
    document: MockDocument,
    open_error: Arc<Mutex<Option<AppError>>>,
    pub opened: Arc<Mutex<Vec<String>>>,
}

impl MockDocumentProvider {
    pub fn new(document: MockDocument) -> Self {
        Self {
            document,
            open_error: Arc::new(Mutex::new(None)),
            opened: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_open_error(error: AppError) -> Self {
        Self {
            document: MockDocument::new(),
            open_error: Arc::new(Mutex::new(Some(error))),
            opened: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn document(&self) -> &MockDocument {
        &self.document
    }
}

impl DocumentProvider for MockDocumentProvider {
    type Document = MockDocument;

    async fn open(&self, source: &str) -> Result<MockDocument, AppError> {
        self.opened.lock().unwrap().push(source.to_string());
        if let Some(e) = self.open_error.lock().unwrap().take() {
            return Err(e);
        }
        Ok(self.document.clone())
    }
}

// ---------------------------------------------------------------------------
// MockSink
// ---------------------------------------------------------------------------

/// Mock sink that records writes and can be told to fail.
#[derive(Clone, Default)]
pub struct MockSink {
    pub saved: Arc<Mutex<Vec<Record>>>,
    error: Arc<Mutex<Option<AppError>>>,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_error(error: AppError) -> Self {
        Self {
            saved: Arc::new(Mutex::new(Vec::new())),
            error: Arc::new(Mutex::new(Some(error))),
        }
    }
}

impl RecordSink for MockSink {
    fn write(&self, record: &Record) -> Result<(), AppError> {
        if let Some(e) = self.error.lock().unwrap().take() {
            return Err(e);
        }
        self.saved.lock().unwrap().push(record.clone());
        Ok(())
    }
}
