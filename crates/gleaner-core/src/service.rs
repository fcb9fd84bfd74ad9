use std::time::{Duration, Instant};

use crate::assemble::RecordAssembler;
use crate::config::ExtractionConfig;
use crate::error::AppError;
use crate::models::Record;
use crate::schema::FieldSchema;
use crate::traits::{DocumentProvider, RecordSink};

/// Outcome of one extraction run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub record: Record,
    /// Fields that fell back to their default, in schema order.
    pub defaulted: Vec<String>,
    pub elapsed: Duration,
}

/// Orchestrates one run: open → extract every field → release → persist.
///
/// Generic over the document provider and the record sink, so it runs
/// against a real browser in production and against mocks in tests.
pub struct ExtractionService<P, S>
where
    P: DocumentProvider,
    S: RecordSink,
{
    provider: P,
    sink: Option<S>,
    assembler: RecordAssembler,
}

impl<P, S> ExtractionService<P, S>
where
    P: DocumentProvider,
    S: RecordSink,
{
    /// Create a new ExtractionService without persistence.
    pub fn new(provider: P, config: ExtractionConfig) -> Self {
        Self {
            provider,
            sink: None,
            assembler: RecordAssembler::new(config),
        }
    }

    /// Create a new ExtractionService that persists each record to `sink`.
    pub fn with_sink(provider: P, sink: S, config: ExtractionConfig) -> Self {
        Self {
            provider,
            sink: Some(sink),
            assembler: RecordAssembler::new(config),
        }
    }

    /// Extract `schema` from the document at `source`.
    ///
    /// Fails only when the document cannot be acquired or the record cannot
    /// be persisted; no file is written in the first case.
    pub async fn run(&self, source: &str, schema: &FieldSchema) -> Result<RunReport, AppError> {
        let started = Instant::now();
        tracing::info!("Extracting {} field(s) from {}", schema.len(), source);

        let record = self.assembler.run(&self.provider, source, schema).await?;
        let defaulted: Vec<String> = record.defaulted().into_iter().map(String::from).collect();

        if let Some(sink) = &self.sink {
            sink.write(&record)?;
        }

        let elapsed = started.elapsed();
        tracing::info!(
            fields = record.len(),
            defaulted = defaulted.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Run complete"
        );

        Ok(RunReport {
            record,
            defaulted,
            elapsed,
        })
    }
}
