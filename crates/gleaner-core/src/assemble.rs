use std::fmt;

use crate::config::ExtractionConfig;
use crate::error::AppError;
use crate::extract::FieldExtractor;
use crate::models::{FieldFailure, Outcome, Record, RecordEntry, Resolution};
use crate::schema::FieldSchema;
use crate::traits::{Document, DocumentProvider};

/// Lifecycle of one assembly run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    DocumentAcquired,
    Extracting { field: usize, of: usize },
    Complete,
    DocumentReleased,
    AcquisitionFailed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Idle => write!(f, "idle"),
            RunState::DocumentAcquired => write!(f, "document acquired"),
            RunState::Extracting { field, of } => write!(f, "extracting field {field}/{of}"),
            RunState::Complete => write!(f, "complete"),
            RunState::DocumentReleased => write!(f, "document released"),
            RunState::AcquisitionFailed => write!(f, "acquisition failed"),
        }
    }
}

/// Builds one complete [`Record`] per document from a [`FieldSchema`].
///
/// Each field is extracted independently, in schema order. A field that
/// cannot be extracted resolves to its default and the run carries on, so
/// the record always holds exactly one entry per schema field.
#[derive(Debug, Clone, Default)]
pub struct RecordAssembler {
    extractor: FieldExtractor,
}

impl RecordAssembler {
    pub fn new(config: ExtractionConfig) -> Self {
        Self {
            extractor: FieldExtractor::new(config),
        }
    }

    /// Open `source`, assemble its record, and release the document.
    ///
    /// Only acquisition failure is an error; the document is closed exactly
    /// once after the last field resolves, however many fields defaulted.
    pub async fn run<P: DocumentProvider>(
        &self,
        provider: &P,
        source: &str,
        schema: &FieldSchema,
    ) -> Result<Record, AppError> {
        tracing::debug!(state = %RunState::Idle, "Opening {}", source);
        let document = match provider.open(source).await {
            Ok(doc) => doc,
            Err(e) => {
                tracing::error!(state = %RunState::AcquisitionFailed, "Could not open {source}: {e}");
                return Err(match e {
                    e @ AppError::AcquisitionFailed { .. } => e,
                    other => AppError::AcquisitionFailed {
                        source_id: source.to_string(),
                        reason: other.to_string(),
                    },
                });
            }
        };
        tracing::info!(state = %RunState::DocumentAcquired, "Opened {}", source);

        let record = self.assemble(&document, schema).await;

        if let Err(e) = document.close().await {
            tracing::warn!("Failed to release document {source}: {e}");
        }
        tracing::debug!(state = %RunState::DocumentReleased, "Released {}", source);

        Ok(record)
    }

    /// Resolve every field of `schema` against an already-open document.
    pub async fn assemble<D: Document>(&self, document: &D, schema: &FieldSchema) -> Record {
        let total = schema.len();
        let mut entries = Vec::with_capacity(total);

        for (i, spec) in schema.fields().iter().enumerate() {
            let state = RunState::Extracting {
                field: i + 1,
                of: total,
            };
            tracing::debug!(%state, field = %spec.name, "Locating {}", spec.locator);

            let result = self.extractor.extract(document, spec).await;
            let entry = match result.outcome {
                Outcome::Present(value) => {
                    tracing::info!(field = %spec.name, "Extracted");
                    RecordEntry {
                        name: spec.name.clone(),
                        value,
                        resolution: Resolution::Extracted,
                    }
                }
                Outcome::Absent(cause) => {
                    if let FieldFailure::Timeout {
                        last_error: Some(last),
                        ..
                    } = &cause
                    {
                        tracing::warn!(field = %spec.name, "Failed to extract {}: {cause} (last error: {last})", spec.name);
                    } else {
                        tracing::warn!(field = %spec.name, "Failed to extract {}: {cause}", spec.name);
                    }
                    RecordEntry {
                        name: spec.name.clone(),
                        value: spec.default.clone(),
                        resolution: Resolution::Defaulted,
                    }
                }
            };
            entries.push(entry);
        }

        let record = Record::new(entries);
        tracing::info!(
            state = %RunState::Complete,
            fields = record.len(),
            defaulted = record.defaulted().len(),
            "Assembled record for schema {}",
            schema.name
        );
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FieldSpec, FieldValue, Locator};
    use crate::normalize::Postprocess;
    use crate::testutil::*;

    fn profile_schema() -> FieldSchema {
        FieldSchema::new(
            "profile",
            vec![
                FieldSpec::one("name", Locator::css("h1")),
                FieldSpec::many("tags", Locator::css("h2")),
                FieldSpec::one("fee", Locator::css("p.fee")).with_postprocess(Postprocess::Normalize),
            ],
        )
        .unwrap()
    }

    fn full_document() -> MockDocument {
        MockDocument::new()
            .with(Locator::css("h1"), Script::Matches(vec!["Dr. A".into()]))
            .with(
                Locator::css("h2"),
                Script::Matches(vec!["Cardiology".into(), "General".into()]),
            )
            .with(Locator::css("p.fee"), Script::Matches(vec!["₹500".into()]))
    }

    #[tokio::test]
    async fn assembles_every_field_in_schema_order() {
        let assembler = RecordAssembler::new(fast_config());
        let record = assembler.assemble(&full_document(), &profile_schema()).await;

        let names: Vec<_> = record.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["name", "tags", "fee"]);
        assert_eq!(record.get("name"), Some(&FieldValue::from("Dr. A")));
        assert_eq!(
            record.get("tags"),
            Some(&FieldValue::List(vec!["Cardiology".into(), "General".into()]))
        );
        assert_eq!(record.get("fee"), Some(&FieldValue::from("500")));
        assert!(record.defaulted().is_empty());
    }

    #[tokio::test]
    async fn timed_out_field_takes_default_and_others_survive() {
        let doc = MockDocument::new()
            .with(Locator::css("h1"), Script::Matches(vec!["Dr. A".into()]))
            .with(Locator::css("h2"), Script::Hang)
            .with(Locator::css("p.fee"), Script::Matches(vec!["₹500".into()]));
        let assembler = RecordAssembler::new(fast_config());
        let record = assembler.assemble(&doc, &profile_schema()).await;

        assert_eq!(record.get("name"), Some(&FieldValue::from("Dr. A")));
        assert_eq!(record.get("tags"), Some(&FieldValue::List(vec![])));
        assert_eq!(record.get("fee"), Some(&FieldValue::from("500")));
        assert_eq!(record.defaulted(), vec!["tags"]);
    }

    #[tokio::test]
    async fn record_is_complete_when_every_field_fails() {
        let doc = MockDocument::new()
            .with(Locator::css("h1"), Script::Error("boom".into()))
            .with(Locator::css("h2"), Script::Error("boom".into()))
            .with(Locator::css("p.fee"), Script::Error("boom".into()));
        let assembler = RecordAssembler::new(fast_config());
        let schema = profile_schema();
        let record = assembler.assemble(&doc, &schema).await;

        assert_eq!(record.len(), schema.len());
        assert_eq!(record.get("name"), Some(&FieldValue::from("Not available")));
        assert_eq!(record.get("fee"), Some(&FieldValue::from("Not available")));
        assert_eq!(record.defaulted(), vec!["name", "tags", "fee"]);
    }

    #[tokio::test]
    async fn custom_default_is_used() {
        let schema = FieldSchema::new(
            "s",
            vec![FieldSpec::many("langs", Locator::css("h3")).with_default(vec!["English".to_string()])],
        )
        .unwrap();
        let assembler = RecordAssembler::new(fast_config());
        let record = assembler.assemble(&MockDocument::new(), &schema).await;
        assert_eq!(
            record.get("langs"),
            Some(&FieldValue::List(vec!["English".into()]))
        );
    }

    #[tokio::test]
    async fn empty_schema_yields_empty_record() {
        let assembler = RecordAssembler::new(fast_config());
        let schema = FieldSchema::new("empty", vec![]).unwrap();
        let record = assembler.assemble(&full_document(), &schema).await;
        assert!(record.is_empty());
        assert_eq!(serde_json::to_string(&record).unwrap(), "{}");
    }

    #[tokio::test]
    async fn run_releases_document_exactly_once() {
        let doc = MockDocument::new().with(Locator::css("h2"), Script::Error("boom".into()));
        let provider = MockDocumentProvider::new(doc);
        let assembler = RecordAssembler::new(fast_config());

        let record = assembler
            .run(&provider, "https://example.com/dr-a", &profile_schema())
            .await
            .unwrap();

        assert_eq!(record.len(), 3);
        assert_eq!(provider.document().close_count(), 1);
        assert_eq!(
            *provider.opened.lock().unwrap(),
            vec!["https://example.com/dr-a".to_string()]
        );
    }

    #[tokio::test]
    async fn run_ignores_release_failure() {
        let doc = full_document().with_close_error(AppError::Generic("tab already gone".into()));
        let provider = MockDocumentProvider::new(doc);
        let assembler = RecordAssembler::new(fast_config());

        let record = assembler
            .run(&provider, "https://example.com", &profile_schema())
            .await
            .unwrap();
        assert_eq!(record.get("name"), Some(&FieldValue::from("Dr. A")));
        assert_eq!(provider.document().close_count(), 1);
    }

    #[tokio::test]
    async fn acquisition_failure_aborts_before_any_field() {
        let provider =
            MockDocumentProvider::with_open_error(AppError::HttpError("HTTP 503".into()));
        let assembler = RecordAssembler::new(fast_config());

        let err = assembler
            .run(&provider, "https://example.com", &profile_schema())
            .await
            .unwrap_err();

        match err {
            AppError::AcquisitionFailed { source_id, reason } => {
                assert_eq!(source_id, "https://example.com");
                assert!(reason.contains("HTTP 503"));
            }
            other => panic!("expected AcquisitionFailed, got {other:?}"),
        }
        assert_eq!(provider.document().find_calls(&Locator::css("h1")), 0);
        assert_eq!(provider.document().close_count(), 0);
    }
}
