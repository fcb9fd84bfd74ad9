//! Single-field extraction with failure isolation.
//!
//! [`FieldExtractor::extract`] never returns an error: every fault raised by
//! the document (timeouts, missing elements, query failures) and every
//! postprocess failure is folded into an
//! [`Outcome::Absent`](crate::models::Outcome::Absent) carrying its cause.

use crate::config::ExtractionConfig;
use crate::models::{
    Cardinality, ExtractionResult, FieldFailure, FieldSpec, FieldValue, WaitPolicy,
};
use crate::traits::Document;

#[derive(Debug, Clone, Default)]
pub struct FieldExtractor {
    config: ExtractionConfig,
}

impl FieldExtractor {
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    /// Extract one field from `document` according to `spec`.
    pub async fn extract<D: Document>(&self, document: &D, spec: &FieldSpec) -> ExtractionResult {
        let matches = match spec.wait {
            WaitPolicy::Bounded => self.wait_for(document, spec).await,
            WaitPolicy::None => lookup_once(document, spec).await,
        };
        let matches = match matches {
            Ok(m) => m,
            Err(cause) => return ExtractionResult::absent(&spec.name, cause),
        };

        let value = match spec.cardinality {
            Cardinality::One => match matches.first() {
                Some(text) => FieldValue::Text(text.trim().to_string()),
                None => return ExtractionResult::absent(&spec.name, FieldFailure::NotFound),
            },
            Cardinality::Many => FieldValue::List(
                matches
                    .iter()
                    .map(|t| t.trim())
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
        };

        match postprocess(spec, value) {
            Ok(value) => ExtractionResult::present(&spec.name, value),
            Err(cause) => ExtractionResult::absent(&spec.name, cause),
        }
    }

    /// Poll until at least one element matches, bounded by `wait_timeout`.
    ///
    /// Retryable lookup faults are ridden out and the most recent one is
    /// reported if the wait expires. Any other fault ends the wait at once.
    async fn wait_for<D: Document>(
        &self,
        document: &D,
        spec: &FieldSpec,
    ) -> Result<Vec<String>, FieldFailure> {
        let mut last_error: Option<String> = None;
        let mut attempts = 0u32;

        let polled = tokio::time::timeout(self.config.wait_timeout, async {
            loop {
                attempts += 1;
                match document.find(&spec.locator).await {
                    Ok(matches) if !matches.is_empty() => return Ok(matches),
                    Ok(_) => {}
                    Err(e) if e.is_retryable() => {
                        tracing::debug!(field = %spec.name, attempt = attempts, "Lookup not ready: {e}");
                        last_error = Some(e.to_string());
                    }
                    Err(e) => return Err(FieldFailure::LookupError(e.to_string())),
                }
                tokio::time::sleep(self.config.poll_interval).await;
            }
        })
        .await;

        match polled {
            Ok(Ok(matches)) => {
                tracing::debug!(field = %spec.name, attempts, "Locator {} matched", spec.locator);
                Ok(matches)
            }
            Ok(Err(cause)) => Err(cause),
            Err(_) => Err(FieldFailure::Timeout {
                waited: self.config.wait_timeout,
                last_error,
            }),
        }
    }
}

async fn lookup_once<D: Document>(
    document: &D,
    spec: &FieldSpec,
) -> Result<Vec<String>, FieldFailure> {
    document
        .find(&spec.locator)
        .await
        .map_err(|e| FieldFailure::LookupError(e.to_string()))
}

fn postprocess(spec: &FieldSpec, value: FieldValue) -> Result<FieldValue, FieldFailure> {
    let Some(step) = &spec.postprocess else {
        return Ok(value);
    };
    let failed = |e: crate::error::AppError| FieldFailure::Postprocess(e.to_string());
    match value {
        FieldValue::Text(text) => step.apply(&text).map(FieldValue::Text).map_err(failed),
        FieldValue::List(items) => items
            .iter()
            .map(|item| step.apply(item))
            .collect::<Result<Vec<_>, _>>()
            .map(FieldValue::List)
            .map_err(failed),
    }
}
