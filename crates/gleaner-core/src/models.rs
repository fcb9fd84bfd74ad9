use std::fmt;
use std::time::Duration;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use crate::normalize::Postprocess;

/// Placeholder stored for a single-valued field that could not be extracted.
pub const NOT_AVAILABLE: &str = "Not available";

/// Where a field lives in the document.
///
/// The query text is opaque to the core; only the document provider
/// interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locator {
    Css(String),
    #[serde(rename = "xpath")]
    XPath(String),
}

impl Locator {
    pub fn css(query: impl Into<String>) -> Self {
        Locator::Css(query.into())
    }

    pub fn xpath(query: impl Into<String>) -> Self {
        Locator::XPath(query.into())
    }

    pub fn query(&self) -> &str {
        match self {
            Locator::Css(q) | Locator::XPath(q) => q,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(q) => write!(f, "css:{q}"),
            Locator::XPath(q) => write!(f, "xpath:{q}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    #[default]
    One,
    Many,
}

/// How long the extractor may wait for a field to appear.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitPolicy {
    /// Poll until the locator matches or the configured timeout elapses.
    #[default]
    Bounded,
    /// Look once.
    None,
}

/// A resolved field value: a single text or an ordered list of texts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    /// The placeholder used when a field of this cardinality has no explicit default.
    pub fn placeholder(cardinality: Cardinality) -> Self {
        match cardinality {
            Cardinality::One => FieldValue::Text(NOT_AVAILABLE.to_string()),
            Cardinality::Many => FieldValue::List(Vec::new()),
        }
    }

    pub fn fits(&self, cardinality: Cardinality) -> bool {
        matches!(
            (self, cardinality),
            (FieldValue::Text(_), Cardinality::One) | (FieldValue::List(_), Cardinality::Many)
        )
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FieldValue::List(items) => Some(items),
            FieldValue::Text(_) => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(items: Vec<String>) -> Self {
        FieldValue::List(items)
    }
}

/// Declarative description of one field to extract.
///
/// When deserialized without a `default`, the placeholder for the field's
/// cardinality is filled in. Consistency between `default` and `cardinality`
/// is checked by [`FieldSchema`](crate::schema::FieldSchema).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawFieldSpec")]
pub struct FieldSpec {
    pub name: String,
    pub locator: Locator,
    pub cardinality: Cardinality,
    pub wait: WaitPolicy,
    pub default: FieldValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postprocess: Option<Postprocess>,
}

#[derive(Deserialize)]
struct RawFieldSpec {
    name: String,
    locator: Locator,
    #[serde(default)]
    cardinality: Cardinality,
    #[serde(default)]
    wait: WaitPolicy,
    #[serde(default)]
    default: Option<FieldValue>,
    #[serde(default)]
    postprocess: Option<Postprocess>,
}

impl From<RawFieldSpec> for FieldSpec {
    fn from(raw: RawFieldSpec) -> Self {
        let default = raw
            .default
            .unwrap_or_else(|| FieldValue::placeholder(raw.cardinality));
        Self {
            name: raw.name,
            locator: raw.locator,
            cardinality: raw.cardinality,
            wait: raw.wait,
            default,
            postprocess: raw.postprocess,
        }
    }
}

impl FieldSpec {
    /// A single-valued field with a bounded wait and the `"Not available"` default.
    pub fn one(name: impl Into<String>, locator: Locator) -> Self {
        Self::with_cardinality(name.into(), locator, Cardinality::One)
    }

    /// A multi-valued field with a bounded wait and an empty-list default.
    pub fn many(name: impl Into<String>, locator: Locator) -> Self {
        Self::with_cardinality(name.into(), locator, Cardinality::Many)
    }

    fn with_cardinality(name: String, locator: Locator, cardinality: Cardinality) -> Self {
        Self {
            name,
            locator,
            cardinality,
            wait: WaitPolicy::Bounded,
            default: FieldValue::placeholder(cardinality),
            postprocess: None,
        }
    }

    /// Look the field up once instead of waiting for it.
    pub fn immediate(mut self) -> Self {
        self.wait = WaitPolicy::None;
        self
    }

    pub fn with_default(mut self, default: impl Into<FieldValue>) -> Self {
        self.default = default.into();
        self
    }

    pub fn with_postprocess(mut self, postprocess: Postprocess) -> Self {
        self.postprocess = Some(postprocess);
        self
    }
}

/// Why a field resolved to its default.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldFailure {
    #[error("timed out after {waited:?}")]
    Timeout {
        waited: Duration,
        /// The last lookup fault seen while polling, if any.
        last_error: Option<String>,
    },

    #[error("no element matched")]
    NotFound,

    #[error("lookup failed: {0}")]
    LookupError(String),

    #[error("postprocess failed: {0}")]
    Postprocess(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Present(FieldValue),
    Absent(FieldFailure),
}

/// The result of extracting one field from one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    pub field: String,
    pub outcome: Outcome,
}

impl ExtractionResult {
    pub fn present(field: &str, value: FieldValue) -> Self {
        Self {
            field: field.to_string(),
            outcome: Outcome::Present(value),
        }
    }

    pub fn absent(field: &str, cause: FieldFailure) -> Self {
        Self {
            field: field.to_string(),
            outcome: Outcome::Absent(cause),
        }
    }

    pub fn cause(&self) -> Option<&FieldFailure> {
        match &self.outcome {
            Outcome::Absent(cause) => Some(cause),
            Outcome::Present(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Extracted,
    Defaulted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordEntry {
    pub name: String,
    pub value: FieldValue,
    pub resolution: Resolution,
}

/// Ordered mapping of field name to resolved value for one run.
///
/// Serializes as a JSON object whose keys follow schema order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    entries: Vec<RecordEntry>,
}

impl Record {
    pub fn new(entries: Vec<RecordEntry>) -> Self {
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| &e.value)
    }

    pub fn entries(&self) -> &[RecordEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names of the fields that fell back to their default, in schema order.
    pub fn defaulted(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.resolution == Resolution::Defaulted)
            .map(|e| e.name.as_str())
            .collect()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.name, &entry.value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_spec_fills_placeholder_default() {
        let spec: FieldSpec = serde_json::from_str(
            r#"{"name": "tags", "locator": {"css": "h2"}, "cardinality": "many"}"#,
        )
        .unwrap();
        assert_eq!(spec.default, FieldValue::List(vec![]));
        assert_eq!(spec.wait, WaitPolicy::Bounded);

        let spec: FieldSpec =
            serde_json::from_str(r#"{"name": "name", "locator": {"xpath": "//h1"}}"#).unwrap();
        assert_eq!(spec.cardinality, Cardinality::One);
        assert_eq!(spec.default, FieldValue::Text(NOT_AVAILABLE.into()));
        assert_eq!(spec.locator, Locator::xpath("//h1"));
    }

    #[test]
    fn test_field_spec_keeps_explicit_default_and_wait() {
        let spec: FieldSpec = serde_json::from_str(
            r#"{"name": "fee", "locator": {"css": "p.fee"}, "wait": "none", "default": "n/a"}"#,
        )
        .unwrap();
        assert_eq!(spec.wait, WaitPolicy::None);
        assert_eq!(spec.default, FieldValue::Text("n/a".into()));
    }

    #[test]
    fn test_field_value_fits_cardinality() {
        assert!(FieldValue::from("x").fits(Cardinality::One));
        assert!(!FieldValue::from("x").fits(Cardinality::Many));
        assert!(FieldValue::List(vec![]).fits(Cardinality::Many));
    }

    #[test]
    fn test_record_serializes_in_entry_order() {
        let record = Record::new(vec![
            RecordEntry {
                name: "zeta".into(),
                value: "₹500".into(),
                resolution: Resolution::Extracted,
            },
            RecordEntry {
                name: "alpha".into(),
                value: FieldValue::List(vec!["a".into()]),
                resolution: Resolution::Defaulted,
            },
        ]);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"zeta":"₹500","alpha":["a"]}"#);
        assert_eq!(record.defaulted(), vec!["alpha"]);
    }

    #[test]
    fn test_locator_display() {
        assert_eq!(Locator::css("h1").to_string(), "css:h1");
        assert_eq!(Locator::xpath("//h1").to_string(), "xpath://h1");
    }
}
