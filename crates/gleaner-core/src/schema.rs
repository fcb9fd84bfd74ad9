use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{FieldSpec, Locator};

/// An ordered, validated set of fields to extract from one document.
///
/// Field names are unique, every default matches its field's cardinality,
/// and every postprocess step is usable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFieldSchema")]
pub struct FieldSchema {
    pub name: String,
    fields: Vec<FieldSpec>,
}

#[derive(Deserialize)]
struct RawFieldSchema {
    #[serde(default)]
    name: Option<String>,
    fields: Vec<FieldSpec>,
}

impl TryFrom<RawFieldSchema> for FieldSchema {
    type Error = AppError;

    fn try_from(raw: RawFieldSchema) -> Result<Self, Self::Error> {
        Self::new(raw.name.unwrap_or_else(|| "default".to_string()), raw.fields)
    }
}

impl FieldSchema {
    pub fn new(name: impl Into<String>, fields: Vec<FieldSpec>) -> Result<Self, AppError> {
        validate(&fields)?;
        Ok(Self {
            name: name.into(),
            fields,
        })
    }

    /// Load a schema from a JSON file.
    ///
    /// When the file carries no `name`, the file stem is used.
    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let schema_str = std::fs::read_to_string(path).map_err(|e| {
            AppError::SchemaError(format!(
                "Failed to read schema file {}: {e}",
                path.display()
            ))
        })?;

        let value: serde_json::Value = serde_json::from_str(&schema_str).map_err(|e| {
            AppError::SchemaError(format!(
                "Invalid JSON in schema file {}: {e}",
                path.display()
            ))
        })?;
        let has_name = value.get("name").is_some();

        let mut schema: FieldSchema = serde_json::from_value(value).map_err(|e| {
            AppError::SchemaError(format!("Invalid schema {}: {e}", path.display()))
        })?;
        if !has_name {
            schema.name = derive_schema_name(path);
        }
        Ok(schema)
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Names of the fields located by XPath.
    pub fn xpath_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| matches!(f.locator, Locator::XPath(_)))
            .map(|f| f.name.as_str())
            .collect()
    }
}

fn validate(fields: &[FieldSpec]) -> Result<(), AppError> {
    let mut seen = HashSet::new();
    for spec in fields {
        if spec.name.trim().is_empty() {
            return Err(AppError::SchemaError("Field name must not be empty".into()));
        }
        if !seen.insert(spec.name.as_str()) {
            return Err(AppError::SchemaError(format!(
                "Duplicate field name: {}",
                spec.name
            )));
        }
        if spec.locator.query().trim().is_empty() {
            return Err(AppError::SchemaError(format!(
                "Field {} has an empty locator",
                spec.name
            )));
        }
        if !spec.default.fits(spec.cardinality) {
            return Err(AppError::SchemaError(format!(
                "Default for field {} does not match cardinality {:?}",
                spec.name, spec.cardinality
            )));
        }
        if let Some(step) = &spec.postprocess {
            step.validate().map_err(|e| {
                AppError::SchemaError(format!("Field {}: {e}", spec.name))
            })?;
        }
    }

    Ok(())
}

/// Derive a schema name from a file path.
///
/// Extracts the file stem (name without extension).
/// Example: `"schemas/doctor_profile.json"` → `"doctor_profile"`
pub fn derive_schema_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("default")
        .to_string()
}
