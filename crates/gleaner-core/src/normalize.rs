//! Text normalization and per-field postprocess steps.

use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::error::AppError;

/// Decompose compatibility and accented forms (NFKD), then drop everything
/// outside 7-bit ASCII.
///
/// Total and idempotent: `normalize(normalize(x)) == normalize(x)`.
///
/// ```
/// use gleaner_core::normalize::normalize;
///
/// assert_eq!(normalize("₹500"), "500");
/// assert_eq!(normalize("Café"), "Cafe");
/// ```
pub fn normalize(text: &str) -> String {
    text.nfkd().filter(char::is_ascii).collect()
}

/// A transform applied to every present value of a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Postprocess {
    /// See [`normalize`].
    Normalize,
    /// Turn `•` bullets into `-` and join wrapped lines.
    FlattenBullets,
    /// Keep the first capture group of `pattern` (or the whole match when the
    /// pattern has no groups). Fails when nothing matches.
    Capture { pattern: String },
}

impl Postprocess {
    pub fn apply(&self, text: &str) -> Result<String, AppError> {
        match self {
            Postprocess::Normalize => Ok(normalize(text)),
            Postprocess::FlattenBullets => Ok(text.replace('\u{2022}', "-").replace('\n', "")),
            Postprocess::Capture { pattern } => {
                let re = compile(pattern)?;
                let caps = re.captures(text).ok_or_else(|| {
                    AppError::PostprocessError(format!("pattern {pattern:?} did not match"))
                })?;
                let m = caps.get(1).or_else(|| caps.get(0)).ok_or_else(|| {
                    AppError::PostprocessError(format!("pattern {pattern:?} captured nothing"))
                })?;
                Ok(m.as_str().trim().to_string())
            }
        }
    }

    /// Reject steps that can never succeed (e.g. an invalid regex).
    pub fn validate(&self) -> Result<(), AppError> {
        match self {
            Postprocess::Capture { pattern } => compile(pattern).map(|_| ()),
            Postprocess::Normalize | Postprocess::FlattenBullets => Ok(()),
        }
    }
}

fn compile(pattern: &str) -> Result<Regex, AppError> {
    Regex::new(pattern)
        .map_err(|e| AppError::PostprocessError(format!("invalid pattern {pattern:?}: {e}")))
}
