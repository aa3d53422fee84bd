//! Structural validation.
//!
//! Checks run in a fixed order and stop at the first failure: size, parsability, emptiness and
//! (JSON only) shape. A successful [`ValidationReport`] means the loader will accept the same
//! text.

use serde::Serialize;

use crate::config::IntakeLimits;
use crate::error::{IntakeError, IntakeResult};
use crate::types::FileKind;

use super::csv::scan_csv;
use super::decode::DecodedText;
use super::delimiter::{detect_delimiter, Delimiter};
use super::json::{classify, parse_json, JsonDetails};

/// Kind-specific counts of a valid upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ValidationDetails {
    Csv { rows: usize, columns: usize },
    Json(JsonDetails),
}

/// Successful validation outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationReport {
    pub kind: FileKind,
    /// Delimiter the CSV was parsed with (`None` for JSON).
    pub delimiter: Option<Delimiter>,
    pub details: ValidationDetails,
}

impl ValidationReport {
    /// Human-readable summary line.
    pub fn message(&self) -> String {
        match self.kind {
            FileKind::Csv => "CSV file is valid".to_string(),
            FileKind::Json => "JSON file is valid".to_string(),
        }
    }
}

/// Fail with [`IntakeError::TooLarge`] when `size` exceeds the ceiling.
pub fn check_size(size: usize, limits: &IntakeLimits) -> IntakeResult<()> {
    if size > limits.max_bytes {
        return Err(IntakeError::TooLarge {
            size,
            limit: limits.max_bytes,
        });
    }
    Ok(())
}

/// Validate decoded text as `kind`, detecting the CSV delimiter from the text.
pub fn validate(
    text: &DecodedText,
    kind: FileKind,
    limits: &IntakeLimits,
) -> IntakeResult<ValidationReport> {
    let delimiter = match kind {
        FileKind::Csv => Some(detect_delimiter(text.as_str(), limits.delimiter_sample_lines)),
        FileKind::Json => None,
    };
    validate_with(text, kind, delimiter, limits)
}

/// Validate decoded text as `kind` with an already chosen delimiter.
///
/// For CSV a missing delimiter means [`Delimiter::Comma`].
pub fn validate_with(
    text: &DecodedText,
    kind: FileKind,
    delimiter: Option<Delimiter>,
    limits: &IntakeLimits,
) -> IntakeResult<ValidationReport> {
    check_size(text.byte_len, limits)?;

    match kind {
        FileKind::Csv => {
            let delimiter = delimiter.unwrap_or_default();
            let shape = scan_csv(text.as_str(), delimiter)?;
            if shape.rows == 0 {
                return Err(IntakeError::Empty { kind });
            }
            Ok(ValidationReport {
                kind,
                delimiter: Some(delimiter),
                details: ValidationDetails::Csv {
                    rows: shape.rows,
                    columns: shape.columns,
                },
            })
        }
        FileKind::Json => {
            let value = parse_json(text.as_str())?;
            let details = classify(&value)?;
            Ok(ValidationReport {
                kind,
                delimiter: None,
                details: ValidationDetails::Json(details),
            })
        }
    }
}
