//! Limits that bound every intake call.
//!
//! [`IntakeLimits`] is cheap to copy and deserializes from JSON (or any serde format) with
//! per-field defaults, so a partial config only overrides what it names.
//!
//! ```rust
//! use tabular_intake::config::IntakeLimits;
//!
//! let limits: IntakeLimits = serde_json::from_str(r#"{"csv_preview_rows": 25}"#).unwrap();
//! assert_eq!(limits.csv_preview_rows, 25);
//! assert_eq!(limits.max_bytes, 20 * 1024 * 1024);
//! limits.validate().unwrap();
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest accepted upload (20 MiB).
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;
/// Rows returned in a CSV preview.
pub const CSV_PREVIEW_ROWS: usize = 10;
/// Elements returned in a JSON list preview.
pub const JSON_PREVIEW_ITEMS: usize = 100;
/// Non-blank lines sampled by the delimiter detector.
pub const DELIMITER_SAMPLE_LINES: usize = 10;

/// Size ceilings and preview caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeLimits {
    pub max_bytes: usize,
    pub csv_preview_rows: usize,
    pub json_preview_items: usize,
    pub delimiter_sample_lines: usize,
}

impl Default for IntakeLimits {
    fn default() -> Self {
        Self {
            max_bytes: MAX_UPLOAD_BYTES,
            csv_preview_rows: CSV_PREVIEW_ROWS,
            json_preview_items: JSON_PREVIEW_ITEMS,
            delimiter_sample_lines: DELIMITER_SAMPLE_LINES,
        }
    }
}

impl IntakeLimits {
    /// Reject limits that would make every upload fail or every preview empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("max_bytes", self.max_bytes),
            ("csv_preview_rows", self.csv_preview_rows),
            ("json_preview_items", self.json_preview_items),
            ("delimiter_sample_lines", self.delimiter_sample_lines),
        ];
        for (field, value) in checks {
            if value == 0 {
                return Err(ConfigError::ZeroLimit { field });
            }
        }
        Ok(())
    }
}

/// Invalid [`IntakeLimits`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("limit '{field}' must be greater than zero")]
    ZeroLimit { field: &'static str },
}
