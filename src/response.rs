//! Serializable result shapes handed to transports.
//!
//! These mirror what a client sees: camelCase keys, a `status` discriminator and a
//! human-readable `message`.

use serde::Serialize;

use crate::error::{ErrorKind, IntakeError};
use crate::ingestion::preview::Metadata;
use crate::ingestion::unified::IngestOutcome;
use crate::ingestion::validate::{ValidationDetails, ValidationReport};
use crate::storage::FileId;
use crate::types::FileKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// What the client declared about the upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub filename: String,
    pub content_type: Option<String>,
    pub size: usize,
}

/// Body of a successful ingestion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub status: Status,
    pub message: String,
    pub identifier: FileId,
    pub file_info: FileInfo,
    pub data: serde_json::Value,
    pub metadata: Metadata,
}

impl From<IngestOutcome> for IngestResponse {
    fn from(outcome: IngestOutcome) -> Self {
        Self {
            status: Status::Success,
            message: "File loaded successfully".to_string(),
            identifier: outcome.identifier,
            file_info: outcome.file_info,
            data: outcome.preview.data,
            metadata: outcome.preview.metadata,
        }
    }
}

/// Body of a successful validation-only call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResponse {
    pub status: Status,
    pub message: String,
    pub file_type: FileKind,
    pub details: ValidationDetails,
}

impl From<ValidationReport> for ValidationResponse {
    fn from(report: ValidationReport) -> Self {
        Self {
            status: Status::Success,
            message: report.message(),
            file_type: report.kind,
            details: report.details,
        }
    }
}

/// Body of any failed call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub status: Status,
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&IntakeError> for ErrorResponse {
    fn from(err: &IntakeError) -> Self {
        Self {
            status: Status::Error,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::json::JsonDetails;
    use serde_json::json;

    #[test]
    fn validation_response_shape() {
        let report = ValidationReport {
            kind: FileKind::Json,
            delimiter: None,
            details: ValidationDetails::Json(JsonDetails::Dict { keys: 4 }),
        };
        let body = serde_json::to_value(ValidationResponse::from(report)).unwrap();
        assert_eq!(
            body,
            json!({
                "status": "success",
                "message": "JSON file is valid",
                "fileType": "json",
                "details": {"type": "dict", "keys": 4}
            })
        );
    }

    #[test]
    fn error_response_carries_stable_kind() {
        let err = IntakeError::UnsupportedStructure("field 'a' holds a nested object".to_string());
        let body = serde_json::to_value(ErrorResponse::from(&err)).unwrap();
        assert_eq!(body["status"], json!("error"));
        assert_eq!(body["kind"], json!("unsupported_structure"));
        assert!(body["message"].as_str().unwrap().contains("nested object"));
    }
}
