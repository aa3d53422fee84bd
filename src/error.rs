use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::storage::StoreError;
use crate::types::FileKind;

/// Convenience result type for intake operations.
pub type IntakeResult<T> = Result<T, IntakeError>;

/// Error type returned by validation, loading, ingestion and retrieval.
///
/// Every failure is classified into exactly one variant; parser errors are rewritten into a
/// positional message rather than passed through verbatim.
#[derive(Debug, Error)]
pub enum IntakeError {
    /// The declared kind (or the filename extension) is neither CSV nor JSON.
    #[error("unsupported file type '{0}' (supported: .csv, .json)")]
    UnsupportedKind(String),

    /// The raw upload is larger than the configured ceiling.
    #[error("file too large: {size} bytes exceeds the limit of {limit} bytes")]
    TooLarge { size: usize, limit: usize },

    /// The content does not parse as the declared kind.
    #[error("unparsable {kind} content: {message}")]
    Unparsable { kind: FileKind, message: String },

    /// The content parses but has no data rows / elements / keys.
    #[error("{kind} content is empty")]
    Empty { kind: FileKind },

    /// JSON content whose shape is not a flat record list or a single flat object.
    #[error("nested structure not supported: {0}")]
    UnsupportedStructure(String),

    /// The persistence collaborator failed to store the upload.
    #[error("persistence failure: {0}")]
    Persistence(#[source] StoreError),

    /// No stored file exists for the identifier.
    #[error("no stored file for identifier '{0}'")]
    NotFound(String),
}

impl IntakeError {
    /// Stable tag describing the failure class.
    pub fn kind(&self) -> ErrorKind {
        match self {
            IntakeError::UnsupportedKind(_) => ErrorKind::UnsupportedKind,
            IntakeError::TooLarge { .. } => ErrorKind::TooLarge,
            IntakeError::Unparsable { .. } => ErrorKind::Unparsable,
            IntakeError::Empty { .. } => ErrorKind::Empty,
            IntakeError::UnsupportedStructure(_) => ErrorKind::UnsupportedStructure,
            IntakeError::Persistence(_) => ErrorKind::PersistenceFailure,
            IntakeError::NotFound(_) => ErrorKind::NotFound,
        }
    }

    /// Suggested HTTP status code for transports that expose this crate.
    pub fn http_status_code(&self) -> u16 {
        match self {
            IntakeError::TooLarge { .. } => 413,
            IntakeError::NotFound(_) => 404,
            IntakeError::Persistence(_) => 500,
            _ => 400,
        }
    }
}

impl From<StoreError> for IntakeError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => IntakeError::NotFound(id),
            other => IntakeError::Persistence(other),
        }
    }
}

/// Failure classes, serialized as snake_case tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnsupportedKind,
    TooLarge,
    Unparsable,
    Empty,
    UnsupportedStructure,
    PersistenceFailure,
    NotFound,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnsupportedKind => "unsupported_kind",
            ErrorKind::TooLarge => "too_large",
            ErrorKind::Unparsable => "unparsable",
            ErrorKind::Empty => "empty",
            ErrorKind::UnsupportedStructure => "unsupported_structure",
            ErrorKind::PersistenceFailure => "persistence_failure",
            ErrorKind::NotFound => "not_found",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_not_found_maps_to_not_found() {
        let err: IntakeError = StoreError::NotFound("abc".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.http_status_code(), 404);
    }

    #[test]
    fn store_io_maps_to_persistence_failure() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err: IntakeError = StoreError::Io(io).into();
        assert_eq!(err.kind(), ErrorKind::PersistenceFailure);
        assert_eq!(err.http_status_code(), 500);
        assert!(err.to_string().starts_with("persistence failure"));
    }

    #[test]
    fn too_large_is_413() {
        let err = IntakeError::TooLarge { size: 30, limit: 20 };
        assert_eq!(err.http_status_code(), 413);
        assert_eq!(err.kind().as_str(), "too_large");
    }
}
