//! Identifier-keyed storage of original upload bytes.
//!
//! [`FileStore`] is the only side-effecting collaborator of the intake path. Each `save` mints a
//! fresh [`FileId`]; stores never overwrite an existing id.

mod dir;
mod memory;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use dir::DirStore;
pub use memory::MemoryStore;

/// Identifier of a stored upload (a random v4 UUID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(Uuid);

impl FileId {
    /// Mint a new random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for FileId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for FileId {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| StoreError::NotFound(s.to_string()))
    }
}

/// A stored upload as returned by [`FileStore::load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub id: FileId,
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Errors raised by a [`FileStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no stored file for identifier '{0}'")]
    NotFound(String),

    /// A freshly minted id already exists in the store.
    #[error("identifier '{0}' already exists")]
    Conflict(FileId),

    /// The sidecar describing a stored file could not be read or written.
    #[error("invalid stored metadata: {0}")]
    Metadata(#[from] serde_json::Error),

    /// The store's internal lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,
}

/// Key to bytes store for uploads.
pub trait FileStore: Send + Sync {
    /// Persist `bytes` under a new identifier bound to `filename`.
    fn save(&self, bytes: &[u8], filename: &str) -> Result<FileId, StoreError>;

    /// Fetch a stored upload, or [`StoreError::NotFound`].
    fn load(&self, id: &FileId) -> Result<StoredFile, StoreError>;
}

impl<T: FileStore + ?Sized> FileStore for std::sync::Arc<T> {
    fn save(&self, bytes: &[u8], filename: &str) -> Result<FileId, StoreError> {
        (**self).save(bytes, filename)
    }

    fn load(&self, id: &FileId) -> Result<StoredFile, StoreError> {
        (**self).load(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_round_trip_through_text() {
        let a = FileId::new();
        let b = FileId::new();
        assert_ne!(a, b);
        assert_eq!(a.to_string().parse::<FileId>().unwrap(), a);
    }

    #[test]
    fn malformed_id_is_not_found() {
        assert!(matches!(
            "not-a-uuid".parse::<FileId>(),
            Err(StoreError::NotFound(s)) if s == "not-a-uuid"
        ));
    }
}
