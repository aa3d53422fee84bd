use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::RwLock;

use super::{FileId, FileStore, StoreError, StoredFile};

/// In-process store backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: RwLock<HashMap<FileId, StoredFile>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored uploads.
    pub fn len(&self) -> usize {
        self.files.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FileStore for MemoryStore {
    fn save(&self, bytes: &[u8], filename: &str) -> Result<FileId, StoreError> {
        let id = FileId::new();
        let mut files = self.files.write().map_err(|_| StoreError::Poisoned)?;
        match files.entry(id) {
            Entry::Occupied(_) => Err(StoreError::Conflict(id)),
            Entry::Vacant(slot) => {
                slot.insert(StoredFile {
                    id,
                    filename: filename.to_string(),
                    bytes: bytes.to_vec(),
                });
                Ok(id)
            }
        }
    }

    fn load(&self, id: &FileId) -> Result<StoredFile, StoreError> {
        let files = self.files.read().map_err(|_| StoreError::Poisoned)?;
        files
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}
