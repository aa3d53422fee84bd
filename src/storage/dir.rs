use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{FileId, FileStore, StoreError, StoredFile};

/// Sidecar written next to each stored upload.
#[derive(Debug, Serialize, Deserialize)]
struct Sidecar {
    filename: String,
    size: usize,
}

/// Directory-backed store.
///
/// Each upload is kept as `<id>.bin` with a `<id>.json` sidecar holding the original filename.
/// Files are created with create-new semantics, so an existing id is never overwritten.
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn data_path(&self, id: &FileId) -> PathBuf {
        self.root.join(format!("{id}.bin"))
    }

    fn sidecar_path(&self, id: &FileId) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }
}

fn create_new(path: &Path, contents: &[u8], id: FileId) -> Result<(), StoreError> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => StoreError::Conflict(id),
            _ => StoreError::Io(e),
        })?;
    file.write_all(contents)?;
    file.sync_all()?;
    Ok(())
}

fn read_existing(path: &Path, id: &FileId) -> Result<Vec<u8>, StoreError> {
    fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => StoreError::NotFound(id.to_string()),
        _ => StoreError::Io(e),
    })
}

impl FileStore for DirStore {
    fn save(&self, bytes: &[u8], filename: &str) -> Result<FileId, StoreError> {
        let id = FileId::new();
        let sidecar = serde_json::to_vec(&Sidecar {
            filename: filename.to_string(),
            size: bytes.len(),
        })?;

        let data_path = self.data_path(&id);
        create_new(&data_path, bytes, id)?;
        if let Err(err) = create_new(&self.sidecar_path(&id), &sidecar, id) {
            let _ = fs::remove_file(&data_path);
            return Err(err);
        }
        Ok(id)
    }

    fn load(&self, id: &FileId) -> Result<StoredFile, StoreError> {
        let sidecar: Sidecar = serde_json::from_slice(&read_existing(&self.sidecar_path(id), id)?)?;
        let bytes = read_existing(&self.data_path(id), id)?;
        Ok(StoredFile {
            id: *id,
            filename: sidecar.filename,
            bytes,
        })
    }
}
