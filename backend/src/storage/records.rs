use std::path::{Path, PathBuf};

use axum::async_trait;
use strum::AsRefStr;

use super::StorageError;

/// The independently persisted JSON documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum RecordKey {
    Config,
    History,
    Restaurant,
}

impl RecordKey {
    pub fn file_name(self) -> String {
        format!("{}.json", self.as_ref())
    }
}

/// Raw get/put of a whole record. Locking and (de)serialization live in `Storage`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn read(&self, key: RecordKey) -> Result<Option<String>, StorageError>;
    async fn write(&self, key: RecordKey, contents: &str) -> Result<(), StorageError>;
}

/// One `<key>.json` file per record under a data directory.
pub struct FileRecordStore {
    data_dir: PathBuf,
}

impl FileRecordStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self { data_dir: data_dir.into() }
    }

    fn path(&self, key: RecordKey) -> PathBuf {
        self.data_dir.join(key.file_name())
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[async_trait]
impl RecordStore for FileRecordStore {
    async fn read(&self, key: RecordKey) -> Result<Option<String>, StorageError> {
        match tokio::fs::read_to_string(self.path(key)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(format!("failed to read {}", key.file_name()), e)),
        }
    }

    async fn write(&self, key: RecordKey, contents: &str) -> Result<(), StorageError> {
        let path = self.path(key);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, contents)
            .await
            .map_err(|e| StorageError::io(format!("failed to write {}", key.file_name()), e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| StorageError::io(format!("failed to replace {}", key.file_name()), e))
    }
}

#[cfg(test)]
pub use memory::MemoryRecordStore;
