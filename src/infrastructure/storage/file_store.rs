//! JSON-file backed key-value store.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, trace, warn};

use crate::domain::errors::FeedError;
use crate::domain::ports::KeyValueStore;

/// File name used inside the data directory.
pub const STORE_FILE_NAME: &str = "store.json";

/// Durable key-value store kept as one JSON object on disk.
///
/// Every write rewrites the file through a temporary file and a rename, so a
/// crash never leaves a half-written store behind.
pub struct FileKeyValueStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileKeyValueStore {
    /// Opens the store at `path`, starting empty if the file is missing or
    /// unreadable.
    ///
    /// # Errors
    /// Returns error if the parent directory cannot be created.
    pub async fn open(path: PathBuf) -> Result<Self, FeedError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| FeedError::storage(format!("Failed to create store dir: {e}")))?;
        }

        let entries = match fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Store file is corrupt, starting empty");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read store file, starting empty");
                BTreeMap::new()
            }
        };

        debug!(path = %path.display(), entries = entries.len(), "Opened key-value store");

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// Opens the store inside `data_dir`.
    ///
    /// # Errors
    /// Returns error if the directory cannot be created.
    pub async fn in_dir(data_dir: &Path) -> Result<Self, FeedError> {
        Self::open(data_dir.join(STORE_FILE_NAME)).await
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), FeedError> {
        let content = serde_json::to_vec_pretty(entries)?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || write_atomically(&path, &content))
            .await
            .map_err(|e| FeedError::storage(format!("Store write task panicked: {e}")))?
    }
}

fn write_atomically(path: &Path, content: &[u8]) -> Result<(), FeedError> {
    let parent = path
        .parent()
        .ok_or_else(|| FeedError::storage("Store path has no parent directory"))?;
    let mut temp_file = tempfile::NamedTempFile::new_in(parent)
        .map_err(|e| FeedError::storage(format!("Failed to create temp file: {e}")))?;
    temp_file
        .write_all(content)
        .map_err(|e| FeedError::storage(format!("Failed to write temp file: {e}")))?;
    temp_file
        .persist(path)
        .map_err(|e| FeedError::storage(format!("Failed to replace store file: {}", e.error)))?;
    Ok(())
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, FeedError> {
        let value = self.entries.read().await.get(key).cloned();
        trace!(key = key, hit = value.is_some(), "Store read");
        Ok(value)
    }

    async fn set(&self, key: &str, value: String) -> Result<(), FeedError> {
        let mut entries = self.entries.write().await;
        let mut updated = entries.clone();
        updated.insert(key.to_string(), value);
        self.persist(&updated).await?;
        *entries = updated;
        trace!(key = key, "Store write");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), FeedError> {
        let mut entries = self.entries.write().await;
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut updated = entries.clone();
        updated.remove(key);
        self.persist(&updated).await?;
        *entries = updated;
        trace!(key = key, "Store remove");
        Ok(())
    }
}
