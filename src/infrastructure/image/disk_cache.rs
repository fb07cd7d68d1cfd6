//! Disk-based store for downloaded image bytes.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tokio::fs;
use tracing::{debug, trace, warn};

use crate::domain::entities::CacheKey;
use crate::domain::errors::{CacheError, CacheResult};

/// Maximum disk cache size in bytes (200 MB default).
pub const DEFAULT_MAX_CACHE_SIZE: u64 = 200 * 1024 * 1024;

const IMAGE_EXTENSION: &str = "img";

/// Cache-only directory holding one file per cache key.
///
/// Files here may disappear at any time (platform cleanup, size-based
/// eviction); callers must treat a missing file as a cache miss.
pub struct DiskImageCache {
    cache_dir: PathBuf,
    max_size: u64,
    current_size: AtomicU64,
    item_count: AtomicUsize,
}

impl DiskImageCache {
    /// Creates a new disk cache in the specified directory.
    ///
    /// # Errors
    /// Returns error if cache directory cannot be created.
    pub async fn new(cache_dir: PathBuf, max_size: u64) -> CacheResult<Self> {
        fs::create_dir_all(&cache_dir)
            .await
            .map_err(|e| CacheError::IoError(format!("Failed to create cache dir: {e}")))?;
        let mut total_size = 0u64;
        let mut count = 0usize;

        let mut entries = fs::read_dir(&cache_dir)
            .await
            .map_err(|e| CacheError::IoError(format!("Failed to read cache dir: {e}")))?;

        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if is_image_file(&path)
                && let Ok(meta) = entry.metadata().await
            {
                total_size += meta.len();
                count += 1;
            }
        }

        let cache = Self {
            cache_dir,
            max_size,
            current_size: AtomicU64::new(total_size),
            item_count: AtomicUsize::new(count),
        };

        cache.cleanup_if_needed(None).await;

        Ok(cache)
    }

    /// Returns the cache directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the path backing `key`.
    #[must_use]
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir
            .join(format!("{}.{IMAGE_EXTENSION}", key.file_stem()))
    }

    /// Checks whether a file exists at `path`.
    pub async fn exists(&self, path: &Path) -> bool {
        fs::try_exists(path).await.unwrap_or(false)
    }

    /// Stores raw bytes for `key` and returns the file path.
    ///
    /// # Errors
    /// Returns error if file cannot be created or written.
    pub async fn put_bytes(&self, key: &CacheKey, bytes: &[u8]) -> CacheResult<PathBuf> {
        let path = self.path_for(key);

        // The directory is cache-only; recreate it if the platform reclaimed it.
        fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(|e| CacheError::IoError(format!("Failed to create cache dir: {e}")))?;

        let old_size = fs::metadata(&path).await.map(|m| m.len()).ok();

        let dir = self.cache_dir.clone();
        let target = path.clone();
        let content = bytes.to_vec();
        tokio::task::spawn_blocking(move || write_atomically(&dir, &target, &content))
            .await
            .map_err(|e| CacheError::IoError(format!("Cache write task panicked: {e}")))??;

        let new_size = bytes.len() as u64;
        if let Some(old) = old_size {
            if new_size > old {
                self.current_size
                    .fetch_add(new_size - old, Ordering::Relaxed);
            } else {
                self.current_size
                    .fetch_sub(old - new_size, Ordering::Relaxed);
            }
        } else {
            self.current_size.fetch_add(new_size, Ordering::Relaxed);
            self.item_count.fetch_add(1, Ordering::Relaxed);
        }

        debug!(key = %key, path = %path.display(), size = bytes.len(), "Stored image on disk");

        self.cleanup_if_needed(Some(&path)).await;

        Ok(path)
    }

    /// Clears the entire disk cache.
    ///
    /// # Errors
    /// Returns error if cache directory cannot be read.
    pub async fn clear(&self) -> CacheResult<()> {
        let mut entries = match fs::read_dir(&self.cache_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(CacheError::IoError(format!("Failed to read cache dir: {e}"))),
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CacheError::IoError(format!("Failed to read entry: {e}")))?
        {
            let path = entry.path();
            if is_image_file(&path) && fs::remove_file(&path).await.is_err() {
                warn!(path = %path.display(), "Failed to remove cache file");
            }
        }
        self.current_size.store(0, Ordering::Relaxed);
        self.item_count.store(0, Ordering::Relaxed);
        debug!("Cleared disk cache");
        Ok(())
    }

    /// Returns the tracked cache size in bytes.
    #[must_use]
    pub fn current_size(&self) -> u64 {
        self.current_size.load(Ordering::Relaxed)
    }

    /// Returns the number of cached files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.item_count.load(Ordering::Relaxed)
    }

    /// Returns true if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes least recently accessed files while over the size limit.
    ///
    /// `keep` is never removed, even when it alone exceeds the limit.
    async fn cleanup_if_needed(&self, keep: Option<&Path>) {
        let current_size = self.current_size();
        if current_size <= self.max_size {
            return;
        }

        debug!(
            current_size = current_size,
            max_size = self.max_size,
            "Disk cache over limit, cleaning up"
        );

        let Ok(mut entries) = fs::read_dir(&self.cache_dir).await else {
            return;
        };

        let mut files: Vec<(PathBuf, std::time::SystemTime, u64)> = Vec::new();

        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if !is_image_file(&path) || keep.is_some_and(|keep| keep == path.as_path()) {
                continue;
            }

            if let Ok(meta) = entry.metadata().await {
                let accessed = meta
                    .accessed()
                    .or_else(|_| meta.modified())
                    .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
                files.push((path, accessed, meta.len()));
            }
        }

        files.sort_by_key(|(_, time, _)| *time);

        let mut freed_size = 0u64;
        let mut freed_count = 0usize;
        let target = current_size - self.max_size + (self.max_size / 10);

        for (path, _, size) in files {
            if freed_size >= target {
                break;
            }

            if let Err(e) = fs::remove_file(&path).await {
                warn!(path = %path.display(), error = %e, "Failed to remove old cache file");
            } else {
                trace!(path = %path.display(), "Removed old cache file");
                freed_size += size;
                freed_count += 1;
            }
        }
        self.current_size.fetch_sub(freed_size, Ordering::Relaxed);
        self.item_count.fetch_sub(freed_count, Ordering::Relaxed);

        debug!(
            freed_size = freed_size,
            freed_count = freed_count,
            "Disk cache cleanup complete"
        );
    }
}

/// Writes through a temp file in `dir` so `path` only ever holds complete content.
fn write_atomically(dir: &Path, path: &Path, content: &[u8]) -> CacheResult<()> {
    let mut temp_file = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| CacheError::IoError(format!("Failed to create temp file: {e}")))?;
    temp_file
        .write_all(content)
        .map_err(|e| CacheError::IoError(format!("Failed to write cache file: {e}")))?;
    temp_file
        .persist(path)
        .map_err(|e| CacheError::IoError(format!("Failed to replace cache file: {}", e.error)))?;
    Ok(())
}

fn is_image_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == IMAGE_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_cache() -> (DiskImageCache, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let cache = DiskImageCache::new(temp_dir.path().to_path_buf(), 1024 * 1024)
            .await
            .unwrap();
        (cache, temp_dir)
    }

    #[tokio::test]
    async fn test_put_returns_path_for_key() {
        let (cache, _temp) = create_test_cache().await;
        let key = CacheKey::from_url("https://example.com/a.jpg");

        let path = cache.put_bytes(&key, b"bytes").await.unwrap();

        assert_eq!(path, cache.path_for(&key));
        assert!(cache.exists(&path).await);
        assert_eq!(std::fs::read(&path).unwrap(), b"bytes");
    }

    #[tokio::test]
    async fn test_missing_file_does_not_exist() {
        let (cache, _temp) = create_test_cache().await;
        let path = cache.path_for(&CacheKey::new("nonexistent"));
        assert!(!cache.exists(&path).await);
    }

    #[tokio::test]
    async fn test_put_recreates_reclaimed_dir() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("images");
        let cache = DiskImageCache::new(dir.clone(), 1024).await.unwrap();

        std::fs::remove_dir_all(&dir).unwrap();

        let path = cache.put_bytes(&CacheKey::new("k"), b"data").await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_counters_track_writes_and_clear() {
        let (cache, _temp) = create_test_cache().await;

        cache.put_bytes(&CacheKey::new("a"), b"hello").await.unwrap();
        cache.put_bytes(&CacheKey::new("b"), b"world!").await.unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.current_size(), 11);

        cache.put_bytes(&CacheKey::new("a"), b"hey").await.unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.current_size(), 9);

        cache.clear().await.unwrap();
        assert!(cache.is_empty());
        assert_eq!(cache.current_size(), 0);
    }

    #[tokio::test]
    async fn test_cleanup_keeps_size_under_limit() {
        let temp_dir = TempDir::new().unwrap();
        let cache = DiskImageCache::new(temp_dir.path().to_path_buf(), 10)
            .await
            .unwrap();

        cache.put_bytes(&CacheKey::new("a"), b"123456").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        cache.put_bytes(&CacheKey::new("b"), b"123456").await.unwrap();

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.current_size(), 6);
    }

    #[tokio::test]
    async fn test_existing_files_are_counted_on_open() {
        let temp_dir = TempDir::new().unwrap();
        {
            let cache = DiskImageCache::new(temp_dir.path().to_path_buf(), 1024)
                .await
                .unwrap();
            cache.put_bytes(&CacheKey::new("a"), b"1234").await.unwrap();
        }
        let reopened = DiskImageCache::new(temp_dir.path().to_path_buf(), 1024)
            .await
            .unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.current_size(), 4);
    }

    #[tokio::test]
    async fn test_oversized_file_survives_its_own_cleanup() {
        let temp_dir = TempDir::new().unwrap();
        let cache = DiskImageCache::new(temp_dir.path().to_path_buf(), 4)
            .await
            .unwrap();

        let old = cache.put_bytes(&CacheKey::new("old"), b"12").await.unwrap();
        let path = cache
            .put_bytes(&CacheKey::new("big"), b"much larger than the budget")
            .await
            .unwrap();

        assert!(cache.exists(&path).await);
        assert!(!cache.exists(&old).await);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_content_without_leftovers() {
        let (cache, temp) = create_test_cache().await;
        let key = CacheKey::new("k");

        cache.put_bytes(&key, b"first version").await.unwrap();
        let path = cache.put_bytes(&key, b"second").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        let names: Vec<_> = std::fs::read_dir(temp.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        assert_eq!(names, vec![path]);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_previous_file_intact() {
        let (cache, _temp) = create_test_cache().await;
        let key = CacheKey::new("k");
        let path = cache.put_bytes(&key, b"complete").await.unwrap();

        let err = write_atomically(&cache.dir().join("missing"), &path, b"partial").unwrap_err();

        assert!(matches!(err, CacheError::IoError(_)));
        assert_eq!(std::fs::read(&path).unwrap(), b"complete");
    }
}
