//! In-memory LRU index of cached image files.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use tokio::sync::RwLock;
use tracing::{debug, trace};

use crate::domain::entities::CacheKey;

/// Default number of keys kept in memory.
pub const DEFAULT_INDEX_SIZE: usize = 256;

/// Hot tier in front of the persistent image index.
///
/// Entries point at files that may since have been reclaimed, so a hit here
/// still has to be checked against the disk.
pub struct MemoryIndex {
    cache: RwLock<LruCache<CacheKey, PathBuf>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryIndex {
    /// Creates an index with the specified capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: RwLock::new(LruCache::new(cap)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Looks up `key`, promoting it on a hit.
    pub async fn get(&self, key: &CacheKey) -> Option<PathBuf> {
        let mut cache = self.cache.write().await;
        if let Some(path) = cache.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "Memory index hit");
            Some(path.clone())
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "Memory index miss");
            None
        }
    }

    /// Records where `key` is stored.
    pub async fn put(&self, key: CacheKey, path: PathBuf) {
        self.cache.write().await.put(key, path);
    }

    /// Drops `key`.
    pub async fn evict(&self, key: &CacheKey) {
        if self.cache.write().await.pop(key).is_some() {
            debug!(key = %key, "Evicted from memory index");
        }
    }

    /// Drops every entry.
    pub async fn clear(&self) {
        self.cache.write().await.clear();
        debug!("Cleared memory index");
    }

    /// Returns index statistics.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        CacheStats {
            hits,
            misses,
            hit_rate,
            size: self.len(),
        }
    }

    /// Best-effort number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.try_read().map(|c| c.len()).unwrap_or(0)
    }

    /// Returns true if the index holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryIndex {
    fn default() -> Self {
        Self::new(DEFAULT_INDEX_SIZE)
    }
}

/// Statistics about index performance.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of hits.
    pub hits: u64,
    /// Number of misses.
    pub misses: u64,
    /// Hit rate as a percentage.
    pub hit_rate: f64,
    /// Current number of entries.
    pub size: usize,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Index: {} images, {:.1}% hit rate ({} hits, {} misses)",
            self.size, self.hit_rate, self.hits, self.misses
        )
    }
}
