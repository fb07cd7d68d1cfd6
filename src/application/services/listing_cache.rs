//! Time-bounded listing snapshot in front of the listing feed.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::domain::entities::{CategorizedListings, Listing, ListingFields, ListingSnapshot};
use crate::domain::errors::FeedError;
use crate::domain::ports::{ImagePreloader, KeyValueStore, ListingSource};
use crate::domain::services::{categorize, normalize_listing_images};

/// Key under which the snapshot is stored.
pub const SNAPSHOT_KEY: &str = "listing_snapshot";

/// Default snapshot lifetime.
pub const DEFAULT_SNAPSHOT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Serves the listing collection from a local snapshot while it is fresh,
/// refreshing it from the network otherwise.
///
/// Concurrent misses are not coalesced: each one fetches and the last
/// snapshot write wins.
#[derive(Clone)]
pub struct ListingCacheService {
    store: Arc<dyn KeyValueStore>,
    source: Arc<dyn ListingSource>,
    preloader: Arc<dyn ImagePreloader>,
    fields: ListingFields,
    ttl: Duration,
}

impl ListingCacheService {
    /// Creates the service with default field names and TTL.
    #[must_use]
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        source: Arc<dyn ListingSource>,
        preloader: Arc<dyn ImagePreloader>,
    ) -> Self {
        Self {
            store,
            source,
            preloader,
            fields: ListingFields::default(),
            ttl: DEFAULT_SNAPSHOT_TTL,
        }
    }

    /// Overrides the snapshot lifetime.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Overrides the upstream field names.
    #[must_use]
    pub fn with_fields(mut self, fields: ListingFields) -> Self {
        self.fields = fields;
        self
    }

    /// Returns the listing collection. Never fails: an unavailable feed with
    /// no fresh snapshot yields an empty list.
    pub async fn get_listings(&self) -> Vec<Listing> {
        let now = Utc::now();

        if let Some(snapshot) = self.read_snapshot().await {
            if snapshot.is_fresh(now, self.ttl) {
                debug!(
                    age_ms = snapshot.age_millis(now),
                    count = snapshot.data.len(),
                    "Serving fresh listing snapshot"
                );
                return snapshot.data;
            }
            debug!(age_ms = snapshot.age_millis(now), "Listing snapshot is stale");
        }

        let listings = match self.fetch().await {
            Ok(listings) => listings,
            Err(e) => {
                warn!(error = %e, "Listing refresh failed");
                return Vec::new();
            }
        };

        // Stamped when the response arrived.
        let snapshot = ListingSnapshot::new(listings, Utc::now());
        if let Err(e) = self.write_snapshot(&snapshot).await {
            warn!(error = %e, "Failed to persist listing snapshot");
        }

        self.preload_images(&snapshot.data);
        info!(count = snapshot.data.len(), "Refreshed listings");

        snapshot.data
    }

    /// Returns the listings partitioned by freshness, in feed order.
    pub async fn get_categorized(&self) -> CategorizedListings {
        let listings = self.get_listings().await;
        categorize(listings, &self.fields, Utc::now())
    }

    /// Drops the snapshot so the next call refetches.
    ///
    /// # Errors
    /// Returns error if the store rejects the removal.
    pub async fn clear(&self) -> Result<(), FeedError> {
        self.store.remove(SNAPSHOT_KEY).await?;
        info!("Cleared listing snapshot");
        Ok(())
    }

    async fn read_snapshot(&self) -> Option<ListingSnapshot> {
        let raw = match self.store.get(SNAPSHOT_KEY).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, "Failed to read listing snapshot");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(error = %e, "Listing snapshot is unreadable, treating as miss");
                None
            }
        }
    }

    async fn write_snapshot(&self, snapshot: &ListingSnapshot) -> Result<(), FeedError> {
        let raw = serde_json::to_string(snapshot)?;
        self.store.set(SNAPSHOT_KEY, raw).await?;
        debug!(count = snapshot.data.len(), "Persisted listing snapshot");
        Ok(())
    }

    async fn fetch(&self) -> Result<Vec<Listing>, FeedError> {
        let listings = self.source.fetch_listings().await?;
        if listings.is_empty() {
            return Err(FeedError::invalid_payload("feed returned no listings"));
        }
        Ok(listings)
    }

    fn preload_images(&self, listings: &[Listing]) {
        let mut submitted = 0usize;
        for listing in listings {
            for url in normalize_listing_images(listing, &self.fields) {
                self.preloader.preload(url);
                submitted += 1;
            }
        }
        debug!(count = submitted, "Submitted image preloads");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::FreshnessTag;
    use crate::domain::ports::mocks::{MockKeyValueStore, MockListingSource, RecordingPreloader};
    use chrono::Duration as ChronoDuration;
    use serde_json::json;

    fn listing(id: i64, days_old: i64) -> Listing {
        Listing::new(json!({
            "id": id,
            "createdAt": (Utc::now() - ChronoDuration::days(days_old)).to_rfc3339(),
        }))
    }

    async fn seed_snapshot(store: &MockKeyValueStore, data: Vec<Listing>, hours_old: i64) {
        let snapshot = ListingSnapshot::new(data, Utc::now() - ChronoDuration::hours(hours_old));
        store
            .set(SNAPSHOT_KEY, serde_json::to_string(&snapshot).unwrap())
            .await
            .unwrap();
    }

    fn source_returning(times: usize, listings: Vec<Listing>) -> MockListingSource {
        let mut source = MockListingSource::new();
        source
            .expect_fetch_listings()
            .times(times)
            .returning(move || Ok(listings.clone()));
        source
    }

    fn failing_source() -> MockListingSource {
        let mut source = MockListingSource::new();
        source
            .expect_fetch_listings()
            .times(1)
            .returning(|| Err(FeedError::network("offline")));
        source
    }

    fn recorder() -> Arc<RecordingPreloader> {
        Arc::new(RecordingPreloader::new())
    }

    fn service(
        store: &MockKeyValueStore,
        source: MockListingSource,
        preloader: Arc<RecordingPreloader>,
    ) -> ListingCacheService {
        ListingCacheService::new(Arc::new(store.clone()), Arc::new(source), preloader)
    }

    #[tokio::test]
    async fn test_fresh_snapshot_skips_network() {
        let store = MockKeyValueStore::new();
        seed_snapshot(&store, vec![listing(1, 1)], 23).await;

        let service = service(&store, source_returning(0, vec![]), recorder());
        let listings = service.get_listings().await;

        assert_eq!(listings.len(), 1);
    }

    #[tokio::test]
    async fn test_stale_snapshot_fetches_once() {
        let store = MockKeyValueStore::new();
        seed_snapshot(&store, vec![listing(1, 1)], 25).await;

        let fresh = vec![listing(2, 1), listing(3, 2)];
        let service = service(&store, source_returning(1, fresh), recorder());
        let listings = service.get_listings().await;

        assert_eq!(listings.len(), 2);
        let stored: ListingSnapshot =
            serde_json::from_str(&store.peek(SNAPSHOT_KEY).await.unwrap()).unwrap();
        assert_eq!(stored.data, listings);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_stale_snapshot() {
        let store = MockKeyValueStore::new();
        seed_snapshot(&store, vec![listing(1, 1)], 25).await;
        let before = store.peek(SNAPSHOT_KEY).await;

        let service = service(&store, failing_source(), recorder());
        let listings = service.get_listings().await;

        assert!(listings.is_empty());
        assert_eq!(store.peek(SNAPSHOT_KEY).await, before);
    }

    #[tokio::test]
    async fn test_empty_feed_is_not_persisted() {
        let store = MockKeyValueStore::new();

        let service = service(&store, source_returning(1, vec![]), recorder());

        assert!(service.get_listings().await.is_empty());
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_a_miss() {
        let store = MockKeyValueStore::new();
        store.set(SNAPSHOT_KEY, "{ broken".to_string()).await.unwrap();

        let source = source_returning(1, vec![listing(1, 1)]);
        let service = service(&store, source, recorder());

        assert_eq!(service.get_listings().await.len(), 1);
    }

    #[tokio::test]
    async fn test_persist_failure_still_returns_data() {
        let store = MockKeyValueStore::new();
        store.set_fail_writes(true);

        let source = source_returning(1, vec![listing(1, 1)]);
        let service = service(&store, source, recorder());

        assert_eq!(service.get_listings().await.len(), 1);
        assert!(store.peek(SNAPSHOT_KEY).await.is_none());
    }

    #[tokio::test]
    async fn test_refresh_preloads_normalized_images() {
        let store = MockKeyValueStore::new();
        let with_images = Listing::new(json!({
            "id": 1,
            "images": ["cdn.example.nethttps://cdn.example.net/a.jpg", "not a url"],
            "image": "example.com/b.jpg",
        }));
        let preloader = Arc::new(RecordingPreloader::new());

        let service = service(&store, source_returning(1, vec![with_images]), preloader.clone());
        service.get_listings().await;

        assert_eq!(
            preloader.urls(),
            vec!["https://cdn.example.net/a.jpg", "https://example.com/b.jpg"]
        );
    }

    #[tokio::test]
    async fn test_snapshot_hit_does_not_preload() {
        let store = MockKeyValueStore::new();
        seed_snapshot(
            &store,
            vec![Listing::new(json!({ "images": ["https://a.com/1.jpg"] }))],
            1,
        )
        .await;
        let preloader = Arc::new(RecordingPreloader::new());

        let service = service(&store, source_returning(0, vec![]), preloader.clone());
        service.get_listings().await;

        assert!(preloader.urls().is_empty());
    }

    #[tokio::test]
    async fn test_categorized_end_to_end() {
        let store = MockKeyValueStore::new();
        let listings = vec![
            listing(1, 1),
            listing(2, 1),
            listing(3, 10),
            listing(4, 20),
            listing(5, 40),
        ];

        let service = service(&store, source_returning(1, listings), recorder());
        let categorized = service.get_categorized().await;

        assert_eq!(categorized.bucket(FreshnessTag::Regular).len(), 2);
        assert_eq!(categorized.bucket(FreshnessTag::Approved).len(), 1);
        assert_eq!(categorized.bucket(FreshnessTag::Wealth).len(), 1);
        assert_eq!(categorized.bucket(FreshnessTag::Listed).len(), 1);
    }

    #[tokio::test]
    async fn test_clear_forces_refetch() {
        let store = MockKeyValueStore::new();
        seed_snapshot(&store, vec![listing(1, 1)], 1).await;

        let service = service(&store, source_returning(1, vec![listing(2, 1)]), recorder());
        service.clear().await.unwrap();

        let listings = service.get_listings().await;
        assert_eq!(listings[0].raw()["id"], 2);
    }

    #[tokio::test]
    async fn test_custom_ttl() {
        let store = MockKeyValueStore::new();
        seed_snapshot(&store, vec![listing(1, 1)], 2).await;

        let service = service(&store, source_returning(1, vec![listing(2, 1)]), recorder())
            .with_ttl(Duration::from_secs(60 * 60));

        assert_eq!(service.get_listings().await[0].raw()["id"], 2);
    }

    #[tokio::test]
    async fn test_snapshot_is_stamped_after_slow_fetch() {
        use std::sync::atomic::{AtomicI64, Ordering};

        let store = MockKeyValueStore::new();
        let fetched_at = Arc::new(AtomicI64::new(0));
        let recorded = fetched_at.clone();

        let mut source = MockListingSource::new();
        source.expect_fetch_listings().times(1).returning(move || {
            std::thread::sleep(std::time::Duration::from_millis(50));
            recorded.store(Utc::now().timestamp_millis(), Ordering::SeqCst);
            Ok(vec![listing(1, 1)])
        });

        service(&store, source, recorder()).get_listings().await;

        let stored: ListingSnapshot =
            serde_json::from_str(&store.peek(SNAPSHOT_KEY).await.unwrap()).unwrap();
        assert!(stored.timestamp >= fetched_at.load(Ordering::SeqCst));
    }
}
