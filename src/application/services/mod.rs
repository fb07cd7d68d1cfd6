//! Application services.

pub mod listing_cache;

pub use listing_cache::{DEFAULT_SNAPSHOT_TTL, ListingCacheService, SNAPSHOT_KEY};
