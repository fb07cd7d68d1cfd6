//! Domain layer with core entities, pure services and port definitions.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;
/// Freshness tagging and URL repair.
pub mod services;

pub use entities::{CategorizedListings, FreshnessTag, Listing, ListingSnapshot};
pub use errors::{CacheError, FeedError};
pub use ports::{ImageFetcher, ImagePreloader, KeyValueStore, ListingSource};
