//! Domain entity definitions.

mod freshness;
mod image;
mod listing;

pub use freshness::{CategorizedListings, FreshnessTag};
pub use image::{
    CacheKey, ImageCacheEntry, ImageLocation, ImageSource, ImageStatus, PreloadOutcome,
    ResolvedImage, encode_uri_component,
};
pub use listing::{
    DEFAULT_CREATED_AT_FIELD, DEFAULT_IMAGES_FIELD, DEFAULT_LEGACY_IMAGES_FIELD, Listing,
    ListingFields, ListingSnapshot, parse_timestamp,
};
