//! Pure domain services.

pub mod freshness;
pub mod url_normalizer;

pub use freshness::{categorize, tag, tag_at, tag_listing};
pub use url_normalizer::{normalize, normalize_all, normalize_listing_images, normalize_one};
