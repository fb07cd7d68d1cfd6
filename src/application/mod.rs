//! Application layer orchestrating the domain ports.

/// Application services.
pub mod services;

pub use services::{ListingCacheService, SNAPSHOT_KEY};
