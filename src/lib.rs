//! Propfeed - cached property listing feed with image preloading.
//!
//! This crate serves a time-bounded local snapshot of a property listing
//! feed, groups listings by freshness, repairs the image URLs they carry and
//! keeps a persistent on-disk cache of those images.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing the listing cache service.
pub mod application;
/// Domain layer containing entities, errors, ports and pure services.
pub mod domain;
/// Infrastructure layer containing adapters for external services.
pub mod infrastructure;
/// Presentation layer containing display state.
pub mod presentation;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "propfeed";
