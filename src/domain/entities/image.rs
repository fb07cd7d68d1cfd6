//! Domain types for image caching and display.

use std::path::PathBuf;

use bytes::Bytes;

/// Identifier of one entry in the local image index.
/// Defaults to the percent-encoded remote URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Creates a key from any string-like input.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Derives the default key for a remote URL.
    #[must_use]
    pub fn from_url(url: &str) -> Self {
        Self(encode_uri_component(url))
    }

    /// Returns the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Filesystem-safe stem for the bytes backing this key.
    #[must_use]
    pub fn file_stem(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(self.0.as_bytes());
        let result = hasher.finalize();
        hex::encode(&result[..16])
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Percent-encodes everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
#[must_use]
pub fn encode_uri_component(input: &str) -> String {
    const UNRESERVED: &[u8] = b"-_.!~*'()";
    let mut out = String::with_capacity(input.len() * 3);
    for &byte in input.as_bytes() {
        if byte.is_ascii_alphanumeric() || UNRESERVED.contains(&byte) {
            out.push(char::from(byte));
        } else {
            out.push('%');
            out.push_str(&format!("{byte:02X}"));
        }
    }
    out
}

/// What a display unit asks to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Asset shipped with the application, identified by name.
    Bundled(&'static str),
    /// Image at a remote URL.
    Remote(String),
}

impl ImageSource {
    /// Creates a remote source.
    #[must_use]
    pub fn remote(url: impl Into<String>) -> Self {
        Self::Remote(url.into())
    }
}

/// Where a loaded image can be read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageLocation {
    /// Bundled asset.
    Bundled(&'static str),
    /// File in the local image cache.
    Local(PathBuf),
    /// Bytes fetched directly from the network, not cached.
    Remote {
        /// Source URL.
        url: String,
        /// Downloaded body.
        bytes: Bytes,
    },
}

/// Outcome of resolving one image for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedImage {
    /// Image is available.
    Loaded(ImageLocation),
    /// Every attempt failed; the consumer shows the fallback asset.
    Errored {
        /// Number of attempts made.
        attempts: u32,
        /// Last failure.
        reason: String,
    },
}

impl ResolvedImage {
    /// Returns true if the image loaded.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    /// Returns the location when loaded.
    #[must_use]
    pub const fn location(&self) -> Option<&ImageLocation> {
        match self {
            Self::Loaded(location) => Some(location),
            Self::Errored { .. } => None,
        }
    }
}

/// Lifecycle of an image display unit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ImageStatus {
    /// Resolution in progress.
    #[default]
    Loading,
    /// Image resolved and ready to show.
    Loaded(ImageLocation),
    /// Resolution failed; show the fallback asset.
    Errored(String),
}

impl ImageStatus {
    /// Returns true while loading.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Returns true once loaded.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    /// Returns true if loading failed.
    #[must_use]
    pub const fn is_errored(&self) -> bool {
        matches!(self, Self::Errored(_))
    }
}

impl From<ResolvedImage> for ImageStatus {
    fn from(resolved: ResolvedImage) -> Self {
        match resolved {
            ResolvedImage::Loaded(location) => Self::Loaded(location),
            ResolvedImage::Errored { reason, .. } => Self::Errored(reason),
        }
    }
}

/// One index entry: cache key mapped to the downloaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCacheEntry {
    /// Index key.
    pub cache_key: CacheKey,
    /// Path of the downloaded bytes.
    pub local_path: PathBuf,
}

/// Result of a best-effort preload. Logged, never surfaced as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreloadOutcome {
    /// A local copy exists (already cached or freshly downloaded).
    Ok,
    /// The preload failed.
    Failed(String),
}

impl PreloadOutcome {
    /// Returns true on success.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}
