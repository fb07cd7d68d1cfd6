//! Display state for one listing image.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::trace;

use crate::domain::entities::{
    CacheKey, ImageLocation, ImageSource, ImageStatus, Listing, ListingFields, ResolvedImage,
};
use crate::domain::services::normalize_listing_images;
use crate::infrastructure::image::ImageCache;

/// Bundled asset shown when an image cannot be loaded.
pub const FALLBACK_ASSET: &str = "property_placeholder";

/// What the view draws for its current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageFrame<'a> {
    /// Loading placeholder.
    Shimmer,
    /// The resolved image.
    Image(&'a ImageLocation),
    /// Bundled fallback asset.
    Fallback(&'static str),
}

/// Image display unit: `Loading -> Loaded | Errored`, never an empty frame.
///
/// Results arriving after [`ImageView::unmount`] are dropped.
pub struct ImageView {
    source: ImageSource,
    cache_key: Option<CacheKey>,
    status: ImageStatus,
    mounted: Arc<AtomicBool>,
}

impl ImageView {
    /// New view in the loading state.
    #[must_use]
    pub fn new(source: ImageSource, cache_key: Option<CacheKey>) -> Self {
        Self {
            source,
            cache_key,
            status: ImageStatus::Loading,
            mounted: Arc::new(AtomicBool::new(true)),
        }
    }

    /// View for the first usable image of a listing, cached under the URL's
    /// default key. Listings without one get the fallback asset.
    #[must_use]
    pub fn for_listing(listing: &Listing, fields: &ListingFields) -> Self {
        match normalize_listing_images(listing, fields).into_iter().next() {
            Some(url) => {
                let key = CacheKey::from_url(&url);
                Self::new(ImageSource::Remote(url), Some(key))
            }
            None => Self::new(ImageSource::Bundled(FALLBACK_ASSET), None),
        }
    }

    /// Image this view displays.
    #[must_use]
    pub const fn source(&self) -> &ImageSource {
        &self.source
    }

    /// Current load status.
    #[must_use]
    pub const fn status(&self) -> &ImageStatus {
        &self.status
    }

    /// Whether results are still accepted.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Acquire)
    }

    /// Frame for the current status. Errors render the fallback asset.
    #[must_use]
    pub fn render(&self) -> ImageFrame<'_> {
        match &self.status {
            ImageStatus::Loading => ImageFrame::Shimmer,
            ImageStatus::Loaded(location) => ImageFrame::Image(location),
            ImageStatus::Errored(_) => ImageFrame::Fallback(FALLBACK_ASSET),
        }
    }

    /// Stores a resolve result. Returns false if the view is unmounted.
    pub fn apply(&mut self, resolved: ResolvedImage) -> bool {
        if !self.is_mounted() {
            trace!("Dropping image result for unmounted view");
            return false;
        }
        self.status = resolved.into();
        true
    }

    /// Stops accepting results, including from loads already in flight.
    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::Release);
    }

    /// Detached load that can outlive a borrow of the view.
    #[must_use]
    pub fn pending_load(&self) -> PendingLoad {
        PendingLoad {
            source: self.source.clone(),
            cache_key: self.cache_key.clone(),
            mounted: self.mounted.clone(),
        }
    }

    /// Resolves through `cache` and applies the result.
    pub async fn load(&mut self, cache: &ImageCache) {
        if let Some(resolved) = self.pending_load().run(cache).await {
            self.apply(resolved);
        }
    }
}

impl std::fmt::Debug for ImageView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageView")
            .field("source", &self.source)
            .field("cache_key", &self.cache_key)
            .field("status", &self.status)
            .field("mounted", &self.is_mounted())
            .finish()
    }
}

/// In-flight resolve for an [`ImageView`].
#[derive(Debug, Clone)]
pub struct PendingLoad {
    source: ImageSource,
    cache_key: Option<CacheKey>,
    mounted: Arc<AtomicBool>,
}

impl PendingLoad {
    /// Resolves the image; `None` if the view was unmounted meanwhile.
    pub async fn run(self, cache: &ImageCache) -> Option<ResolvedImage> {
        let resolved = cache.resolve(&self.source, self.cache_key.as_ref()).await;
        self.mounted.load(Ordering::Acquire).then_some(resolved)
    }
}
