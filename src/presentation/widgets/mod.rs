//! Display widgets.

mod image_view;

pub use image_view::{FALLBACK_ASSET, ImageFrame, ImageView, PendingLoad};
