//! Presentation layer with display state for listing images.

/// Reusable widgets.
pub mod widgets;

pub use widgets::{ImageFrame, ImageView};
