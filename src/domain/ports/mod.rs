mod image_fetch_port;
mod key_value_port;
mod listing_source_port;

pub use image_fetch_port::{ImageFetcher, ImagePreloader};
pub use key_value_port::KeyValueStore;
pub use listing_source_port::ListingSource;
