//! Filesystem I/O: image decoding, input enumeration, and clustered output
//! placement.

mod files;
mod loader;

pub use files::{list_images, sort_into_directories};
pub use loader::{FsLoader, ImageLoader};
