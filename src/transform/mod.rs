//! Image preprocessing transforms.

mod resize;

pub use resize::{Preprocessor, Resizer};
