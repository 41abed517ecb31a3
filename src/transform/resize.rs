//! Uniform resizing so feature extractors see comparable dimensions.

use crate::pipeline::StageProgress;
use crate::types::LoadedImage;
use anyhow::Result;
use image::imageops::FilterType;

/// Prepares a batch of decoded images for feature extraction, ticking
/// `progress` once per image. Must return exactly as many images as it
/// received; the stage writes results back over the batch's pool range.
pub trait Preprocessor: Send + Sync {
    fn prepare_batch(
        &self,
        images: Vec<LoadedImage>,
        progress: &StageProgress,
    ) -> Result<Vec<LoadedImage>>;
}

/// Scales every image to a fixed size.
#[derive(Debug, Clone, Copy)]
pub struct Resizer {
    width: u32,
    height: u32,
}

impl Resizer {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Resizer {
    fn default() -> Self {
        Self::new(300, 300)
    }
}

impl Preprocessor for Resizer {
    fn prepare_batch(
        &self,
        images: Vec<LoadedImage>,
        progress: &StageProgress,
    ) -> Result<Vec<LoadedImage>> {
        Ok(images
            .into_iter()
            .map(|mut item| {
                item.image = item
                    .image
                    .resize_exact(self.width, self.height, FilterType::Triangle);
                progress.add(1);
                item
            })
            .collect())
    }
}
