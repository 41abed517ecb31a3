//! Feature extraction: turning decoded images into numeric vectors.

mod color_moments;
mod histogram;

pub use color_moments::ColorMoments;
pub use histogram::HueHistogram;

use crate::pipeline::StageProgress;
use crate::types::{FeatureRecord, LoadedImage};
use anyhow::Result;

/// Computes a fixed-length feature vector per image.
///
/// The vector length is constant for one extractor instance and reported by
/// `feature_vector_size`, so downstream consumers can rely on uniform
/// dimensionality across the whole run. Implementations tick `progress`
/// once per image.
pub trait FeatureExtractor: Send + Sync {
    fn build_features(
        &self,
        images: Vec<LoadedImage>,
        progress: &StageProgress,
    ) -> Result<Vec<FeatureRecord>>;

    fn feature_vector_size(&self) -> usize;
}
