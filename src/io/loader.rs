//! Image decoding from the local filesystem.

use crate::pipeline::StageProgress;
use crate::types::LoadedImage;
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Decodes a batch of image paths into pixel data.
///
/// Implementations tick `progress` once per decoded image so the driving
/// caller sees per-unit feedback. A path that cannot be decoded is an
/// error; the pipeline surfaces it at the stage's join point rather than
/// skipping the file silently.
pub trait ImageLoader: Send + Sync {
    fn load_batch(&self, paths: Vec<PathBuf>, progress: &StageProgress)
        -> Result<Vec<LoadedImage>>;
}

/// Loader reading images from local disk via the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLoader;

impl ImageLoader for FsLoader {
    fn load_batch(
        &self,
        paths: Vec<PathBuf>,
        progress: &StageProgress,
    ) -> Result<Vec<LoadedImage>> {
        let mut batch = Vec::with_capacity(paths.len());

        for path in paths {
            let image = image::open(&path)
                .with_context(|| format!("failed to decode image {}", path.display()))?;
            progress.add(1);
            batch.push(LoadedImage { path, image });
        }

        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn test_load_batch_decodes_and_ticks_progress() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = Vec::new();
        for name in ["a.png", "b.png"] {
            let path = dir.path().join(name);
            RgbImage::new(4, 3).save(&path).unwrap();
            paths.push(path);
        }

        let progress = StageProgress::new();
        let batch = FsLoader.load_batch(paths.clone(), &progress).unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].path, paths[0]);
        assert_eq!(batch[0].image.width(), 4);
        assert_eq!(progress.completed(), 2);
    }

    #[test]
    fn test_load_batch_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.png");

        let progress = StageProgress::new();
        let result = FsLoader.load_batch(vec![missing.clone()], &progress);

        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("nope.png"));
        assert_eq!(progress.completed(), 0);
    }
}
