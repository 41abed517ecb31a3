//! Per-channel color moment features.

use crate::features::FeatureExtractor;
use crate::pipeline::StageProgress;
use crate::types::{FeatureRecord, LoadedImage};
use anyhow::Result;

/// Mean and standard deviation of each RGB channel, six values per image.
///
/// Much coarser than a histogram, but robust for collections dominated by
/// overall tone rather than color distribution.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColorMoments;

impl FeatureExtractor for ColorMoments {
    fn build_features(
        &self,
        images: Vec<LoadedImage>,
        progress: &StageProgress,
    ) -> Result<Vec<FeatureRecord>> {
        let mut records = Vec::with_capacity(images.len());

        for item in images {
            let rgb = item.image.to_rgb8();
            let pixel_count = (rgb.width() * rgb.height()).max(1) as f64;

            let mut sums = [0.0f64; 3];
            for pixel in rgb.pixels() {
                for channel in 0..3 {
                    sums[channel] += f64::from(pixel[channel]);
                }
            }
            let means = sums.map(|sum| sum / pixel_count);

            let mut squared = [0.0f64; 3];
            for pixel in rgb.pixels() {
                for channel in 0..3 {
                    let deviation = f64::from(pixel[channel]) - means[channel];
                    squared[channel] += deviation * deviation;
                }
            }

            let mut vector = Vec::with_capacity(6);
            for channel in 0..3 {
                vector.push(means[channel]);
                vector.push((squared[channel] / pixel_count).sqrt());
            }

            progress.add(1);
            records.push(FeatureRecord {
                path: item.path,
                vector,
            });
        }

        Ok(records)
    }

    fn feature_vector_size(&self) -> usize {
        6
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};
    use std::path::PathBuf;

    #[test]
    fn test_solid_image_has_zero_deviation() {
        let mut image = RgbImage::new(3, 3);
        for pixel in image.pixels_mut() {
            *pixel = Rgb([10, 200, 30]);
        }

        let progress = StageProgress::new();
        let records = ColorMoments
            .build_features(
                vec![LoadedImage {
                    path: PathBuf::from("solid.png"),
                    image: DynamicImage::ImageRgb8(image),
                }],
                &progress,
            )
            .unwrap();

        let vector = &records[0].vector;
        assert_eq!(vector.len(), ColorMoments.feature_vector_size());
        assert_eq!(vector[0], 10.0);
        assert_eq!(vector[2], 200.0);
        assert_eq!(vector[4], 30.0);
        for deviation in [vector[1], vector[3], vector[5]] {
            assert_eq!(deviation, 0.0);
        }
    }

    #[test]
    fn test_two_tone_image_deviation() {
        let mut image = RgbImage::new(2, 1);
        image.put_pixel(0, 0, Rgb([0, 0, 0]));
        image.put_pixel(1, 0, Rgb([100, 0, 0]));

        let progress = StageProgress::new();
        let records = ColorMoments
            .build_features(
                vec![LoadedImage {
                    path: PathBuf::from("two.png"),
                    image: DynamicImage::ImageRgb8(image),
                }],
                &progress,
            )
            .unwrap();

        let vector = &records[0].vector;
        assert_eq!(vector[0], 50.0);
        assert_eq!(vector[1], 50.0);
    }
}
