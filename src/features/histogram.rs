//! Global hue histogram features.

use crate::features::FeatureExtractor;
use crate::pipeline::StageProgress;
use crate::types::{FeatureRecord, LoadedImage};
use anyhow::{bail, Result};
use image::Rgb;

/// Histogram of pixel hues over the whole image, normalized by pixel count.
///
/// Hue alone is a cheap, scale-invariant summary of an image's dominant
/// colors, which is enough to group visually similar photographs.
#[derive(Debug, Clone, Copy)]
pub struct HueHistogram {
    bins: usize,
}

impl HueHistogram {
    pub fn new(bins: usize) -> Result<Self> {
        if bins == 0 {
            bail!("histogram bin count must be greater than zero");
        }
        Ok(Self { bins })
    }

    pub fn bins(&self) -> usize {
        self.bins
    }
}

/// Hue of an RGB pixel in degrees, `[0, 360)`. Achromatic pixels map to 0.
fn hue(pixel: &Rgb<u8>) -> f64 {
    let r = f64::from(pixel[0]) / 255.0;
    let g = f64::from(pixel[1]) / 255.0;
    let b = f64::from(pixel[2]) / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    if delta < f64::EPSILON {
        return 0.0;
    }

    let hue = if max == r {
        60.0 * (((g - b) / delta) % 6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    if hue < 0.0 {
        hue + 360.0
    } else {
        hue
    }
}

impl FeatureExtractor for HueHistogram {
    fn build_features(
        &self,
        images: Vec<LoadedImage>,
        progress: &StageProgress,
    ) -> Result<Vec<FeatureRecord>> {
        let mut records = Vec::with_capacity(images.len());

        for item in images {
            let rgb = item.image.to_rgb8();
            let mut histogram = vec![0.0f64; self.bins];

            for pixel in rgb.pixels() {
                let bin = ((hue(pixel) / 360.0) * self.bins as f64) as usize;
                histogram[bin.min(self.bins - 1)] += 1.0;
            }

            let pixel_count = f64::from(rgb.width() * rgb.height());
            if pixel_count > 0.0 {
                for value in &mut histogram {
                    *value /= pixel_count;
                }
            }

            progress.add(1);
            records.push(FeatureRecord {
                path: item.path,
                vector: histogram,
            });
        }

        Ok(records)
    }

    fn feature_vector_size(&self) -> usize {
        self.bins
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};
    use std::path::PathBuf;

    fn solid(r: u8, g: u8, b: u8) -> LoadedImage {
        let mut image = RgbImage::new(4, 4);
        for pixel in image.pixels_mut() {
            *pixel = Rgb([r, g, b]);
        }
        LoadedImage {
            path: PathBuf::from("solid.png"),
            image: DynamicImage::ImageRgb8(image),
        }
    }

    #[test]
    fn test_zero_bins_is_rejected() {
        assert!(HueHistogram::new(0).is_err());
    }

    #[test]
    fn test_hue_of_primaries() {
        assert_eq!(hue(&Rgb([255, 0, 0])), 0.0);
        assert_eq!(hue(&Rgb([0, 255, 0])), 120.0);
        assert_eq!(hue(&Rgb([0, 0, 255])), 240.0);
        assert_eq!(hue(&Rgb([128, 128, 128])), 0.0);
    }

    #[test]
    fn test_solid_image_fills_one_bin() {
        let extractor = HueHistogram::new(12).unwrap();
        let progress = StageProgress::new();

        let records = extractor
            .build_features(vec![solid(0, 255, 0)], &progress)
            .unwrap();

        assert_eq!(records.len(), 1);
        let vector = &records[0].vector;
        assert_eq!(vector.len(), extractor.feature_vector_size());

        // Green is 120 degrees, bin 4 of 12; all mass lands there.
        assert_eq!(vector[4], 1.0);
        assert_eq!(vector.iter().sum::<f64>(), 1.0);
        assert_eq!(progress.completed(), 1);
    }

    #[test]
    fn test_histogram_is_normalized() {
        let extractor = HueHistogram::new(8).unwrap();
        let progress = StageProgress::new();

        let mut image = RgbImage::new(2, 2);
        image.put_pixel(0, 0, Rgb([255, 0, 0]));
        image.put_pixel(1, 0, Rgb([0, 255, 0]));
        image.put_pixel(0, 1, Rgb([0, 0, 255]));
        image.put_pixel(1, 1, Rgb([255, 0, 0]));

        let records = extractor
            .build_features(
                vec![LoadedImage {
                    path: PathBuf::from("mix.png"),
                    image: DynamicImage::ImageRgb8(image),
                }],
                &progress,
            )
            .unwrap();

        let total: f64 = records[0].vector.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }
}
