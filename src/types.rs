//! Core dataset types flowing between pipeline stages.

use image::DynamicImage;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A decoded image keyed by its originating path.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    /// Path the image was decoded from.
    pub path: PathBuf,

    /// Decoded pixel data.
    pub image: DynamicImage,
}

/// A path plus its numeric feature vector.
///
/// Vector length is fixed per run by the configured feature extractor;
/// downstream stages re-associate records with inputs by `path`, never by
/// position, since fan-out workers append in nondeterministic order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRecord {
    pub path: PathBuf,
    pub vector: Vec<f64>,
}

/// One cluster of feature records.
///
/// Clusters partition the feature set: every record belongs to exactly one
/// cluster, none are dropped or duplicated.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Cluster {
    pub records: Vec<FeatureRecord>,
}

impl Cluster {
    /// Number of records assigned to this cluster.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Paths of all member records.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.records.iter().map(|record| record.path.as_path())
    }
}
