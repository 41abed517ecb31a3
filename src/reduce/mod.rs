//! Dimensionality reduction for plotting feature datasets.

mod mds;

pub use mds::ClassicalMds;

use crate::types::FeatureRecord;
use anyhow::Result;

/// Projects a feature dataset to `output_dim` dimensions.
///
/// Output has the same cardinality and path-correspondence as the input;
/// only the vectors change. Runs as a single background task over the
/// whole dataset.
pub trait DimReductionAlgorithm: Send + Sync {
    fn reduce(&self, records: &[FeatureRecord], output_dim: usize) -> Result<Vec<FeatureRecord>>;
}
