//! K-medians clustering under the Manhattan metric.

use crate::cluster::{assemble, manhattan, nearest, seed_centroids, ClusteringAlgorithm};
use crate::types::{Cluster, FeatureRecord};
use anyhow::{bail, Result};
use rayon::prelude::*;

/// Like k-means, but assigns by L1 distance and recomputes each centroid as
/// the coordinate-wise median of its members, which makes it markedly less
/// sensitive to outlier images.
#[derive(Debug, Clone, Copy)]
pub struct KMedians {
    k: usize,
    max_iterations: usize,
}

impl KMedians {
    pub fn new(k: usize) -> Result<Self> {
        if k == 0 {
            bail!("cluster count must be greater than zero");
        }
        Ok(Self {
            k,
            max_iterations: 100,
        })
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

/// Median of a non-empty sample; the mean of the two middle values for even
/// sample sizes.
fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

impl ClusteringAlgorithm for KMedians {
    fn cluster(&self, records: &[FeatureRecord]) -> Result<Vec<Cluster>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let k = self.k.min(records.len());
        let dimensions = records[0].vector.len();
        let mut centroids = seed_centroids(records, k);
        let mut assignments = vec![0usize; records.len()];

        for _ in 0..self.max_iterations {
            let next: Vec<usize> = records
                .par_iter()
                .map(|record| nearest(&record.vector, &centroids, manhattan))
                .collect();

            let converged = next == assignments;
            assignments = next;

            for (index, centroid) in centroids.iter_mut().enumerate() {
                let members: Vec<&FeatureRecord> = records
                    .iter()
                    .zip(&assignments)
                    .filter(|(_, &assignment)| assignment == index)
                    .map(|(record, _)| record)
                    .collect();

                if members.is_empty() {
                    continue;
                }

                for dimension in 0..dimensions {
                    let mut column: Vec<f64> =
                        members.iter().map(|m| m.vector[dimension]).collect();
                    centroid[dimension] = median(&mut column);
                }
            }

            if converged {
                break;
            }
        }

        Ok(assemble(records, &assignments, k))
    }
}
