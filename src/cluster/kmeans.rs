//! Lloyd's k-means with deterministic seeding.

use crate::cluster::{assemble, euclidean_sq, nearest, seed_centroids, ClusteringAlgorithm};
use crate::types::{Cluster, FeatureRecord};
use anyhow::{bail, Result};
use rayon::prelude::*;

/// Standard k-means: assign each record to its nearest centroid, recompute
/// centroids as cluster means, repeat until assignments stabilize.
#[derive(Debug, Clone, Copy)]
pub struct KMeans {
    k: usize,
    max_iterations: usize,
}

impl KMeans {
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

impl ClusteringAlgorithm for KMeans {
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
                .map(|record| nearest(&record.vector, &centroids, euclidean_sq))
                .collect();

            let converged = next == assignments;
            assignments = next;

            let mut sums = vec![vec![0.0f64; dimensions]; k];
            let mut counts = vec![0usize; k];
            for (record, &assignment) in records.iter().zip(&assignments) {
                counts[assignment] += 1;
                for (accumulator, value) in sums[assignment].iter_mut().zip(&record.vector) {
                    *accumulator += value;
                }
            }

            for (centroid, (sum, count)) in centroids.iter_mut().zip(sums.iter().zip(&counts)) {
                // Centroids that lost every member keep their position.
                if *count > 0 {
                    for (target, value) in centroid.iter_mut().zip(sum) {
                        *target = value / *count as f64;
                    }
                }
            }

            if converged {
                break;
            }
        }

        Ok(assemble(records, &assignments, k))
    }
}
