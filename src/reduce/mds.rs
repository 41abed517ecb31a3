//! Classical multidimensional scaling.
//!
//! Embeds the dataset so that pairwise Euclidean distances are preserved as
//! well as a linear projection allows: square the distance matrix, double-
//! center it into a Gram matrix, and take the top eigenpairs. Eigenpairs
//! are found by power iteration with deflation, which is plenty for the
//! two or three output axes this pipeline asks for.

use crate::reduce::DimReductionAlgorithm;
use crate::types::FeatureRecord;
use anyhow::{bail, Result};
use ndarray::{Array1, Array2, Axis};

#[derive(Debug, Clone, Copy)]
pub struct ClassicalMds {
    max_power_iterations: usize,
    tolerance: f64,
}

impl ClassicalMds {
    pub fn new() -> Self {
        Self {
            max_power_iterations: 500,
            tolerance: 1e-12,
        }
    }
}

impl Default for ClassicalMds {
    fn default() -> Self {
        Self::new()
    }
}

/// Squared Euclidean distances between all record pairs.
fn squared_distances(records: &[FeatureRecord]) -> Array2<f64> {
    let n = records.len();
    let mut distances = Array2::zeros((n, n));

    for i in 0..n {
        for j in (i + 1)..n {
            let d: f64 = records[i]
                .vector
                .iter()
                .zip(&records[j].vector)
                .map(|(a, b)| (a - b) * (a - b))
                .sum();
            distances[[i, j]] = d;
            distances[[j, i]] = d;
        }
    }

    distances
}

/// Gram matrix from squared distances: `B = -1/2 * J D2 J` with
/// `J = I - 1/n`.
fn double_center(squared: &Array2<f64>) -> Array2<f64> {
    let n = squared.nrows();
    let row_means = squared.sum_axis(Axis(1)) / n as f64;
    let grand_mean = squared.sum() / (n * n) as f64;

    let mut gram = Array2::zeros((n, n));
    for i in 0..n {
        for j in 0..n {
            gram[[i, j]] = -0.5 * (squared[[i, j]] - row_means[i] - row_means[j] + grand_mean);
        }
    }
    gram
}

impl ClassicalMds {
    /// Dominant eigenpair of a symmetric matrix by power iteration.
    /// Returns `None` when the iteration collapses to the zero vector.
    fn dominant_eigenpair(&self, matrix: &Array2<f64>, axis: usize) -> Option<(f64, Array1<f64>)> {
        let n = matrix.nrows();

        // Deterministic, dense start vector; any component in the target
        // eigenspace survives the first multiplication.
        let mut vector =
            Array1::from_iter((0..n).map(|i| ((i + axis + 1) as f64).sin() + 1e-3));
        let norm = vector.dot(&vector).sqrt();
        vector /= norm;

        for _ in 0..self.max_power_iterations {
            let mut next = matrix.dot(&vector);
            let norm = next.dot(&next).sqrt();
            if norm < 1e-12 {
                return None;
            }
            next /= norm;

            let aligned = 1.0 - next.dot(&vector).abs() < self.tolerance;
            vector = next;
            if aligned {
                break;
            }
        }

        let eigenvalue = vector.dot(&matrix.dot(&vector));
        Some((eigenvalue, vector))
    }
}

impl DimReductionAlgorithm for ClassicalMds {
    fn reduce(&self, records: &[FeatureRecord], output_dim: usize) -> Result<Vec<FeatureRecord>> {
        if output_dim == 0 {
            bail!("output dimensionality must be greater than zero");
        }
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let n = records.len();
        let mut gram = double_center(&squared_distances(records));
        let mut coordinates = vec![vec![0.0f64; output_dim]; n];

        for axis in 0..output_dim.min(n) {
            let Some((eigenvalue, vector)) = self.dominant_eigenpair(&gram, axis) else {
                break;
            };

            // Non-positive eigenvalues carry no more metric structure; the
            // remaining axes stay at zero.
            if eigenvalue <= 0.0 {
                break;
            }

            let scale = eigenvalue.sqrt();
            for (target, component) in coordinates.iter_mut().zip(vector.iter()) {
                target[axis] = component * scale;
            }

            // Deflate so the next pass finds the next eigenpair.
            for i in 0..n {
                for j in 0..n {
                    gram[[i, j]] -= eigenvalue * vector[i] * vector[j];
                }
            }
        }

        Ok(records
            .iter()
            .zip(coordinates)
            .map(|(record, vector)| FeatureRecord {
                path: record.path.clone(),
                vector,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn record(name: &str, vector: Vec<f64>) -> FeatureRecord {
        FeatureRecord {
            path: PathBuf::from(name),
            vector,
        }
    }

    fn pairwise(records: &[FeatureRecord]) -> Vec<f64> {
        let mut distances = Vec::new();
        for i in 0..records.len() {
            for j in (i + 1)..records.len() {
                let d: f64 = records[i]
                    .vector
                    .iter()
                    .zip(&records[j].vector)
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum();
                distances.push(d.sqrt());
            }
        }
        distances
    }

    #[test]
    fn test_zero_output_dim_is_rejected() {
        assert!(ClassicalMds::new().reduce(&[], 0).is_err());
    }

    #[test]
    fn test_empty_input() {
        let reduced = ClassicalMds::new().reduce(&[], 2).unwrap();
        assert!(reduced.is_empty());
    }

    #[test]
    fn test_preserves_planar_configuration() {
        // A unit square living in 5 dimensions is exactly 2-dimensional.
        let records = vec![
            record("a", vec![0.0, 0.0, 1.0, 1.0, 1.0]),
            record("b", vec![1.0, 0.0, 1.0, 1.0, 1.0]),
            record("c", vec![0.0, 1.0, 1.0, 1.0, 1.0]),
            record("d", vec![1.0, 1.0, 1.0, 1.0, 1.0]),
        ];

        let reduced = ClassicalMds::new().reduce(&records, 2).unwrap();

        assert_eq!(reduced.len(), records.len());
        for (original, projected) in records.iter().zip(&reduced) {
            assert_eq!(original.path, projected.path);
            assert_eq!(projected.vector.len(), 2);
        }

        let before = pairwise(&records);
        let after = pairwise(&reduced);
        for (b, a) in before.iter().zip(&after) {
            assert!((b - a).abs() < 1e-6, "distance {b} became {a}");
        }
    }

    #[test]
    fn test_collinear_points_collapse_to_one_axis() {
        let records = vec![
            record("a", vec![0.0, 0.0, 0.0]),
            record("b", vec![1.0, 1.0, 1.0]),
            record("c", vec![2.0, 2.0, 2.0]),
        ];

        let reduced = ClassicalMds::new().reduce(&records, 2).unwrap();

        let before = pairwise(&records);
        let after = pairwise(&reduced);
        for (b, a) in before.iter().zip(&after) {
            assert!((b - a).abs() < 1e-6);
        }

        // All variance fits on the first axis.
        for projected in &reduced {
            assert!(projected.vector[1].abs() < 1e-6);
        }
    }
}
