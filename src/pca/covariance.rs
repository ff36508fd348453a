use std::fmt::Debug;

use anyhow::bail;
use ndarray::{Array2, Axis};

use crate::dense::Dataset;
use crate::error::CopacError;
use crate::neighbors::Neighbor;
use crate::utils::ObjectId;

/// Builds the covariance matrix of a local window of objects.
pub trait CovarianceMatrixBuilder: Debug + Send + Sync {
    /// Covariance matrix (dimensionality × dimensionality) of the vectors of `ids`.
    fn process_ids(&self, ids: &[ObjectId], dataset: &Dataset) -> anyhow::Result<Array2<f64>>;

    /// Covariance matrix of the objects of a neighborhood query result.
    fn process_neighbors(&self, neighbors: &[Neighbor], dataset: &Dataset) -> anyhow::Result<Array2<f64>> {
        let ids: Vec<ObjectId> = neighbors.iter().map(|n| n.id).collect();
        self.process_ids(&ids, dataset)
    }
}

/// Centroid-centred covariance, normalized by the number of objects.
///
/// Ids are sorted and deduplicated before accumulation, so any two windows
/// holding the same objects give bit-identical matrices.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardCovarianceMatrixBuilder;

impl CovarianceMatrixBuilder for StandardCovarianceMatrixBuilder {
    fn process_ids(&self, ids: &[ObjectId], dataset: &Dataset) -> anyhow::Result<Array2<f64>> {
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            bail!(CopacError::parameter("cannot build a covariance matrix from an empty window"));
        }

        let rows = dataset.select(&ids)?;
        let n = rows.nrows() as f64;
        let centroid = rows
            .mean_axis(Axis(0))
            .ok_or_else(|| CopacError::fatal_state("mean of a non-empty window is undefined"))?;
        let centered = &rows - &centroid;

        Ok(centered.t().dot(&centered) / n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn dataset() -> Dataset {
        Dataset::from_rows(&[
            vec![0.0, 0.0],
            vec![2.0, 0.0],
            vec![0.0, 2.0],
            vec![2.0, 2.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_square_covariance() {
        let cov = StandardCovarianceMatrixBuilder
            .process_ids(&[0, 1, 2, 3], &dataset())
            .unwrap();
        let expected = array![[1.0, 0.0], [0.0, 1.0]];
        for (a, b) in cov.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_order_independent() {
        let builder = StandardCovarianceMatrixBuilder;
        let ds = dataset();
        let a = builder.process_ids(&[0, 1, 3], &ds).unwrap();
        let b = builder.process_ids(&[3, 0, 1, 1], &ds).unwrap();
        assert_eq!(a, b);

        let neighbors = vec![Neighbor::new(0.0, 3), Neighbor::new(1.0, 1), Neighbor::new(2.0, 0)];
        let c = builder.process_neighbors(&neighbors, &ds).unwrap();
        assert_eq!(a, c);
    }

    #[test]
    fn test_collinear_window_is_rank_one() {
        let cov = StandardCovarianceMatrixBuilder
            .process_ids(&[0, 3], &dataset())
            .unwrap();
        assert_abs_diff_eq!(cov[[0, 0]], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(cov[[0, 1]], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(cov[[0, 0]] * cov[[1, 1]] - cov[[0, 1]] * cov[[1, 0]], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_and_unknown_ids() {
        assert!(StandardCovarianceMatrixBuilder.process_ids(&[], &dataset()).is_err());
        assert!(StandardCovarianceMatrixBuilder.process_ids(&[0, 9], &dataset()).is_err());
    }
}
