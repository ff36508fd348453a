//! # Symmetric Eigen Decomposition
//!
//! Wraps nalgebra's symmetric eigen solver for dense covariance matrices.
//! Input matrices are symmetrized first so that round-off asymmetry can never
//! produce complex eigenvalues. Output order is whatever the solver returns;
//! use [`SortedEigenPairs`] to arrange the pairs.

use anyhow::bail;
use nalgebra::SymmetricEigen;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use nshare::{IntoNalgebra, IntoNdarray2};

use crate::error::CopacError;
use crate::utils::ensure_finite;

pub(crate) mod sorted;
pub use sorted::{EigenPair, SortedEigenPairs};

const MAX_ITERATIONS: usize = 10_000;

/// Eigenvalues and unit-norm eigenvectors of a real symmetric matrix.
///
/// Column `i` of `eigenvectors` belongs to `eigenvalues[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct EigenDecomposition {
    eigenvalues: Array1<f64>,
    eigenvectors: Array2<f64>,
}

impl EigenDecomposition {
    /// Decomposes `matrix` after replacing it by `(A + Aᵀ) / 2`.
    ///
    /// # Errors
    /// - Parameter: the matrix is empty or not square
    /// - Numeric: an entry is NaN or infinite, or the solver does not converge
    pub fn new(matrix: ArrayView2<f64>) -> anyhow::Result<Self> {
        let (rows, cols) = matrix.dim();
        if rows != cols || rows == 0 {
            bail!(CopacError::parameter(format!(
                "eigen decomposition needs a non-empty square matrix, got {rows}x{cols}"
            )));
        }
        ensure_finite(matrix)?;

        let symmetric = (&matrix + &matrix.t()) * 0.5;
        let eigen = SymmetricEigen::try_new(symmetric.into_nalgebra(), f64::EPSILON, MAX_ITERATIONS)
            .ok_or_else(|| {
                CopacError::numeric(format!(
                    "symmetric eigen decomposition of a {rows}x{rows} matrix did not converge"
                ))
            })?;

        let eigenvalues = Array1::from_iter(eigen.eigenvalues.iter().copied());
        let eigenvectors = eigen.eigenvectors.into_ndarray2().into_owned();
        if eigenvalues.iter().any(|v| !v.is_finite()) {
            bail!(CopacError::numeric("eigen decomposition produced non-finite eigenvalues"));
        }

        Ok(EigenDecomposition {
            eigenvalues,
            eigenvectors,
        })
    }

    pub fn len(&self) -> usize {
        self.eigenvalues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.eigenvalues.is_empty()
    }

    pub fn eigenvalues(&self) -> &Array1<f64> {
        &self.eigenvalues
    }

    /// Eigenvectors stored as columns.
    pub fn eigenvectors(&self) -> &Array2<f64> {
        &self.eigenvectors
    }

    pub fn eigenvector(&self, index: usize) -> ArrayView1<'_, f64> {
        self.eigenvectors.column(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::copac_error;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn assert_eigen_equation(matrix: &Array2<f64>, evd: &EigenDecomposition) {
        for i in 0..evd.len() {
            let v = evd.eigenvector(i);
            let lhs = matrix.dot(&v);
            let rhs = &v * evd.eigenvalues()[i];
            for (a, b) in lhs.iter().zip(rhs.iter()) {
                assert_abs_diff_eq!(*a, *b, epsilon = 1e-9);
            }
            assert_abs_diff_eq!(v.dot(&v), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_diagonal_matrix() {
        let m = array![[3.0, 0.0], [0.0, 1.0]];
        let evd = EigenDecomposition::new(m.view()).unwrap();

        let mut values = evd.eigenvalues().to_vec();
        values.sort_by(|a, b| a.total_cmp(b));
        assert_abs_diff_eq!(values[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(values[1], 3.0, epsilon = 1e-12);
        assert_eigen_equation(&m, &evd);
    }

    #[test]
    fn test_dense_symmetric_matrix() {
        let m = array![[4.0, 1.0, 2.0], [1.0, 3.0, 0.5], [2.0, 0.5, 5.0]];
        let evd = EigenDecomposition::new(m.view()).unwrap();
        assert_eq!(evd.len(), 3);
        assert_abs_diff_eq!(evd.eigenvalues().sum(), 12.0, epsilon = 1e-9);
        assert_eigen_equation(&m, &evd);

        // eigenvectors of distinct eigenvalues are orthogonal
        for i in 0..3 {
            for j in (i + 1)..3 {
                assert_abs_diff_eq!(evd.eigenvector(i).dot(&evd.eigenvector(j)), 0.0, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_slightly_asymmetric_matrix_is_symmetrized() {
        let noisy = array![[2.0, 1.0 + 1e-12], [1.0 - 1e-12, 2.0]];
        let evd = EigenDecomposition::new(noisy.view()).unwrap();
        let symmetric = array![[2.0, 1.0], [1.0, 2.0]];
        assert_eigen_equation(&symmetric, &evd);
    }

    #[test]
    fn test_non_finite_entries() {
        let m = array![[1.0, f64::NAN], [f64::NAN, 1.0]];
        let err = EigenDecomposition::new(m.view()).unwrap_err();
        assert!(copac_error(&err).unwrap().is_numeric());

        let m = array![[f64::INFINITY, 0.0], [0.0, 1.0]];
        let err = EigenDecomposition::new(m.view()).unwrap_err();
        assert!(copac_error(&err).unwrap().is_numeric());
    }

    #[test]
    fn test_non_square_matrix() {
        let m = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let err = EigenDecomposition::new(m.view()).unwrap_err();
        assert!(copac_error(&err).unwrap().is_parameter());
    }
}
