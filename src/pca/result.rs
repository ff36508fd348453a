use ndarray::{Array1, Array2};

use super::filter::FilteredEigenPairs;
use crate::eigen::sorted::column_stack;
use crate::utils::ensure_param;

/// Representative eigenvalues written into the clamped eigenvalue matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EigenvalueClamp {
    big: f64,
    small: f64,
}

impl EigenvalueClamp {
    /// `big` must be positive, `small` non-negative and not above `big`.
    pub fn new(big: f64, small: f64) -> anyhow::Result<Self> {
        ensure_param("big", big, "positive", |b| b > 0.0)?;
        ensure_param("small", small, "non-negative", |s| s >= 0.0)?;
        ensure_param("small", small, &format!("at most big ({big})"), |s| s <= big)?;
        Ok(EigenvalueClamp { big, small })
    }

    pub fn big(&self) -> f64 {
        self.big
    }

    pub fn small(&self) -> f64 {
        self.small
    }
}

impl Default for EigenvalueClamp {
    fn default() -> Self {
        EigenvalueClamp { big: 1.0, small: 0.0 }
    }
}

/// Outcome of one filtered local PCA.
///
/// Eigenvalues and eigenvectors are kept in the sorted order of the filtered
/// pairs. `e_hat` holds `big` on the diagonal positions of strong pairs and
/// `small` on those of weak pairs; `e_czech` is its complement.
#[derive(Debug, Clone, PartialEq)]
pub struct PcaFilteredResult {
    eigenvalues: Array1<f64>,
    eigenvectors: Array2<f64>,
    strong_eigenvalues: Array1<f64>,
    weak_eigenvalues: Array1<f64>,
    strong_eigenvectors: Array2<f64>,
    weak_eigenvectors: Array2<f64>,
    correlation_dimension: usize,
    e_hat: Array2<f64>,
    e_czech: Array2<f64>,
    explained_variance: f64,
}

impl PcaFilteredResult {
    pub fn new(filtered: &FilteredEigenPairs, clamp: EigenvalueClamp) -> Self {
        let dim = filtered.pairs().first().map_or(0, |p| p.eigenvector.len());
        let d = filtered.len();

        let mut e_hat = Array2::zeros((d, d));
        let mut e_czech = Array2::zeros((d, d));
        for i in 0..d {
            let strong = filtered.is_strong(i);
            e_hat[[i, i]] = if strong { clamp.big } else { clamp.small };
            e_czech[[i, i]] = if strong { clamp.small } else { clamp.big };
        }

        let strong_eigenvalues: Array1<f64> = filtered.strong_pairs().map(|p| p.eigenvalue).collect();
        let weak_eigenvalues: Array1<f64> = filtered.weak_pairs().map(|p| p.eigenvalue).collect();
        let strong_mass: f64 = strong_eigenvalues.iter().map(|v| v.max(0.0)).sum();
        let total_mass: f64 = strong_mass + weak_eigenvalues.iter().map(|v| v.max(0.0)).sum::<f64>();
        let explained_variance = if total_mass > 0.0 {
            strong_mass / total_mass
        } else if d > 0 && filtered.strong_count() == d {
            1.0
        } else {
            0.0
        };

        PcaFilteredResult {
            eigenvalues: filtered.pairs().iter().map(|p| p.eigenvalue).collect(),
            eigenvectors: column_stack(filtered.pairs().iter(), dim),
            strong_eigenvectors: column_stack(filtered.strong_pairs(), dim),
            weak_eigenvectors: column_stack(filtered.weak_pairs(), dim),
            correlation_dimension: filtered.strong_count(),
            strong_eigenvalues,
            weak_eigenvalues,
            e_hat,
            e_czech,
            explained_variance,
        }
    }

    /// Number of strong eigenpairs.
    pub fn correlation_dimension(&self) -> usize {
        self.correlation_dimension
    }

    pub fn eigenvalues(&self) -> &Array1<f64> {
        &self.eigenvalues
    }

    pub fn eigenvectors(&self) -> &Array2<f64> {
        &self.eigenvectors
    }

    pub fn strong_eigenvalues(&self) -> &Array1<f64> {
        &self.strong_eigenvalues
    }

    pub fn weak_eigenvalues(&self) -> &Array1<f64> {
        &self.weak_eigenvalues
    }

    pub fn strong_eigenvectors(&self) -> &Array2<f64> {
        &self.strong_eigenvectors
    }

    pub fn weak_eigenvectors(&self) -> &Array2<f64> {
        &self.weak_eigenvectors
    }

    /// Clamped eigenvalue matrix: `big` for strong, `small` for weak directions.
    pub fn e_hat(&self) -> &Array2<f64> {
        &self.e_hat
    }

    /// Complement of [`Self::e_hat`]: `small` for strong, `big` for weak directions.
    pub fn e_czech(&self) -> &Array2<f64> {
        &self.e_czech
    }

    /// Share of the eigenvalue mass lying in the strong subspace.
    ///
    /// Without any mass, 1 when every direction is strong and 0 otherwise.
    pub fn explained_variance(&self) -> f64 {
        self.explained_variance
    }

    /// `V · Ê · Vᵀ`, the matrix of a correlation-adapted similarity.
    pub fn similarity_matrix(&self) -> Array2<f64> {
        self.eigenvectors.dot(&self.e_hat).dot(&self.eigenvectors.t())
    }

    /// `V · Ě · Vᵀ`, projecting onto the weak subspace when `small = 0`.
    pub fn selection_matrix_of_weak_eigenvectors(&self) -> Array2<f64> {
        self.eigenvectors.dot(&self.e_czech).dot(&self.eigenvectors.t())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eigen::{EigenPair, SortedEigenPairs};
    use crate::pca::filter::{EigenPairFilter, FirstNEigenPairFilter};
    use crate::utils::SortOrder;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn filtered(values: &[f64], strong: usize) -> FilteredEigenPairs {
        let pairs = values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let mut vector = Array1::zeros(values.len());
                vector[i] = 1.0;
                EigenPair::new(v, vector)
            })
            .collect();
        let sorted = SortedEigenPairs::from_pairs(pairs, SortOrder::Descending);
        FirstNEigenPairFilter::new(strong).filter(&sorted)
    }

    #[test]
    fn test_clamp_validation() {
        assert!(EigenvalueClamp::new(1.0, 0.0).is_ok());
        assert!(EigenvalueClamp::new(2.0, 2.0).is_ok());
        assert!(EigenvalueClamp::new(0.0, 0.0).is_err());
        assert!(EigenvalueClamp::new(1.0, -0.1).is_err());
        assert!(EigenvalueClamp::new(1.0, 1.5).is_err());
        assert!(EigenvalueClamp::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_clamped_matrix() {
        let result = PcaFilteredResult::new(&filtered(&[4.0, 2.0, 1.0], 1), EigenvalueClamp::new(10.0, 0.5).unwrap());
        assert_eq!(result.correlation_dimension(), 1);
        assert_eq!(result.e_hat(), &Array2::from_diag(&array![10.0, 0.5, 0.5]));
        assert_eq!(result.e_czech(), &Array2::from_diag(&array![0.5, 10.0, 10.0]));

        let bigs = result.e_hat().iter().filter(|&&v| v == 10.0).count();
        assert_eq!(bigs, result.correlation_dimension());
    }

    #[test]
    fn test_eigenvector_matrices() {
        let result = PcaFilteredResult::new(&filtered(&[1.0, 3.0, 2.0], 2), EigenvalueClamp::default());
        assert_eq!(result.eigenvalues(), &array![3.0, 2.0, 1.0]);
        assert_eq!(result.strong_eigenvalues(), &array![3.0, 2.0]);
        assert_eq!(result.weak_eigenvalues(), &array![1.0]);
        assert_eq!(result.strong_eigenvectors(), &array![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]);
        assert_eq!(result.weak_eigenvectors(), &array![[1.0], [0.0], [0.0]]);
        assert_abs_diff_eq!(result.explained_variance(), 5.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_similarity_and_selection_matrices() {
        let result = PcaFilteredResult::new(&filtered(&[5.0, 1.0], 1), EigenvalueClamp::default());
        // big = 1, small = 0: projections onto the strong and the weak axis
        assert_eq!(result.similarity_matrix(), array![[1.0, 0.0], [0.0, 0.0]]);
        assert_eq!(result.selection_matrix_of_weak_eigenvectors(), array![[0.0, 0.0], [0.0, 1.0]]);
    }

    #[test]
    fn test_all_weak() {
        let result = PcaFilteredResult::new(&filtered(&[2.0, 1.0], 0), EigenvalueClamp::default());
        assert_eq!(result.correlation_dimension(), 0);
        assert_eq!(result.strong_eigenvectors().dim(), (2, 0));
        assert_eq!(result.weak_eigenvectors().dim(), (2, 2));
        assert_eq!(result.explained_variance(), 0.0);
    }

    #[test]
    fn test_zero_mass_explained_variance() {
        let all_strong = PcaFilteredResult::new(&filtered(&[0.0, 0.0], 2), EigenvalueClamp::default());
        assert_eq!(all_strong.explained_variance(), 1.0);

        let partly_strong = PcaFilteredResult::new(&filtered(&[0.0, 0.0], 1), EigenvalueClamp::default());
        assert_eq!(partly_strong.explained_variance(), 0.0);
    }
}
