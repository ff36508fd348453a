use ndarray::{Array1, Array2};

use super::EigenDecomposition;
use crate::utils::SortOrder;

#[derive(Debug, Clone, PartialEq)]
pub struct EigenPair {
    pub eigenvalue: f64,
    pub eigenvector: Array1<f64>,
}

impl EigenPair {
    pub fn new(eigenvalue: f64, eigenvector: Array1<f64>) -> Self {
        EigenPair {
            eigenvalue,
            eigenvector,
        }
    }
}

/// Eigenpairs ordered by eigenvalue.
///
/// The sort is stable: pairs with equal eigenvalues keep the order in which
/// the decomposition reported them.
#[derive(Debug, Clone, PartialEq)]
pub struct SortedEigenPairs {
    pairs: Vec<EigenPair>,
    order: SortOrder,
}

impl SortedEigenPairs {
    pub fn new(evd: &EigenDecomposition, order: SortOrder) -> Self {
        let pairs = evd
            .eigenvalues()
            .iter()
            .enumerate()
            .map(|(i, &value)| EigenPair::new(value, evd.eigenvector(i).to_owned()))
            .collect();
        Self::from_pairs(pairs, order)
    }

    pub fn from_pairs(mut pairs: Vec<EigenPair>, order: SortOrder) -> Self {
        match order {
            SortOrder::Ascending => pairs.sort_by(|a, b| a.eigenvalue.total_cmp(&b.eigenvalue)),
            SortOrder::Descending => pairs.sort_by(|a, b| b.eigenvalue.total_cmp(&a.eigenvalue)),
        }
        SortedEigenPairs { pairs, order }
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[EigenPair] {
        &self.pairs
    }

    pub fn get(&self, index: usize) -> Option<&EigenPair> {
        self.pairs.get(index)
    }

    pub fn eigenvalues(&self) -> Array1<f64> {
        self.pairs.iter().map(|p| p.eigenvalue).collect()
    }

    /// Eigenvectors as columns, in sorted order.
    pub fn eigenvectors(&self) -> Array2<f64> {
        column_stack(self.pairs.iter(), self.dimensionality())
    }

    /// Length of the eigenvectors, zero when there are no pairs.
    pub fn dimensionality(&self) -> usize {
        self.pairs.first().map_or(0, |p| p.eigenvector.len())
    }

    /// Re-sorts a copy under a different order.
    pub fn reordered(&self, order: SortOrder) -> Self {
        Self::from_pairs(self.pairs.clone(), order)
    }

    pub fn into_pairs(self) -> Vec<EigenPair> {
        self.pairs
    }
}

/// Places the eigenvectors of `pairs` side by side as columns of a `dim`-row matrix.
pub(crate) fn column_stack<'a>(pairs: impl Iterator<Item = &'a EigenPair>, dim: usize) -> Array2<f64> {
    let pairs: Vec<&EigenPair> = pairs.collect();
    let mut matrix = Array2::zeros((dim, pairs.len()));
    for (mut column, pair) in matrix.columns_mut().into_iter().zip(pairs) {
        column.assign(&pair.eigenvector);
    }
    matrix
}
