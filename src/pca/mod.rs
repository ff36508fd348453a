//! # Filtered Local PCA
//!
//! Runs covariance estimation, symmetric eigen decomposition, descending sort
//! and an [`EigenPairFilter`] over a local window, yielding a
//! [`PcaFilteredResult`]. All entry points converge on [`PcaFilteredRunner::process_eigen`],
//! so two windows with the same covariance matrix give identical results.

use std::sync::Arc;

use log::trace;
use ndarray::ArrayView2;

use crate::dense::Dataset;
use crate::eigen::{EigenDecomposition, SortedEigenPairs};
use crate::neighbors::Neighbor;
use crate::utils::{ObjectId, SortOrder};

mod covariance;
mod filter;
mod result;

pub use covariance::{CovarianceMatrixBuilder, StandardCovarianceMatrixBuilder};
pub use filter::{
    EigenPairFilter, FilterPolicy, FilteredEigenPairs, FirstNEigenPairFilter, LimitEigenPairFilter,
    PercentageEigenPairFilter, RelativeEigenPairFilter, SignificantEigenPairFilter, DEFAULT_ALPHA,
    DEFAULT_RALPHA,
};
pub use result::{EigenvalueClamp, PcaFilteredResult};

pub struct PcaFilteredRunnerBuilder {
    policy: FilterPolicy,
    filter: Option<Arc<dyn EigenPairFilter>>,
    big: f64,
    small: f64,
    covariance: Arc<dyn CovarianceMatrixBuilder>,
}

impl PcaFilteredRunnerBuilder {
    pub fn new() -> Self {
        PcaFilteredRunnerBuilder {
            policy: FilterPolicy::default(),
            filter: None,
            big: 1.0,
            small: 0.0,
            covariance: Arc::new(StandardCovarianceMatrixBuilder),
        }
    }

    /// Selects one of the built-in filters.
    pub fn filter_policy(mut self, policy: FilterPolicy) -> Self {
        self.policy = policy;
        self.filter = None;
        self
    }

    /// Uses a caller-provided filter instead of a built-in policy.
    pub fn filter(mut self, filter: Arc<dyn EigenPairFilter>) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn big(mut self, big: f64) -> Self {
        self.big = big;
        self
    }

    pub fn small(mut self, small: f64) -> Self {
        self.small = small;
        self
    }

    pub fn covariance_builder(mut self, builder: Arc<dyn CovarianceMatrixBuilder>) -> Self {
        self.covariance = builder;
        self
    }

    pub fn build(self) -> anyhow::Result<PcaFilteredRunner> {
        let clamp = EigenvalueClamp::new(self.big, self.small)?;
        let filter = match self.filter {
            Some(filter) => filter,
            None => self.policy.into_filter()?,
        };
        Ok(PcaFilteredRunner {
            filter,
            clamp,
            covariance: self.covariance,
        })
    }
}

impl Default for PcaFilteredRunnerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct PcaFilteredRunner {
    filter: Arc<dyn EigenPairFilter>,
    clamp: EigenvalueClamp,
    covariance: Arc<dyn CovarianceMatrixBuilder>,
}

impl PcaFilteredRunner {
    pub fn builder() -> PcaFilteredRunnerBuilder {
        PcaFilteredRunnerBuilder::new()
    }

    pub fn filter(&self) -> &dyn EigenPairFilter {
        self.filter.as_ref()
    }

    pub fn clamp(&self) -> EigenvalueClamp {
        self.clamp
    }

    /// Filtered PCA of the objects `ids`.
    pub fn process_ids(&self, ids: &[ObjectId], dataset: &Dataset) -> anyhow::Result<PcaFilteredResult> {
        let covariance = self.covariance.process_ids(ids, dataset)?;
        self.process_covariance(covariance.view())
    }

    /// Filtered PCA of a neighborhood query result.
    pub fn process_neighbors(&self, neighbors: &[Neighbor], dataset: &Dataset) -> anyhow::Result<PcaFilteredResult> {
        let covariance = self.covariance.process_neighbors(neighbors, dataset)?;
        self.process_covariance(covariance.view())
    }

    /// Filtered PCA of a precomputed covariance matrix.
    pub fn process_covariance(&self, covariance: ArrayView2<f64>) -> anyhow::Result<PcaFilteredResult> {
        let evd = EigenDecomposition::new(covariance)?;
        Ok(self.process_eigen(&evd))
    }

    /// Sorts, filters and clamps an existing decomposition.
    pub fn process_eigen(&self, evd: &EigenDecomposition) -> PcaFilteredResult {
        let sorted = SortedEigenPairs::new(evd, SortOrder::Descending);
        let filtered = self.filter.filter(&sorted);
        trace!(
            "{} filter kept {} of {} eigenpairs",
            self.filter.name(),
            filtered.strong_count(),
            filtered.len()
        );
        PcaFilteredResult::new(&filtered, self.clamp)
    }
}
