//! # Correlation Partition Clustering
//!
//! Estimates the correlation dimension of every object by a filtered PCA over
//! its neighborhood, groups the objects by that dimension and runs a separate
//! clustering algorithm on each group.
//!
//! ## Pipeline
//! 1. local dimension per object ([`Copac::local_dimensions`])
//! 2. grouping into a [`PartitionMap`] ([`Copac::partition`])
//! 3. one sub-dataset per partition, ids preserved
//! 4. the partition algorithm on each sub-dataset, in ascending partition order
//! 5. aggregation into a [`PartitionClusteringResult`]
//!
//! Any failure aborts the whole run; partial aggregations are never returned.
//! With [`CopacBuilder::parallel`] steps 1 and 4 fan out over rayon, which
//! leaves the result unchanged.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{bail, Context};
use log::info;
use parking_lot::Mutex;
use rayon::prelude::*;

use crate::clustering::{Clustering, ClusteringFactory, ClusteringRegistry, ClusteringResult};
use crate::dense::Dataset;
use crate::error::CopacError;
use crate::neighbors::{KnnQuery, NeighborhoodQuery};
use crate::pca::{
    CovarianceMatrixBuilder, EigenPairFilter, FilterPolicy, PcaFilteredRunner, PcaFilteredRunnerBuilder,
};
use crate::utils::ObjectId;

mod observer;
mod partition;

pub use observer::{CancellationToken, LogObserver, NoopObserver, PipelineObserver};
pub use partition::{PartitionClusteringResult, PartitionMap};

enum AlgorithmChoice {
    Named(String),
    Factory(String, ClusteringFactory),
}

pub struct CopacBuilder {
    runner: PcaFilteredRunnerBuilder,
    k: Option<usize>,
    neighborhood: Option<Arc<dyn NeighborhoodQuery>>,
    algorithm: Option<AlgorithmChoice>,
    registry: ClusteringRegistry,
    observer: Arc<dyn PipelineObserver>,
    parallel: bool,
}

impl CopacBuilder {
    pub fn new() -> Self {
        CopacBuilder {
            runner: PcaFilteredRunnerBuilder::new(),
            k: None,
            neighborhood: None,
            algorithm: None,
            registry: ClusteringRegistry::with_defaults(),
            observer: Arc::new(LogObserver),
            parallel: false,
        }
    }

    pub fn filter_policy(mut self, policy: FilterPolicy) -> Self {
        self.runner = self.runner.filter_policy(policy);
        self
    }

    pub fn filter(mut self, filter: Arc<dyn EigenPairFilter>) -> Self {
        self.runner = self.runner.filter(filter);
        self
    }

    /// Shorthand for the percentage filter with threshold `alpha`.
    pub fn filter_threshold(self, alpha: f64) -> Self {
        self.filter_policy(FilterPolicy::Percentage { alpha })
    }

    pub fn big(mut self, big: f64) -> Self {
        self.runner = self.runner.big(big);
        self
    }

    pub fn small(mut self, small: f64) -> Self {
        self.runner = self.runner.small(small);
        self
    }

    pub fn covariance_builder(mut self, builder: Arc<dyn CovarianceMatrixBuilder>) -> Self {
        self.runner = self.runner.covariance_builder(builder);
        self
    }

    /// Size of the k-nearest-neighbor window. Ignored when a custom
    /// neighborhood is set.
    pub fn k(mut self, k: usize) -> Self {
        self.k = Some(k);
        self
    }

    pub fn neighborhood(mut self, neighborhood: Arc<dyn NeighborhoodQuery>) -> Self {
        self.neighborhood = Some(neighborhood);
        self
    }

    /// Selects the partition algorithm by its registry name.
    pub fn partition_algorithm(mut self, name: impl Into<String>) -> Self {
        self.algorithm = Some(AlgorithmChoice::Named(name.into()));
        self
    }

    /// Uses `factory` to create one algorithm instance per partition.
    pub fn partition_algorithm_factory<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Clustering> + Send + Sync + 'static,
    {
        self.algorithm = Some(AlgorithmChoice::Factory(name.into(), Arc::new(factory)));
        self
    }

    pub fn registry(mut self, registry: ClusteringRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Validates the whole configuration.
    ///
    /// # Errors
    /// Parameter error for an invalid filter, clamp or `k`, a missing
    /// partition algorithm, or a name the registry does not know.
    pub fn build(self) -> anyhow::Result<Copac> {
        let runner = self.runner.build()?;

        let neighborhood: Arc<dyn NeighborhoodQuery> = match (self.neighborhood, self.k) {
            (Some(neighborhood), _) => neighborhood,
            (None, Some(k)) => Arc::new(KnnQuery::new(k)?),
            (None, None) => Arc::new(KnnQuery::default()),
        };

        let (algorithm_name, algorithm) = match self.algorithm {
            Some(AlgorithmChoice::Named(name)) => {
                let factory = self.registry.resolve(&name)?;
                (name, factory)
            }
            Some(AlgorithmChoice::Factory(name, factory)) => (name, factory),
            None => bail!(CopacError::parameter("a partition algorithm is required")),
        };

        Ok(Copac {
            runner,
            neighborhood,
            algorithm,
            algorithm_name,
            observer: self.observer,
            parallel: self.parallel,
        })
    }
}

impl Default for CopacBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Partitions a dataset by local correlation dimension and clusters each partition.
pub struct Copac {
    runner: PcaFilteredRunner,
    neighborhood: Arc<dyn NeighborhoodQuery>,
    algorithm: ClusteringFactory,
    algorithm_name: String,
    observer: Arc<dyn PipelineObserver>,
    parallel: bool,
}

impl Copac {
    pub fn builder() -> CopacBuilder {
        CopacBuilder::new()
    }

    pub fn runner(&self) -> &PcaFilteredRunner {
        &self.runner
    }

    pub fn algorithm_name(&self) -> &str {
        &self.algorithm_name
    }

    pub fn run(&self, dataset: &Dataset) -> anyhow::Result<PartitionClusteringResult> {
        self.run_with_cancellation(dataset, &CancellationToken::new())
    }

    pub fn run_with_cancellation(
        &self,
        dataset: &Dataset,
        token: &CancellationToken,
    ) -> anyhow::Result<PartitionClusteringResult> {
        info!(
            "COPAC on {} objects of dimensionality {} with partition algorithm {}",
            dataset.len(),
            dataset.dimensionality(),
            self.algorithm_name
        );

        let partition_map = self.partition(dataset, token)?;
        let sub_datasets = dataset.partition(partition_map.as_map())?;

        let results = if self.parallel {
            self.cluster_parallel(&sub_datasets, token)?
        } else {
            self.cluster_sequential(&sub_datasets, token)?
        };

        ensure_not_cancelled(token)?;
        Ok(PartitionClusteringResult::new(results, dataset.dimensionality()))
    }

    /// Correlation dimension of every object, in the dataset's id order.
    pub fn local_dimensions(
        &self,
        dataset: &Dataset,
        token: &CancellationToken,
    ) -> anyhow::Result<Vec<(ObjectId, usize)>> {
        if self.parallel {
            dataset
                .ids()
                .par_iter()
                .map(|&id| self.local_dimension(dataset, id, token))
                .collect()
        } else {
            dataset
                .ids()
                .iter()
                .map(|&id| self.local_dimension(dataset, id, token))
                .collect()
        }
    }

    /// Groups the objects of `dataset` by correlation dimension.
    pub fn partition(&self, dataset: &Dataset, token: &CancellationToken) -> anyhow::Result<PartitionMap> {
        let dimensions = self.local_dimensions(dataset, token)?;
        let partition_map = PartitionMap::from_assignments(dimensions);
        partition_map.ensure_covers(dataset)?;
        self.observer.partitions_built(&partition_map);
        Ok(partition_map)
    }

    fn local_dimension(
        &self,
        dataset: &Dataset,
        id: ObjectId,
        token: &CancellationToken,
    ) -> anyhow::Result<(ObjectId, usize)> {
        ensure_not_cancelled(token)?;
        let neighbors = self.neighborhood.neighbors(dataset, id)?;
        if neighbors.is_empty() {
            bail!(CopacError::fatal_state(format!("neighborhood of object {id} is empty")));
        }
        if let Some(unknown) = neighbors.iter().find(|n| !dataset.contains(n.id)) {
            bail!(CopacError::fatal_state(format!(
                "neighborhood of object {id} references unknown object {}",
                unknown.id
            )));
        }
        let pca = self
            .runner
            .process_neighbors(&neighbors, dataset)
            .with_context(|| format!("local PCA of object {id} failed"))?;
        let dimension = pca.correlation_dimension();
        self.observer.dimension_computed(id, dimension);
        Ok((id, dimension))
    }

    fn cluster_sequential(
        &self,
        sub_datasets: &BTreeMap<usize, Dataset>,
        token: &CancellationToken,
    ) -> anyhow::Result<BTreeMap<usize, ClusteringResult>> {
        let mut results = BTreeMap::new();
        for (&partition, sub_dataset) in sub_datasets {
            let result = self.cluster_partition(partition, sub_dataset, token)?;
            results.insert(partition, result);
        }
        Ok(results)
    }

    fn cluster_parallel(
        &self,
        sub_datasets: &BTreeMap<usize, Dataset>,
        token: &CancellationToken,
    ) -> anyhow::Result<BTreeMap<usize, ClusteringResult>> {
        let results = Mutex::new(BTreeMap::new());
        sub_datasets
            .par_iter()
            .try_for_each(|(&partition, sub_dataset)| -> anyhow::Result<()> {
                let result = self.cluster_partition(partition, sub_dataset, token)?;
                if results.lock().insert(partition, result).is_some() {
                    bail!(CopacError::fatal_state(format!(
                        "partition {partition} was clustered twice"
                    )));
                }
                Ok(())
            })?;
        Ok(results.into_inner())
    }

    fn cluster_partition(
        &self,
        partition: usize,
        sub_dataset: &Dataset,
        token: &CancellationToken,
    ) -> anyhow::Result<ClusteringResult> {
        ensure_not_cancelled(token)?;
        self.observer
            .partition_started(partition, sub_dataset.len(), &self.algorithm_name);

        let mut algorithm = (self.algorithm)();
        algorithm
            .run(sub_dataset)
            .with_context(|| format!("{} failed on partition {partition}", self.algorithm_name))?;
        let result = algorithm.take_result().ok_or_else(|| {
            CopacError::fatal_state(format!(
                "{} produced no result for partition {partition}",
                self.algorithm_name
            ))
        })?;

        let mut expected = sub_dataset.ids().to_vec();
        expected.sort_unstable();
        if result.object_ids() != expected {
            bail!(CopacError::fatal_state(format!(
                "{} clustered {} objects of partition {partition}, which holds {}",
                self.algorithm_name,
                result.object_count(),
                expected.len()
            )));
        }

        self.observer.partition_finished(partition, &result);
        Ok(result)
    }
}

fn ensure_not_cancelled(token: &CancellationToken) -> anyhow::Result<()> {
    if token.is_cancelled() {
        bail!(CopacError::Cancelled);
    }
    Ok(())
}
