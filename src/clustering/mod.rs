//! # Partition Clustering Algorithms
//!
//! The orchestrator treats the clustering run on each partition as a black
//! box: anything implementing [`Clustering`] can be plugged in, either
//! directly as a factory or by name through a [`ClusteringRegistry`].

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::bail;

use crate::dense::Dataset;
use crate::error::CopacError;
use crate::similarity::{CosineSimilarity, EuclideanSimilarity};
use crate::utils::ObjectId;

mod components;
mod trivial;

pub use components::{
    similarity_graph, SimilarityComponents, DEFAULT_COSINE_THRESHOLD, DEFAULT_SIMILARITY_THRESHOLD,
};
pub use trivial::TrivialAllInOne;

/// A clustering algorithm that can be run on a partition.
pub trait Clustering: Send {
    fn name(&self) -> &str;

    fn run(&mut self, dataset: &Dataset) -> anyhow::Result<()>;

    /// Result of the last `run`, handed out once.
    fn take_result(&mut self) -> Option<ClusteringResult>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    ids: Vec<ObjectId>,
}

impl Cluster {
    pub fn new(ids: Vec<ObjectId>) -> Self {
        Cluster { ids }
    }

    pub fn ids(&self) -> &[ObjectId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClusteringResult {
    clusters: Vec<Cluster>,
}

impl ClusteringResult {
    pub fn new(clusters: Vec<Cluster>) -> Self {
        ClusteringResult { clusters }
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn object_count(&self) -> usize {
        self.clusters.iter().map(Cluster::len).sum()
    }

    /// All clustered ids in ascending order.
    pub fn object_ids(&self) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = self.clusters.iter().flat_map(|c| c.ids.iter().copied()).collect();
        ids.sort_unstable();
        ids
    }
}

pub type ClusteringFactory = Arc<dyn Fn() -> Box<dyn Clustering> + Send + Sync>;

/// Clustering algorithms selectable by name.
#[derive(Clone, Default)]
pub struct ClusteringRegistry {
    factories: BTreeMap<String, ClusteringFactory>,
}

impl ClusteringRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `"trivial-all-in-one"`, `"similarity-components"` and
    /// `"cosine-components"`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(TrivialAllInOne::NAME, || Box::new(TrivialAllInOne::new()));
        registry.register(SimilarityComponents::<EuclideanSimilarity>::NAME, || {
            Box::new(SimilarityComponents::new(
                EuclideanSimilarity::default(),
                DEFAULT_SIMILARITY_THRESHOLD,
            ))
        });
        registry.register(SimilarityComponents::<CosineSimilarity>::COSINE_NAME, || {
            Box::new(
                SimilarityComponents::new(CosineSimilarity, DEFAULT_COSINE_THRESHOLD)
                    .with_name(SimilarityComponents::<CosineSimilarity>::COSINE_NAME),
            )
        });
        registry
    }

    /// Adds or replaces the factory registered under `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Clustering> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    pub fn resolve(&self, name: &str) -> anyhow::Result<ClusteringFactory> {
        match self.factories.get(name) {
            Some(factory) => Ok(Arc::clone(factory)),
            None => bail!(CopacError::parameter(format!(
                "unknown partition algorithm '{name}', expected one of: {}",
                self.names().join(", ")
            ))),
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for ClusteringRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusteringRegistry")
            .field("algorithms", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::copac_error;

    #[test]
    fn test_registry_defaults() {
        let registry = ClusteringRegistry::with_defaults();
        assert_eq!(
            registry.names(),
            vec!["cosine-components", "similarity-components", "trivial-all-in-one"]
        );

        let factory = registry.resolve("trivial-all-in-one").unwrap();
        let algorithm = factory();
        assert_eq!(algorithm.name(), "trivial-all-in-one");

        let cosine = registry.resolve("cosine-components").unwrap()();
        assert_eq!(cosine.name(), "cosine-components");
    }

    #[test]
    fn test_registry_unknown_name() {
        let err = ClusteringRegistry::with_defaults().resolve("dbscan").err().unwrap();
        assert!(copac_error(&err).unwrap().is_parameter());
        assert!(err.to_string().contains("trivial-all-in-one"));
    }

    #[test]
    fn test_registry_custom_algorithm() {
        let mut registry = ClusteringRegistry::new();
        registry.register("everything", || Box::new(TrivialAllInOne::new()));
        assert!(registry.resolve("everything").is_ok());
        assert!(registry.resolve("trivial-all-in-one").is_err());
    }

    #[test]
    fn test_result_accessors() {
        let result = ClusteringResult::new(vec![Cluster::new(vec![4, 1]), Cluster::new(vec![3])]);
        assert_eq!(result.len(), 2);
        assert_eq!(result.object_count(), 3);
        assert_eq!(result.object_ids(), vec![1, 3, 4]);
    }
}
