use std::collections::BTreeMap;

use anyhow::bail;

use crate::clustering::ClusteringResult;
use crate::dense::Dataset;
use crate::error::CopacError;
use crate::utils::ObjectId;

/// Object ids grouped by correlation dimension.
///
/// Ids inside a partition keep the order in which they were assigned.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PartitionMap {
    partitions: BTreeMap<usize, Vec<ObjectId>>,
}

impl PartitionMap {
    /// Groups `(id, dimension)` assignments by dimension.
    pub fn from_assignments(assignments: impl IntoIterator<Item = (ObjectId, usize)>) -> Self {
        let mut partitions: BTreeMap<usize, Vec<ObjectId>> = BTreeMap::new();
        for (id, dimension) in assignments {
            partitions.entry(dimension).or_default().push(id);
        }
        PartitionMap { partitions }
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    pub fn get(&self, partition: usize) -> Option<&[ObjectId]> {
        self.partitions.get(&partition).map(Vec::as_slice)
    }

    /// Partition ids in ascending order.
    pub fn partition_ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.partitions.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &[ObjectId])> + '_ {
        self.partitions.iter().map(|(&k, v)| (k, v.as_slice()))
    }

    pub fn object_count(&self) -> usize {
        self.partitions.values().map(Vec::len).sum()
    }

    pub fn as_map(&self) -> &BTreeMap<usize, Vec<ObjectId>> {
        &self.partitions
    }

    /// Fails with a fatal state unless every object of `dataset` is in exactly one partition.
    pub fn ensure_covers(&self, dataset: &Dataset) -> anyhow::Result<()> {
        let mut assigned: Vec<ObjectId> = self.partitions.values().flatten().copied().collect();
        assigned.sort_unstable();
        let mut expected = dataset.ids().to_vec();
        expected.sort_unstable();
        if assigned != expected {
            bail!(CopacError::fatal_state(format!(
                "partition map holds {} assignments for {} objects",
                assigned.len(),
                expected.len()
            )));
        }
        Ok(())
    }
}

/// Per-partition clustering results together with the ambient dimensionality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionClusteringResult {
    results: BTreeMap<usize, ClusteringResult>,
    dimensionality: usize,
}

impl PartitionClusteringResult {
    pub fn new(results: BTreeMap<usize, ClusteringResult>, dimensionality: usize) -> Self {
        PartitionClusteringResult {
            results,
            dimensionality,
        }
    }

    pub fn dimensionality(&self) -> usize {
        self.dimensionality
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn get(&self, partition: usize) -> Option<&ClusteringResult> {
        self.results.get(&partition)
    }

    pub fn partition_ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.results.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &ClusteringResult)> + '_ {
        self.results.iter().map(|(&k, v)| (k, v))
    }

    /// Total number of clusters over all partitions.
    pub fn cluster_count(&self) -> usize {
        self.results.values().map(ClusteringResult::len).sum()
    }

    pub fn into_results(self) -> BTreeMap<usize, ClusteringResult> {
        self.results
    }
}
