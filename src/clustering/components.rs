use nalgebra_sparse::{CooMatrix, CsrMatrix};
use petgraph::unionfind::UnionFind;
use rayon::prelude::*;

use super::{Cluster, Clustering, ClusteringResult};
use crate::dense::Dataset;
use crate::similarity::SimilarityMeasure;

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.5;
pub const DEFAULT_COSINE_THRESHOLD: f64 = 0.9;

/// Sparse similarity graph over the rows of `dataset`.
///
/// Holds an upper-triangular entry `(i, j, sim)` for each row pair `i < j`
/// whose similarity exceeds `threshold`. Indices are row positions, not ids.
pub fn similarity_graph<S>(dataset: &Dataset, similarity: &S, threshold: f64) -> anyhow::Result<CsrMatrix<f64>>
where
    S: SimilarityMeasure,
{
    let n = dataset.len();
    let data = dataset.data();

    let triplets: Vec<(usize, usize, f64)> = (0..n)
        .into_par_iter()
        .flat_map_iter(|i| {
            let row_i = data.row(i);
            ((i + 1)..n).filter_map(move |j| {
                let sim = similarity.calculate(row_i, data.row(j));
                (sim > threshold).then_some((i, j, sim))
            })
        })
        .collect();

    let coo = CooMatrix::try_from_triplets(
        n,
        n,
        triplets.iter().map(|&(i, _, _)| i).collect(),
        triplets.iter().map(|&(_, j, _)| j).collect(),
        triplets.iter().map(|&(_, _, v)| v).collect(),
    )
    .map_err(|e| anyhow::anyhow!("Failed to create similarity matrix: {}", e))?;

    Ok(CsrMatrix::from(&coo))
}

/// Connected components of the similarity graph.
///
/// Clusters are listed in the order of their first member in the dataset.
#[derive(Debug, Clone)]
pub struct SimilarityComponents<S> {
    name: &'static str,
    similarity: S,
    threshold: f64,
    result: Option<ClusteringResult>,
}

impl<S> SimilarityComponents<S> {
    pub const NAME: &'static str = "similarity-components";
    pub const COSINE_NAME: &'static str = "cosine-components";

    pub fn new(similarity: S, threshold: f64) -> Self {
        SimilarityComponents {
            name: Self::NAME,
            similarity,
            threshold,
            result: None,
        }
    }

    /// Reports `name` instead of the default algorithm name.
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }
}

impl<S> Clustering for SimilarityComponents<S>
where
    S: SimilarityMeasure + 'static,
{
    fn name(&self) -> &str {
        self.name
    }

    fn run(&mut self, dataset: &Dataset) -> anyhow::Result<()> {
        let graph = similarity_graph(dataset, &self.similarity, self.threshold)?;

        let mut components = UnionFind::<usize>::new(dataset.len());
        for (i, j, _) in graph.triplet_iter() {
            components.union(i, j);
        }

        let mut slot_of_root = vec![usize::MAX; dataset.len()];
        let mut clusters: Vec<Vec<usize>> = Vec::new();
        for (row, &id) in dataset.ids().iter().enumerate() {
            let root = components.find(row);
            if slot_of_root[root] == usize::MAX {
                slot_of_root[root] = clusters.len();
                clusters.push(Vec::new());
            }
            clusters[slot_of_root[root]].push(id);
        }

        log::debug!(
            "{} found {} components among {} objects",
            self.name,
            clusters.len(),
            dataset.len()
        );
        self.result = Some(ClusteringResult::new(clusters.into_iter().map(Cluster::new).collect()));
        Ok(())
    }

    fn take_result(&mut self) -> Option<ClusteringResult> {
        self.result.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::{CosineSimilarity, EuclideanSimilarity};
    use ndarray::array;

    fn two_groups() -> Dataset {
        Dataset::new(
            vec![10, 11, 12, 20, 21],
            array![[0.0, 0.0], [0.1, 0.0], [0.2, 0.1], [5.0, 5.0], [5.1, 5.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_similarity_graph() {
        let graph = similarity_graph(&two_groups(), &EuclideanSimilarity::default(), 0.5).unwrap();
        assert_eq!(graph.nrows(), 5);
        for (i, j, &weight) in graph.triplet_iter() {
            assert!(i < j);
            assert!(weight > 0.5);
            // no edges between the groups
            assert_eq!(i < 3, j < 3);
        }
        assert_eq!(graph.nnz(), 4);
    }

    #[test]
    fn test_components() {
        let mut algorithm = SimilarityComponents::new(EuclideanSimilarity::default(), 0.5);
        algorithm.run(&two_groups()).unwrap();
        let result = algorithm.take_result().unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result.clusters()[0].ids(), &[10, 11, 12]);
        assert_eq!(result.clusters()[1].ids(), &[20, 21]);
    }

    #[test]
    fn test_singletons_without_edges() {
        let mut algorithm = SimilarityComponents::new(EuclideanSimilarity::default(), 0.99);
        algorithm.run(&two_groups()).unwrap();
        assert_eq!(algorithm.take_result().unwrap().len(), 5);
    }

    #[test]
    fn test_cosine_components_follow_directions() {
        let ds = Dataset::new(
            vec![0, 1, 2, 3, 4],
            array![[1.0, 0.0], [3.0, 0.1], [0.5, 0.02], [0.0, 2.0], [0.1, 5.0]],
        )
        .unwrap();
        let mut algorithm = SimilarityComponents::new(CosineSimilarity, DEFAULT_COSINE_THRESHOLD)
            .with_name(SimilarityComponents::<CosineSimilarity>::COSINE_NAME);
        assert_eq!(algorithm.name(), "cosine-components");

        algorithm.run(&ds).unwrap();
        let result = algorithm.take_result().unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result.clusters()[0].ids(), &[0, 1, 2]);
        assert_eq!(result.clusters()[1].ids(), &[3, 4]);
    }
}
