use super::{Cluster, Clustering, ClusteringResult};
use crate::dense::Dataset;

/// Puts every object of the dataset into a single cluster.
#[derive(Debug, Clone, Default)]
pub struct TrivialAllInOne {
    result: Option<ClusteringResult>,
}

impl TrivialAllInOne {
    pub const NAME: &'static str = "trivial-all-in-one";

    pub fn new() -> Self {
        Self::default()
    }
}

impl Clustering for TrivialAllInOne {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn run(&mut self, dataset: &Dataset) -> anyhow::Result<()> {
        let clusters = if dataset.is_empty() {
            Vec::new()
        } else {
            vec![Cluster::new(dataset.ids().to_vec())]
        };
        self.result = Some(ClusteringResult::new(clusters));
        Ok(())
    }

    fn take_result(&mut self) -> Option<ClusteringResult> {
        self.result.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_single_cluster() {
        let ds = Dataset::new(vec![7, 3], array![[0.0], [100.0]]).unwrap();
        let mut algorithm = TrivialAllInOne::new();
        assert!(algorithm.take_result().is_none());

        algorithm.run(&ds).unwrap();
        let result = algorithm.take_result().unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.clusters()[0].ids(), &[7, 3]);
        assert!(algorithm.take_result().is_none());
    }
}
