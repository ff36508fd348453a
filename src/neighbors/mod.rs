use std::fmt::Debug;

use anyhow::bail;
use ndarray::ArrayView1;

use crate::dense::Dataset;
use crate::error::CopacError;
use crate::utils::ObjectId;

/// One entry of a neighborhood query result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub distance: f64,
    pub id: ObjectId,
}

impl Neighbor {
    pub fn new(distance: f64, id: ObjectId) -> Self {
        Neighbor { distance, id }
    }
}

/// Determines the local window around an object.
pub trait NeighborhoodQuery: Debug + Send + Sync {
    /// Neighbors of `id`, closest first. The object itself may be included.
    fn neighbors(&self, dataset: &Dataset, id: ObjectId) -> anyhow::Result<Vec<Neighbor>>;
}

/// The `k` nearest objects under Euclidean distance, the query object included.
///
/// Without an explicit `k`, three times the dataset dimensionality is used.
/// Equal distances are ordered by id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KnnQuery {
    k: Option<usize>,
}

impl KnnQuery {
    pub fn new(k: usize) -> anyhow::Result<Self> {
        if k == 0 {
            bail!(CopacError::parameter("k must be at least 1"));
        }
        Ok(KnnQuery { k: Some(k) })
    }

    /// Neighborhood size used on `dataset`.
    pub fn k_for(&self, dataset: &Dataset) -> usize {
        self.k.unwrap_or(3 * dataset.dimensionality())
    }
}

impl NeighborhoodQuery for KnnQuery {
    fn neighbors(&self, dataset: &Dataset, id: ObjectId) -> anyhow::Result<Vec<Neighbor>> {
        let Some(query) = dataset.vector(id) else {
            bail!(CopacError::parameter(format!("unknown object id {id}")));
        };

        let mut neighbors: Vec<Neighbor> = dataset
            .iter()
            .map(|(other, vector)| Neighbor::new(euclidean_distance(query, vector), other))
            .collect();
        neighbors.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.id.cmp(&b.id)));
        neighbors.truncate(self.k_for(dataset));
        Ok(neighbors)
    }
}

pub fn euclidean_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn line() -> Dataset {
        Dataset::from_rows(&[vec![0.0], vec![1.0], vec![3.0], vec![-1.0], vec![10.0]]).unwrap()
    }

    #[test]
    fn test_knn_includes_query_object() {
        let ds = line();
        let result = KnnQuery::new(3).unwrap().neighbors(&ds, 0).unwrap();
        let ids: Vec<ObjectId> = result.iter().map(|n| n.id).collect();
        // 1 and 3 are both at distance 1, ordered by id
        assert_eq!(ids, vec![0, 1, 3]);
        assert_abs_diff_eq!(result[0].distance, 0.0);
        assert_abs_diff_eq!(result[2].distance, 1.0);
    }

    #[test]
    fn test_knn_default_k_and_overflow() {
        let ds = line();
        assert_eq!(KnnQuery::default().k_for(&ds), 3);

        let all = KnnQuery::new(50).unwrap().neighbors(&ds, 4).unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all.last().unwrap().id, 3);
    }

    #[test]
    fn test_knn_errors() {
        assert!(KnnQuery::new(0).is_err());
        assert!(KnnQuery::default().neighbors(&line(), 42).is_err());
    }
}
