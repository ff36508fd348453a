use std::collections::BTreeMap;
use std::fmt::Display;

use ahash::AHashMap;
use anyhow::bail;
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

use crate::error::CopacError;
use crate::utils::ObjectId;

/// A set of equally sized real vectors, each addressed by a unique object id.
///
/// Rows of `data` hold the vectors in the order of `ids`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    ids: Vec<ObjectId>,
    data: Array2<f64>,
    index: AHashMap<ObjectId, usize>,
}

impl Dataset {
    pub fn new(ids: Vec<ObjectId>, data: Array2<f64>) -> anyhow::Result<Self> {
        if data.ncols() == 0 {
            bail!(CopacError::parameter("dataset dimensionality must be at least 1"));
        }
        if ids.len() != data.nrows() {
            bail!(CopacError::parameter(format!(
                "number of ids ({}) does not match number of rows ({})",
                ids.len(),
                data.nrows()
            )));
        }

        let mut index = AHashMap::with_capacity(ids.len());
        for (row, &id) in ids.iter().enumerate() {
            if index.insert(id, row).is_some() {
                bail!(CopacError::parameter(format!("duplicate object id {id}")));
            }
        }

        Ok(Dataset { ids, data, index })
    }

    /// Builds a dataset with ids `0..rows.len()`.
    pub fn from_rows(rows: &[Vec<f64>]) -> anyhow::Result<Self> {
        let Some(first) = rows.first() else {
            bail!(CopacError::parameter(
                "cannot infer dimensionality from an empty row set"
            ));
        };
        let dim = first.len();
        if let Some(pos) = rows.iter().position(|r| r.len() != dim) {
            bail!(CopacError::parameter(format!(
                "row {pos} has length {}, expected {dim}",
                rows[pos].len()
            )));
        }

        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        let data = Array2::from_shape_vec((rows.len(), dim), flat)?;
        Self::new((0..rows.len()).collect(), data)
    }

    pub fn dimensionality(&self) -> usize {
        self.data.ncols()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[ObjectId] {
        &self.ids
    }

    pub fn data(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn vector(&self, id: ObjectId) -> Option<ArrayView1<'_, f64>> {
        self.index.get(&id).map(|&row| self.data.row(row))
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, ArrayView1<'_, f64>)> + '_ {
        self.ids.iter().copied().zip(self.data.rows())
    }

    /// Copies the vectors of `ids` into a matrix, one row per id in the given order.
    pub fn select(&self, ids: &[ObjectId]) -> anyhow::Result<Array2<f64>> {
        let rows = self.rows_of(ids)?;
        Ok(self.data.select(Axis(0), &rows))
    }

    /// Standalone dataset holding only `ids`, which keep their original values.
    pub fn subset(&self, ids: &[ObjectId]) -> anyhow::Result<Dataset> {
        let data = self.select(ids)?;
        Dataset::new(ids.to_vec(), data)
    }

    /// Materializes one sub-dataset per group.
    ///
    /// Every object must appear in exactly one group; anything else means the
    /// grouping was built inconsistently and is reported as a fatal state.
    pub fn partition<K>(&self, groups: &BTreeMap<K, Vec<ObjectId>>) -> anyhow::Result<BTreeMap<K, Dataset>>
    where
        K: Ord + Copy + Display,
    {
        let mut seen = AHashMap::with_capacity(self.len());
        let mut partitions = BTreeMap::new();

        for (&key, ids) in groups {
            for &id in ids {
                if !self.contains(id) {
                    bail!(CopacError::fatal_state(format!(
                        "partition {key} references unknown object {id}"
                    )));
                }
                if let Some(other) = seen.insert(id, key) {
                    bail!(CopacError::fatal_state(format!(
                        "object {id} assigned to partitions {other} and {key}"
                    )));
                }
            }
            partitions.insert(key, self.subset(ids)?);
        }

        if seen.len() != self.len() {
            bail!(CopacError::fatal_state(format!(
                "{} of {} objects were not assigned to any partition",
                self.len() - seen.len(),
                self.len()
            )));
        }

        Ok(partitions)
    }

    fn rows_of(&self, ids: &[ObjectId]) -> anyhow::Result<Vec<usize>> {
        ids.iter()
            .map(|id| {
                self.index
                    .get(id)
                    .copied()
                    .ok_or_else(|| anyhow::Error::from(CopacError::parameter(format!("unknown object id {id}"))))
            })
            .collect()
    }
}
