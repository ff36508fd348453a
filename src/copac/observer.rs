use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info, trace};

use super::partition::PartitionMap;
use crate::clustering::ClusteringResult;
use crate::utils::ObjectId;

/// Receives progress checkpoints of a partitioning run.
///
/// All methods default to doing nothing. With parallel execution enabled,
/// `dimension_computed` and the partition callbacks may be invoked from
/// several threads at once.
pub trait PipelineObserver: Send + Sync {
    fn dimension_computed(&self, _id: ObjectId, _dimension: usize) {}

    fn partitions_built(&self, _partitions: &PartitionMap) {}

    fn partition_started(&self, _partition: usize, _size: usize, _algorithm: &str) {}

    fn partition_finished(&self, _partition: usize, _result: &ClusteringResult) {}
}

/// Forwards checkpoints to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl PipelineObserver for LogObserver {
    fn dimension_computed(&self, id: ObjectId, dimension: usize) {
        trace!("object {id}: correlation dimension {dimension}");
    }

    fn partitions_built(&self, partitions: &PartitionMap) {
        info!(
            "partitioned {} objects into {} correlation dimensions",
            partitions.object_count(),
            partitions.len()
        );
        for (dimension, ids) in partitions.iter() {
            debug!("partition {dimension}: {} objects", ids.len());
        }
    }

    fn partition_started(&self, partition: usize, size: usize, algorithm: &str) {
        info!("running {algorithm} on partition {partition} ({size} objects)");
    }

    fn partition_finished(&self, partition: usize, result: &ClusteringResult) {
        debug!("partition {partition}: {} clusters", result.len());
    }
}

/// Discards all checkpoints.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// Shared flag used to abort a run from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_is_shared() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
