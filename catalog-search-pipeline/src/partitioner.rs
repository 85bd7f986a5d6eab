//! Splits object ids into bounded partitions.
//!
//! Incremental runs partition the ids produced by the change aggregator.
//! Full rebuilds page through the entity store instead.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{info, instrument, warn};

use crate::errors::PipelineError;
use crate::retry::RetryPolicy;
use catalog_search_repository::{EntityStore, StoreError, StoreQuery};
use catalog_search_shared::{Operation, OperationKind, Partition};

/// Chunk ids into partitions of at most `max_size`, keeping their order.
pub fn partition(
    kind: OperationKind,
    object_ids: Vec<String>,
    max_size: usize,
) -> Result<Vec<Partition>, PipelineError> {
    if max_size == 0 {
        return Err(PipelineError::configuration("partition size must be positive"));
    }

    Ok(object_ids
        .chunks(max_size)
        .filter_map(|chunk| Partition::new(kind, chunk.to_vec()))
        .collect())
}

/// Partition resolved operations: removals first, then index operations.
pub fn partition_operations(
    operations: &[Operation],
    max_size: usize,
) -> Result<Vec<Partition>, PipelineError> {
    let ids_of = |kind: OperationKind| -> Vec<String> {
        operations
            .iter()
            .filter(|op| op.kind == kind)
            .map(|op| op.object_id.clone())
            .collect()
    };

    let mut partitions = partition(OperationKind::Remove, ids_of(OperationKind::Remove), max_size)?;
    partitions.extend(partition(OperationKind::Index, ids_of(OperationKind::Index), max_size)?);
    Ok(partitions)
}

/// A store page that could not be fetched.
#[derive(Debug, Clone)]
pub struct PartitionFailure {
    /// Zero-based page number.
    pub page: usize,
    pub error: StoreError,
}

/// Partitions of one run together with the pages that failed.
#[derive(Debug, Clone, Default)]
pub struct PartitionPlan {
    pub partitions: Vec<Partition>,
    pub failures: Vec<PartitionFailure>,
}

impl PartitionPlan {
    pub fn from_partitions(partitions: Vec<Partition>) -> Self {
        Self {
            partitions,
            failures: Vec::new(),
        }
    }
}

/// Pages through the whole entity store for a rebuild.
pub struct FullRebuildPartitioner<T: Send> {
    store: Arc<dyn EntityStore<T>>,
    partition_size: usize,
    parallelism: usize,
    retry: RetryPolicy,
}

impl<T: Send + 'static> FullRebuildPartitioner<T> {
    pub fn new(
        store: Arc<dyn EntityStore<T>>,
        partition_size: usize,
        parallelism: usize,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            partition_size,
            parallelism,
            retry,
        }
    }

    /// Build one `Index` partition per store page.
    ///
    /// A page that still fails after retries is reported in the plan and
    /// does not stop its siblings.
    #[instrument(skip(self), fields(partition_size = self.partition_size))]
    pub async fn plan(&self) -> Result<PartitionPlan, PipelineError> {
        if self.partition_size == 0 {
            return Err(PipelineError::configuration("partition size must be positive"));
        }

        let count_query = StoreQuery::count_only();
        let total = self
            .retry
            .run("count entities", || self.store.search(&count_query))
            .await?
            .total_count as usize;
        let pages = total.div_ceil(self.partition_size);

        let results: Vec<(usize, Result<Vec<String>, StoreError>)> = stream::iter(0..pages)
            .map(|page| async move {
                let query = StoreQuery::page(page * self.partition_size, self.partition_size);
                let result = self
                    .retry
                    .run("fetch page", || self.store.search(&query))
                    .await
                    .map(|page| page.ids);
                (page, result)
            })
            .buffered(self.parallelism.max(1))
            .collect()
            .await;

        let mut plan = PartitionPlan::default();
        for (page, result) in results {
            match result {
                Ok(ids) => plan
                    .partitions
                    .extend(Partition::new(OperationKind::Index, ids)),
                Err(error) => {
                    warn!(page = page, error = %error, "Failed to fetch page");
                    plan.failures.push(PartitionFailure { page, error });
                }
            }
        }

        info!(
            total = total,
            pages = pages,
            partitions = plan.partitions.len(),
            failures = plan.failures.len(),
            "Planned full rebuild"
        );
        Ok(plan)
    }
}
