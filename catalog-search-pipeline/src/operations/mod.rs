//! Operation log readers and the change aggregator.
//!
//! Providers turn raw change history into operations on index documents.
//! The aggregator merges the output of several providers into exactly one
//! operation per object.

mod change_log;
mod price;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::PipelineError;
use catalog_search_shared::Operation;

pub use change_log::ChangeLogOperationProvider;
pub use price::{PriceLookupConfig, ProductPriceOperationProvider};

/// Source of index operations for a time window.
#[async_trait]
pub trait OperationProvider: Send + Sync {
    /// Operations recorded in `(start, end]`, at most one per object.
    ///
    /// # Arguments
    ///
    /// * `start` - Watermark of the previous run; `None` reads all history
    /// * `end` - Upper bound of the window
    async fn get_operations(
        &self,
        start: Option<DateTime<Utc>>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Operation>, PipelineError>;
}

/// Merges operation lists into one resolved operation per object id.
pub struct ChangeAggregator;

impl ChangeAggregator {
    /// Resolve operations. The latest timestamp wins and `Remove` wins ties.
    /// Output follows the first-seen order of object ids.
    pub fn resolve(operations: impl IntoIterator<Item = Operation>) -> Vec<Operation> {
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut resolved: Vec<Operation> = Vec::new();

        for operation in operations {
            match positions.get(&operation.object_id) {
                Some(&index) => {
                    if operation.supersedes(&resolved[index]) {
                        resolved[index] = operation;
                    }
                }
                None => {
                    positions.insert(operation.object_id.clone(), resolved.len());
                    resolved.push(operation);
                }
            }
        }

        resolved
    }
}
