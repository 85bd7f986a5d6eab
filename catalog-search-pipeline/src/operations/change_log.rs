use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use super::{ChangeAggregator, OperationProvider};
use crate::errors::PipelineError;
use catalog_search_repository::{ChangeLogSource, EntityKind};
use catalog_search_shared::Operation;

/// Reads the change history of one entity kind and reduces it to the
/// latest operation per object.
pub struct ChangeLogOperationProvider {
    source: Arc<dyn ChangeLogSource>,
    kind: EntityKind,
}

impl ChangeLogOperationProvider {
    pub fn new(source: Arc<dyn ChangeLogSource>, kind: EntityKind) -> Self {
        Self { source, kind }
    }

    pub fn products(source: Arc<dyn ChangeLogSource>) -> Self {
        Self::new(source, EntityKind::Product)
    }

    pub fn categories(source: Arc<dyn ChangeLogSource>) -> Self {
        Self::new(source, EntityKind::Category)
    }
}

#[async_trait]
impl OperationProvider for ChangeLogOperationProvider {
    #[instrument(skip(self), fields(kind = self.kind.as_str()))]
    async fn get_operations(
        &self,
        start: Option<DateTime<Utc>>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Operation>, PipelineError> {
        let records = self.source.find_change_history(self.kind, start, end).await?;
        let operations = ChangeAggregator::resolve(records.iter().map(|r| r.to_operation()));

        debug!(
            records = records.len(),
            operations = operations.len(),
            "Read change history"
        );
        Ok(operations)
    }
}
