//! Per document type indexing: where partitions come from, how documents
//! are built and where they are written.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use tracing::{debug, instrument};

use crate::builder::{
    BatchDocumentBuilder, CategoryDocumentBuilder, ContextLoader, DocumentBuilder,
    EmptyContextLoader, OutlineDocumentBuilder, PriceContextLoader, PriceDocumentBuilder,
    ProductDocumentBuilder, PropertyDocumentBuilder, SnapshotDocumentBuilder,
    UserGroupsDocumentBuilder,
};
use crate::errors::{BuildError, PipelineError};
use crate::operations::{
    ChangeAggregator, ChangeLogOperationProvider, OperationProvider, PriceLookupConfig,
    ProductPriceOperationProvider,
};
use crate::partitioner::{partition_operations, FullRebuildPartitioner, PartitionPlan};
use crate::publisher::{IndexPublisher, PublishSummary};
use crate::retry::RetryPolicy;
use catalog_search_repository::{ChangeLogSource, EntityStore, PricingStore};
use catalog_search_shared::{
    CatalogEntity, CatalogProduct, Category, IndexDocument, OperationKind, Partition,
    ResponseGroup, CATALOG_ITEM_DOCUMENT_TYPE, CATEGORY_DOCUMENT_TYPE,
};

/// Configuration shared by the index builders.
#[derive(Debug, Clone)]
pub struct IndexingConfig {
    /// Maximum number of object ids per partition.
    pub partition_size: usize,
    /// Store pages fetched concurrently during a full rebuild.
    pub full_rebuild_parallelism: usize,
    /// Retry policy for store page fetches and entity loads.
    pub retry: RetryPolicy,
    /// Paging of price lookups for price change translation.
    pub price_lookup: PriceLookupConfig,
    /// Whether to store the serialized entity in `__object`.
    pub store_snapshots: bool,
    /// Whether category documents carry `usergroups`.
    pub index_user_groups: bool,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            partition_size: 500,
            full_rebuild_parallelism: 5,
            retry: RetryPolicy::default(),
            price_lookup: PriceLookupConfig::default(),
            store_snapshots: false,
            index_user_groups: true,
        }
    }
}

/// The time window of one indexing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexingWindow {
    pub rebuild: bool,
    /// Watermark of the previous run.
    pub start: Option<DateTime<Utc>>,
    pub end: DateTime<Utc>,
}

impl IndexingWindow {
    pub fn is_full_rebuild(&self) -> bool {
        self.rebuild || self.start.is_none()
    }
}

/// Documents built for one partition.
#[derive(Debug, Default)]
pub struct BuildOutcome {
    pub documents: Vec<IndexDocument>,
    /// Entities vetoed by a builder.
    pub vetoed: usize,
    /// Entities that failed to build.
    pub failures: Vec<BuildError>,
    /// Ids the store no longer knows.
    pub missing: usize,
}

/// Indexing of one document type.
#[async_trait]
pub trait SearchIndexBuilder: Send + Sync {
    fn document_type(&self) -> &str;

    /// Partitions to process for `window`.
    async fn partitions(&self, window: &IndexingWindow) -> Result<PartitionPlan, PipelineError>;

    /// Load the entities of an `Index` partition and build their documents.
    async fn build_documents(&self, partition: &Partition) -> Result<BuildOutcome, PipelineError>;

    async fn publish(
        &self,
        scope: &str,
        documents: &[IndexDocument],
    ) -> Result<PublishSummary, PipelineError>;

    async fn remove(&self, scope: &str, ids: &[String]) -> Result<usize, PipelineError>;

    async fn remove_all(&self, scope: &str) -> Result<(), PipelineError>;
}

/// Index builder over one kind of catalog entity.
pub struct EntityIndexBuilder<T: Send + Sync> {
    document_type: String,
    store: Arc<dyn EntityStore<T>>,
    response_group: ResponseGroup,
    context_loader: Arc<dyn ContextLoader<T>>,
    builder: BatchDocumentBuilder<T>,
    providers: Vec<Arc<dyn OperationProvider>>,
    publisher: Arc<IndexPublisher>,
    config: IndexingConfig,
}

impl<T: CatalogEntity + Send + Sync + 'static> EntityIndexBuilder<T> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        document_type: impl Into<String>,
        store: Arc<dyn EntityStore<T>>,
        response_group: ResponseGroup,
        context_loader: Arc<dyn ContextLoader<T>>,
        builders: Vec<Arc<dyn DocumentBuilder<T>>>,
        providers: Vec<Arc<dyn OperationProvider>>,
        publisher: Arc<IndexPublisher>,
        config: IndexingConfig,
    ) -> Self {
        Self {
            document_type: document_type.into(),
            store,
            response_group,
            context_loader,
            builder: BatchDocumentBuilder::new(builders),
            providers,
            publisher,
            config,
        }
    }

    async fn changed_partitions(
        &self,
        start: Option<DateTime<Utc>>,
        end: DateTime<Utc>,
    ) -> Result<PartitionPlan, PipelineError> {
        let batches = try_join_all(
            self.providers
                .iter()
                .map(|provider| provider.get_operations(start, end)),
        )
        .await?;
        let operations = ChangeAggregator::resolve(batches.into_iter().flatten());

        debug!(operations = operations.len(), "Resolved changes");
        Ok(PartitionPlan::from_partitions(partition_operations(
            &operations,
            self.config.partition_size,
        )?))
    }
}

impl EntityIndexBuilder<CatalogProduct> {
    /// Index builder for `catalogitem` documents.
    pub fn products(
        store: Arc<dyn EntityStore<CatalogProduct>>,
        pricing: Arc<dyn PricingStore>,
        change_log: Arc<dyn ChangeLogSource>,
        publisher: Arc<IndexPublisher>,
        config: IndexingConfig,
    ) -> Self {
        let mut builders: Vec<Arc<dyn DocumentBuilder<CatalogProduct>>> = vec![
            Arc::new(ProductDocumentBuilder),
            Arc::new(OutlineDocumentBuilder::new()),
            Arc::new(PropertyDocumentBuilder::new()),
            Arc::new(PriceDocumentBuilder),
        ];
        if config.store_snapshots {
            builders.push(Arc::new(SnapshotDocumentBuilder::new()));
        }

        let providers: Vec<Arc<dyn OperationProvider>> = vec![
            Arc::new(ChangeLogOperationProvider::products(change_log.clone())),
            Arc::new(ProductPriceOperationProvider::with_config(
                change_log,
                pricing.clone(),
                config.price_lookup.clone(),
            )),
        ];

        Self::new(
            CATALOG_ITEM_DOCUMENT_TYPE,
            store,
            ResponseGroup::FULL,
            Arc::new(PriceContextLoader::with_config(
                pricing,
                config.price_lookup.clone(),
            )),
            builders,
            providers,
            publisher,
            config,
        )
    }
}

impl EntityIndexBuilder<Category> {
    /// Index builder for `category` documents.
    pub fn categories(
        store: Arc<dyn EntityStore<Category>>,
        change_log: Arc<dyn ChangeLogSource>,
        publisher: Arc<IndexPublisher>,
        config: IndexingConfig,
    ) -> Self {
        let mut builders: Vec<Arc<dyn DocumentBuilder<Category>>> = vec![
            Arc::new(CategoryDocumentBuilder),
            Arc::new(OutlineDocumentBuilder::new()),
            Arc::new(PropertyDocumentBuilder::new()),
        ];
        if config.index_user_groups {
            builders.push(Arc::new(UserGroupsDocumentBuilder));
        }
        if config.store_snapshots {
            builders.push(Arc::new(SnapshotDocumentBuilder::new()));
        }

        Self::new(
            CATEGORY_DOCUMENT_TYPE,
            store,
            ResponseGroup::FULL,
            Arc::new(EmptyContextLoader),
            builders,
            vec![Arc::new(ChangeLogOperationProvider::categories(change_log))],
            publisher,
            config,
        )
    }
}

#[async_trait]
impl<T: CatalogEntity + Send + Sync + 'static> SearchIndexBuilder for EntityIndexBuilder<T> {
    fn document_type(&self) -> &str {
        &self.document_type
    }

    #[instrument(skip(self), fields(document_type = %self.document_type))]
    async fn partitions(&self, window: &IndexingWindow) -> Result<PartitionPlan, PipelineError> {
        if window.is_full_rebuild() {
            FullRebuildPartitioner::new(
                self.store.clone(),
                self.config.partition_size,
                self.config.full_rebuild_parallelism,
                self.config.retry.clone(),
            )
            .plan()
            .await
        } else {
            self.changed_partitions(window.start, window.end).await
        }
    }

    #[instrument(skip(self, partition), fields(document_type = %self.document_type, size = partition.len()))]
    async fn build_documents(&self, partition: &Partition) -> Result<BuildOutcome, PipelineError> {
        if partition.kind() != OperationKind::Index {
            return Ok(BuildOutcome::default());
        }

        let ids = partition.object_ids();
        let loaded = self
            .config
            .retry
            .run("load entities", || {
                self.store.get_by_ids(ids, self.response_group, None)
            })
            .await?;

        // Store order is unspecified; rebuild partition order.
        let mut by_id: HashMap<String, T> = loaded
            .into_iter()
            .map(|entity| (entity.id().to_string(), entity))
            .collect();
        let entities: Vec<T> = ids.iter().filter_map(|id| by_id.remove(id)).collect();
        let missing = ids.len() - entities.len();
        if missing > 0 {
            debug!(missing = missing, "Entities not found in store");
        }

        let context = self.context_loader.load(&entities).await?;
        let batch = self.builder.build(&entities, &context);

        Ok(BuildOutcome {
            documents: batch.documents,
            vetoed: batch.vetoed,
            failures: batch.failures,
            missing,
        })
    }

    async fn publish(
        &self,
        scope: &str,
        documents: &[IndexDocument],
    ) -> Result<PublishSummary, PipelineError> {
        self.publisher
            .publish(scope, &self.document_type, documents)
            .await
    }

    async fn remove(&self, scope: &str, ids: &[String]) -> Result<usize, PipelineError> {
        self.publisher.remove(scope, &self.document_type, ids).await
    }

    async fn remove_all(&self, scope: &str) -> Result<(), PipelineError> {
        self.publisher.remove_all(scope, &self.document_type).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_search_repository::{InMemorySearchProvider, StoreError, StorePage, StoreQuery};
    use catalog_search_shared::{ChangeKind, ChangeRecord, Outline};
    use catalog_search_repository::EntityKind;
    use chrono::Duration;

    struct CategoryStore(Vec<Category>);

    #[async_trait]
    impl EntityStore<Category> for CategoryStore {
        async fn get_by_ids(
            &self,
            ids: &[String],
            _response_group: ResponseGroup,
            _catalog: Option<&str>,
        ) -> Result<Vec<Category>, StoreError> {
            // Reverse to check that partition order is restored.
            Ok(self
                .0
                .iter()
                .rev()
                .filter(|c| ids.contains(&c.id))
                .cloned()
                .collect())
        }

        async fn search(&self, query: &StoreQuery) -> Result<StorePage, StoreError> {
            let ids: Vec<String> = self.0.iter().map(|c| c.id.clone()).collect();
            Ok(StorePage {
                ids: ids.into_iter().skip(query.skip).take(query.take).collect(),
                total_count: self.0.len() as u64,
            })
        }
    }

    struct Changes(Vec<ChangeRecord>);

    #[async_trait]
    impl ChangeLogSource for Changes {
        async fn find_change_history(
            &self,
            kind: EntityKind,
            _start: Option<DateTime<Utc>>,
            _end: DateTime<Utc>,
        ) -> Result<Vec<ChangeRecord>, StoreError> {
            assert_eq!(kind, EntityKind::Category);
            Ok(self.0.clone())
        }
    }

    fn category(id: &str, active: bool) -> Category {
        Category {
            id: id.into(),
            code: id.into(),
            name: id.to_uppercase(),
            catalog_id: "goods".into(),
            parent_id: None,
            is_active: Some(active),
            priority: 0,
            created_date: Utc::now(),
            modified_date: None,
            outlines: vec![Outline::from_path(&format!("goods/{}", id))],
            links: vec![],
            property_values: vec![],
            parents: vec![],
        }
    }

    fn builder(changes: Vec<ChangeRecord>) -> EntityIndexBuilder<Category> {
        let store = Arc::new(CategoryStore(vec![
            category("c1", true),
            category("c2", false),
            category("c3", true),
        ]));
        let publisher = Arc::new(IndexPublisher::new(Arc::new(InMemorySearchProvider::new())));
        EntityIndexBuilder::categories(
            store,
            Arc::new(Changes(changes)),
            publisher,
            IndexingConfig {
                partition_size: 2,
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_full_rebuild_without_watermark() {
        let builder = builder(vec![]);
        let window = IndexingWindow {
            rebuild: false,
            start: None,
            end: Utc::now(),
        };

        let plan = builder.partitions(&window).await.unwrap();

        assert_eq!(builder.document_type(), "category");
        assert_eq!(plan.partitions.len(), 2);
        assert!(plan
            .partitions
            .iter()
            .all(|p| p.kind() == OperationKind::Index));
    }

    #[tokio::test]
    async fn test_incremental_partitions_put_removals_first() {
        let t0 = Utc::now() - Duration::hours(1);
        let builder = builder(vec![
            ChangeRecord::new("c1", t0, ChangeKind::Modified),
            ChangeRecord::new("c9", t0, ChangeKind::Deleted),
        ]);
        let window = IndexingWindow {
            rebuild: false,
            start: Some(t0 - Duration::minutes(1)),
            end: Utc::now(),
        };

        let plan = builder.partitions(&window).await.unwrap();

        assert_eq!(plan.partitions.len(), 2);
        assert_eq!(plan.partitions[0].kind(), OperationKind::Remove);
        assert_eq!(plan.partitions[0].object_ids(), ["c9".to_string()]);
        assert_eq!(plan.partitions[1].object_ids(), ["c1".to_string()]);
    }

    #[tokio::test]
    async fn test_build_keeps_partition_order_and_counts_missing() {
        let builder = builder(vec![]);
        let partition = Partition::new(
            OperationKind::Index,
            vec!["c3".into(), "gone".into(), "c1".into(), "c2".into()],
        )
        .unwrap();

        let outcome = builder.build_documents(&partition).await.unwrap();

        let ids: Vec<&str> = outcome.documents.iter().map(|d| d.id()).collect();
        assert_eq!(ids, vec!["c3", "c1", "c2"]);
        assert_eq!(outcome.missing, 1);
        assert!(outcome.failures.is_empty());
    }
}
