//! Orchestrator module for the indexing pipeline.
//!
//! Runs the index builders of the requested document types over one time
//! window and reports what happened per document type.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::sync::watch;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::errors::PipelineError;
use crate::index_builder::{IndexingWindow, SearchIndexBuilder};
use catalog_search_shared::{OperationKind, Partition};

/// One indexing run.
#[derive(Debug, Clone)]
pub struct IndexingRequest {
    pub scope: String,
    /// Document types to index. Empty means all registered types.
    pub document_types: Vec<String>,
    /// Drop the existing documents and rebuild from the store.
    pub rebuild: bool,
    /// Watermark of the previous run.
    pub start: Option<DateTime<Utc>>,
    pub end: DateTime<Utc>,
}

impl IndexingRequest {
    /// Incremental run of all document types from `start` up to now.
    pub fn incremental(scope: impl Into<String>, start: Option<DateTime<Utc>>) -> Self {
        Self {
            scope: scope.into(),
            document_types: Vec::new(),
            rebuild: false,
            start,
            end: Utc::now(),
        }
    }

    /// Full rebuild of all document types.
    pub fn rebuild(scope: impl Into<String>) -> Self {
        Self {
            rebuild: true,
            ..Self::incremental(scope, None)
        }
    }

    fn window(&self) -> IndexingWindow {
        IndexingWindow {
            rebuild: self.rebuild,
            start: self.start,
            end: self.end,
        }
    }
}

/// Outcome of one document type within a run.
#[derive(Debug, Clone, Default)]
pub struct DocumentTypeReport {
    pub document_type: String,
    pub partitions_processed: usize,
    pub partitions_failed: usize,
    /// Store pages that could not be read during a full rebuild.
    pub pages_failed: usize,
    pub documents_indexed: usize,
    pub documents_failed: usize,
    pub documents_removed: usize,
    pub documents_vetoed: usize,
    pub build_failures: usize,
    pub cancelled: bool,
    /// Where the next incremental run should start. Only set when every
    /// partition of the window was processed and every document was accepted
    /// by the backend.
    pub watermark: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl DocumentTypeReport {
    fn new(document_type: &str) -> Self {
        Self {
            document_type: document_type.to_string(),
            ..Default::default()
        }
    }

    pub fn is_complete(&self) -> bool {
        self.watermark.is_some()
    }
}

/// Outcome of an indexing run.
#[derive(Debug, Clone)]
pub struct IndexingReport {
    pub run_id: Uuid,
    pub document_types: Vec<DocumentTypeReport>,
    pub cancelled: bool,
}

impl IndexingReport {
    pub fn get(&self, document_type: &str) -> Option<&DocumentTypeReport> {
        self.document_types
            .iter()
            .find(|r| r.document_type.eq_ignore_ascii_case(document_type))
    }
}

/// Coordinates index builders.
///
/// Document types are indexed concurrently; partitions of one document type
/// are processed in order. Cancellation is checked between partitions, so an
/// in-flight partition always finishes.
pub struct IndexingOrchestrator {
    builders: Vec<Arc<dyn SearchIndexBuilder>>,
    cancel_tx: watch::Sender<bool>,
}

impl IndexingOrchestrator {
    pub fn new(builders: Vec<Arc<dyn SearchIndexBuilder>>) -> Self {
        let (cancel_tx, _) = watch::channel(false);
        Self { builders, cancel_tx }
    }

    /// Ask running and future runs to stop after their current partition.
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    /// Allow runs again after a cancellation.
    pub fn reset(&self) {
        self.cancel_tx.send_replace(false);
    }

    fn is_cancelled(&self) -> bool {
        *self.cancel_tx.borrow()
    }

    /// Run the requested document types over the request window.
    ///
    /// Unknown document types are a configuration error. Failures of a
    /// single partition are recorded in the report and do not stop the run.
    pub async fn run(&self, request: IndexingRequest) -> Result<IndexingReport, PipelineError> {
        let builders = self.select(&request.document_types)?;
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "indexing_run",
            run_id = %run_id,
            scope = %request.scope,
            rebuild = request.rebuild
        );

        let report = async {
            info!(document_types = builders.len(), "Starting indexing run");

            let reports = join_all(
                builders
                    .iter()
                    .map(|builder| self.run_document_type(builder.as_ref(), &request)),
            )
            .await;
            let cancelled = reports.iter().any(|r| r.cancelled);

            info!(cancelled = cancelled, "Indexing run finished");
            IndexingReport {
                run_id,
                document_types: reports,
                cancelled,
            }
        }
        .instrument(span)
        .await;

        Ok(report)
    }

    fn select(&self, document_types: &[String]) -> Result<Vec<Arc<dyn SearchIndexBuilder>>, PipelineError> {
        if document_types.is_empty() {
            return Ok(self.builders.clone());
        }

        document_types
            .iter()
            .map(|requested| {
                self.builders
                    .iter()
                    .find(|b| b.document_type().eq_ignore_ascii_case(requested))
                    .cloned()
                    .ok_or_else(|| {
                        PipelineError::configuration(format!(
                            "no index builder for document type {}",
                            requested
                        ))
                    })
            })
            .collect()
    }

    async fn run_document_type(
        &self,
        builder: &dyn SearchIndexBuilder,
        request: &IndexingRequest,
    ) -> DocumentTypeReport {
        let document_type = builder.document_type();
        let mut report = DocumentTypeReport::new(document_type);

        if request.rebuild {
            if let Err(e) = builder.remove_all(&request.scope).await {
                error!(document_type = %document_type, error = %e, "Failed to clear index");
                report.error = Some(e.to_string());
                return report;
            }
        }

        let plan = match builder.partitions(&request.window()).await {
            Ok(plan) => plan,
            Err(e) => {
                error!(document_type = %document_type, error = %e, "Failed to plan partitions");
                report.error = Some(e.to_string());
                return report;
            }
        };
        report.pages_failed = plan.failures.len();

        info!(
            document_type = %document_type,
            partitions = plan.partitions.len(),
            "Processing partitions"
        );

        for partition in &plan.partitions {
            if self.is_cancelled() {
                warn!(document_type = %document_type, "Indexing cancelled");
                report.cancelled = true;
                break;
            }

            match self.process(builder, &request.scope, partition, &mut report).await {
                Ok(()) => report.partitions_processed += 1,
                Err(e) => {
                    error!(
                        document_type = %document_type,
                        kind = ?partition.kind(),
                        size = partition.len(),
                        error = %e,
                        "Failed to process partition"
                    );
                    report.partitions_failed += 1;
                }
            }
        }

        if !report.cancelled
            && report.partitions_failed == 0
            && report.pages_failed == 0
            && report.documents_failed == 0
        {
            report.watermark = Some(request.end);
        }

        info!(
            document_type = %document_type,
            indexed = report.documents_indexed,
            removed = report.documents_removed,
            failed_documents = report.documents_failed,
            failed_partitions = report.partitions_failed,
            "Document type finished"
        );
        report
    }

    async fn process(
        &self,
        builder: &dyn SearchIndexBuilder,
        scope: &str,
        partition: &Partition,
        report: &mut DocumentTypeReport,
    ) -> Result<(), PipelineError> {
        match partition.kind() {
            OperationKind::Remove => {
                report.documents_removed += builder.remove(scope, partition.object_ids()).await?;
            }
            OperationKind::Index => {
                let outcome = builder.build_documents(partition).await?;
                report.documents_vetoed += outcome.vetoed;
                report.build_failures += outcome.failures.len();

                let summary = builder.publish(scope, &outcome.documents).await?;
                report.documents_indexed += summary.indexed;
                report.documents_failed += summary.failed;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index_builder::BuildOutcome;
    use crate::partitioner::{PartitionFailure, PartitionPlan};
    use crate::publisher::{IndexPublisher, PublishSummary};
    use async_trait::async_trait;
    use catalog_search_repository::{SearchError, SearchProvider, StoreError};
    use catalog_search_shared::{IndexDocument, SearchCriteria, SearchResult};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    struct MockBuilder {
        document_type: &'static str,
        plan: Vec<Partition>,
        failing_page: bool,
        failing_partition: Option<usize>,
        built: AtomicUsize,
        cleared: AtomicUsize,
        removed: Mutex<Vec<String>>,
        cancel_after_first: Option<Arc<IndexingOrchestrator>>,
        publisher: Option<IndexPublisher>,
    }

    impl MockBuilder {
        fn new(document_type: &'static str, plan: Vec<Partition>) -> Self {
            Self {
                document_type,
                plan,
                failing_page: false,
                failing_partition: None,
                built: AtomicUsize::new(0),
                cleared: AtomicUsize::new(0),
                removed: Mutex::new(Vec::new()),
                cancel_after_first: None,
                publisher: None,
            }
        }
    }

    #[async_trait]
    impl SearchIndexBuilder for MockBuilder {
        fn document_type(&self) -> &str {
            self.document_type
        }

        async fn partitions(&self, _window: &IndexingWindow) -> Result<PartitionPlan, PipelineError> {
            let mut plan = PartitionPlan::from_partitions(self.plan.clone());
            if self.failing_page {
                plan.failures.push(PartitionFailure {
                    page: 3,
                    error: StoreError::connection("down"),
                });
            }
            Ok(plan)
        }

        async fn build_documents(&self, partition: &Partition) -> Result<BuildOutcome, PipelineError> {
            let call = self.built.fetch_add(1, Ordering::SeqCst);
            if let Some(orchestrator) = &self.cancel_after_first {
                orchestrator.cancel();
            }
            if Some(call) == self.failing_partition {
                return Err(PipelineError::Store(StoreError::query("bad page")));
            }
            Ok(BuildOutcome {
                documents: partition
                    .object_ids()
                    .iter()
                    .map(|id| IndexDocument::new(id.clone()))
                    .collect(),
                ..Default::default()
            })
        }

        async fn publish(
            &self,
            scope: &str,
            documents: &[IndexDocument],
        ) -> Result<PublishSummary, PipelineError> {
            if let Some(publisher) = &self.publisher {
                return publisher.publish(scope, self.document_type, documents).await;
            }
            Ok(PublishSummary {
                indexed: documents.len(),
                failed: 0,
            })
        }

        async fn remove(&self, _scope: &str, ids: &[String]) -> Result<usize, PipelineError> {
            self.removed.lock().await.extend(ids.iter().cloned());
            Ok(ids.len())
        }

        async fn remove_all(&self, _scope: &str) -> Result<(), PipelineError> {
            self.cleared.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Backend that refuses documents with one id and accepts the rest.
    struct RejectingProvider {
        rejected_id: &'static str,
        indexed: Mutex<Vec<String>>,
        commits: AtomicUsize,
    }

    #[async_trait]
    impl SearchProvider for RejectingProvider {
        async fn search(
            &self,
            _scope: &str,
            _criteria: &SearchCriteria,
        ) -> Result<SearchResult, SearchError> {
            Ok(SearchResult::default())
        }

        async fn index(
            &self,
            _scope: &str,
            _document_type: &str,
            document: &IndexDocument,
        ) -> Result<(), SearchError> {
            if document.id() == self.rejected_id {
                return Err(SearchError::index("document rejected"));
            }
            self.indexed.lock().await.push(document.id().to_string());
            Ok(())
        }

        async fn remove(
            &self,
            _scope: &str,
            _document_type: &str,
            _key_field: &str,
            _key_value: &str,
        ) -> Result<(), SearchError> {
            Ok(())
        }

        async fn remove_all(&self, _scope: &str, _document_type: &str) -> Result<(), SearchError> {
            Ok(())
        }

        async fn commit(&self, _scope: &str) -> Result<(), SearchError> {
            self.commits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn close(&self, _scope: &str, _document_type: &str) -> Result<(), SearchError> {
            Ok(())
        }
    }

    fn partition(kind: OperationKind, ids: &[&str]) -> Partition {
        Partition::new(kind, ids.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    #[tokio::test]
    async fn test_incremental_run_reports_per_document_type() {
        let products = Arc::new(MockBuilder::new(
            "catalogitem",
            vec![
                partition(OperationKind::Remove, &["p9"]),
                partition(OperationKind::Index, &["p1", "p2"]),
            ],
        ));
        let categories = Arc::new(MockBuilder::new(
            "category",
            vec![partition(OperationKind::Index, &["c1"])],
        ));
        let builders: Vec<Arc<dyn SearchIndexBuilder>> = vec![products.clone(), categories.clone()];
        let orchestrator = IndexingOrchestrator::new(builders);
        let request = IndexingRequest::incremental("store", Some(Utc::now()));
        let end = request.end;

        let report = orchestrator.run(request).await.unwrap();

        let items = report.get("catalogitem").unwrap();
        assert_eq!(items.partitions_processed, 2);
        assert_eq!(items.documents_removed, 1);
        assert_eq!(items.documents_indexed, 2);
        assert_eq!(items.watermark, Some(end));
        assert_eq!(report.get("category").unwrap().documents_indexed, 1);
        assert!(!report.cancelled);
        assert_eq!(products.removed.lock().await.as_slice(), ["p9".to_string()]);
        assert_eq!(products.cleared.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rebuild_clears_requested_type_only() {
        let products = Arc::new(MockBuilder::new("catalogitem", vec![]));
        let categories = Arc::new(MockBuilder::new("category", vec![]));
        let builders: Vec<Arc<dyn SearchIndexBuilder>> = vec![products.clone(), categories.clone()];
        let orchestrator = IndexingOrchestrator::new(builders);
        let mut request = IndexingRequest::rebuild("store");
        request.document_types = vec!["Category".into()];

        let report = orchestrator.run(request).await.unwrap();

        assert_eq!(report.document_types.len(), 1);
        assert_eq!(categories.cleared.load(Ordering::SeqCst), 1);
        assert_eq!(products.cleared.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_document_type_is_rejected() {
        let orchestrator = IndexingOrchestrator::new(vec![]);
        let mut request = IndexingRequest::incremental("store", None);
        request.document_types = vec!["member".into()];

        let result = orchestrator.run(request).await;

        assert!(matches!(result, Err(PipelineError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_partition_failure_keeps_siblings_and_watermark() {
        let mut builder = MockBuilder::new(
            "catalogitem",
            vec![
                partition(OperationKind::Index, &["a"]),
                partition(OperationKind::Index, &["b"]),
                partition(OperationKind::Index, &["c"]),
            ],
        );
        builder.failing_partition = Some(1);
        let orchestrator = IndexingOrchestrator::new(vec![Arc::new(builder) as Arc<dyn SearchIndexBuilder>]);

        let report = orchestrator
            .run(IndexingRequest::incremental("store", Some(Utc::now())))
            .await
            .unwrap();

        let items = report.get("catalogitem").unwrap();
        assert_eq!(items.partitions_processed, 2);
        assert_eq!(items.partitions_failed, 1);
        assert_eq!(items.documents_indexed, 2);
        assert!(!items.is_complete());
    }

    #[tokio::test]
    async fn test_failed_pages_hold_watermark() {
        let mut builder = MockBuilder::new("catalogitem", vec![partition(OperationKind::Index, &["a"])]);
        builder.failing_page = true;
        let orchestrator = IndexingOrchestrator::new(vec![Arc::new(builder) as Arc<dyn SearchIndexBuilder>]);

        let report = orchestrator.run(IndexingRequest::rebuild("store")).await.unwrap();

        let items = report.get("catalogitem").unwrap();
        assert_eq!(items.pages_failed, 1);
        assert_eq!(items.documents_indexed, 1);
        assert!(items.watermark.is_none());
    }

    #[tokio::test]
    async fn test_rejected_document_holds_watermark() {
        let provider = Arc::new(RejectingProvider {
            rejected_id: "b",
            indexed: Mutex::new(Vec::new()),
            commits: AtomicUsize::new(0),
        });
        let mut builder = MockBuilder::new(
            "catalogitem",
            vec![
                partition(OperationKind::Index, &["a", "b"]),
                partition(OperationKind::Index, &["c"]),
            ],
        );
        builder.publisher = Some(IndexPublisher::new(provider.clone()));
        let orchestrator = IndexingOrchestrator::new(vec![Arc::new(builder) as Arc<dyn SearchIndexBuilder>]);

        let report = orchestrator
            .run(IndexingRequest::incremental("store", Some(Utc::now())))
            .await
            .unwrap();

        let items = report.get("catalogitem").unwrap();
        assert_eq!(items.partitions_processed, 2);
        assert_eq!(items.partitions_failed, 0);
        assert_eq!(items.documents_indexed, 2);
        assert_eq!(items.documents_failed, 1);
        assert!(items.watermark.is_none());
        assert!(!items.is_complete());
        assert_eq!(*provider.indexed.lock().await, vec!["a".to_string(), "c".to_string()]);
        assert_eq!(provider.commits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cancellation_between_partitions() {
        let orchestrator = Arc::new(IndexingOrchestrator::new(vec![]));
        let mut builder = MockBuilder::new(
            "catalogitem",
            vec![
                partition(OperationKind::Index, &["a"]),
                partition(OperationKind::Index, &["b"]),
            ],
        );
        builder.cancel_after_first = Some(orchestrator.clone());
        let builder: Arc<dyn SearchIndexBuilder> = Arc::new(builder);

        let report = orchestrator
            .run_document_type(builder.as_ref(), &IndexingRequest::incremental("store", Some(Utc::now())))
            .await;

        assert!(report.cancelled);
        assert_eq!(report.partitions_processed, 1);
        assert_eq!(report.documents_indexed, 1);
        assert!(report.watermark.is_none());
    }
}
