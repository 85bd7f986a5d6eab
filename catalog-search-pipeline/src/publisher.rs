//! Publishes built documents to the index backend.
//!
//! Writes to one `(scope, document type)` pair are serialized; different
//! document types publish concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::errors::PipelineError;
use crate::retry::RetryPolicy;
use catalog_search_repository::{BatchOperationSummary, SearchError, SearchProvider};
use catalog_search_shared::fields;
use catalog_search_shared::IndexDocument;

/// Configuration for the publisher.
#[derive(Debug, Clone, Default)]
pub struct PublisherConfig {
    pub retry: RetryPolicy,
}

/// Outcome of publishing one batch.
#[derive(Debug, Clone, Default)]
pub struct PublishSummary {
    pub indexed: usize,
    pub failed: usize,
}

/// Writes documents through a [`SearchProvider`] with retries.
pub struct IndexPublisher {
    provider: Arc<dyn SearchProvider>,
    config: PublisherConfig,
    locks: Mutex<HashMap<(String, String), Arc<Mutex<()>>>>,
}

impl IndexPublisher {
    /// Create a new publisher with the default retry policy.
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self::with_config(provider, PublisherConfig::default())
    }

    /// Create a new publisher with custom configuration.
    pub fn with_config(provider: Arc<dyn SearchProvider>, config: PublisherConfig) -> Self {
        Self {
            provider,
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn writer_lock(&self, scope: &str, document_type: &str) -> Arc<Mutex<()>> {
        let key = (scope.to_lowercase(), document_type.to_lowercase());
        self.locks.lock().await.entry(key).or_default().clone()
    }

    /// Index `documents`, then commit and close the writer.
    ///
    /// Per-document failures are counted in the summary. A batch that cannot
    /// be attempted, or a failed commit, is an error.
    #[instrument(skip(self, documents), fields(scope = %scope, document_type = %document_type, count = documents.len()))]
    pub async fn publish(
        &self,
        scope: &str,
        document_type: &str,
        documents: &[IndexDocument],
    ) -> Result<PublishSummary, PipelineError> {
        if documents.is_empty() {
            return Ok(PublishSummary::default());
        }

        let lock = self.writer_lock(scope, document_type).await;
        let _guard = lock.lock().await;

        let summary: BatchOperationSummary = self
            .config
            .retry
            .run("index batch", || {
                self.provider.index_batch(scope, document_type, documents)
            })
            .await?;

        for failure in summary.results.iter().filter(|r| !r.success) {
            warn!(
                document_id = %failure.document_id,
                error = ?failure.error,
                "Failed to index document"
            );
        }

        self.commit_and_close(scope, document_type).await?;

        info!(
            indexed = summary.succeeded,
            failed = summary.failed,
            "Published documents"
        );
        Ok(PublishSummary {
            indexed: summary.succeeded,
            failed: summary.failed,
        })
    }

    /// Remove the documents of `ids` by their `__key`, then commit.
    ///
    /// Returns the number of ids removed.
    #[instrument(skip(self, ids), fields(scope = %scope, document_type = %document_type, count = ids.len()))]
    pub async fn remove(
        &self,
        scope: &str,
        document_type: &str,
        ids: &[String],
    ) -> Result<usize, PipelineError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let lock = self.writer_lock(scope, document_type).await;
        let _guard = lock.lock().await;

        for id in ids {
            let key = id.to_lowercase();
            self.config
                .retry
                .run("remove document", || {
                    self.provider
                        .remove(scope, document_type, fields::KEY_FIELD, &key)
                })
                .await?;
        }

        self.config
            .retry
            .run("commit", || self.provider.commit(scope))
            .await?;

        debug!(removed = ids.len(), "Removed documents");
        Ok(ids.len())
    }

    /// Drop every document of `document_type`.
    #[instrument(skip(self), fields(scope = %scope, document_type = %document_type))]
    pub async fn remove_all(&self, scope: &str, document_type: &str) -> Result<(), PipelineError> {
        let lock = self.writer_lock(scope, document_type).await;
        let _guard = lock.lock().await;

        self.config
            .retry
            .run("remove all", || self.provider.remove_all(scope, document_type))
            .await?;

        info!("Removed all documents");
        Ok(())
    }

    async fn commit_and_close(&self, scope: &str, document_type: &str) -> Result<(), SearchError> {
        self.config
            .retry
            .run("commit", || self.provider.commit(scope))
            .await?;
        self.provider.close(scope, document_type).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use catalog_search_shared::{DocumentField, SearchCriteria, SearchResult};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingProvider {
        index_failures: AtomicUsize,
        batches: AtomicUsize,
        commits: AtomicUsize,
        closes: AtomicUsize,
        removed: Mutex<Vec<(String, String)>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    #[async_trait]
    impl SearchProvider for RecordingProvider {
        async fn search(
            &self,
            _scope: &str,
            _criteria: &SearchCriteria,
        ) -> Result<SearchResult, SearchError> {
            Ok(SearchResult::empty())
        }

        async fn index(
            &self,
            _scope: &str,
            _document_type: &str,
            document: &IndexDocument,
        ) -> Result<(), SearchError> {
            if document.id() == "bad" {
                return Err(SearchError::index("mapping conflict"));
            }
            Ok(())
        }

        async fn index_batch(
            &self,
            scope: &str,
            document_type: &str,
            documents: &[IndexDocument],
        ) -> Result<BatchOperationSummary, SearchError> {
            let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(running, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            self.batches.fetch_add(1, Ordering::SeqCst);
            if self.index_failures.load(Ordering::SeqCst) > 0 {
                self.index_failures.fetch_sub(1, Ordering::SeqCst);
                return Err(SearchError::connection("connection reset"));
            }

            let mut summary = BatchOperationSummary::default();
            for document in documents {
                summary.push(document.id(), self.index(scope, document_type, document).await);
            }
            Ok(summary)
        }

        async fn remove(
            &self,
            _scope: &str,
            _document_type: &str,
            key_field: &str,
            key_value: &str,
        ) -> Result<(), SearchError> {
            self.removed
                .lock()
                .await
                .push((key_field.to_string(), key_value.to_string()));
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
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn documents(ids: &[&str]) -> Vec<IndexDocument> {
        ids.iter()
            .map(|id| {
                let mut document = IndexDocument::new(*id);
                document.add(DocumentField::keyword(fields::KEY_FIELD, id.to_lowercase()));
                document
            })
            .collect()
    }

    #[tokio::test]
    async fn test_publish_counts_failures_and_commits() {
        let provider = Arc::new(RecordingProvider::default());
        let publisher = IndexPublisher::new(provider.clone());

        let summary = publisher
            .publish("store", "catalogitem", &documents(&["a", "bad", "c"]))
            .await
            .unwrap();

        assert_eq!(summary.indexed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(provider.commits.load(Ordering::SeqCst), 1);
        assert_eq!(provider.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_retries_transient_failure() {
        let provider = Arc::new(RecordingProvider::default());
        provider.index_failures.store(2, Ordering::SeqCst);
        let publisher = IndexPublisher::new(provider.clone());

        let summary = publisher
            .publish("store", "catalogitem", &documents(&["a"]))
            .await
            .unwrap();

        assert_eq!(summary.indexed, 1);
        assert_eq!(provider.batches.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_remove_uses_lowercased_key() {
        let provider = Arc::new(RecordingProvider::default());
        let publisher = IndexPublisher::new(provider.clone());

        let removed = publisher
            .remove("store", "catalogitem", &["P-1".to_string(), "p2".to_string()])
            .await
            .unwrap();

        assert_eq!(removed, 2);
        assert_eq!(
            provider.removed.lock().await.as_slice(),
            &[
                ("__key".to_string(), "p-1".to_string()),
                ("__key".to_string(), "p2".to_string()),
            ]
        );
        assert_eq!(provider.commits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_writes_to_one_document_type_are_serialized() {
        let provider = Arc::new(RecordingProvider::default());
        let publisher = Arc::new(IndexPublisher::new(provider.clone()));
        let batch = documents(&["a"]);

        let first = {
            let publisher = publisher.clone();
            let batch = batch.clone();
            tokio::spawn(async move { publisher.publish("store", "catalogitem", &batch).await })
        };
        let second = {
            let publisher = publisher.clone();
            let batch = batch.clone();
            tokio::spawn(async move { publisher.publish("store", "CatalogItem", &batch).await })
        };
        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();

        assert_eq!(provider.max_in_flight.load(Ordering::SeqCst), 1);
    }
}
