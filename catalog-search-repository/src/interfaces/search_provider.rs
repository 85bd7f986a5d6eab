//! Index backend trait definition.
//!
//! This module defines the abstract interface for index operations, allowing
//! for different backend implementations (OpenSearch, in-memory, etc.).

use async_trait::async_trait;

use crate::errors::SearchError;
use crate::types::BatchOperationSummary;
use catalog_search_shared::{IndexDocument, SearchCriteria, SearchResult};

/// Abstract interface for index backend operations.
///
/// Documents live in per-scope, per-document-type indexes. Writes become
/// visible to `search` only after `commit`.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Searches may run concurrently;
/// writers are expected to serialize writes per document type themselves.
///
/// # Error Handling
///
/// All methods return `Result<T, SearchError>`. Backend-specific errors are
/// translated before they reach the caller.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Execute criteria against the index of `criteria.document_type`.
    ///
    /// # Arguments
    ///
    /// * `scope` - The index scope (usually the store or tenant)
    /// * `criteria` - The search criteria
    ///
    /// # Returns
    ///
    /// * `Ok(SearchResult)` - Ordered document references, total count and facets
    /// * `Err(SearchError)` - If translation or execution fails
    async fn search(&self, scope: &str, criteria: &SearchCriteria)
        -> Result<SearchResult, SearchError>;

    /// Index a single document, replacing any document with the same id.
    ///
    /// # Arguments
    ///
    /// * `scope` - The index scope
    /// * `document_type` - The document type (e.g. `catalogitem`)
    /// * `document` - The document to index
    async fn index(
        &self,
        scope: &str,
        document_type: &str,
        document: &IndexDocument,
    ) -> Result<(), SearchError>;

    /// Index several documents and report per-document outcomes.
    ///
    /// The default implementation calls `index` for each document.
    ///
    /// # Returns
    ///
    /// * `Ok(BatchOperationSummary)` - Aggregate statistics and individual results
    /// * `Err(SearchError)` - If the batch could not be attempted at all
    async fn index_batch(
        &self,
        scope: &str,
        document_type: &str,
        documents: &[IndexDocument],
    ) -> Result<BatchOperationSummary, SearchError> {
        let mut summary = BatchOperationSummary::default();
        for document in documents {
            let outcome = self.index(scope, document_type, document).await;
            summary.push(document.id(), outcome);
        }
        Ok(summary)
    }

    /// Remove every document whose `key_field` equals `key_value`.
    ///
    /// Removing a document that does not exist is not an error.
    async fn remove(
        &self,
        scope: &str,
        document_type: &str,
        key_field: &str,
        key_value: &str,
    ) -> Result<(), SearchError>;

    /// Remove every document of a document type.
    async fn remove_all(&self, scope: &str, document_type: &str) -> Result<(), SearchError>;

    /// Make pending writes in `scope` durable and visible.
    async fn commit(&self, scope: &str) -> Result<(), SearchError>;

    /// Release writer resources held for a document type.
    async fn close(&self, scope: &str, document_type: &str) -> Result<(), SearchError>;
}
