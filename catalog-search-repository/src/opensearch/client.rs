//! OpenSearch client implementation.
//!
//! This module provides the concrete implementation of `SearchProvider`
//! using the OpenSearch Rust client.

use std::collections::HashSet;

use async_trait::async_trait;
use opensearch::{
    http::request::JsonBody,
    http::response::Response,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesDeleteParts, IndicesExistsParts, IndicesRefreshParts},
    BulkParts, DeleteByQueryParts, IndexParts, OpenSearch, SearchParts,
};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::errors::SearchError;
use crate::interfaces::SearchProvider;
use crate::opensearch::index_config::IndexConfig;
use crate::opensearch::queries::{build_search_body, parse_search_response};
use crate::translator::CriteriaTranslator;
use crate::types::BatchOperationSummary;
use catalog_search_shared::{IndexDocument, SearchCriteria, SearchResult};

/// OpenSearch implementation of [`SearchProvider`].
///
/// # Example
///
/// ```ignore
/// let provider = OpenSearchProvider::new("http://localhost:9200", IndexConfig::default()).await?;
/// provider.index("b2b-store", "catalogitem", &document).await?;
/// provider.commit("b2b-store").await?;
/// ```
pub struct OpenSearchProvider {
    client: OpenSearch,
    index_config: IndexConfig,
    translator: CriteriaTranslator,
    /// Indexes known to exist, so writes skip the existence check.
    known_indexes: Mutex<HashSet<String>>,
}

impl OpenSearchProvider {
    /// Create a new provider connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    /// * `index_config` - Shard, replica and bulk settings
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchProvider)` - A new provider instance
    /// * `Err(SearchError)` - If connection setup fails
    pub async fn new(url: &str, index_config: IndexConfig) -> Result<Self, SearchError> {
        let parsed_url = Url::parse(url).map_err(|e| SearchError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| SearchError::connection(e.to_string()))?;

        info!(
            url = %url,
            max_batch_size = index_config.max_batch_size,
            "Created OpenSearch client"
        );

        Ok(Self {
            client: OpenSearch::new(transport),
            index_config,
            translator: CriteriaTranslator::new(),
            known_indexes: Mutex::new(HashSet::new()),
        })
    }

    /// Create the index with catalog mappings unless it already exists.
    async fn ensure_index(&self, index: &str) -> Result<(), SearchError> {
        let mut known = self.known_indexes.lock().await;
        if known.contains(index) {
            return Ok(());
        }

        let exists = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await?;

        if !exists.status_code().is_success() {
            let response = self
                .client
                .indices()
                .create(IndicesCreateParts::Index(index))
                .body(self.index_config.index_settings())
                .send()
                .await?;

            let status = response.status_code();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                // Another writer may have created it in the meantime.
                if !body.contains("resource_already_exists_exception") {
                    error!(index = %index, status = %status, body = %body, "Index creation failed");
                    return Err(SearchError::index_creation(format!(
                        "Create index {} failed with status {}: {}",
                        index, status, body
                    )));
                }
            }
            info!(index = %index, "Created index");
        }

        known.insert(index.to_string());
        Ok(())
    }

    async fn error_body(response: Response) -> String {
        let status = response.status_code();
        let body = response.text().await.unwrap_or_default();
        format!("status {}: {}", status, body)
    }

    async fn bulk_chunk(
        &self,
        index: &str,
        documents: &[IndexDocument],
    ) -> Result<BatchOperationSummary, SearchError> {
        let mut body: Vec<JsonBody<Value>> = Vec::with_capacity(documents.len() * 2);
        for doc in documents {
            body.push(json!({ "index": { "_id": doc.id() } }).into());
            body.push(Value::Object(doc.to_json()).into());
        }

        let response = self
            .client
            .bulk(BulkParts::Index(index))
            .body(body)
            .send()
            .await?;

        if !response.status_code().is_success() {
            let message = Self::error_body(response).await;
            error!(index = %index, error = %message, "Bulk request failed");
            return Err(SearchError::bulk_index(message));
        }

        let response_body: Value = response
            .json()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))?;

        Ok(summarize_bulk_response(documents, &response_body))
    }
}

/// Per-document outcomes of a bulk response. Items come back in request
/// order.
fn summarize_bulk_response(documents: &[IndexDocument], response: &Value) -> BatchOperationSummary {
    let items = response
        .get("items")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    let mut summary = BatchOperationSummary::default();
    for (i, doc) in documents.iter().enumerate() {
        let item = items.get(i).and_then(|item| item.get("index"));
        let outcome = match item {
            Some(item) => match item.get("error") {
                Some(error) => {
                    let status = item.get("status").and_then(Value::as_u64).unwrap_or(0);
                    Err(SearchError::bulk_index(format!("status {}: {}", status, error)))
                }
                None => Ok(()),
            },
            None => Err(SearchError::bulk_index("missing item in bulk response")),
        };
        summary.push(doc.id(), outcome);
    }
    summary
}

#[async_trait]
impl SearchProvider for OpenSearchProvider {
    #[instrument(skip(self, criteria), fields(document_type = %criteria.document_type))]
    async fn search(
        &self,
        scope: &str,
        criteria: &SearchCriteria,
    ) -> Result<SearchResult, SearchError> {
        let query = self.translator.translate(criteria)?;
        let index = IndexConfig::index_name(scope, &query.document_type);

        let response = self
            .client
            .search(SearchParts::Index(&[index.as_str()]))
            .body(build_search_body(&query))
            .send()
            .await?;

        let status = response.status_code();
        if status.as_u16() == 404 {
            debug!(index = %index, "Index does not exist, returning empty result");
            return Ok(SearchResult::empty());
        }
        if !status.is_success() {
            let message = Self::error_body(response).await;
            error!(index = %index, error = %message, "Search request failed");
            return Err(SearchError::query(message));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))?;
        let result = parse_search_response(&query, &body)?;

        debug!(
            total = result.total_count,
            returned = result.documents.len(),
            "Search completed"
        );
        Ok(result)
    }

    async fn index(
        &self,
        scope: &str,
        document_type: &str,
        document: &IndexDocument,
    ) -> Result<(), SearchError> {
        let index = IndexConfig::index_name(scope, document_type);
        self.ensure_index(&index).await?;

        let response = self
            .client
            .index(IndexParts::IndexId(&index, document.id()))
            .body(Value::Object(document.to_json()))
            .send()
            .await?;

        if !response.status_code().is_success() {
            let message = Self::error_body(response).await;
            error!(index = %index, id = %document.id(), error = %message, "Index request failed");
            return Err(SearchError::index(message));
        }

        debug!(index = %index, id = %document.id(), "Document indexed");
        Ok(())
    }

    #[instrument(skip(self, documents), fields(count = documents.len()))]
    async fn index_batch(
        &self,
        scope: &str,
        document_type: &str,
        documents: &[IndexDocument],
    ) -> Result<BatchOperationSummary, SearchError> {
        let mut summary = BatchOperationSummary::default();
        if documents.is_empty() {
            return Ok(summary);
        }

        let index = IndexConfig::index_name(scope, document_type);
        self.ensure_index(&index).await?;

        for chunk in documents.chunks(self.index_config.max_batch_size.max(1)) {
            summary.merge(self.bulk_chunk(&index, chunk).await?);
        }

        if summary.failed > 0 {
            warn!(
                index = %index,
                failed = summary.failed,
                total = summary.total,
                "Bulk indexing had failures"
            );
        }
        Ok(summary)
    }

    async fn remove(
        &self,
        scope: &str,
        document_type: &str,
        key_field: &str,
        key_value: &str,
    ) -> Result<(), SearchError> {
        let index = IndexConfig::index_name(scope, document_type);

        let response = self
            .client
            .delete_by_query(DeleteByQueryParts::Index(&[index.as_str()]))
            .body(json!({ "query": { "term": { key_field: key_value } } }))
            .send()
            .await?;

        let status = response.status_code();
        // 404 is acceptable - the index may not exist yet
        if !status.is_success() && status.as_u16() != 404 {
            let message = Self::error_body(response).await;
            error!(index = %index, key = %key_value, error = %message, "Delete request failed");
            return Err(SearchError::delete(message));
        }

        debug!(index = %index, key = %key_value, "Documents removed");
        Ok(())
    }

    async fn remove_all(&self, scope: &str, document_type: &str) -> Result<(), SearchError> {
        let index = IndexConfig::index_name(scope, document_type);

        let response = self
            .client
            .indices()
            .delete(IndicesDeleteParts::Index(&[index.as_str()]))
            .send()
            .await?;

        let status = response.status_code();
        if !status.is_success() && status.as_u16() != 404 {
            let message = Self::error_body(response).await;
            return Err(SearchError::delete(message));
        }

        self.known_indexes.lock().await.remove(&index);
        info!(index = %index, "Index dropped");
        Ok(())
    }

    async fn commit(&self, scope: &str) -> Result<(), SearchError> {
        let pattern = IndexConfig::scope_pattern(scope);

        let response = self
            .client
            .indices()
            .refresh(IndicesRefreshParts::Index(&[pattern.as_str()]))
            .send()
            .await?;

        if !response.status_code().is_success() {
            let message = Self::error_body(response).await;
            return Err(SearchError::commit(message));
        }
        Ok(())
    }

    async fn close(&self, _scope: &str, _document_type: &str) -> Result<(), SearchError> {
        Ok(())
    }
}
