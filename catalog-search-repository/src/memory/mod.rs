//! In-process index backend.
//!
//! Keeps committed documents and pending writes per `(scope, document type)`
//! behind a `tokio::sync::RwLock`. It evaluates the same translated queries
//! as the OpenSearch backend and is used by tests and local runs.

mod matcher;

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::errors::SearchError;
use crate::interfaces::SearchProvider;
use crate::translator::{CriteriaTranslator, QueryFilter, TranslatedQuery};
use catalog_search_shared::{
    DocumentRef, Facet, FacetGroup, IndexDocument, SearchCriteria, SearchResult,
};

type IndexKey = (String, String);

fn index_key(scope: &str, document_type: &str) -> IndexKey {
    (scope.to_lowercase(), document_type.to_lowercase())
}

#[derive(Debug, Clone)]
enum PendingWrite {
    Upsert(IndexDocument),
    Remove { field: String, value: String },
}

#[derive(Debug, Default)]
struct MemoryIndex {
    committed: Vec<IndexDocument>,
    pending: Vec<PendingWrite>,
}

impl MemoryIndex {
    fn apply_pending(&mut self) {
        for write in std::mem::take(&mut self.pending) {
            match write {
                PendingWrite::Upsert(doc) => {
                    match self.committed.iter().position(|d| d.id() == doc.id()) {
                        Some(index) => self.committed[index] = doc,
                        None => self.committed.push(doc),
                    }
                }
                PendingWrite::Remove { field, value } => {
                    let filter = QueryFilter::term(field, value);
                    self.committed.retain(|d| !matcher::matches(d, &filter));
                }
            }
        }
    }
}

/// In-memory implementation of [`SearchProvider`].
#[derive(Debug, Default)]
pub struct InMemorySearchProvider {
    indexes: RwLock<HashMap<IndexKey, MemoryIndex>>,
    translator: CriteriaTranslator,
}

impl InMemorySearchProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed documents in an index.
    pub async fn document_count(&self, scope: &str, document_type: &str) -> usize {
        self.indexes
            .read()
            .await
            .get(&index_key(scope, document_type))
            .map(|index| index.committed.len())
            .unwrap_or(0)
    }

    fn execute(&self, docs: &[IndexDocument], query: &TranslatedQuery) -> SearchResult {
        let mut base: Vec<(usize, f64, &IndexDocument)> = Vec::new();
        for (position, doc) in docs.iter().enumerate() {
            if !query.must.iter().all(|f| matcher::matches(doc, f)) {
                continue;
            }
            let score = match query.phrase.as_deref() {
                Some(phrase) => match matcher::phrase_score(doc, &query.content_fields, phrase) {
                    Some(score) => score,
                    None => continue,
                },
                None => 1.0,
            };
            base.push((position, score, doc));
        }

        let facet_groups = query
            .facets
            .iter()
            .filter_map(|request| {
                let scoped: Vec<&IndexDocument> = base
                    .iter()
                    .map(|(_, _, doc)| *doc)
                    .filter(|doc| query.applied_except(&request.key).all(|f| matcher::matches(doc, f)))
                    .collect();

                let facets: Vec<Facet> = request
                    .values
                    .iter()
                    .filter_map(|value| {
                        let count = scoped
                            .iter()
                            .filter(|doc| matcher::matches(doc, &value.filter))
                            .count() as u64;
                        (count > 0).then(|| Facet {
                            key: value.id.clone(),
                            count,
                            labels: Vec::new(),
                        })
                    })
                    .collect();

                (!facets.is_empty()).then(|| FacetGroup {
                    field_name: request.key.clone(),
                    facet_type: request.facet_type.clone(),
                    facets,
                    labels: Vec::new(),
                })
            })
            .collect();

        let mut hits: Vec<(usize, f64, &IndexDocument)> = base
            .into_iter()
            .filter(|(_, _, doc)| query.applied.iter().all(|f| matcher::matches(doc, &f.filter)))
            .collect();

        hits.sort_by(|(pa, sa, a), (pb, sb, b)| {
            matcher::compare_by(a, b, &query.sort)
                .then_with(|| sb.partial_cmp(sa).unwrap_or(std::cmp::Ordering::Equal))
                .then_with(|| pa.cmp(pb))
        });

        let total_count = hits.len() as u64;
        let documents = hits
            .into_iter()
            .skip(query.skip)
            .take(query.take)
            .map(|(_, score, doc)| DocumentRef {
                id: doc.id().to_string(),
                score: query.phrase.as_ref().map(|_| score),
                fields: doc.stored_json(),
            })
            .collect();

        SearchResult {
            total_count,
            documents,
            facet_groups,
        }
    }
}

#[async_trait]
impl SearchProvider for InMemorySearchProvider {
    #[instrument(skip(self, criteria), fields(document_type = %criteria.document_type))]
    async fn search(&self, scope: &str, criteria: &SearchCriteria) -> Result<SearchResult, SearchError> {
        let query = self.translator.translate(criteria)?;
        let indexes = self.indexes.read().await;

        let Some(index) = indexes.get(&index_key(scope, &query.document_type)) else {
            debug!("Index does not exist, returning empty result");
            return Ok(SearchResult::empty());
        };

        Ok(self.execute(&index.committed, &query))
    }

    async fn index(
        &self,
        scope: &str,
        document_type: &str,
        document: &IndexDocument,
    ) -> Result<(), SearchError> {
        if document.id().is_empty() {
            return Err(SearchError::index("document id is required"));
        }
        let mut indexes = self.indexes.write().await;
        indexes
            .entry(index_key(scope, document_type))
            .or_default()
            .pending
            .push(PendingWrite::Upsert(document.clone()));
        Ok(())
    }

    async fn remove(
        &self,
        scope: &str,
        document_type: &str,
        key_field: &str,
        key_value: &str,
    ) -> Result<(), SearchError> {
        let mut indexes = self.indexes.write().await;
        if let Some(index) = indexes.get_mut(&index_key(scope, document_type)) {
            index.pending.push(PendingWrite::Remove {
                field: key_field.to_string(),
                value: key_value.to_string(),
            });
        }
        Ok(())
    }

    async fn remove_all(&self, scope: &str, document_type: &str) -> Result<(), SearchError> {
        self.indexes
            .write()
            .await
            .remove(&index_key(scope, document_type));
        Ok(())
    }

    #[instrument(skip(self))]
    async fn commit(&self, scope: &str) -> Result<(), SearchError> {
        let scope = scope.to_lowercase();
        let mut indexes = self.indexes.write().await;
        for ((index_scope, _), index) in indexes.iter_mut() {
            if *index_scope == scope {
                index.apply_pending();
            }
        }
        Ok(())
    }

    async fn close(&self, _scope: &str, _document_type: &str) -> Result<(), SearchError> {
        Ok(())
    }
}
