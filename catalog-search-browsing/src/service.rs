//! Retrieval that reconciles index hits with the authoritative store.
//!
//! The index is treated as an id oracle that may lag behind the store. When
//! some hits no longer resolve, the page is enlarged by the shortfall and
//! searched again, up to `max_retries` times. The answer keeps the index's
//! relevance order.
//!
//! With index search switched off, the store pages the entities itself and
//! no reconciliation is needed.

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::aggregation::{to_aggregations, Aggregation};
use crate::config::BrowsingConfig;
use crate::errors::BrowsingError;
use crate::hydration::Hydrator;
use catalog_search_repository::{EntityStore, SearchProvider, StoreQuery};
use catalog_search_shared::{
    CatalogEntity, CriteriaKind, DocumentRef, ResponseGroup, SearchCriteria,
};

/// How the reconciliation loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconciliationOutcome {
    /// Every index hit of the last pass resolved.
    Complete,
    /// The retry budget or the index's total ran out first. Items may be
    /// fewer than the index claims.
    Exhausted,
}

#[derive(Debug, Clone)]
pub struct BrowseResult<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub aggregations: Vec<Aggregation>,
    pub outcome: ReconciliationOutcome,
    /// Number of index searches issued. Zero when the store served the page.
    pub searches: usize,
}

/// Searches the index and hydrates hits into entities of type `T`.
pub struct BrowsingService<T: Send> {
    provider: Arc<dyn SearchProvider>,
    store: Arc<dyn EntityStore<T>>,
    hydrator: Hydrator<T>,
    config: BrowsingConfig,
}

impl<T> BrowsingService<T>
where
    T: CatalogEntity + DeserializeOwned + Send + Sync + 'static,
{
    pub fn new(
        provider: Arc<dyn SearchProvider>,
        store: Arc<dyn EntityStore<T>>,
        config: BrowsingConfig,
    ) -> Self {
        Self {
            provider,
            hydrator: Hydrator::new(store.clone(), config.clone()),
            store,
            config,
        }
    }

    /// Run `criteria` against the index of `scope` and return the hydrated
    /// entities in relevance order. Routed to the store instead when index
    /// search is switched off.
    ///
    /// Stale hits never fail the request. Backend and store failures do.
    #[instrument(
        skip(self, criteria),
        fields(scope = %scope, document_type = %criteria.document_type, skip = criteria.skip, take = criteria.take)
    )]
    pub async fn search(
        &self,
        scope: &str,
        criteria: &SearchCriteria,
        response_group: ResponseGroup,
    ) -> Result<BrowseResult<T>, BrowsingError> {
        if !self.config.use_index_search {
            return self.search_store(criteria, response_group).await;
        }

        let original_take = criteria.take;
        let skip = criteria.skip;
        let catalog = criteria.catalog_hint();

        let mut current = criteria.clone();
        let mut ordinals: HashMap<String, usize> = HashMap::new();
        let mut hydrated: HashMap<String, T> = HashMap::new();
        let mut retries = 0;
        let mut searches = 0;

        let (total_count, facet_groups, outcome) = loop {
            let result = self.provider.search(scope, &current).await?;
            searches += 1;

            let new_refs: Vec<DocumentRef> = result
                .documents
                .into_iter()
                .enumerate()
                .filter_map(|(ordinal, document)| {
                    let key = document.id.to_lowercase();
                    if ordinals.contains_key(&key) {
                        return None;
                    }
                    ordinals.insert(key, ordinal);
                    Some(document)
                })
                .collect();

            let found = new_refs.len();
            if found == 0 {
                break (
                    result.total_count,
                    result.facet_groups,
                    ReconciliationOutcome::Complete,
                );
            }

            let entities = self
                .hydrator
                .hydrate(&new_refs, response_group, catalog)
                .await?;
            let resolved = entities.len();
            for entity in entities {
                hydrated.entry(entity.id().to_lowercase()).or_insert(entity);
            }

            debug!(pass = searches, found, resolved, "Hydrated search pass");

            if resolved == found {
                break (
                    result.total_count,
                    result.facet_groups,
                    ReconciliationOutcome::Complete,
                );
            }

            let window = (skip + current.take) as u64;
            if retries >= self.config.max_retries || window >= result.total_count {
                warn!(
                    searches,
                    total_count = result.total_count,
                    missing = found - resolved,
                    "Index references did not resolve, returning partial result"
                );
                break (
                    result.total_count,
                    result.facet_groups,
                    ReconciliationOutcome::Exhausted,
                );
            }

            let remaining = (result.total_count as usize).saturating_sub(skip);
            let take = (current.take + found - resolved).min(remaining);
            retries += 1;
            current = current.with_take(take);
        };

        let mut ordered: Vec<(usize, T)> = hydrated
            .into_iter()
            .filter_map(|(key, entity)| ordinals.get(&key).map(|ordinal| (*ordinal, entity)))
            .collect();
        ordered.sort_by_key(|(ordinal, _)| *ordinal);

        let limit = original_take.min(usize::try_from(total_count).unwrap_or(usize::MAX));
        let items: Vec<T> = ordered
            .into_iter()
            .take(limit)
            .map(|(_, entity)| entity)
            .collect();

        Ok(BrowseResult {
            items,
            total_count,
            aggregations: to_aggregations(&facet_groups, &criteria.applied_filters),
            outcome,
            searches,
        })
    }

    /// Page through the entity store in store order.
    async fn search_store(
        &self,
        criteria: &SearchCriteria,
        response_group: ResponseGroup,
    ) -> Result<BrowseResult<T>, BrowsingError> {
        let catalog = criteria.catalog_hint();
        let with_hidden = match &criteria.kind {
            CriteriaKind::CatalogItem(item) => item.with_hidden,
            CriteriaKind::Category(category) => category.with_hidden,
            CriteriaKind::Keyword => false,
        };
        let query = StoreQuery {
            skip: criteria.skip,
            take: criteria.take,
            with_hidden,
            catalog: catalog.map(str::to_string),
        };

        let page = self.store.search(&query).await?;
        let entities = if page.ids.is_empty() {
            Vec::new()
        } else {
            self.store
                .get_by_ids(&page.ids, response_group, catalog)
                .await?
        };

        let mut by_id: HashMap<String, T> = entities
            .into_iter()
            .map(|entity| (entity.id().to_lowercase(), entity))
            .collect();
        let items: Vec<T> = page
            .ids
            .iter()
            .filter_map(|id| by_id.remove(&id.to_lowercase()))
            .collect();

        let outcome = if items.len() == page.ids.len() {
            ReconciliationOutcome::Complete
        } else {
            ReconciliationOutcome::Exhausted
        };
        debug!(found = page.ids.len(), resolved = items.len(), "Served page from store");

        Ok(BrowseResult {
            items,
            total_count: page.total_count,
            aggregations: Vec::new(),
            outcome,
            searches: 0,
        })
    }
}
