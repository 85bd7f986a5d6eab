//! Authoritative store contracts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::StoreError;
use crate::types::{EntityKind, StorePage, StoreQuery};
use catalog_search_shared::{ChangeRecord, Price, ResponseGroup};

/// Read access to one kind of catalog entity.
#[async_trait]
pub trait EntityStore<T: Send>: Send + Sync {
    /// Load entities by id.
    ///
    /// Missing ids are skipped and the result order is unspecified; callers
    /// re-order against their own id list.
    ///
    /// # Arguments
    ///
    /// * `ids` - The entity ids to load
    /// * `response_group` - Which parts of the entity to populate
    /// * `catalog` - Optional catalog hint used to resolve outlines
    async fn get_by_ids(
        &self,
        ids: &[String],
        response_group: ResponseGroup,
        catalog: Option<&str>,
    ) -> Result<Vec<T>, StoreError>;

    /// Page through entity ids. A `take` of zero only returns the count.
    async fn search(&self, query: &StoreQuery) -> Result<StorePage, StoreError>;
}

/// Price lookups.
#[async_trait]
pub trait PricingStore: Send + Sync {
    /// Load price records by their own ids.
    async fn get_prices_by_ids(&self, ids: &[String]) -> Result<Vec<Price>, StoreError>;

    /// Evaluate the current prices of products across all pricelists.
    async fn evaluate_prices(&self, product_ids: &[String]) -> Result<Vec<Price>, StoreError>;
}

/// Source of entity change history.
#[async_trait]
pub trait ChangeLogSource: Send + Sync {
    /// Changes of `kind` recorded in `(start, end]`. A missing `start`
    /// means the beginning of history.
    async fn find_change_history(
        &self,
        kind: EntityKind,
        start: Option<DateTime<Utc>>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ChangeRecord>, StoreError>;
}
