use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, instrument};

use super::{ChangeAggregator, OperationProvider};
use crate::errors::PipelineError;
use catalog_search_repository::{ChangeLogSource, EntityKind, PricingStore};
use catalog_search_shared::{Operation, Price};

/// Paging of price lookups.
#[derive(Debug, Clone)]
pub struct PriceLookupConfig {
    /// Ids per pricing store call.
    pub page_size: usize,
    /// Maximum number of lookups in flight.
    pub parallelism: usize,
}

impl Default for PriceLookupConfig {
    fn default() -> Self {
        Self {
            page_size: 1000,
            parallelism: 10,
        }
    }
}

/// Turns price changes into `Index` operations for the owning products.
///
/// Price ids that no longer resolve in the pricing store are dropped.
pub struct ProductPriceOperationProvider {
    change_log: Arc<dyn ChangeLogSource>,
    pricing: Arc<dyn PricingStore>,
    config: PriceLookupConfig,
}

impl ProductPriceOperationProvider {
    pub fn new(change_log: Arc<dyn ChangeLogSource>, pricing: Arc<dyn PricingStore>) -> Self {
        Self::with_config(change_log, pricing, PriceLookupConfig::default())
    }

    pub fn with_config(
        change_log: Arc<dyn ChangeLogSource>,
        pricing: Arc<dyn PricingStore>,
        config: PriceLookupConfig,
    ) -> Self {
        Self {
            change_log,
            pricing,
            config,
        }
    }

    async fn lookup_prices(&self, price_ids: Vec<String>) -> Result<Vec<Price>, PipelineError> {
        let page_size = self.config.page_size.max(1);
        let pages: Vec<Vec<String>> = price_ids.chunks(page_size).map(<[String]>::to_vec).collect();

        let prices: Vec<Vec<Price>> = stream::iter(pages)
            .map(|page| {
                let pricing = self.pricing.clone();
                async move { pricing.get_prices_by_ids(&page).await }
            })
            .buffer_unordered(self.config.parallelism.max(1))
            .try_collect()
            .await?;

        Ok(prices.into_iter().flatten().collect())
    }
}

#[async_trait]
impl OperationProvider for ProductPriceOperationProvider {
    #[instrument(skip(self))]
    async fn get_operations(
        &self,
        start: Option<DateTime<Utc>>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Operation>, PipelineError> {
        let records = self
            .change_log
            .find_change_history(EntityKind::Price, start, end)
            .await?;
        let changes = ChangeAggregator::resolve(records.iter().map(|r| r.to_operation()));
        if changes.is_empty() {
            return Ok(Vec::new());
        }

        let price_ids: Vec<String> = changes.iter().map(|op| op.object_id.clone()).collect();
        let owners: HashMap<String, String> = self
            .lookup_prices(price_ids)
            .await?
            .into_iter()
            .map(|price| (price.id, price.product_id))
            .collect();

        let product_operations = changes.iter().filter_map(|change| {
            match owners.get(&change.object_id) {
                Some(product_id) => Some(Operation::index(product_id.clone(), change.timestamp)),
                None => {
                    debug!(price_id = %change.object_id, "Price not found, dropping change");
                    None
                }
            }
        });
        let operations = ChangeAggregator::resolve(product_operations);

        debug!(
            price_changes = changes.len(),
            operations = operations.len(),
            "Translated price changes"
        );
        Ok(operations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_search_repository::StoreError;
    use catalog_search_shared::{ChangeKind, ChangeRecord, OperationKind};
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct PriceChanges(Vec<ChangeRecord>);

    #[async_trait]
    impl ChangeLogSource for PriceChanges {
        async fn find_change_history(
            &self,
            kind: EntityKind,
            _start: Option<DateTime<Utc>>,
            _end: DateTime<Utc>,
        ) -> Result<Vec<ChangeRecord>, StoreError> {
            assert_eq!(kind, EntityKind::Price);
            Ok(self.0.clone())
        }
    }

    struct MockPricing {
        prices: Vec<Price>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PricingStore for MockPricing {
        async fn get_prices_by_ids(&self, ids: &[String]) -> Result<Vec<Price>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .prices
                .iter()
                .filter(|p| ids.contains(&p.id))
                .cloned()
                .collect())
        }

        async fn evaluate_prices(&self, _product_ids: &[String]) -> Result<Vec<Price>, StoreError> {
            Ok(Vec::new())
        }
    }

    fn price(id: &str, product_id: &str) -> Price {
        Price {
            id: id.into(),
            product_id: product_id.into(),
            pricelist_id: "default".into(),
            currency: "USD".into(),
            list: 10.0,
            sale: None,
        }
    }

    #[tokio::test]
    async fn test_price_changes_index_owning_products() {
        let t0 = Utc::now() - Duration::hours(1);
        let changes = Arc::new(PriceChanges(vec![
            ChangeRecord::new("pr1", t0, ChangeKind::Modified),
            ChangeRecord::new("pr2", t0 + Duration::minutes(1), ChangeKind::Added),
            ChangeRecord::new("pr3", t0 + Duration::minutes(2), ChangeKind::Modified),
            ChangeRecord::new("gone", t0, ChangeKind::Deleted),
        ]));
        let pricing = Arc::new(MockPricing {
            prices: vec![price("pr1", "p1"), price("pr2", "p1"), price("pr3", "p2")],
            calls: AtomicUsize::new(0),
        });
        let provider = ProductPriceOperationProvider::with_config(
            changes,
            pricing.clone(),
            PriceLookupConfig {
                page_size: 2,
                parallelism: 2,
            },
        );

        let operations = provider.get_operations(None, Utc::now()).await.unwrap();

        assert_eq!(pricing.calls.load(Ordering::SeqCst), 2);
        assert_eq!(operations.len(), 2);
        assert_eq!(operations[0].object_id, "p1");
        assert_eq!(operations[0].timestamp, t0 + Duration::minutes(1));
        assert!(operations.iter().all(|op| op.kind == OperationKind::Index));
    }
}
