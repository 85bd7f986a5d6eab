use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, instrument};

use crate::errors::PipelineError;
use crate::operations::PriceLookupConfig;
use catalog_search_repository::PricingStore;
use catalog_search_shared::{CatalogEntity, CatalogProduct, Price};

/// Side-channel data for builders, keyed by entity id.
#[derive(Debug, Clone, Default)]
pub struct BuildContext {
    prices: HashMap<String, Vec<Price>>,
}

impl BuildContext {
    /// Group evaluated prices by the product they belong to.
    pub fn with_prices(prices: impl IntoIterator<Item = Price>) -> Self {
        let mut grouped: HashMap<String, Vec<Price>> = HashMap::new();
        for price in prices {
            grouped.entry(price.product_id.clone()).or_default().push(price);
        }
        Self { prices: grouped }
    }

    pub fn prices_for(&self, entity_id: &str) -> &[Price] {
        self.prices
            .get(entity_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Loads the build context for a batch of entities.
#[async_trait]
pub trait ContextLoader<T: Send + Sync>: Send + Sync {
    async fn load(&self, entities: &[T]) -> Result<BuildContext, PipelineError>;
}

/// Loader for entity kinds whose builders need no context.
pub struct EmptyContextLoader;

#[async_trait]
impl<T: Send + Sync> ContextLoader<T> for EmptyContextLoader {
    async fn load(&self, _entities: &[T]) -> Result<BuildContext, PipelineError> {
        Ok(BuildContext::default())
    }
}

/// Evaluates the current prices of a batch of products.
///
/// Product ids are evaluated in pages of `page_size`, with at most
/// `parallelism` pricing calls in flight.
pub struct PriceContextLoader {
    pricing: Arc<dyn PricingStore>,
    config: PriceLookupConfig,
}

impl PriceContextLoader {
    pub fn new(pricing: Arc<dyn PricingStore>) -> Self {
        Self::with_config(pricing, PriceLookupConfig::default())
    }

    pub fn with_config(pricing: Arc<dyn PricingStore>, config: PriceLookupConfig) -> Self {
        Self { pricing, config }
    }
}

#[async_trait]
impl ContextLoader<CatalogProduct> for PriceContextLoader {
    #[instrument(skip(self, entities), fields(count = entities.len()))]
    async fn load(&self, entities: &[CatalogProduct]) -> Result<BuildContext, PipelineError> {
        if entities.is_empty() {
            return Ok(BuildContext::default());
        }

        let ids: Vec<String> = entities.iter().map(|p| p.id().to_string()).collect();
        let pages: Vec<Vec<String>> = ids
            .chunks(self.config.page_size.max(1))
            .map(<[String]>::to_vec)
            .collect();
        let page_count = pages.len();

        let prices: Vec<Vec<Price>> = stream::iter(pages)
            .map(|page| {
                let pricing = self.pricing.clone();
                async move { pricing.evaluate_prices(&page).await }
            })
            .buffer_unordered(self.config.parallelism.max(1))
            .try_collect()
            .await?;
        let prices: Vec<Price> = prices.into_iter().flatten().collect();
        debug!(pages = page_count, prices = prices.len(), "Evaluated prices");

        Ok(BuildContext::with_prices(prices))
    }
}
