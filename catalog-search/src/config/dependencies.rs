//! Dependency initialization and wiring for catalog search.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use super::Settings;
use crate::AppError;
use catalog_search_browsing::{BrowseResult, BrowsingService};
use catalog_search_pipeline::{
    EntityIndexBuilder, IndexPublisher, IndexingOrchestrator, IndexingReport, IndexingRequest,
    SearchIndexBuilder,
};
use catalog_search_repository::{
    ChangeLogSource, EntityStore, IndexConfig, OpenSearchProvider, PricingStore, SearchProvider,
};
use catalog_search_shared::{CatalogProduct, Category, ResponseGroup, SearchCriteria};

/// The authoritative store and its change history, supplied by the host.
#[derive(Clone)]
pub struct Collaborators {
    pub products: Arc<dyn EntityStore<CatalogProduct>>,
    pub categories: Arc<dyn EntityStore<Category>>,
    pub pricing: Arc<dyn PricingStore>,
    pub change_log: Arc<dyn ChangeLogSource>,
}

/// Container for all initialized dependencies.
pub struct Dependencies {
    pub settings: Settings,
    pub provider: Arc<dyn SearchProvider>,
    /// Indexes products and categories.
    pub orchestrator: IndexingOrchestrator,
    pub products: BrowsingService<CatalogProduct>,
    pub categories: BrowsingService<Category>,
}

impl Dependencies {
    /// Initialize all dependencies against OpenSearch.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(AppError)` - If the OpenSearch client cannot be created
    pub async fn new(settings: Settings, collaborators: Collaborators) -> Result<Self, AppError> {
        info!(
            opensearch_url = %settings.opensearch_url,
            scope = %settings.scope,
            partition_size = settings.partition_size,
            "Initializing dependencies"
        );

        let provider = OpenSearchProvider::new(&settings.opensearch_url, IndexConfig::default())
            .await
            .map_err(|e| AppError::config(format!("Failed to create OpenSearch client: {}", e)))?;

        info!("OpenSearch provider created");

        Ok(Self::with_provider(settings, Arc::new(provider), collaborators))
    }

    /// Wire everything around an existing index backend.
    pub fn with_provider(
        settings: Settings,
        provider: Arc<dyn SearchProvider>,
        collaborators: Collaborators,
    ) -> Self {
        let publisher = Arc::new(IndexPublisher::with_config(
            provider.clone(),
            settings.publisher_config(),
        ));
        let indexing = settings.indexing_config();

        let builders: Vec<Arc<dyn SearchIndexBuilder>> = vec![
            Arc::new(EntityIndexBuilder::products(
                collaborators.products.clone(),
                collaborators.pricing.clone(),
                collaborators.change_log.clone(),
                publisher.clone(),
                indexing.clone(),
            )),
            Arc::new(EntityIndexBuilder::categories(
                collaborators.categories.clone(),
                collaborators.change_log.clone(),
                publisher,
                indexing,
            )),
        ];

        let browsing = settings.browsing_config();
        let products =
            BrowsingService::new(provider.clone(), collaborators.products, browsing.clone());
        let categories = BrowsingService::new(provider.clone(), collaborators.categories, browsing);

        Self {
            settings,
            provider,
            orchestrator: IndexingOrchestrator::new(builders),
            products,
            categories,
        }
    }

    /// Index every document type of the configured scope.
    ///
    /// A rebuild drops and rebuilds the indexes. Otherwise changes after
    /// `start` are applied.
    pub async fn index(
        &self,
        rebuild: bool,
        start: Option<DateTime<Utc>>,
    ) -> Result<IndexingReport, AppError> {
        let request = if rebuild {
            IndexingRequest::rebuild(self.settings.scope.clone())
        } else {
            IndexingRequest::incremental(self.settings.scope.clone(), start)
        };
        Ok(self.orchestrator.run(request).await?)
    }

    pub async fn search_products(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<BrowseResult<CatalogProduct>, AppError> {
        Ok(self
            .products
            .search(&self.settings.scope, criteria, ResponseGroup::FULL)
            .await?)
    }

    pub async fn search_categories(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<BrowseResult<Category>, AppError> {
        Ok(self
            .categories
            .search(&self.settings.scope, criteria, ResponseGroup::FULL)
            .await?)
    }
}
