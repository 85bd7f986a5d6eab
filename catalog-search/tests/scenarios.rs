//! End-to-end scenarios: index a small catalog into the in-memory backend
//! and search it through the browsing services.

use std::sync::Arc;

use async_trait::async_trait;
use catalog_search::{Collaborators, Dependencies, Settings};
use catalog_search_browsing::ReconciliationOutcome;
use catalog_search_repository::{
    ChangeLogSource, EntityKind, EntityStore, InMemorySearchProvider, PricingStore, StoreError,
    StorePage, StoreQuery,
};
use catalog_search_shared::{
    CatalogEntity, CatalogItemCriteria, CatalogProduct, Category, CategoryCriteria, ChangeKind,
    ChangeRecord, Outline, Price, PriceRangeFilter, RangeFilterValue, ResponseGroup,
    SearchCriteria, SearchFilter, SortField,
};
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

struct MemoryStore<T> {
    items: Mutex<Vec<T>>,
}

impl<T> MemoryStore<T> {
    fn new(items: Vec<T>) -> Arc<Self> {
        Arc::new(Self {
            items: Mutex::new(items),
        })
    }
}

impl<T: CatalogEntity> MemoryStore<T> {
    async fn delete(&self, id: &str) {
        self.items.lock().await.retain(|item| item.id() != id);
    }
}

#[async_trait]
impl<T> EntityStore<T> for MemoryStore<T>
where
    T: CatalogEntity + Clone + Send + Sync,
{
    async fn get_by_ids(
        &self,
        ids: &[String],
        _response_group: ResponseGroup,
        _catalog: Option<&str>,
    ) -> Result<Vec<T>, StoreError> {
        Ok(self
            .items
            .lock()
            .await
            .iter()
            .filter(|item| ids.iter().any(|id| id == item.id()))
            .cloned()
            .collect())
    }

    async fn search(&self, query: &StoreQuery) -> Result<StorePage, StoreError> {
        let items = self.items.lock().await;
        Ok(StorePage {
            ids: items
                .iter()
                .skip(query.skip)
                .take(query.take)
                .map(|item| item.id().to_string())
                .collect(),
            total_count: items.len() as u64,
        })
    }
}

struct MemoryPricing(Vec<Price>);

#[async_trait]
impl PricingStore for MemoryPricing {
    async fn get_prices_by_ids(&self, ids: &[String]) -> Result<Vec<Price>, StoreError> {
        Ok(self.0.iter().filter(|p| ids.contains(&p.id)).cloned().collect())
    }

    async fn evaluate_prices(&self, product_ids: &[String]) -> Result<Vec<Price>, StoreError> {
        Ok(self
            .0
            .iter()
            .filter(|p| product_ids.contains(&p.product_id))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
struct MemoryChangeLog(Mutex<Vec<(EntityKind, ChangeRecord)>>);

#[async_trait]
impl ChangeLogSource for MemoryChangeLog {
    async fn find_change_history(
        &self,
        kind: EntityKind,
        _start: Option<DateTime<Utc>>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<ChangeRecord>, StoreError> {
        Ok(self
            .0
            .lock()
            .await
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, record)| record.clone())
            .collect())
    }
}

fn product(id: &str, catalog: &str, is_active: Option<bool>) -> CatalogProduct {
    let now = Utc::now();
    CatalogProduct {
        id: id.to_string(),
        code: id.to_uppercase(),
        name: format!("Product {}", id),
        catalog_id: catalog.to_string(),
        category_id: Some("shoes".to_string()),
        main_product_id: None,
        is_active,
        product_type: Some("Physical".to_string()),
        start_date: now - Duration::days(1),
        end_date: None,
        created_date: now - Duration::days(10),
        modified_date: None,
        priority: 0,
        vendor: None,
        outlines: vec![Outline::from_path(&format!("{}/shoes/{}", catalog, id))],
        links: vec![],
        property_values: vec![],
    }
}

fn category(id: &str, catalog: &str) -> Category {
    Category {
        id: id.to_string(),
        code: id.to_uppercase(),
        name: format!("Category {}", id),
        catalog_id: catalog.to_string(),
        parent_id: None,
        is_active: Some(true),
        priority: 0,
        created_date: Utc::now() - Duration::days(10),
        modified_date: None,
        outlines: vec![Outline::from_path(&format!("{}/{}", catalog, id))],
        links: vec![],
        property_values: vec![],
        parents: vec![],
    }
}

fn price(product_id: &str, currency: &str, list: f64) -> Price {
    Price {
        id: format!("{}-{}", product_id, currency),
        product_id: product_id.to_string(),
        pricelist_id: format!("default-{}", currency.to_lowercase()),
        currency: currency.to_string(),
        list,
        sale: None,
    }
}

/// Six products over two catalogs, one of them hidden.
fn sample_products() -> Vec<CatalogProduct> {
    vec![
        product("p1", "goods", Some(true)),
        product("p2", "goods", Some(true)),
        product("p3", "goods", None),
        product("p4", "other", Some(true)),
        product("p5", "other", Some(true)),
        product("p6", "other", Some(true)),
    ]
}

struct Fixture {
    deps: Dependencies,
    products: Arc<MemoryStore<CatalogProduct>>,
    change_log: Arc<MemoryChangeLog>,
}

async fn indexed(products: Vec<CatalogProduct>, prices: Vec<Price>, settings: Settings) -> Fixture {
    let products = MemoryStore::new(products);
    let change_log = Arc::new(MemoryChangeLog::default());
    let collaborators = Collaborators {
        products: products.clone(),
        categories: MemoryStore::new(vec![category("shoes", "goods"), category("hats", "other")]),
        pricing: Arc::new(MemoryPricing(prices)),
        change_log: change_log.clone(),
    };
    let deps =
        Dependencies::with_provider(settings, Arc::new(InMemorySearchProvider::new()), collaborators);

    let report = deps.index(true, None).await.unwrap();
    assert!(report.document_types.iter().all(|t| t.is_complete()));

    Fixture {
        deps,
        products,
        change_log,
    }
}

fn goods(with_hidden: bool) -> SearchCriteria {
    SearchCriteria::catalog_items(CatalogItemCriteria {
        catalog: Some("goods".into()),
        with_hidden,
        ..Default::default()
    })
    .with_sort(vec![SortField::asc("code")])
}

fn codes(items: &[CatalogProduct]) -> Vec<&str> {
    items.iter().map(|p| p.code.as_str()).collect()
}

#[tokio::test]
async fn test_rebuild_indexes_every_entity() {
    let fixture = indexed(sample_products(), vec![], Settings::default()).await;

    let report = fixture.deps.index(true, None).await.unwrap();

    let products = report.get("catalogitem").unwrap();
    assert_eq!(products.documents_indexed, 6);
    assert_eq!(products.build_failures, 0);
    assert_eq!(report.get("category").unwrap().documents_indexed, 2);
}

#[tokio::test]
async fn test_catalog_filter_and_hidden_products() {
    let fixture = indexed(sample_products(), vec![], Settings::default()).await;

    let visible = fixture.deps.search_products(&goods(false)).await.unwrap();
    assert_eq!(visible.total_count, 2);
    assert_eq!(codes(&visible.items), vec!["P1", "P2"]);
    assert_eq!(visible.outcome, ReconciliationOutcome::Complete);

    let all = fixture.deps.search_products(&goods(true)).await.unwrap();
    assert_eq!(all.total_count, 3);
    assert_eq!(codes(&all.items), vec!["P1", "P2", "P3"]);
}

#[tokio::test]
async fn test_future_start_date_is_excluded_until_requested() {
    let mut upcoming = product("p7", "goods", Some(true));
    upcoming.start_date = Utc::now() + Duration::days(2);
    let mut products = sample_products();
    products.push(upcoming);
    let fixture = indexed(products, vec![], Settings::default()).await;

    let now = fixture.deps.search_products(&goods(false)).await.unwrap();
    assert_eq!(codes(&now.items), vec!["P1", "P2"]);

    let later = SearchCriteria::catalog_items(CatalogItemCriteria {
        catalog: Some("goods".into()),
        start_date: Utc::now() + Duration::days(3),
        ..Default::default()
    })
    .with_sort(vec![SortField::asc("code")]);
    let result = fixture.deps.search_products(&later).await.unwrap();
    assert_eq!(codes(&result.items), vec!["P1", "P2", "P7"]);
}

#[tokio::test]
async fn test_price_facet_counts_only_its_currency() {
    let prices = vec![
        price("p1", "USD", 10.0),
        price("p2", "EUR", 10.0),
        price("p3", "USD", 50.0),
        price("p3", "EUR", 15.0),
    ];
    let fixture = indexed(sample_products(), prices, Settings::default()).await;

    let usd = SearchFilter::PriceRange(PriceRangeFilter {
        currency: "USD".into(),
        values: vec![
            RangeFilterValue::new("0_to_20", Some("0"), Some("20")),
            RangeFilterValue::new("20_to_100", Some("20"), Some("100")),
        ],
    });
    let criteria = goods(true).with_currency("USD").with_filter(usd);

    let result = fixture.deps.search_products(&criteria).await.unwrap();

    let price = result
        .aggregations
        .iter()
        .find(|a| a.field == "price")
        .unwrap();
    let count = |value: &str| {
        price
            .items
            .iter()
            .find(|i| i.value == value)
            .map(|i| i.count)
            .unwrap_or(0)
    };
    assert_eq!(count("0_to_20"), 1);
    assert_eq!(count("20_to_100"), 1);
    assert_eq!(price.aggregation_type, "pricerange");
}

#[tokio::test]
async fn test_deleted_product_is_reconciled_then_removed() {
    let fixture = indexed(sample_products(), vec![], Settings::default()).await;
    fixture.products.delete("p1").await;

    // The index still claims p1; the page grows until p2 fills the gap.
    let stale = fixture
        .deps
        .search_products(&goods(false).with_take(1))
        .await
        .unwrap();
    assert_eq!(codes(&stale.items), vec!["P2"]);
    assert_eq!(stale.searches, 2);
    assert_eq!(stale.total_count, 2);

    fixture.change_log.0.lock().await.push((
        EntityKind::Product,
        ChangeRecord::new("p1", Utc::now(), ChangeKind::Deleted),
    ));
    let report = fixture
        .deps
        .index(false, Some(Utc::now() - Duration::hours(1)))
        .await
        .unwrap();
    assert_eq!(report.get("catalogitem").unwrap().documents_removed, 1);

    let fresh = fixture.deps.search_products(&goods(false)).await.unwrap();
    assert_eq!(fresh.total_count, 1);
    assert_eq!(codes(&fresh.items), vec!["P2"]);
}

#[tokio::test]
async fn test_snapshots_serve_hydration() {
    let settings = Settings {
        use_full_object_index_storing: true,
        ..Default::default()
    };
    let fixture = indexed(sample_products(), vec![], settings).await;
    // Snapshots outlive the store rows they were built from.
    fixture.products.delete("p2").await;

    let result = fixture.deps.search_products(&goods(false)).await.unwrap();

    assert_eq!(codes(&result.items), vec!["P1", "P2"]);
    assert_eq!(result.searches, 1);
}

#[tokio::test]
async fn test_categories_by_outline() {
    let fixture = indexed(sample_products(), vec![], Settings::default()).await;

    let criteria = SearchCriteria::categories(CategoryCriteria {
        outlines: vec!["goods".into()],
        with_hidden: false,
    });
    let result = fixture.deps.search_categories(&criteria).await.unwrap();

    assert_eq!(result.items.len(), 1);
    assert_eq!(result.items[0].code, "SHOES");
}
