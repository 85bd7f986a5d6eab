//! # Catalog Search Browsing
//!
//! Serves searches over the catalog index while compensating for its lag
//! behind the authoritative store. Index hits are hydrated from entity
//! snapshots or the store. Hits that no longer resolve are replaced by
//! enlarging the page and searching again.
//!
//! ## Example
//!
//! ```ignore
//! let service = BrowsingService::new(provider, product_store, BrowsingConfig::default());
//! let result = service.search("store", &criteria, ResponseGroup::INFO).await?;
//! for product in result.items {
//!     println!("{}", product.code);
//! }
//! ```

pub mod aggregation;
pub mod config;
pub mod errors;
pub mod hydration;
pub mod service;

pub use aggregation::{to_aggregations, Aggregation, AggregationItem, AggregationLabel};
pub use config::BrowsingConfig;
pub use errors::BrowsingError;
pub use hydration::Hydrator;
pub use service::{BrowseResult, BrowsingService, ReconciliationOutcome};
