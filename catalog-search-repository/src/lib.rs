//! # Catalog Search Repository
//!
//! Contracts for the collaborators of catalog search (index backend,
//! authoritative store, pricing and change log), the backend-neutral
//! criteria translator and two index backends: OpenSearch and in-memory.

pub mod errors;
pub mod interfaces;
pub mod memory;
pub mod opensearch;
pub mod translator;
pub mod types;

pub use errors::{SearchError, StoreError};
pub use interfaces::{ChangeLogSource, EntityStore, PricingStore, SearchProvider};
pub use memory::InMemorySearchProvider;
pub use opensearch::{IndexConfig, OpenSearchProvider};
pub use translator::{CriteriaTranslator, QueryFilter, TranslatedQuery};
pub use types::{BatchOperationSummary, EntityKind, StorePage, StoreQuery};
