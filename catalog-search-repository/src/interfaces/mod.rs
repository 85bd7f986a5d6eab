//! Interface definitions for the index backend and the authoritative store.
//!
//! These traits allow for dependency injection and swappable backends.

mod catalog_store;
mod search_provider;

pub use catalog_store::{ChangeLogSource, EntityStore, PricingStore};
pub use search_provider::SearchProvider;
