//! OpenSearch implementation of the index backend.
//!
//! This module provides a concrete implementation of `SearchProvider`
//! using OpenSearch as the backend.

mod client;
mod index_config;
mod queries;

pub use client::OpenSearchProvider;
pub use index_config::IndexConfig;
pub use queries::{build_filter, build_search_body, parse_search_response};
