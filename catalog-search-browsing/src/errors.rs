//! Error types for the browsing service.

use catalog_search_repository::{SearchError, StoreError};
use thiserror::Error;

/// Errors surfaced to callers of the browsing service.
///
/// Stale index references are not errors; they end in a partial result.
#[derive(Error, Debug)]
pub enum BrowsingError {
    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl BrowsingError {
    /// True when the failure came from a collaborator that may recover.
    pub fn is_transient(&self) -> bool {
        match self {
            BrowsingError::Search(e) => e.is_transient(),
            BrowsingError::Store(e) => e.is_transient(),
        }
    }
}
