//! Authoritative store error types.

use thiserror::Error;

/// Errors reported by the catalog, pricing and change-log stores.
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    /// Failed to reach the store.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The store did not answer in time.
    #[error("Timeout error: {0}")]
    TimeoutError(String),

    /// The store rejected or failed the query.
    #[error("Query error: {0}")]
    QueryError(String),

    /// A requested record does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl StoreError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a query error.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::QueryError(msg.into())
    }

    /// Create a not found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::ConnectionError(_) | StoreError::TimeoutError(_))
    }
}
