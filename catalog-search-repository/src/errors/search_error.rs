//! Search error types.
//!
//! This module defines the errors surfaced by index backends. Backend
//! specific failures are mapped onto these variants at the boundary so
//! callers never see a transport type.

use thiserror::Error;

/// Errors that can occur during search backend operations.
#[derive(Error, Debug, Clone)]
pub enum SearchError {
    /// Failed to reach the search backend.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The backend did not answer in time.
    #[error("Timeout error: {0}")]
    TimeoutError(String),

    /// The criteria could not be mapped to a backend query.
    #[error("Query translation error: {0}")]
    QueryTranslationError(String),

    /// Search query execution failed.
    #[error("Query error: {0}")]
    QueryError(String),

    /// Failed to index a single document.
    #[error("Index error: {0}")]
    IndexError(String),

    /// Bulk indexing operation had failures.
    #[error("Bulk index error: {0}")]
    BulkIndexError(String),

    /// Failed to delete documents.
    #[error("Delete error: {0}")]
    DeleteError(String),

    /// Failed to make pending writes visible.
    #[error("Commit error: {0}")]
    CommitError(String),

    /// Failed to create the search index.
    #[error("Index creation error: {0}")]
    IndexCreationError(String),

    /// Failed to parse response from the backend.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Failed to serialize data for the backend.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl SearchError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a timeout error.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::TimeoutError(msg.into())
    }

    /// Create a query translation error.
    pub fn translation(msg: impl Into<String>) -> Self {
        Self::QueryTranslationError(msg.into())
    }

    /// Create a query error.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::QueryError(msg.into())
    }

    /// Create an index error.
    pub fn index(msg: impl Into<String>) -> Self {
        Self::IndexError(msg.into())
    }

    /// Create a bulk index error.
    pub fn bulk_index(msg: impl Into<String>) -> Self {
        Self::BulkIndexError(msg.into())
    }

    /// Create a delete error.
    pub fn delete(msg: impl Into<String>) -> Self {
        Self::DeleteError(msg.into())
    }

    /// Create a commit error.
    pub fn commit(msg: impl Into<String>) -> Self {
        Self::CommitError(msg.into())
    }

    pub fn index_creation(msg: impl Into<String>) -> Self {
        Self::IndexCreationError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Whether retrying the same call may succeed.
    ///
    /// Connectivity and timeout failures are transient. Write failures are
    /// transient only when the backend reported throttling or unavailability.
    pub fn is_transient(&self) -> bool {
        match self {
            SearchError::ConnectionError(_) | SearchError::TimeoutError(_) => true,
            SearchError::IndexError(msg)
            | SearchError::BulkIndexError(msg)
            | SearchError::DeleteError(msg)
            | SearchError::CommitError(msg) => {
                let msg = msg.to_lowercase();
                msg.contains("rate limit")
                    || msg.contains("timeout")
                    || msg.contains("connection")
                    || msg.contains("503")
                    || msg.contains("429")
            }
            SearchError::QueryTranslationError(_)
            | SearchError::QueryError(_)
            | SearchError::IndexCreationError(_)
            | SearchError::ParseError(_)
            | SearchError::SerializationError(_) => false,
        }
    }
}

impl From<opensearch::Error> for SearchError {
    fn from(err: opensearch::Error) -> Self {
        if err.is_timeout() {
            Self::TimeoutError(err.to_string())
        } else {
            Self::ConnectionError(err.to_string())
        }
    }
}
