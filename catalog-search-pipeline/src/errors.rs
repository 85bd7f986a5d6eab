//! Error types for the indexing pipeline.

use catalog_search_repository::{SearchError, StoreError};
use thiserror::Error;

/// Errors that can occur while maintaining the index.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Error from the index backend.
    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    /// Error from the authoritative store.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Invalid pipeline configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The run was cancelled before this step.
    #[error("Indexing cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Create a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

/// Failure to build the document of a single entity.
///
/// Build errors never abort a batch; the entity is skipped and the error
/// logged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    #[error("Invalid entity {entity_id}: {reason}")]
    InvalidEntity { entity_id: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl BuildError {
    pub fn invalid(entity_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEntity {
            entity_id: entity_id.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for BuildError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
