//! # Catalog Search
//!
//! Entry point for running catalog search: settings from the environment,
//! tracing setup and the wiring of index backend, indexing pipeline and
//! browsing services.

pub mod config;
pub mod telemetry;

pub use config::{Collaborators, Dependencies, Settings};

use thiserror::Error;

/// Errors that can occur during initialization or execution.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] catalog_search_pipeline::PipelineError),

    /// Browsing error.
    #[error("Browsing error: {0}")]
    Browsing(#[from] catalog_search_browsing::BrowsingError),

    /// Search error.
    #[error("Search error: {0}")]
    Search(#[from] catalog_search_repository::SearchError),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
