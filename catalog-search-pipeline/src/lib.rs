//! # Catalog Search Pipeline
//!
//! Incremental maintenance of the catalog search index.
//!
//! ## Architecture
//!
//! 1. **Operations**: change logs are read and resolved to one operation per object
//! 2. **Partitioner**: object ids are chunked into bounded partitions
//! 3. **Builder**: entities are loaded and turned into index documents
//! 4. **Publisher**: documents are written to the index backend with retries
//! 5. **Orchestrator**: runs the index builder of each document type

pub mod builder;
pub mod errors;
pub mod index_builder;
pub mod operations;
pub mod orchestrator;
pub mod partitioner;
pub mod publisher;
pub mod retry;

pub use errors::{BuildError, PipelineError};
pub use index_builder::{EntityIndexBuilder, IndexingConfig, IndexingWindow, SearchIndexBuilder};
pub use orchestrator::{DocumentTypeReport, IndexingOrchestrator, IndexingReport, IndexingRequest};
pub use publisher::{IndexPublisher, PublisherConfig};
pub use retry::RetryPolicy;
