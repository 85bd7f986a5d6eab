//! Request and response types shared by the repository contracts.

use crate::errors::SearchError;

/// Result of a batch operation for a single document.
///
/// This struct represents the outcome of one operation within a batch (for
/// example indexing one document). It indicates whether the operation
/// succeeded and includes error details if it failed.
#[derive(Debug, Clone)]
pub struct BatchOperationResult {
    /// Id of the document the operation targeted.
    pub document_id: String,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Error if the operation failed.
    pub error: Option<SearchError>,
}

/// Summary of a batch operation containing aggregate statistics and individual results.
///
/// This allows callers to handle partial failures without failing the whole
/// batch.
#[derive(Debug, Clone, Default)]
pub struct BatchOperationSummary {
    /// Total number of items in the batch.
    pub total: usize,
    /// Number of successful operations.
    pub succeeded: usize,
    /// Number of failed operations.
    pub failed: usize,
    /// Individual results for each item.
    pub results: Vec<BatchOperationResult>,
}

impl BatchOperationSummary {
    pub fn push(&mut self, document_id: impl Into<String>, outcome: Result<(), SearchError>) {
        self.total += 1;
        let (success, error) = match outcome {
            Ok(()) => {
                self.succeeded += 1;
                (true, None)
            }
            Err(e) => {
                self.failed += 1;
                (false, Some(e))
            }
        };
        self.results.push(BatchOperationResult {
            document_id: document_id.into(),
            success,
            error,
        });
    }

    pub fn merge(&mut self, other: BatchOperationSummary) {
        self.total += other.total;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.results.extend(other.results);
    }

    /// First failure, used when a caller needs a single error to propagate.
    pub fn first_error(&self) -> Option<&SearchError> {
        self.results.iter().find_map(|r| r.error.as_ref())
    }
}

/// Kind of entity tracked by the authoritative store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Product,
    Category,
    Price,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Product => "Product",
            EntityKind::Category => "Category",
            EntityKind::Price => "Price",
        }
    }
}

/// Paging query against the authoritative store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreQuery {
    pub skip: usize,
    pub take: usize,
    pub with_hidden: bool,
    pub catalog: Option<String>,
}

impl StoreQuery {
    /// A query that only asks for the total count.
    pub fn count_only() -> Self {
        Self {
            take: 0,
            with_hidden: true,
            ..Default::default()
        }
    }

    pub fn page(skip: usize, take: usize) -> Self {
        Self {
            skip,
            take,
            with_hidden: true,
            catalog: None,
        }
    }
}

/// One page of store ids together with the total number of matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorePage {
    pub ids: Vec<String>,
    pub total_count: u64,
}
