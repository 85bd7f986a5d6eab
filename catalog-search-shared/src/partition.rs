//! Bounded units of indexing work.

use serde::Serialize;

use crate::operation::OperationKind;

/// A non-empty batch of object ids that share one operation kind.
///
/// Partitions are created by the partitioner and never change afterwards,
/// so the fields are only reachable through accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Partition {
    kind: OperationKind,
    object_ids: Vec<String>,
}

impl Partition {
    /// Create a partition, returning `None` for an empty id list.
    pub fn new(kind: OperationKind, object_ids: Vec<String>) -> Option<Self> {
        if object_ids.is_empty() {
            return None;
        }
        Some(Self { kind, object_ids })
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn object_ids(&self) -> &[String] {
        &self.object_ids
    }

    pub fn len(&self) -> usize {
        self.object_ids.len()
    }

    /// Never true for a constructed partition.
    pub fn is_empty(&self) -> bool {
        self.object_ids.is_empty()
    }
}
