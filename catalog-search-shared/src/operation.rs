//! Index operations and raw change-log records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What has to happen to an object's index document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Index,
    Remove,
}

/// A resolved mutation of a single object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub object_id: String,
    pub kind: OperationKind,
    pub timestamp: DateTime<Utc>,
}

impl Operation {
    pub fn new(object_id: impl Into<String>, kind: OperationKind, timestamp: DateTime<Utc>) -> Self {
        Self {
            object_id: object_id.into(),
            kind,
            timestamp,
        }
    }

    pub fn index(object_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(object_id, OperationKind::Index, timestamp)
    }

    pub fn remove(object_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(object_id, OperationKind::Remove, timestamp)
    }

    /// Returns true when `self` should replace `other` for the same object.
    ///
    /// The later timestamp wins; on an exact tie a `Remove` beats an `Index`.
    pub fn supersedes(&self, other: &Operation) -> bool {
        match self.timestamp.cmp(&other.timestamp) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Equal => {
                self.kind == OperationKind::Remove && other.kind == OperationKind::Index
            }
        }
    }
}

/// Kind of change recorded by the authoritative store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

impl From<ChangeKind> for OperationKind {
    fn from(kind: ChangeKind) -> Self {
        match kind {
            ChangeKind::Added | ChangeKind::Modified => OperationKind::Index,
            ChangeKind::Deleted => OperationKind::Remove,
        }
    }
}

/// One entry of an entity change log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub object_id: String,
    pub modified_at: DateTime<Utc>,
    pub kind: ChangeKind,
}

impl ChangeRecord {
    pub fn new(object_id: impl Into<String>, modified_at: DateTime<Utc>, kind: ChangeKind) -> Self {
        Self {
            object_id: object_id.into(),
            modified_at,
            kind,
        }
    }

    pub fn to_operation(&self) -> Operation {
        Operation::new(self.object_id.clone(), self.kind.into(), self.modified_at)
    }
}
