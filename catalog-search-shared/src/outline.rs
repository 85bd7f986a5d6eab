//! Materialized hierarchical paths.

use serde::{Deserialize, Serialize};

/// One segment of an outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineItem {
    pub id: String,
}

/// A root-to-leaf path. The last item is the entity itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outline {
    pub items: Vec<OutlineItem>,
}

impl Outline {
    pub fn new(ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            items: ids
                .into_iter()
                .map(|id| OutlineItem { id: id.into() })
                .collect(),
        }
    }

    /// Build an outline from a `/`-separated path.
    pub fn from_path(path: &str) -> Self {
        Self::new(path.split('/').filter(|segment| !segment.is_empty()))
    }

    /// The first segment, which names the catalog.
    pub fn root(&self) -> Option<&str> {
        self.items.first().map(|item| item.id.as_str())
    }

    /// Segments above the entity itself.
    pub fn ancestors(&self) -> &[OutlineItem] {
        match self.items.split_last() {
            Some((_, rest)) => rest,
            None => &[],
        }
    }

    pub fn to_path(&self) -> String {
        self.items
            .iter()
            .map(|item| item.id.as_str())
            .collect::<Vec<_>>()
            .join("/")
    }
}
