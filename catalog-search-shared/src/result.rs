//! Search results returned by index backends.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::fields::OBJECT_FIELD;

/// A lightweight reference to an indexed document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub id: String,
    pub score: Option<f64>,
    /// Stored fields returned with the hit.
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl DocumentRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            score: None,
            fields: Map::new(),
        }
    }

    /// The serialized entity snapshot, when the document carries one.
    pub fn snapshot(&self) -> Option<&str> {
        match self.fields.get(OBJECT_FIELD) {
            Some(Value::String(s)) if !s.is_empty() => Some(s),
            Some(Value::Array(values)) => values.first().and_then(Value::as_str),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facet {
    pub key: String,
    pub count: u64,
    #[serde(default)]
    pub labels: Vec<FacetLabel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetLabel {
    pub language: Option<String>,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetGroup {
    pub field_name: String,
    pub facet_type: String,
    pub facets: Vec<Facet>,
    #[serde(default)]
    pub labels: Vec<FacetLabel>,
}

impl FacetGroup {
    pub fn count_of(&self, key: &str) -> Option<u64> {
        self.facets
            .iter()
            .find(|f| f.key.eq_ignore_ascii_case(key))
            .map(|f| f.count)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub total_count: u64,
    pub documents: Vec<DocumentRef>,
    pub facet_groups: Vec<FacetGroup>,
}

impl SearchResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn facet_group(&self, field_name: &str) -> Option<&FacetGroup> {
        self.facet_groups
            .iter()
            .find(|g| g.field_name.eq_ignore_ascii_case(field_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snapshot_lookup() {
        let mut doc = DocumentRef::new("p1");
        assert!(doc.snapshot().is_none());

        doc.fields.insert(OBJECT_FIELD.into(), json!("{\"id\":\"p1\"}"));
        assert_eq!(doc.snapshot(), Some("{\"id\":\"p1\"}"));

        doc.fields.insert(OBJECT_FIELD.into(), json!(["{}"]));
        assert_eq!(doc.snapshot(), Some("{}"));
    }

    #[test]
    fn test_facet_lookup_is_case_insensitive() {
        let result = SearchResult {
            total_count: 1,
            documents: vec![],
            facet_groups: vec![FacetGroup {
                field_name: "Color".into(),
                facet_type: "attribute".into(),
                facets: vec![Facet {
                    key: "Red".into(),
                    count: 2,
                    labels: vec![],
                }],
                labels: vec![],
            }],
        };

        let group = result.facet_group("color").unwrap();
        assert_eq!(group.count_of("red"), Some(2));
        assert_eq!(group.count_of("blue"), None);
    }
}
