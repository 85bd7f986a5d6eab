//! OpenSearch index configuration and mappings.
//!
//! Every `(scope, document type)` pair gets its own index. Fields are
//! mapped dynamically: strings become lower-case normalized keywords,
//! `__content*` fields are analyzed text and the `__object` snapshot is kept
//! in the source without being indexed.

use serde_json::{json, Value};

use catalog_search_shared::fields::{CONTENT_FIELD, OBJECT_FIELD};

/// Settings shared by all catalog indexes.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    pub number_of_shards: u32,
    pub number_of_replicas: u32,
    /// Maximum number of documents sent in one bulk request.
    pub max_batch_size: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            number_of_shards: 1,
            number_of_replicas: 1,
            max_batch_size: 1000,
        }
    }
}

impl IndexConfig {
    pub fn with_max_batch_size(max_batch_size: usize) -> Self {
        Self {
            max_batch_size,
            ..Default::default()
        }
    }

    /// Index name for a scope and document type, e.g. `b2b-store-catalogitem`.
    pub fn index_name(scope: &str, document_type: &str) -> String {
        format!("{}-{}", scope, document_type).to_lowercase()
    }

    /// Wildcard matching every index of a scope.
    pub fn scope_pattern(scope: &str) -> String {
        format!("{}-*", scope).to_lowercase()
    }

    /// Settings and dynamic mappings for a new index.
    pub fn index_settings(&self) -> Value {
        json!({
            "settings": {
                "number_of_shards": self.number_of_shards,
                "number_of_replicas": self.number_of_replicas,
                "analysis": {
                    "normalizer": {
                        "lowercase": {
                            "type": "custom",
                            "filter": ["lowercase"]
                        }
                    }
                }
            },
            "mappings": {
                "dynamic_templates": [
                    {
                        "object_snapshot": {
                            "match": OBJECT_FIELD,
                            "mapping": { "type": "text", "index": false }
                        }
                    },
                    {
                        "content": {
                            "match": format!("{}*", CONTENT_FIELD),
                            "match_mapping_type": "string",
                            "mapping": { "type": "text" }
                        }
                    },
                    {
                        "keywords": {
                            "match_mapping_type": "string",
                            "mapping": { "type": "keyword", "normalizer": "lowercase" }
                        }
                    }
                ]
            }
        })
    }
}
