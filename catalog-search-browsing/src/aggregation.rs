//! Maps facet groups of a search result to aggregations for callers.

use serde::{Deserialize, Serialize};

use catalog_search_shared::{Facet, FacetGroup, FacetLabel, SearchFilter};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationLabel {
    pub language: Option<String>,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationItem {
    pub value: String,
    pub count: u64,
    pub is_applied: bool,
    pub labels: Vec<AggregationLabel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    pub aggregation_type: String,
    pub field: String,
    pub items: Vec<AggregationItem>,
    pub labels: Vec<AggregationLabel>,
}

fn labels(labels: &[FacetLabel]) -> Vec<AggregationLabel> {
    labels
        .iter()
        .map(|l| AggregationLabel {
            language: l.language.clone(),
            label: l.label.clone(),
        })
        .collect()
}

/// Value ids and attribute values of the applied filters.
fn applied_values(applied_filters: &[SearchFilter]) -> Vec<&str> {
    let mut values = Vec::new();
    for filter in applied_filters {
        values.extend(filter.value_ids());
        if let SearchFilter::Attribute(attribute) = filter {
            values.extend(attribute.values.iter().flatten().map(|v| v.value.as_str()));
        }
    }
    values
}

fn item(facet: &Facet, applied: &[&str]) -> AggregationItem {
    AggregationItem {
        value: facet.key.clone(),
        count: facet.count,
        is_applied: applied.iter().any(|v| v.eq_ignore_ascii_case(&facet.key)),
        labels: labels(&facet.labels),
    }
}

/// Convert facet groups to aggregations, marking the items the caller has
/// applied. Groups without items are dropped.
pub fn to_aggregations(
    facet_groups: &[FacetGroup],
    applied_filters: &[SearchFilter],
) -> Vec<Aggregation> {
    let applied = applied_values(applied_filters);

    facet_groups
        .iter()
        .filter(|group| !group.facets.is_empty())
        .map(|group| Aggregation {
            aggregation_type: group.facet_type.clone(),
            field: group.field_name.clone(),
            items: group.facets.iter().map(|f| item(f, &applied)).collect(),
            labels: labels(&group.labels),
        })
        .collect()
}
