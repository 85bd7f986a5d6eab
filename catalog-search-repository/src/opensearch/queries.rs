//! OpenSearch query builders.
//!
//! Renders a [`TranslatedQuery`] as an OpenSearch search body and reads the
//! response back into a [`SearchResult`]. Aggregation names are positional
//! (`f{facet}` / `v{value}`) because facet value ids may contain characters
//! OpenSearch rejects in aggregation names.

use serde_json::{json, Map, Value};

use crate::errors::SearchError;
use crate::translator::{Bound, QueryFilter, TranslatedQuery};
use catalog_search_shared::{DocumentRef, Facet, FacetGroup, SearchResult};

/// Render one filter node.
pub fn build_filter(filter: &QueryFilter) -> Value {
    match filter {
        QueryFilter::Term { field, values } => {
            let values: Vec<Value> = values.iter().map(|v| v.to_json()).collect();
            json!({ "terms": { field: values } })
        }
        QueryFilter::Prefix { field, values } => {
            let should: Vec<Value> = values
                .iter()
                .flat_map(|path| {
                    [
                        json!({ "term": { field: path } }),
                        json!({ "prefix": { field: format!("{}/", path) } }),
                    ]
                })
                .collect();
            json!({ "bool": { "should": should, "minimum_should_match": 1 } })
        }
        QueryFilter::Range {
            field,
            lower,
            upper,
        } => {
            let mut range = Map::new();
            if let Some(Bound { value, inclusive }) = lower {
                range.insert(if *inclusive { "gte" } else { "gt" }.into(), value.to_json());
            }
            if let Some(Bound { value, inclusive }) = upper {
                range.insert(if *inclusive { "lte" } else { "lt" }.into(), value.to_json());
            }
            json!({ "range": { field: range } })
        }
        QueryFilter::Exists { field } => json!({ "exists": { "field": field } }),
        QueryFilter::And(filters) => json!({ "bool": { "filter": build_filters(filters.iter()) } }),
        QueryFilter::Or(filters) => json!({
            "bool": {
                "should": build_filters(filters.iter()),
                "minimum_should_match": 1
            }
        }),
        QueryFilter::Not(inner) => json!({ "bool": { "must_not": [build_filter(inner)] } }),
    }
}

fn build_filters<'a>(filters: impl Iterator<Item = &'a QueryFilter>) -> Vec<Value> {
    filters.map(build_filter).collect()
}

fn build_text_query(query: &TranslatedQuery) -> Value {
    match &query.phrase {
        Some(phrase) => json!({
            "multi_match": {
                "query": phrase,
                "fields": query.content_fields,
                "operator": "and"
            }
        }),
        None => json!({ "match_all": {} }),
    }
}

fn build_sort(query: &TranslatedQuery) -> Vec<Value> {
    let mut sort: Vec<Value> = query
        .sort
        .iter()
        .map(|s| {
            let mut options = json!({
                "order": if s.descending { "desc" } else { "asc" },
                "missing": "_last"
            });
            if s.ignore_unmapped {
                options["unmapped_type"] = json!("long");
            }
            json!({ s.field.to_lowercase(): options })
        })
        .collect();
    sort.push(json!({ "_score": { "order": "desc" } }));
    sort
}

fn build_aggregations(query: &TranslatedQuery) -> Map<String, Value> {
    let mut aggs = Map::new();
    for (i, facet) in query.facets.iter().enumerate() {
        let mut values = Map::new();
        for (j, value) in facet.values.iter().enumerate() {
            values.insert(format!("v{}", j), json!({ "filter": build_filter(&value.filter) }));
        }
        let scope = build_filters(query.applied_except(&facet.key));
        aggs.insert(
            format!("f{}", i),
            json!({
                "filter": { "bool": { "filter": scope } },
                "aggs": values
            }),
        );
    }
    aggs
}

/// Build the complete search request body.
pub fn build_search_body(query: &TranslatedQuery) -> Value {
    let mut body = json!({
        "from": query.skip,
        "size": query.take,
        "track_total_hits": true,
        "query": {
            "bool": {
                "must": [build_text_query(query)],
                "filter": build_filters(query.must.iter())
            }
        },
        "sort": build_sort(query),
        "_source": { "excludes": [format!("{}*", catalog_search_shared::fields::CONTENT_FIELD)] }
    });

    if !query.applied.is_empty() {
        body["post_filter"] = json!({
            "bool": { "filter": build_filters(query.applied.iter().map(|f| &f.filter)) }
        });
    }

    let aggs = build_aggregations(query);
    if !aggs.is_empty() {
        body["aggs"] = Value::Object(aggs);
    }

    body
}

fn parse_hit(hit: &Value) -> Option<DocumentRef> {
    let id = hit.get("_id")?.as_str()?;
    Some(DocumentRef {
        id: id.to_string(),
        score: hit.get("_score").and_then(Value::as_f64),
        fields: hit
            .get("_source")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default(),
    })
}

/// Read a search response back against the query that produced it.
pub fn parse_search_response(
    query: &TranslatedQuery,
    response: &Value,
) -> Result<SearchResult, SearchError> {
    let hits = response
        .get("hits")
        .ok_or_else(|| SearchError::parse("response has no hits"))?;

    let total_count = hits
        .get("total")
        .and_then(|t| t.get("value").or(Some(t)))
        .and_then(Value::as_u64)
        .unwrap_or(0);

    let documents = hits
        .get("hits")
        .and_then(Value::as_array)
        .map(|hits| hits.iter().filter_map(parse_hit).collect())
        .unwrap_or_default();

    let facet_groups = query
        .facets
        .iter()
        .enumerate()
        .filter_map(|(i, facet)| {
            let agg = response.get("aggregations")?.get(format!("f{}", i))?;
            let facets: Vec<Facet> = facet
                .values
                .iter()
                .enumerate()
                .filter_map(|(j, value)| {
                    let count = agg.get(format!("v{}", j))?.get("doc_count")?.as_u64()?;
                    (count > 0).then(|| Facet {
                        key: value.id.clone(),
                        count,
                        labels: Vec::new(),
                    })
                })
                .collect();
            (!facets.is_empty()).then(|| FacetGroup {
                field_name: facet.key.clone(),
                facet_type: facet.facet_type.clone(),
                facets,
                labels: Vec::new(),
            })
        })
        .collect();

    Ok(SearchResult {
        total_count,
        documents,
        facet_groups,
    })
}
