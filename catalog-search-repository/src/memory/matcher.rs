//! Evaluation of translated filters against in-memory documents.

use std::cmp::Ordering;

use catalog_search_shared::{FieldValue, IndexDocument, SortField};

use crate::translator::{Bound, QueryFilter};

/// Values of `field`, matched case-insensitively on the field name.
fn field_values<'a>(doc: &'a IndexDocument, field: &'a str) -> impl Iterator<Item = &'a FieldValue> + 'a {
    doc.fields()
        .iter()
        .filter(move |f| f.name.eq_ignore_ascii_case(field))
        .flat_map(|f| f.values.iter())
}

fn text_of(value: &FieldValue) -> String {
    match value {
        FieldValue::String(s) => s.to_lowercase(),
        other => other.to_json().to_string().trim_matches('"').to_lowercase(),
    }
}

fn values_equal(stored: &FieldValue, wanted: &FieldValue) -> bool {
    match stored.compare(wanted) {
        Some(ordering) => ordering == Ordering::Equal,
        None => text_of(stored) == text_of(wanted),
    }
}

fn within(value: &FieldValue, lower: Option<&Bound>, upper: Option<&Bound>) -> bool {
    let lower_ok = lower.map_or(true, |b| match value.compare(&b.value) {
        Some(Ordering::Greater) => true,
        Some(Ordering::Equal) => b.inclusive,
        _ => false,
    });
    let upper_ok = upper.map_or(true, |b| match value.compare(&b.value) {
        Some(Ordering::Less) => true,
        Some(Ordering::Equal) => b.inclusive,
        _ => false,
    });
    lower_ok && upper_ok
}

pub fn matches(doc: &IndexDocument, filter: &QueryFilter) -> bool {
    match filter {
        QueryFilter::Term { field, values } => {
            field_values(doc, field).any(|stored| values.iter().any(|v| values_equal(stored, v)))
        }
        QueryFilter::Prefix { field, values } => field_values(doc, field).any(|stored| {
            let path = text_of(stored);
            values.iter().any(|prefix| {
                path == *prefix
                    || (path.starts_with(prefix.as_str())
                        && path[prefix.len()..].starts_with('/'))
            })
        }),
        QueryFilter::Range {
            field,
            lower,
            upper,
        } => field_values(doc, field).any(|v| within(v, lower.as_ref(), upper.as_ref())),
        QueryFilter::Exists { field } => field_values(doc, field).next().is_some(),
        QueryFilter::And(filters) => filters.iter().all(|f| matches(doc, f)),
        QueryFilter::Or(filters) => filters.iter().any(|f| matches(doc, f)),
        QueryFilter::Not(inner) => !matches(doc, inner),
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// Number of phrase tokens found in the content fields, or `None` when a
/// token is missing.
pub fn phrase_score(doc: &IndexDocument, content_fields: &[String], phrase: &str) -> Option<f64> {
    let content: Vec<String> = content_fields
        .iter()
        .flat_map(|field| field_values(doc, field))
        .flat_map(|v| tokenize(&text_of(v)).collect::<Vec<_>>())
        .collect();

    let mut score = 0usize;
    for token in tokenize(phrase) {
        let hits = content.iter().filter(|t| **t == token).count();
        if hits == 0 {
            return None;
        }
        score += hits;
    }
    Some(score as f64)
}

/// Order two documents by the sort fields. Documents missing a field sort
/// after those that have it, in either direction.
pub fn compare_by(a: &IndexDocument, b: &IndexDocument, sort: &[SortField]) -> Ordering {
    for field in sort {
        let left = field_values(a, &field.field).next();
        let right = field_values(b, &field.field).next();
        let ordering = match (left, right) {
            (Some(l), Some(r)) => {
                let ordering = l.compare(r).unwrap_or(Ordering::Equal);
                if field.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_search_shared::DocumentField;

    fn doc() -> IndexDocument {
        let mut doc = IndexDocument::new("p1");
        doc.add(DocumentField::keyword_collection("__outline", "goods/shoes"));
        doc.add(DocumentField::keyword_collection("__outline", "goods/shoes/boots"));
        doc.add(DocumentField::keyword("Color", "Red"));
        doc.add(DocumentField::keyword("size", 7));
        doc.add(DocumentField::text("__content", "Red leather boots"));
        doc
    }

    #[test]
    fn test_term_is_case_insensitive() {
        assert!(matches(&doc(), &QueryFilter::term("color", "red")));
        assert!(matches(&doc(), &QueryFilter::term("size", "7")));
        assert!(!matches(&doc(), &QueryFilter::term("color", "blue")));
    }

    #[test]
    fn test_prefix_respects_path_segments() {
        let prefix = |p: &str| QueryFilter::Prefix {
            field: "__outline".into(),
            values: vec![p.into()],
        };
        assert!(matches(&doc(), &prefix("goods")));
        assert!(matches(&doc(), &prefix("goods/shoes/boots")));
        assert!(!matches(&doc(), &prefix("goods/sho")));
    }

    #[test]
    fn test_range_and_negation() {
        let range = QueryFilter::Range {
            field: "size".into(),
            lower: Some(Bound::inclusive(7.0)),
            upper: Some(Bound::exclusive(10.0)),
        };
        assert!(matches(&doc(), &range));
        assert!(!matches(
            &doc(),
            &QueryFilter::Not(Box::new(QueryFilter::Exists {
                field: "size".into()
            }))
        ));
    }

    #[test]
    fn test_phrase_requires_every_token() {
        let fields = vec!["__content".to_string()];
        assert_eq!(phrase_score(&doc(), &fields, "leather BOOTS"), Some(2.0));
        assert_eq!(phrase_score(&doc(), &fields, "leather sandals"), None);
    }

    #[test]
    fn test_missing_sort_values_go_last() {
        let with_size = doc();
        let without = IndexDocument::new("p2");
        let sort = vec![SortField::desc("size")];
        assert_eq!(compare_by(&with_size, &without, &sort), Ordering::Less);
        assert_eq!(compare_by(&without, &with_size, &sort), Ordering::Greater);
    }
}
