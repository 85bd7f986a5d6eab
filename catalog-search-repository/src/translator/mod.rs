//! Backend-neutral criteria translation.
//!
//! `CriteriaTranslator` turns `SearchCriteria` into a `TranslatedQuery`: a
//! small filter AST plus paging, sort and facet requests. The base
//! translation covers what every criteria shares; the criteria variant then
//! appends its own fragments (see [`fragments`]). Each backend renders or
//! evaluates the AST in its own dialect.

mod fragments;

use chrono::DateTime;
use tracing::debug;

use crate::errors::SearchError;
use catalog_search_shared::fields::{self, KEY_FIELD};
use catalog_search_shared::{
    CriteriaKind, FieldValue, RangeFilterValue, SearchCriteria, SearchFilter, SortField,
};

pub use fragments::{CatalogItemFragments, CategoryFragments, CriteriaFragments};

/// One end of a range.
#[derive(Debug, Clone, PartialEq)]
pub struct Bound {
    pub value: FieldValue,
    pub inclusive: bool,
}

impl Bound {
    pub fn inclusive(value: impl Into<FieldValue>) -> Self {
        Self {
            value: value.into(),
            inclusive: true,
        }
    }

    pub fn exclusive(value: impl Into<FieldValue>) -> Self {
        Self {
            value: value.into(),
            inclusive: false,
        }
    }
}

/// Filter AST shared by all backends.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryFilter {
    /// Field equals any of the values.
    Term { field: String, values: Vec<FieldValue> },
    /// Field equals one of the paths or lies below it.
    Prefix { field: String, values: Vec<String> },
    Range {
        field: String,
        lower: Option<Bound>,
        upper: Option<Bound>,
    },
    Exists { field: String },
    And(Vec<QueryFilter>),
    Or(Vec<QueryFilter>),
    Not(Box<QueryFilter>),
}

impl QueryFilter {
    pub fn term(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        QueryFilter::Term {
            field: field.into(),
            values: vec![value.into()],
        }
    }
}

/// A filter the caller selected, tagged with its facet key.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedFilter {
    pub key: String,
    pub filter: QueryFilter,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FacetValueRequest {
    pub id: String,
    pub filter: QueryFilter,
}

/// Counts to compute for one facet.
#[derive(Debug, Clone, PartialEq)]
pub struct FacetRequest {
    pub key: String,
    pub facet_type: String,
    pub values: Vec<FacetValueRequest>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedQuery {
    pub document_type: String,
    pub phrase: Option<String>,
    /// Content fields the phrase is matched against.
    pub content_fields: Vec<String>,
    /// Always applied.
    pub must: Vec<QueryFilter>,
    /// Applied to hits and to every facet except the filter's own.
    pub applied: Vec<KeyedFilter>,
    pub facets: Vec<FacetRequest>,
    pub sort: Vec<SortField>,
    pub skip: usize,
    pub take: usize,
}

impl TranslatedQuery {
    /// Applied filters that constrain the facet named `key`.
    pub fn applied_except<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a QueryFilter> + 'a {
        self.applied
            .iter()
            .filter(move |f| !f.key.eq_ignore_ascii_case(key))
            .map(|f| &f.filter)
    }
}

/// Translates criteria into a [`TranslatedQuery`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CriteriaTranslator;

impl CriteriaTranslator {
    pub fn new() -> Self {
        Self
    }

    pub fn translate(&self, criteria: &SearchCriteria) -> Result<TranslatedQuery, SearchError> {
        let mut query = self.translate_base(criteria)?;

        match &criteria.kind {
            CriteriaKind::Keyword => {}
            CriteriaKind::CatalogItem(item) => {
                CatalogItemFragments::new(item).append(criteria, &mut query)?
            }
            CriteriaKind::Category(category) => {
                CategoryFragments::new(category).append(criteria, &mut query)?
            }
        }

        debug!(
            document_type = %query.document_type,
            must = query.must.len(),
            applied = query.applied.len(),
            facets = query.facets.len(),
            "Translated criteria"
        );
        Ok(query)
    }

    fn translate_base(&self, criteria: &SearchCriteria) -> Result<TranslatedQuery, SearchError> {
        if criteria.document_type.trim().is_empty() {
            return Err(SearchError::translation("document type is required"));
        }

        let mut must = Vec::new();
        if !criteria.ids.is_empty() {
            must.push(QueryFilter::Term {
                field: KEY_FIELD.to_string(),
                values: criteria
                    .ids
                    .iter()
                    .map(|id| FieldValue::from(id.to_lowercase()))
                    .collect(),
            });
        }

        let currency = criteria.currency.as_deref();
        let mut applied = Vec::new();
        for filter in criteria
            .applied_filters
            .iter()
            .filter(|f| f.applies_to_currency(currency))
        {
            if let Some(translated) = self.translate_filter(filter, criteria)? {
                applied.push(KeyedFilter {
                    key: filter.key().to_string(),
                    filter: translated,
                });
            }
        }

        let mut facets = Vec::new();
        for filter in criteria
            .filters
            .iter()
            .filter(|f| f.applies_to_currency(currency))
        {
            let values = self.facet_values(filter, criteria)?;
            if !values.is_empty() {
                facets.push(FacetRequest {
                    key: filter.key().to_string(),
                    facet_type: filter.facet_type().to_string(),
                    values,
                });
            }
        }

        let mut content_fields = vec![fields::content_field(None)];
        if let Some(locale) = criteria.locale.as_deref() {
            content_fields.push(fields::content_field(Some(locale)));
        }

        Ok(TranslatedQuery {
            document_type: criteria.document_type.clone(),
            phrase: criteria
                .search_phrase
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string),
            content_fields,
            must,
            applied,
            facets,
            sort: criteria.sort.clone(),
            skip: criteria.skip,
            take: criteria.take,
        })
    }

    /// A selected filter as one OR over its values, or `None` when it has
    /// no values.
    fn translate_filter(
        &self,
        filter: &SearchFilter,
        criteria: &SearchCriteria,
    ) -> Result<Option<QueryFilter>, SearchError> {
        let alternatives: Vec<QueryFilter> = self
            .facet_values(filter, criteria)?
            .into_iter()
            .map(|v| v.filter)
            .collect();

        Ok(match alternatives.len() {
            0 => None,
            1 => alternatives.into_iter().next(),
            _ => Some(QueryFilter::Or(alternatives)),
        })
    }

    fn facet_values(
        &self,
        filter: &SearchFilter,
        criteria: &SearchCriteria,
    ) -> Result<Vec<FacetValueRequest>, SearchError> {
        match filter {
            SearchFilter::Attribute(attribute) => {
                let field = attribute.key.to_lowercase();
                Ok(attribute
                    .values
                    .iter()
                    .flatten()
                    .map(|v| FacetValueRequest {
                        id: v.id.clone(),
                        filter: QueryFilter::term(field.clone(), v.value.clone()),
                    })
                    .collect())
            }
            SearchFilter::Range(range) => {
                let field = range.key.to_lowercase();
                range
                    .values
                    .iter()
                    .map(|v| {
                        Ok(FacetValueRequest {
                            id: v.id.clone(),
                            filter: range_filter(&field, v)?,
                        })
                    })
                    .collect()
            }
            SearchFilter::PriceRange(price) => price
                .values
                .iter()
                .map(|v| {
                    Ok(FacetValueRequest {
                        id: v.id.clone(),
                        filter: price_range_filter(&price.currency, &criteria.pricelists, v)?,
                    })
                })
                .collect(),
        }
    }
}

fn parse_bound(raw: Option<&str>, inclusive: bool) -> Result<Option<Bound>, SearchError> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(None);
    };

    let value = if let Ok(number) = raw.parse::<f64>() {
        FieldValue::Number(number)
    } else if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        FieldValue::Date(date.to_utc())
    } else {
        return Err(SearchError::translation(format!(
            "range bound '{}' is neither a number nor a date",
            raw
        )));
    };

    Ok(Some(Bound { value, inclusive }))
}

fn range_filter(field: &str, value: &RangeFilterValue) -> Result<QueryFilter, SearchError> {
    Ok(QueryFilter::Range {
        field: field.to_string(),
        lower: parse_bound(value.lower.as_deref(), value.include_lower)?,
        upper: parse_bound(value.upper.as_deref(), value.include_upper)?,
    })
}

/// Price range honouring pricelist priority: the first pricelist that has a
/// price for the document decides whether it matches.
fn price_range_filter(
    currency: &str,
    pricelists: &[String],
    value: &RangeFilterValue,
) -> Result<QueryFilter, SearchError> {
    if pricelists.is_empty() {
        return range_filter(&fields::currency_price_field(currency), value);
    }

    let mut alternatives = Vec::with_capacity(pricelists.len());
    let mut preceding: Vec<QueryFilter> = Vec::new();
    for pricelist in pricelists {
        let field = fields::pricelist_price_field(currency, pricelist);
        let mut clause = preceding.clone();
        clause.push(range_filter(&field, value)?);
        alternatives.push(if clause.len() == 1 {
            clause.remove(0)
        } else {
            QueryFilter::And(clause)
        });
        preceding.push(QueryFilter::Not(Box::new(QueryFilter::Exists { field })));
    }

    Ok(if alternatives.len() == 1 {
        alternatives.remove(0)
    } else {
        QueryFilter::Or(alternatives)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_search_shared::{
        AttributeFilter, CatalogItemCriteria, PriceRangeFilter, RangeFilter,
    };

    fn price_filter(currency: &str) -> SearchFilter {
        SearchFilter::PriceRange(PriceRangeFilter {
            currency: currency.into(),
            values: vec![
                RangeFilterValue::new("0_to_100", Some("0"), Some("100")),
                RangeFilterValue::new("100_to_700", Some("100"), Some("700")),
            ],
        })
    }

    #[test]
    fn test_empty_document_type_is_rejected() {
        let criteria = SearchCriteria::keyword(" ");
        let result = CriteriaTranslator::new().translate(&criteria);
        assert!(matches!(result, Err(SearchError::QueryTranslationError(_))));
    }

    #[test]
    fn test_ids_become_lower_cased_key_filter() {
        let criteria = SearchCriteria::keyword("catalogitem").with_ids(vec!["ABC".into()]);
        let query = CriteriaTranslator::new().translate(&criteria).unwrap();
        assert_eq!(query.must, vec![QueryFilter::term("__key", "abc")]);
    }

    #[test]
    fn test_attribute_filter_ors_values() {
        let criteria = SearchCriteria::keyword("catalogitem").with_applied_filter(
            SearchFilter::Attribute(AttributeFilter::from_values("Color", ["red", "blue"])),
        );
        let query = CriteriaTranslator::new().translate(&criteria).unwrap();

        assert_eq!(query.applied.len(), 1);
        assert_eq!(query.applied[0].key, "Color");
        match &query.applied[0].filter {
            QueryFilter::Or(values) => {
                assert_eq!(values.len(), 2);
                assert_eq!(values[0], QueryFilter::term("color", "red"));
            }
            other => panic!("unexpected filter {:?}", other),
        }
    }

    #[test]
    fn test_range_bounds_keep_inclusivity() {
        let criteria = SearchCriteria::keyword("catalogitem").with_applied_filter(
            SearchFilter::Range(RangeFilter {
                key: "size".into(),
                values: vec![RangeFilterValue::new("5_to_10", Some("5"), Some("10"))],
            }),
        );
        let query = CriteriaTranslator::new().translate(&criteria).unwrap();

        assert_eq!(
            query.applied[0].filter,
            QueryFilter::Range {
                field: "size".into(),
                lower: Some(Bound::inclusive(5.0)),
                upper: Some(Bound::exclusive(10.0)),
            }
        );
    }

    #[test]
    fn test_unparseable_bound_is_translation_error() {
        let criteria = SearchCriteria::keyword("catalogitem").with_applied_filter(
            SearchFilter::Range(RangeFilter {
                key: "size".into(),
                values: vec![RangeFilterValue::new("bad", Some("small"), None)],
            }),
        );
        let result = CriteriaTranslator::new().translate(&criteria);
        assert!(matches!(result, Err(SearchError::QueryTranslationError(_))));
    }

    #[test]
    fn test_price_filter_in_other_currency_is_skipped() {
        let criteria = SearchCriteria::catalog_items(CatalogItemCriteria::default())
            .with_currency("USD")
            .with_filter(price_filter("EUR"))
            .with_applied_filter(price_filter("EUR").restrict_to(&["0_to_100".into()]));
        let query = CriteriaTranslator::new().translate(&criteria).unwrap();

        assert!(query.applied.is_empty());
        assert!(query.facets.is_empty());
    }

    #[test]
    fn test_price_filter_without_pricelists_uses_currency_field() {
        let criteria = SearchCriteria::keyword("catalogitem")
            .with_currency("USD")
            .with_filter(price_filter("usd"));
        let query = CriteriaTranslator::new().translate(&criteria).unwrap();

        assert_eq!(query.facets.len(), 1);
        assert_eq!(query.facets[0].key, "price");
        match &query.facets[0].values[0].filter {
            QueryFilter::Range { field, .. } => assert_eq!(field, "price_usd"),
            other => panic!("unexpected filter {:?}", other),
        }
    }

    #[test]
    fn test_price_filter_prefers_first_pricelist() {
        let criteria = SearchCriteria::keyword("catalogitem")
            .with_currency("USD")
            .with_pricelists(vec!["default".into(), "sale".into()])
            .with_applied_filter(price_filter("USD").restrict_to(&["0_to_100".into()]));
        let query = CriteriaTranslator::new().translate(&criteria).unwrap();

        let QueryFilter::Or(alternatives) = &query.applied[0].filter else {
            panic!("expected OR over pricelists");
        };
        assert_eq!(alternatives.len(), 2);
        assert!(matches!(&alternatives[0], QueryFilter::Range { field, .. } if field == "price_usd_default"));
        let QueryFilter::And(second) = &alternatives[1] else {
            panic!("expected AND for fallback pricelist");
        };
        assert_eq!(
            second[0],
            QueryFilter::Not(Box::new(QueryFilter::Exists {
                field: "price_usd_default".into()
            }))
        );
    }

    #[test]
    fn test_applied_except_skips_own_key() {
        let criteria = SearchCriteria::keyword("catalogitem")
            .with_applied_filter(SearchFilter::Attribute(AttributeFilter::from_values(
                "color",
                ["red"],
            )))
            .with_applied_filter(SearchFilter::Attribute(AttributeFilter::from_values(
                "brand",
                ["acme"],
            )));
        let query = CriteriaTranslator::new().translate(&criteria).unwrap();

        assert_eq!(query.applied_except("COLOR").count(), 1);
        assert_eq!(query.applied_except("size").count(), 2);
    }
}
