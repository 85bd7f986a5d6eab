//! Criteria-specific filter fragments.

use catalog_search_shared::fields::{
    CATALOG_FIELD, END_DATE_FIELD, OUTLINE_FIELD, START_DATE_FIELD, STATUS_FIELD, STATUS_VISIBLE,
    TYPE_FIELD,
};
use catalog_search_shared::{CatalogItemCriteria, CategoryCriteria, FieldValue, SearchCriteria};

use super::{Bound, QueryFilter, TranslatedQuery};
use crate::errors::SearchError;

/// Extra filters contributed by a criteria variant on top of the base
/// translation.
pub trait CriteriaFragments {
    fn append(&self, criteria: &SearchCriteria, query: &mut TranslatedQuery)
        -> Result<(), SearchError>;
}

pub struct CatalogItemFragments<'a> {
    item: &'a CatalogItemCriteria,
}

impl<'a> CatalogItemFragments<'a> {
    pub fn new(item: &'a CatalogItemCriteria) -> Self {
        Self { item }
    }
}

impl CriteriaFragments for CatalogItemFragments<'_> {
    fn append(
        &self,
        _criteria: &SearchCriteria,
        query: &mut TranslatedQuery,
    ) -> Result<(), SearchError> {
        let item = self.item;

        query.must.push(QueryFilter::Range {
            field: START_DATE_FIELD.to_string(),
            lower: item.start_date_from.map(Bound::exclusive),
            upper: Some(Bound::inclusive(item.start_date)),
        });

        // Products without an end date are indexed with the far-future
        // sentinel, so the bound always applies.
        query.must.push(QueryFilter::Range {
            field: END_DATE_FIELD.to_string(),
            lower: Some(Bound::exclusive(item.end_date.unwrap_or(item.start_date))),
            upper: None,
        });

        if !item.class_types.is_empty() {
            query.must.push(QueryFilter::Term {
                field: TYPE_FIELD.to_string(),
                values: item.class_types.iter().map(|t| FieldValue::from(t.as_str())).collect(),
            });
        }

        if let Some(catalog) = item.catalog.as_deref().filter(|c| !c.is_empty()) {
            query
                .must
                .push(QueryFilter::term(CATALOG_FIELD, catalog.to_lowercase()));
        }

        if let Some(outlines) = outline_filter(&item.outlines) {
            query.must.push(outlines);
        }

        if !item.with_hidden {
            query.must.push(visible_only());
        }

        Ok(())
    }
}

pub struct CategoryFragments<'a> {
    category: &'a CategoryCriteria,
}

impl<'a> CategoryFragments<'a> {
    pub fn new(category: &'a CategoryCriteria) -> Self {
        Self { category }
    }
}

impl CriteriaFragments for CategoryFragments<'_> {
    fn append(
        &self,
        _criteria: &SearchCriteria,
        query: &mut TranslatedQuery,
    ) -> Result<(), SearchError> {
        if let Some(outlines) = outline_filter(&self.category.outlines) {
            query.must.push(outlines);
        }
        if !self.category.with_hidden {
            query.must.push(visible_only());
        }
        Ok(())
    }
}

fn visible_only() -> QueryFilter {
    QueryFilter::term(STATUS_FIELD, STATUS_VISIBLE)
}

/// Outline paths as prefix matches. Leading and trailing separators and
/// wildcards are ignored.
fn outline_filter(outlines: &[String]) -> Option<QueryFilter> {
    let paths: Vec<String> = outlines
        .iter()
        .map(|o| o.trim_matches(|c| c == '/' || c == '*').to_lowercase())
        .filter(|o| !o.is_empty())
        .collect();

    if paths.is_empty() {
        None
    } else {
        Some(QueryFilter::Prefix {
            field: OUTLINE_FIELD.to_string(),
            values: paths,
        })
    }
}
