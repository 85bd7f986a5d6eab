//! Conversion of storefront-style search requests into criteria.
//!
//! Terms arrive as `key:value1,value2` strings and sort instructions as
//! `field [asc|desc]`.

use serde::{Deserialize, Serialize};

use crate::criteria::{
    CatalogItemCriteria, CategoryCriteria, SearchCriteria, SortField, DEFAULT_TAKE,
};
use crate::fields::{self, NAME_FIELD, PRIORITY_FIELD, RESERVED_PREFIX, SORT_FIELD};
use crate::filters::{AttributeFilter, SearchFilter};

/// Term key whose values name filter values rather than a field.
const TAGS_TERM: &str = "tags";

/// A term key with its distinct values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermValues {
    pub key: String,
    pub values: Vec<String>,
}

/// Parse `key:v1,v2` terms, grouping values by key.
///
/// Entries without a `:` are ignored and empty values are dropped.
pub fn parse_terms(terms: &[String]) -> Vec<TermValues> {
    let mut result: Vec<TermValues> = Vec::new();

    for term in terms {
        let Some((key, values)) = term.split_once(':') else {
            continue;
        };

        let index = match result.iter().position(|t| t.key == key) {
            Some(index) => index,
            None => {
                result.push(TermValues {
                    key: key.to_string(),
                    values: Vec::new(),
                });
                result.len() - 1
            }
        };

        let entry = &mut result[index];
        for value in values.split(',').filter(|v| !v.is_empty()) {
            if !entry.values.iter().any(|v| v == value) {
                entry.values.push(value.to_string());
            }
        }
    }

    result
}

/// A parsed sort instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortInstruction {
    pub column: String,
    pub descending: bool,
}

/// Parse `column [direction]` entries. Only `desc` sorts descending.
pub fn parse_sort(sort: &[String]) -> Vec<SortInstruction> {
    sort.iter()
        .filter(|s| !s.trim().is_empty())
        .map(|s| {
            let (column, direction) = match s.trim().split_once(' ') {
                Some((column, direction)) => (column, direction.trim()),
                None => (s.trim(), ""),
            };
            SortInstruction {
                column: column.to_string(),
                descending: direction == "desc",
            }
        })
        .collect()
}

/// Last segment of a `category1/category2` outline.
fn category_of(outline: Option<&str>) -> &str {
    outline
        .and_then(|o| o.rsplit('/').next())
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSearchRequest {
    pub currency: Option<String>,
    #[serde(default)]
    pub terms: Vec<String>,
    pub search_phrase: Option<String>,
    /// `category1/category2`, without the catalog.
    pub outline: Option<String>,
    #[serde(default)]
    pub pricelists: Vec<String>,
    #[serde(default)]
    pub sort: Vec<String>,
    #[serde(default)]
    pub skip: usize,
    pub take: usize,
}

impl Default for ProductSearchRequest {
    fn default() -> Self {
        Self {
            currency: None,
            terms: Vec::new(),
            search_phrase: None,
            outline: None,
            pricelists: Vec::new(),
            sort: Vec::new(),
            skip: 0,
            take: DEFAULT_TAKE,
        }
    }
}

impl ProductSearchRequest {
    /// Build product criteria for `catalog`, offering `available` as facets.
    pub fn to_criteria(&self, catalog: &str, available: &[SearchFilter]) -> SearchCriteria {
        let outline = match self.outline.as_deref().filter(|o| !o.is_empty()) {
            Some(outline) => format!("{}/{}", catalog, outline),
            None => format!("{}*", catalog),
        };

        let mut criteria = SearchCriteria::catalog_items(CatalogItemCriteria {
            outlines: vec![outline],
            ..Default::default()
        })
        .with_skip(self.skip)
        .with_take(self.take)
        .with_pricelists(self.pricelists.clone());
        criteria.currency = self.currency.clone();
        criteria.search_phrase = self.search_phrase.clone();
        criteria.filters = available.to_vec();
        criteria.applied_filters = self.applied_filters(available);
        criteria.sort = self.sort_fields(catalog);
        criteria
    }

    fn applied_filters(&self, available: &[SearchFilter]) -> Vec<SearchFilter> {
        let currency = self.currency.as_deref();
        let candidates: Vec<&SearchFilter> = available
            .iter()
            .filter(|f| f.applies_to_currency(currency))
            .collect();

        let mut applied = Vec::new();
        for term in parse_terms(&self.terms) {
            let predefined = candidates
                .iter()
                .find(|f| f.key().eq_ignore_ascii_case(&term.key));

            match predefined {
                Some(filter) => applied.push(filter.restrict_to(&term.values)),
                None if term.key == TAGS_TERM => {
                    for value in &term.values {
                        let owner = candidates
                            .iter()
                            .find(|f| f.value_ids().iter().any(|id| id == value));
                        if let Some(filter) = owner {
                            applied.push(filter.restrict_to(&term.values));
                        }
                    }
                }
                None if !term.key.starts_with(RESERVED_PREFIX) => {
                    applied.push(SearchFilter::Attribute(AttributeFilter::from_values(
                        term.key.clone(),
                        term.values.clone(),
                    )));
                }
                None => {}
            }
        }
        applied
    }

    fn sort_fields(&self, catalog: &str) -> Vec<SortField> {
        let priority_field = fields::priority_field(catalog, category_of(self.outline.as_deref()));
        let mut sort = Vec::new();

        for instruction in parse_sort(&self.sort) {
            let column = instruction.column.to_lowercase();
            let descending = instruction.descending;
            match column.as_str() {
                "price" => {
                    if let Some(currency) = self.currency.as_deref() {
                        sort.extend(self.pricelists.iter().map(|pricelist| {
                            SortField::new(fields::pricelist_price_field(currency, pricelist), descending)
                                .ignoring_unmapped()
                        }));
                    }
                }
                "priority" => {
                    sort.push(SortField::new(priority_field.clone(), descending).ignoring_unmapped());
                    sort.push(SortField::new(PRIORITY_FIELD, descending));
                }
                "name" | "title" => sort.push(SortField::new(NAME_FIELD, descending)),
                _ => sort.push(SortField::new(column, descending)),
            }
        }

        if sort.is_empty() {
            sort.push(SortField::desc(priority_field).ignoring_unmapped());
            sort.push(SortField::desc(PRIORITY_FIELD));
            sort.push(SortField::asc(SORT_FIELD));
        }
        sort
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySearchRequest {
    pub outline: Option<String>,
    #[serde(default)]
    pub sort: Vec<String>,
    #[serde(default)]
    pub skip: usize,
    pub take: usize,
}

impl Default for CategorySearchRequest {
    fn default() -> Self {
        Self {
            outline: None,
            sort: Vec::new(),
            skip: 0,
            take: DEFAULT_TAKE,
        }
    }
}

impl CategorySearchRequest {
    pub fn to_criteria(&self, catalog: &str) -> SearchCriteria {
        let outline = match self.outline.as_deref().filter(|o| !o.is_empty()) {
            Some(outline) => format!("{}/{}", catalog, outline),
            None => format!("{}*", catalog),
        };

        let mut sort: Vec<SortField> = parse_sort(&self.sort)
            .into_iter()
            .map(|s| match s.column.to_lowercase().as_str() {
                "name" | "title" => SortField::new(NAME_FIELD, s.descending),
                other => SortField::new(other, s.descending),
            })
            .collect();
        if sort.is_empty() {
            sort.push(SortField::desc(PRIORITY_FIELD));
            sort.push(SortField::asc(SORT_FIELD));
        }

        SearchCriteria::categories(CategoryCriteria {
            outlines: vec![outline],
            with_hidden: false,
        })
        .with_skip(self.skip)
        .with_take(self.take)
        .with_sort(sort)
    }
}
