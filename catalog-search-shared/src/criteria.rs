//! Search criteria.
//!
//! A criteria value is immutable once built: the builder methods consume
//! `self` and return a new value, so a caller can derive a retry query from
//! an original request without touching it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::filters::SearchFilter;

pub const CATALOG_ITEM_DOCUMENT_TYPE: &str = "catalogitem";
pub const CATEGORY_DOCUMENT_TYPE: &str = "category";

pub const DEFAULT_TAKE: usize = 20;

/// One sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    pub field: String,
    pub descending: bool,
    /// Documents without the field are tolerated instead of failing the query.
    pub ignore_unmapped: bool,
}

impl SortField {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
            ignore_unmapped: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
            ignore_unmapped: false,
        }
    }

    pub fn new(field: impl Into<String>, descending: bool) -> Self {
        Self {
            field: field.into(),
            descending,
            ignore_unmapped: false,
        }
    }

    pub fn ignoring_unmapped(mut self) -> Self {
        self.ignore_unmapped = true;
        self
    }
}

/// Filters specific to product searches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItemCriteria {
    pub catalog: Option<String>,
    pub outlines: Vec<String>,
    pub class_types: Vec<String>,
    /// Upper bound (inclusive) on the entity start date.
    pub start_date: DateTime<Utc>,
    /// Exclusive lower bound on the entity start date.
    pub start_date_from: Option<DateTime<Utc>>,
    /// Exclusive lower bound on the entity end date.
    pub end_date: Option<DateTime<Utc>>,
    pub with_hidden: bool,
}

impl Default for CatalogItemCriteria {
    fn default() -> Self {
        Self {
            catalog: None,
            outlines: Vec::new(),
            class_types: Vec::new(),
            start_date: Utc::now(),
            start_date_from: None,
            end_date: None,
            with_hidden: false,
        }
    }
}

/// Filters specific to category searches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCriteria {
    pub outlines: Vec<String>,
    pub with_hidden: bool,
}

/// The query intent, which decides the extra filters a translator appends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CriteriaKind {
    Keyword,
    CatalogItem(CatalogItemCriteria),
    Category(CategoryCriteria),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchCriteria {
    pub document_type: String,
    pub search_phrase: Option<String>,
    pub ids: Vec<String>,
    pub locale: Option<String>,
    pub currency: Option<String>,
    pub pricelists: Vec<String>,
    /// Filters offered as facets.
    pub filters: Vec<SearchFilter>,
    /// Filters the caller has selected.
    pub applied_filters: Vec<SearchFilter>,
    pub sort: Vec<SortField>,
    pub skip: usize,
    pub take: usize,
    pub kind: CriteriaKind,
}

impl SearchCriteria {
    pub fn keyword(document_type: impl Into<String>) -> Self {
        Self {
            document_type: document_type.into(),
            search_phrase: None,
            ids: Vec::new(),
            locale: None,
            currency: None,
            pricelists: Vec::new(),
            filters: Vec::new(),
            applied_filters: Vec::new(),
            sort: Vec::new(),
            skip: 0,
            take: DEFAULT_TAKE,
            kind: CriteriaKind::Keyword,
        }
    }

    pub fn catalog_items(item: CatalogItemCriteria) -> Self {
        Self {
            kind: CriteriaKind::CatalogItem(item),
            ..Self::keyword(CATALOG_ITEM_DOCUMENT_TYPE)
        }
    }

    pub fn categories(category: CategoryCriteria) -> Self {
        Self {
            kind: CriteriaKind::Category(category),
            ..Self::keyword(CATEGORY_DOCUMENT_TYPE)
        }
    }

    pub fn with_take(mut self, take: usize) -> Self {
        self.take = take;
        self
    }

    pub fn with_skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    pub fn with_phrase(mut self, phrase: impl Into<String>) -> Self {
        self.search_phrase = Some(phrase.into());
        self
    }

    pub fn with_ids(mut self, ids: Vec<String>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn with_pricelists(mut self, pricelists: Vec<String>) -> Self {
        self.pricelists = pricelists;
        self
    }

    pub fn with_filter(mut self, filter: SearchFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_applied_filter(mut self, filter: SearchFilter) -> Self {
        self.applied_filters.push(filter);
        self
    }

    pub fn with_sort(mut self, sort: Vec<SortField>) -> Self {
        self.sort = sort;
        self
    }

    /// Catalog to pass to the store as a loading hint.
    pub fn catalog_hint(&self) -> Option<&str> {
        match &self.kind {
            CriteriaKind::CatalogItem(item) => item.catalog.as_deref(),
            _ => None,
        }
    }
}
