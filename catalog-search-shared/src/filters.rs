//! Facet and filter definitions.

use serde::{Deserialize, Serialize};

use crate::fields::PRICE_FIELD;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeFilterValue {
    pub id: String,
    pub value: String,
}

impl AttributeFilterValue {
    pub fn new(id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            value: value.into(),
        }
    }
}

/// Exact match on one of several values of a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeFilter {
    pub key: String,
    /// `None` means the filter accepts whatever values the request supplies.
    pub values: Option<Vec<AttributeFilterValue>>,
    #[serde(default)]
    pub is_localized: bool,
}

impl AttributeFilter {
    pub fn new(key: impl Into<String>, values: Vec<AttributeFilterValue>) -> Self {
        Self {
            key: key.into(),
            values: Some(values),
            is_localized: false,
        }
    }

    /// Build a filter whose value ids equal their values.
    pub fn from_values<I, S>(key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values
            .into_iter()
            .map(|v| {
                let v = v.into();
                AttributeFilterValue::new(v.clone(), v)
            })
            .collect();
        Self::new(key, values)
    }
}

/// One bucket of a range filter. Bounds are kept as strings and parsed by
/// the translator against the target field type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeFilterValue {
    pub id: String,
    pub lower: Option<String>,
    pub upper: Option<String>,
    pub include_lower: bool,
    pub include_upper: bool,
}

impl RangeFilterValue {
    /// A half-open bucket `[lower, upper)`.
    pub fn new(id: impl Into<String>, lower: Option<&str>, upper: Option<&str>) -> Self {
        Self {
            id: id.into(),
            lower: lower.map(str::to_string),
            upper: upper.map(str::to_string),
            include_lower: true,
            include_upper: false,
        }
    }

    pub fn inclusive(mut self, include_lower: bool, include_upper: bool) -> Self {
        self.include_lower = include_lower;
        self.include_upper = include_upper;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeFilter {
    pub key: String,
    pub values: Vec<RangeFilterValue>,
}

/// A range over prices in one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRangeFilter {
    pub currency: String,
    pub values: Vec<RangeFilterValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SearchFilter {
    Attribute(AttributeFilter),
    Range(RangeFilter),
    PriceRange(PriceRangeFilter),
}

impl SearchFilter {
    pub fn key(&self) -> &str {
        match self {
            SearchFilter::Attribute(f) => &f.key,
            SearchFilter::Range(f) => &f.key,
            SearchFilter::PriceRange(_) => PRICE_FIELD,
        }
    }

    /// Facet type name reported back to callers.
    pub fn facet_type(&self) -> &'static str {
        match self {
            SearchFilter::Attribute(_) => "attribute",
            SearchFilter::Range(_) => "range",
            SearchFilter::PriceRange(_) => "pricerange",
        }
    }

    pub fn currency(&self) -> Option<&str> {
        match self {
            SearchFilter::PriceRange(f) => Some(&f.currency),
            _ => None,
        }
    }

    /// True unless this is a price filter in a different currency.
    pub fn applies_to_currency(&self, currency: Option<&str>) -> bool {
        match (self.currency(), currency) {
            (Some(own), Some(requested)) => own.eq_ignore_ascii_case(requested),
            (Some(_), None) => false,
            (None, _) => true,
        }
    }

    /// Ids of the values this filter defines.
    pub fn value_ids(&self) -> Vec<&str> {
        match self {
            SearchFilter::Attribute(f) => f
                .values
                .iter()
                .flatten()
                .map(|v| v.id.as_str())
                .collect(),
            SearchFilter::Range(f) => f.values.iter().map(|v| v.id.as_str()).collect(),
            SearchFilter::PriceRange(f) => f.values.iter().map(|v| v.id.as_str()).collect(),
        }
    }

    /// Keep only the values whose ids are in `ids`.
    ///
    /// An attribute filter without predefined values takes `ids` as its
    /// values.
    pub fn restrict_to(&self, ids: &[String]) -> SearchFilter {
        let wanted = |id: &str| ids.iter().any(|i| i.eq_ignore_ascii_case(id));
        match self {
            SearchFilter::Attribute(f) => {
                let values = match &f.values {
                    Some(values) => values.iter().filter(|v| wanted(&v.id)).cloned().collect(),
                    None => ids
                        .iter()
                        .map(|id| AttributeFilterValue::new(id.clone(), id.clone()))
                        .collect(),
                };
                SearchFilter::Attribute(AttributeFilter {
                    key: f.key.clone(),
                    values: Some(values),
                    is_localized: f.is_localized,
                })
            }
            SearchFilter::Range(f) => SearchFilter::Range(RangeFilter {
                key: f.key.clone(),
                values: f.values.iter().filter(|v| wanted(&v.id)).cloned().collect(),
            }),
            SearchFilter::PriceRange(f) => SearchFilter::PriceRange(PriceRangeFilter {
                currency: f.currency.clone(),
                values: f.values.iter().filter(|v| wanted(&v.id)).cloned().collect(),
            }),
        }
    }
}
