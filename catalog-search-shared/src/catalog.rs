//! Catalog entities owned by the authoritative store.
//!
//! These types are also the payload of the denormalized `__object` snapshot,
//! so they round-trip through serde.

use std::ops::BitOr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::outline::Outline;

/// Anything the store can hand out by id.
pub trait CatalogEntity {
    fn id(&self) -> &str;
}

/// Data type of a custom property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyValueType {
    ShortText,
    LongText,
    Number,
    Integer,
    Boolean,
    DateTime,
}

/// A custom property value attached to a product or category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyValue {
    pub property_name: String,
    pub value: Value,
    pub value_type: PropertyValueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
}

impl PropertyValue {
    pub fn new(
        property_name: impl Into<String>,
        value: impl Into<Value>,
        value_type: PropertyValueType,
    ) -> Self {
        Self {
            property_name: property_name.into(),
            value: value.into(),
            value_type,
            language_code: None,
        }
    }

    pub fn with_language(mut self, language_code: impl Into<String>) -> Self {
        self.language_code = Some(language_code.into());
        self
    }
}

/// Placement of an entity in a category other than its main one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryLink {
    pub catalog_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(default)]
    pub priority: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub id: String,
    pub code: String,
    pub name: String,
    pub catalog_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    /// Set on variations; variations are never shown on their own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_product_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
    pub start_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    pub created_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default)]
    pub outlines: Vec<Outline>,
    #[serde(default)]
    pub links: Vec<CategoryLink>,
    #[serde(default)]
    pub property_values: Vec<PropertyValue>,
}

impl CatalogEntity for CatalogProduct {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub code: String,
    pub name: String,
    pub catalog_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub priority: i32,
    pub created_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub outlines: Vec<Outline>,
    #[serde(default)]
    pub links: Vec<CategoryLink>,
    #[serde(default)]
    pub property_values: Vec<PropertyValue>,
    /// Ancestors from the root down, when loaded.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<Category>,
}

impl CatalogEntity for Category {
    fn id(&self) -> &str {
        &self.id
    }
}

/// A product price in one pricelist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub id: String,
    pub product_id: String,
    pub pricelist_id: String,
    pub currency: String,
    pub list: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sale: Option<f64>,
}

impl Price {
    /// Sale price when present, list price otherwise.
    pub fn effective_value(&self) -> f64 {
        self.sale.unwrap_or(self.list)
    }
}

impl CatalogEntity for Price {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Which parts of an entity the store should load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResponseGroup(u32);

impl ResponseGroup {
    pub const INFO: ResponseGroup = ResponseGroup(1);
    pub const OUTLINES: ResponseGroup = ResponseGroup(1 << 1);
    pub const LINKS: ResponseGroup = ResponseGroup(1 << 2);
    pub const PROPERTIES: ResponseGroup = ResponseGroup(1 << 3);
    pub const PARENTS: ResponseGroup = ResponseGroup(1 << 4);
    pub const FULL: ResponseGroup = ResponseGroup(0b1_1111);

    pub fn contains(self, other: ResponseGroup) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ResponseGroup {
    type Output = ResponseGroup;

    fn bitor(self, rhs: ResponseGroup) -> ResponseGroup {
        ResponseGroup(self.0 | rhs.0)
    }
}

impl Default for ResponseGroup {
    fn default() -> Self {
        ResponseGroup::INFO
    }
}
