//! Well-known index field names.
//!
//! Builders write these fields and the criteria translator queries them, so
//! both sides must agree on the exact spelling.

/// Lower-cased entity id, used for point deletes.
pub const KEY_FIELD: &str = "__key";
/// Entity type or product class.
pub const TYPE_FIELD: &str = "__type";
/// Default sort key (entity name).
pub const SORT_FIELD: &str = "__sort";
/// Expanded outline paths.
pub const OUTLINE_FIELD: &str = "__outline";
/// Free-text content.
pub const CONTENT_FIELD: &str = "__content";
/// Serialized entity snapshot.
pub const OBJECT_FIELD: &str = "__object";

pub const STATUS_FIELD: &str = "status";
pub const IS_FIELD: &str = "is";
pub const CATALOG_FIELD: &str = "catalog";
pub const CODE_FIELD: &str = "code";
pub const NAME_FIELD: &str = "name";
pub const START_DATE_FIELD: &str = "startdate";
pub const END_DATE_FIELD: &str = "enddate";
pub const CREATED_DATE_FIELD: &str = "createddate";
pub const LAST_MODIFIED_DATE_FIELD: &str = "lastmodifieddate";
pub const LAST_INDEX_DATE_FIELD: &str = "lastindexdate";
pub const PRIORITY_FIELD: &str = "priority";
pub const VENDOR_FIELD: &str = "vendor";
pub const PARENT_FIELD: &str = "parent";
pub const USER_GROUPS_FIELD: &str = "usergroups";
pub const PRICE_FIELD: &str = "price";

pub const STATUS_VISIBLE: &str = "visible";
pub const STATUS_HIDDEN: &str = "hidden";

/// Marker written to `usergroups` when no restriction applies.
pub const ANY_USER_GROUP: &str = "__any__";

/// Marker written to `usergroups` when the restrictions of a category and
/// its parents have no group in common.
pub const NO_USER_GROUP: &str = "__none__";

/// Keys starting with this prefix are reserved for system fields and never
/// become ad-hoc attribute filters.
pub const RESERVED_PREFIX: &str = "_";

/// `price_{currency}_{pricelist}`, lower-cased.
pub fn pricelist_price_field(currency: &str, pricelist: &str) -> String {
    format!("price_{}_{}", currency, pricelist).to_lowercase()
}

/// `price_{currency}`, lower-cased.
pub fn currency_price_field(currency: &str) -> String {
    format!("price_{}", currency).to_lowercase()
}

/// `priority_{catalog}_{category}`, lower-cased.
pub fn priority_field(catalog: &str, category: &str) -> String {
    format!("priority_{}_{}", catalog, category).to_lowercase()
}

/// `__content_{language}` for localized content, `__content` otherwise.
pub fn content_field(language: Option<&str>) -> String {
    match language {
        Some(lang) if !lang.is_empty() => format!("{}_{}", CONTENT_FIELD, lang).to_lowercase(),
        _ => CONTENT_FIELD.to_string(),
    }
}
