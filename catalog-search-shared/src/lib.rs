//! # Catalog Search Shared
//!
//! Types shared by the indexing pipeline, the repository backends and the
//! browsing service: operations and partitions, index documents, catalog
//! entities, search criteria and results.

pub mod catalog;
pub mod criteria;
pub mod document;
pub mod fields;
pub mod filters;
pub mod operation;
pub mod outline;
pub mod partition;
pub mod request;
pub mod result;

pub use catalog::{
    CatalogEntity, CatalogProduct, Category, CategoryLink, Price, PropertyValue,
    PropertyValueType, ResponseGroup,
};
pub use criteria::{
    CatalogItemCriteria, CategoryCriteria, CriteriaKind, SearchCriteria, SortField,
    CATALOG_ITEM_DOCUMENT_TYPE, CATEGORY_DOCUMENT_TYPE,
};
pub use document::{DocumentField, FieldValue, IndexDocument, IndexMode};
pub use filters::{
    AttributeFilter, AttributeFilterValue, PriceRangeFilter, RangeFilter, RangeFilterValue,
    SearchFilter,
};
pub use operation::{ChangeKind, ChangeRecord, Operation, OperationKind};
pub use outline::{Outline, OutlineItem};
pub use partition::Partition;
pub use request::{CategorySearchRequest, ProductSearchRequest};
pub use result::{DocumentRef, Facet, FacetGroup, FacetLabel, SearchResult};
