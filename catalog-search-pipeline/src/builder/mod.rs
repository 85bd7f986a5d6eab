//! Document builders.
//!
//! Each builder contributes fields to an [`IndexDocument`] and votes on
//! whether the entity should be indexed at all. A [`BatchDocumentBuilder`]
//! runs a configured list of builders over a batch of entities.

mod category;
mod context;
mod outline;
mod price;
mod product;
mod property;
mod snapshot;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::errors::BuildError;
use catalog_search_shared::fields;
use catalog_search_shared::{
    CatalogEntity, CatalogProduct, Category, DocumentField, IndexDocument, Outline, PropertyValue,
};

pub use category::{category_visibility, CategoryDocumentBuilder, UserGroupsDocumentBuilder};
pub use context::{BuildContext, ContextLoader, EmptyContextLoader, PriceContextLoader};
pub use outline::{expand_outline, OutlineDocumentBuilder};
pub use price::PriceDocumentBuilder;
pub use product::{open_end_date, product_visibility, ProductDocumentBuilder};
pub use property::PropertyDocumentBuilder;
pub use snapshot::SnapshotDocumentBuilder;

/// Contributes fields of one entity to its index document.
pub trait DocumentBuilder<T>: Send + Sync {
    /// Add fields for `entity` to `document`.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The entity may be indexed
    /// * `Ok(false)` - The builder vetoes indexing the entity
    /// * `Err(BuildError)` - The entity cannot be built; treated as a veto
    fn update_document(
        &self,
        document: &mut IndexDocument,
        entity: &T,
        context: &BuildContext,
    ) -> Result<bool, BuildError>;
}

/// Catalog entities that carry outlines and property values.
pub trait IndexableEntity: CatalogEntity + Send + Sync {
    fn outlines(&self) -> &[Outline];
    fn property_values(&self) -> &[PropertyValue];
}

impl IndexableEntity for CatalogProduct {
    fn outlines(&self) -> &[Outline] {
        &self.outlines
    }

    fn property_values(&self) -> &[PropertyValue] {
        &self.property_values
    }
}

impl IndexableEntity for Category {
    fn outlines(&self) -> &[Outline] {
        &self.outlines
    }

    fn property_values(&self) -> &[PropertyValue] {
        &self.property_values
    }
}

/// Documents produced from one batch of entities.
#[derive(Debug, Default)]
pub struct BatchBuild {
    /// Documents of the entities every builder accepted, in input order.
    pub documents: Vec<IndexDocument>,
    /// Number of entities vetoed by at least one builder.
    pub vetoed: usize,
    /// Entities that failed to build.
    pub failures: Vec<BuildError>,
}

/// Runs builders in order over a batch of entities.
pub struct BatchDocumentBuilder<T> {
    builders: Vec<Arc<dyn DocumentBuilder<T>>>,
}

impl<T: CatalogEntity> BatchDocumentBuilder<T> {
    pub fn new(builders: Vec<Arc<dyn DocumentBuilder<T>>>) -> Self {
        Self { builders }
    }

    /// Build documents for `entities`.
    ///
    /// An entity is kept only when every builder votes for it. A failing
    /// entity never affects its siblings.
    pub fn build(&self, entities: &[T], context: &BuildContext) -> BatchBuild {
        let mut batch = BatchBuild::default();

        for entity in entities {
            let mut document = IndexDocument::new(entity.id());
            let mut keep = true;
            let mut failed = false;

            for builder in &self.builders {
                match builder.update_document(&mut document, entity, context) {
                    Ok(vote) => keep &= vote,
                    Err(e) => {
                        warn!(entity_id = %entity.id(), error = %e, "Failed to build document");
                        batch.failures.push(e);
                        failed = true;
                        break;
                    }
                }
            }

            if failed {
                continue;
            }
            if keep {
                batch.documents.push(document);
            } else {
                debug!(entity_id = %entity.id(), "Entity vetoed");
                batch.vetoed += 1;
            }
        }

        batch
    }
}

pub(crate) fn add_is(document: &mut IndexDocument, value: &str) {
    document.add(DocumentField::keyword_collection(fields::IS_FIELD, value));
}

/// Fields shared by product and category documents.
pub(crate) struct CommonFields<'a> {
    pub id: &'a str,
    pub code: &'a str,
    pub name: &'a str,
    pub created_date: DateTime<Utc>,
    pub modified_date: Option<DateTime<Utc>>,
    pub priority: i32,
}

impl CommonFields<'_> {
    pub(crate) fn write(&self, document: &mut IndexDocument) {
        document.add(DocumentField::keyword(fields::KEY_FIELD, self.id.to_lowercase()));
        document.add(DocumentField::keyword(fields::SORT_FIELD, self.name));
        document.add(DocumentField::keyword(fields::CODE_FIELD, self.code));
        document.add(DocumentField::keyword(fields::NAME_FIELD, self.name));
        document.add(DocumentField::keyword(fields::CREATED_DATE_FIELD, self.created_date));
        document.add(DocumentField::keyword(
            fields::LAST_MODIFIED_DATE_FIELD,
            self.modified_date.unwrap_or(self.created_date),
        ));
        document.add(DocumentField::keyword(fields::PRIORITY_FIELD, self.priority));
        document.add(DocumentField::keyword(fields::LAST_INDEX_DATE_FIELD, Utc::now()));
        document.add(DocumentField::text(fields::CONTENT_FIELD, self.name));
        document.add(DocumentField::text(fields::CONTENT_FIELD, self.code));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_search_shared::FieldValue;

    struct Named(String);

    impl CatalogEntity for Named {
        fn id(&self) -> &str {
            &self.0
        }
    }

    struct TagBuilder;

    impl DocumentBuilder<Named> for TagBuilder {
        fn update_document(
            &self,
            document: &mut IndexDocument,
            entity: &Named,
            _context: &BuildContext,
        ) -> Result<bool, BuildError> {
            document.add(DocumentField::keyword("tag", entity.0.as_str()));
            Ok(true)
        }
    }

    struct RejectingBuilder;

    impl DocumentBuilder<Named> for RejectingBuilder {
        fn update_document(
            &self,
            _document: &mut IndexDocument,
            entity: &Named,
            _context: &BuildContext,
        ) -> Result<bool, BuildError> {
            match entity.0.as_str() {
                "broken" => Err(BuildError::invalid("broken", "missing name")),
                "vetoed" => Ok(false),
                _ => Ok(true),
            }
        }
    }

    fn batch_builder() -> BatchDocumentBuilder<Named> {
        BatchDocumentBuilder::new(vec![Arc::new(TagBuilder), Arc::new(RejectingBuilder)])
    }

    #[test]
    fn test_failure_is_isolated() {
        let entities: Vec<Named> = ["a", "broken", "b", "c"]
            .iter()
            .map(|id| Named(id.to_string()))
            .collect();

        let batch = batch_builder().build(&entities, &BuildContext::default());

        let ids: Vec<&str> = batch.documents.iter().map(|d| d.id()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(batch.failures.len(), 1);
        assert_eq!(batch.vetoed, 0);
        assert_eq!(batch.documents[1].values("tag"), &[FieldValue::from("b")]);
    }

    #[test]
    fn test_any_veto_excludes_entity() {
        let entities = vec![Named("vetoed".into()), Named("kept".into())];

        let batch = batch_builder().build(&entities, &BuildContext::default());

        assert_eq!(batch.documents.len(), 1);
        assert_eq!(batch.documents[0].id(), "kept");
        assert_eq!(batch.vetoed, 1);
        assert!(batch.failures.is_empty());
    }
}
