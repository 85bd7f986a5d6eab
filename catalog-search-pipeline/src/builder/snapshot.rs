use std::marker::PhantomData;

use serde::Serialize;

use super::{BuildContext, DocumentBuilder};
use crate::errors::BuildError;
use catalog_search_shared::fields;
use catalog_search_shared::{DocumentField, IndexDocument};

/// Stores the serialized entity in `__object` so searches can hydrate
/// results without a store round trip.
pub struct SnapshotDocumentBuilder<T> {
    _entity: PhantomData<fn(&T)>,
}

impl<T> SnapshotDocumentBuilder<T> {
    pub fn new() -> Self {
        Self {
            _entity: PhantomData,
        }
    }
}

impl<T> Default for SnapshotDocumentBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Serialize> DocumentBuilder<T> for SnapshotDocumentBuilder<T> {
    fn update_document(
        &self,
        document: &mut IndexDocument,
        entity: &T,
        _context: &BuildContext,
    ) -> Result<bool, BuildError> {
        let snapshot = serde_json::to_string(entity)?;
        document.set(DocumentField::stored_only(fields::OBJECT_FIELD, snapshot));
        Ok(true)
    }
}
