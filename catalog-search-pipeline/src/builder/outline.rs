use std::collections::HashSet;
use std::marker::PhantomData;

use super::{BuildContext, DocumentBuilder, IndexableEntity};
use crate::errors::BuildError;
use catalog_search_shared::fields;
use catalog_search_shared::{DocumentField, IndexDocument, Outline};

/// Expand an outline into the paths a document can be found under.
///
/// The leaf item (the entity itself) is dropped. The result holds every
/// prefix from full depth down to the root and, for deeper outlines, a
/// `{root}/{item}` shortcut for each item below the root.
pub fn expand_outline(outline: &Outline) -> Vec<String> {
    let items: Vec<&str> = outline
        .ancestors()
        .iter()
        .map(|item| item.id.as_str())
        .collect();

    let mut result: Vec<String> = (1..=items.len())
        .rev()
        .map(|depth| items[..depth].join("/"))
        .collect();

    if items.len() > 2 {
        let root = items[0];
        result.extend(items[1..].iter().map(|item| format!("{}/{}", root, item)));
    }

    dedup_ignore_case(result)
}

fn dedup_ignore_case(values: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|value| seen.insert(value.to_lowercase()))
        .collect()
}

/// Writes `catalog` and `__outline`.
pub struct OutlineDocumentBuilder<T> {
    _entity: PhantomData<fn(&T)>,
}

impl<T> OutlineDocumentBuilder<T> {
    pub fn new() -> Self {
        Self {
            _entity: PhantomData,
        }
    }
}

impl<T> Default for OutlineDocumentBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: IndexableEntity> DocumentBuilder<T> for OutlineDocumentBuilder<T> {
    fn update_document(
        &self,
        document: &mut IndexDocument,
        entity: &T,
        _context: &BuildContext,
    ) -> Result<bool, BuildError> {
        let catalogs = dedup_ignore_case(
            entity
                .outlines()
                .iter()
                .filter_map(Outline::root)
                .map(str::to_string),
        );
        for catalog in catalogs {
            document.add(DocumentField::keyword_collection(
                fields::CATALOG_FIELD,
                catalog.to_lowercase(),
            ));
        }

        let paths = dedup_ignore_case(entity.outlines().iter().flat_map(expand_outline));
        for path in paths {
            document.add(DocumentField::keyword_collection(
                fields::OUTLINE_FIELD,
                path.to_lowercase(),
            ));
        }

        Ok(true)
    }
}
