use std::collections::HashSet;

use super::{add_is, BuildContext, CommonFields, DocumentBuilder};
use crate::errors::BuildError;
use catalog_search_shared::fields;
use catalog_search_shared::{Category, DocumentField, IndexDocument};

const CATEGORY_TYPE: &str = "category";

/// Status of a category: only active categories are visible.
pub fn category_visibility(category: &Category) -> &'static str {
    if category.is_active == Some(true) {
        fields::STATUS_VISIBLE
    } else {
        fields::STATUS_HIDDEN
    }
}

/// Writes the core fields of a category document.
#[derive(Debug, Default)]
pub struct CategoryDocumentBuilder;

impl DocumentBuilder<Category> for CategoryDocumentBuilder {
    fn update_document(
        &self,
        document: &mut IndexDocument,
        category: &Category,
        _context: &BuildContext,
    ) -> Result<bool, BuildError> {
        if category.id.is_empty() {
            return Err(BuildError::invalid(&category.code, "category has no id"));
        }

        let status = category_visibility(category);

        CommonFields {
            id: &category.id,
            code: &category.code,
            name: &category.name,
            created_date: category.created_date,
            modified_date: category.modified_date,
            priority: category.priority,
        }
        .write(document);

        document.add(DocumentField::keyword(fields::TYPE_FIELD, CATEGORY_TYPE));
        document.add(DocumentField::keyword(fields::STATUS_FIELD, status));
        add_is(document, status);
        add_is(document, CATEGORY_TYPE);
        add_is(document, &category.code);

        if let Some(parent_id) = &category.parent_id {
            document.add(DocumentField::keyword(
                fields::PARENT_FIELD,
                parent_id.to_lowercase(),
            ));
        }
        for link in &category.links {
            if let Some(category_id) = &link.category_id {
                document.set(DocumentField::keyword(
                    fields::priority_field(&link.catalog_id, category_id),
                    link.priority,
                ));
            }
        }

        Ok(true)
    }
}

/// Restricts categories to the user groups allowed by the category and all
/// of its parents.
///
/// Categories without any restriction get `__any__`. When the restrictions
/// have no group in common the document gets `__none__`.
#[derive(Debug, Default)]
pub struct UserGroupsDocumentBuilder;

impl UserGroupsDocumentBuilder {
    fn groups_of(category: &Category) -> Vec<String> {
        category
            .property_values
            .iter()
            .filter(|p| p.property_name.eq_ignore_ascii_case(fields::USER_GROUPS_FIELD))
            .filter_map(|p| p.value.as_str())
            .map(str::to_string)
            .collect()
    }

    /// Intersection of the restrictions of `category` and its parents, or
    /// `None` when no category in the chain is restricted.
    pub fn user_groups(category: &Category) -> Option<Vec<String>> {
        let restricted: Vec<Vec<String>> = category
            .parents
            .iter()
            .chain(std::iter::once(category))
            .map(Self::groups_of)
            .filter(|groups| !groups.is_empty())
            .collect();

        let (first, rest) = restricted.split_first()?;
        let allowed: Vec<String> = first
            .iter()
            .filter(|group| {
                rest.iter().all(|other| {
                    other
                        .iter()
                        .any(|candidate| candidate.eq_ignore_ascii_case(group))
                })
            })
            .cloned()
            .collect();

        let mut seen = HashSet::new();
        Some(
            allowed
                .into_iter()
                .filter(|group| seen.insert(group.to_lowercase()))
                .collect(),
        )
    }
}

impl DocumentBuilder<Category> for UserGroupsDocumentBuilder {
    fn update_document(
        &self,
        document: &mut IndexDocument,
        category: &Category,
        _context: &BuildContext,
    ) -> Result<bool, BuildError> {
        let groups = match Self::user_groups(category) {
            None => vec![fields::ANY_USER_GROUP.to_string()],
            Some(groups) if groups.is_empty() => vec![fields::NO_USER_GROUP.to_string()],
            Some(groups) => groups,
        };

        let mut values = groups.into_iter();
        if let Some(first) = values.next() {
            document.set(DocumentField::keyword_collection(fields::USER_GROUPS_FIELD, first));
        }
        for group in values {
            document.add(DocumentField::keyword_collection(fields::USER_GROUPS_FIELD, group));
        }

        Ok(true)
    }
}
