use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::{BuildContext, DocumentBuilder, IndexableEntity};
use crate::errors::BuildError;
use catalog_search_shared::fields;
use catalog_search_shared::{
    CatalogEntity, DocumentField, FieldValue, IndexDocument, PropertyValue, PropertyValueType,
};

/// Writes custom property values as typed fields and into the content
/// fields used for phrase search.
pub struct PropertyDocumentBuilder<T> {
    _entity: PhantomData<fn(&T)>,
}

impl<T> PropertyDocumentBuilder<T> {
    pub fn new() -> Self {
        Self {
            _entity: PhantomData,
        }
    }
}

impl<T> Default for PropertyDocumentBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn typed_value(entity_id: &str, property: &PropertyValue) -> Result<Option<FieldValue>, BuildError> {
    let invalid = || {
        BuildError::invalid(
            entity_id,
            format!(
                "property {} is not a valid {:?}",
                property.property_name, property.value_type
            ),
        )
    };

    let value = match property.value_type {
        PropertyValueType::ShortText => text_of(&property.value).map(FieldValue::from),
        PropertyValueType::LongText => text_of(&property.value).map(|s| FieldValue::from(s.to_lowercase())),
        PropertyValueType::Integer => Some(FieldValue::from(property.value.as_i64().ok_or_else(invalid)?)),
        PropertyValueType::Number => Some(FieldValue::from(property.value.as_f64().ok_or_else(invalid)?)),
        PropertyValueType::Boolean => Some(FieldValue::from(property.value.as_bool().ok_or_else(invalid)?)),
        PropertyValueType::DateTime => {
            let raw = property.value.as_str().ok_or_else(invalid)?;
            let date = DateTime::parse_from_rfc3339(raw).map_err(|_| invalid())?;
            Some(FieldValue::from(date.with_timezone(&Utc)))
        }
    };
    Ok(value)
}

impl<T: IndexableEntity> DocumentBuilder<T> for PropertyDocumentBuilder<T> {
    fn update_document(
        &self,
        document: &mut IndexDocument,
        entity: &T,
        _context: &BuildContext,
    ) -> Result<bool, BuildError> {
        for property in entity.property_values() {
            if property.value.is_null() || property.property_name.is_empty() {
                continue;
            }

            let name = property.property_name.to_lowercase();
            if name.starts_with(fields::RESERVED_PREFIX) {
                continue;
            }

            if matches!(
                property.value_type,
                PropertyValueType::ShortText | PropertyValueType::LongText
            ) {
                if let Some(text) = text_of(&property.value).filter(|t| !t.trim().is_empty()) {
                    document.add(DocumentField::text(
                        fields::content_field(property.language_code.as_deref()),
                        text.to_lowercase(),
                    ));
                }
            }

            if let Some(value) = typed_value(entity.id(), property)? {
                document.add(DocumentField::keyword(name, value));
            }
        }

        Ok(true)
    }
}
