//! Index documents built from catalog entities.

use std::cmp::Ordering;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

/// A single typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    Date(DateTime<Utc>),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Compare two values of compatible types.
    ///
    /// Integers and numbers compare numerically; strings compare
    /// case-insensitively. Mismatched types are incomparable.
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::String(a), FieldValue::String(b)) => {
                Some(a.to_lowercase().cmp(&b.to_lowercase()))
            }
            (FieldValue::Boolean(a), FieldValue::Boolean(b)) => Some(a.cmp(b)),
            (FieldValue::Date(a), FieldValue::Date(b)) => Some(a.cmp(b)),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::String(s) => Value::String(s.clone()),
            FieldValue::Integer(i) => Value::from(*i),
            FieldValue::Number(n) => Value::from(*n),
            FieldValue::Boolean(b) => Value::Bool(*b),
            FieldValue::Date(d) => Value::String(d.to_rfc3339_opts(SecondsFormat::Millis, true)),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Integer(value as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::Date(value)
    }
}

/// How a field is indexed by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMode {
    /// Tokenized for full-text matching.
    Analyzed,
    /// Matched as a single exact term.
    NotAnalyzed,
    /// Carried in the document but not searchable.
    No,
}

/// A named field with one or more values and its storage flags.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentField {
    pub name: String,
    pub values: Vec<FieldValue>,
    pub store: bool,
    pub index_mode: IndexMode,
    pub collection: bool,
}

impl DocumentField {
    pub fn new(
        name: impl Into<String>,
        value: impl Into<FieldValue>,
        store: bool,
        index_mode: IndexMode,
        collection: bool,
    ) -> Self {
        Self {
            name: name.into(),
            values: vec![value.into()],
            store,
            index_mode,
            collection,
        }
    }

    /// Stored, exact-match, single-valued field.
    pub fn keyword(name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::new(name, value, true, IndexMode::NotAnalyzed, false)
    }

    /// Stored, exact-match, multi-valued field.
    pub fn keyword_collection(name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::new(name, value, true, IndexMode::NotAnalyzed, true)
    }

    /// Unstored full-text field.
    pub fn text(name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::new(name, value, false, IndexMode::Analyzed, true)
    }

    /// Stored payload that is never searched.
    pub fn stored_only(name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::new(name, value, true, IndexMode::No, false)
    }

    pub fn first(&self) -> Option<&FieldValue> {
        self.values.first()
    }
}

/// An ordered multimap of fields describing one entity.
///
/// Adding a field whose name already exists appends the new values to the
/// existing entry. Fields can be overwritten but never removed.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDocument {
    id: String,
    fields: Vec<DocumentField>,
}

impl IndexDocument {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Add a field, appending to an existing field of the same name.
    pub fn add(&mut self, field: DocumentField) {
        match self.position(&field.name) {
            Some(index) => {
                let existing = &mut self.fields[index];
                existing.values.extend(field.values);
                existing.collection = true;
            }
            None => self.fields.push(field),
        }
    }

    /// Replace the values of a field, or add it when missing.
    pub fn set(&mut self, field: DocumentField) {
        match self.position(&field.name) {
            Some(index) => self.fields[index] = field,
            None => self.fields.push(field),
        }
    }

    pub fn get(&self, name: &str) -> Option<&DocumentField> {
        self.position(name).map(|index| &self.fields[index])
    }

    /// All values of a field; empty when the field is missing.
    pub fn values(&self, name: &str) -> &[FieldValue] {
        self.get(name).map(|f| f.values.as_slice()).unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn fields(&self) -> &[DocumentField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Render the document as a JSON object.
    ///
    /// Collections and repeated fields become arrays; single values stay
    /// scalar.
    pub fn to_json(&self) -> Map<String, Value> {
        let mut map = Map::with_capacity(self.fields.len());
        for field in &self.fields {
            let value = if field.collection || field.values.len() > 1 {
                Value::Array(field.values.iter().map(FieldValue::to_json).collect())
            } else {
                field.first().map(FieldValue::to_json).unwrap_or(Value::Null)
            };
            map.insert(field.name.clone(), value);
        }
        map
    }

    /// Stored fields only, as returned to search callers.
    pub fn stored_json(&self) -> Map<String, Value> {
        let mut map = self.to_json();
        for field in self.fields.iter().filter(|f| !f.store) {
            map.remove(&field.name);
        }
        map
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_appends_to_existing_field() {
        let mut doc = IndexDocument::new("p1");
        doc.add(DocumentField::keyword_collection("is", "visible"));
        doc.add(DocumentField::keyword_collection("is", "product"));
        doc.add(DocumentField::keyword("name", "Shoe"));

        assert_eq!(doc.len(), 2);
        assert_eq!(
            doc.values("is"),
            &[FieldValue::from("visible"), FieldValue::from("product")]
        );
        assert_eq!(doc.fields()[0].name, "is");
    }

    #[test]
    fn test_set_overwrites_values() {
        let mut doc = IndexDocument::new("p1");
        doc.add(DocumentField::keyword("status", "visible"));
        doc.set(DocumentField::keyword("status", "hidden"));

        assert_eq!(doc.values("status"), &[FieldValue::from("hidden")]);
    }

    #[test]
    fn test_json_rendering() {
        let mut doc = IndexDocument::new("p1");
        doc.add(DocumentField::keyword("name", "Shoe"));
        doc.add(DocumentField::keyword_collection("catalog", "goods"));
        doc.add(DocumentField::text("__content", "shoe"));

        let json = doc.to_json();
        assert_eq!(json["name"], Value::from("Shoe"));
        assert!(json["catalog"].is_array());

        let stored = doc.stored_json();
        assert!(stored.contains_key("name"));
        assert!(!stored.contains_key("__content"));
    }

    #[test]
    fn test_compare_numeric_and_string() {
        assert_eq!(
            FieldValue::Integer(3).compare(&FieldValue::Number(2.5)),
            Some(Ordering::Greater)
        );
        assert_eq!(
            FieldValue::from("Black").compare(&FieldValue::from("black")),
            Some(Ordering::Equal)
        );
        assert_eq!(FieldValue::from("1").compare(&FieldValue::Integer(1)), None);
    }
}
