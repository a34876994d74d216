use std::sync::Arc;

use serde::Serialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

use super::path::{CollectionPath, DocumentPath};

/// Top-level fields of a document.
pub type Fields = serde_json::Map<String, JsonValue>;

/// A document read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub path: DocumentPath,
    pub fields: Fields,
}

impl Document {
    pub fn new(path: DocumentPath, fields: Fields) -> Self {
        Self { path, fields }
    }

    /// The document id (natural key).
    pub fn id(&self) -> &str {
        self.path.id()
    }

    pub fn get(&self, field: &str) -> Option<&JsonValue> {
        self.fields.get(field)
    }

    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(JsonValue::as_str)
    }

    /// Integer field; floats with no fractional part are accepted.
    pub fn i64_field(&self, field: &str) -> Option<i64> {
        let value = self.fields.get(field)?;
        value.as_i64().or_else(|| {
            value
                .as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e18)
                .map(|f| f as i64)
        })
    }
}

/// Encode a value as document fields. The value must serialize to a map.
pub fn to_fields<T: Serialize>(value: &T) -> Result<Fields, StoreError> {
    match serde_json::to_value(value) {
        Ok(JsonValue::Object(map)) => Ok(map),
        Ok(other) => Err(StoreError::Serialization(format!(
            "expected an object, got {other}"
        ))),
        Err(e) => Err(StoreError::Serialization(e.to_string())),
    }
}

/// Document store operation error.
///
/// These are **infrastructure errors** as opposed to domain errors
/// (validation, invariants).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Transient failures that a caller may retry as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Backend(_))
    }
}

/// Hosted document database with collection/document semantics.
///
/// ## Semantics
///
/// - Every document has a unique key inside its collection; ids double as
///   natural keys (item ids, `YYYY-MM-DD` dates).
/// - Documents may own nested sub-collections. A sub-collection can be listed
///   even when its parent document has no fields of its own.
/// - `write_document` with `merge = false` replaces the document. With
///   `merge = true` it overwrites only the supplied top-level fields and
///   preserves every sibling field.
///
/// Connection settings are the implementation's concern; the domain never
/// sees them.
pub trait DocumentStore: Send + Sync {
    /// List the documents directly inside a collection, ordered by id.
    fn list_collection(&self, path: &CollectionPath) -> Result<Vec<Document>, StoreError>;

    /// Fetch a single document; `Ok(None)` when it does not exist.
    fn get_document(&self, path: &DocumentPath) -> Result<Option<Document>, StoreError>;

    /// Create or update a document.
    fn write_document(&self, path: &DocumentPath, fields: Fields, merge: bool)
    -> Result<(), StoreError>;
}

impl<S> DocumentStore for Arc<S>
where
    S: DocumentStore + ?Sized,
{
    fn list_collection(&self, path: &CollectionPath) -> Result<Vec<Document>, StoreError> {
        (**self).list_collection(path)
    }

    fn get_document(&self, path: &DocumentPath) -> Result<Option<Document>, StoreError> {
        (**self).get_document(path)
    }

    fn write_document(
        &self,
        path: &DocumentPath,
        fields: Fields,
        merge: bool,
    ) -> Result<(), StoreError> {
        (**self).write_document(path, fields, merge)
    }
}
