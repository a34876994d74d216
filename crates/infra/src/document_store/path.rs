//! Collection / document paths.
//!
//! Paths alternate collection and document segments, starting with a
//! collection: `inventoryLog/{logId}/variantItems/{itemId}`.

use super::r#trait::StoreError;

fn validate_segment(segment: &str) -> Result<(), StoreError> {
    if segment.is_empty() {
        return Err(StoreError::InvalidPath("empty path segment".to_string()));
    }
    if segment.contains('/') {
        return Err(StoreError::InvalidPath(format!(
            "segment `{segment}` contains '/'"
        )));
    }
    Ok(())
}

fn split(raw: &str) -> Result<Vec<String>, StoreError> {
    let segments: Vec<String> = raw.trim_matches('/').split('/').map(str::to_string).collect();
    for s in &segments {
        validate_segment(s)?;
    }
    Ok(segments)
}

/// Path of a collection (odd number of segments).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CollectionPath(Vec<String>);

/// Path of a document (even number of segments).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentPath(Vec<String>);

impl CollectionPath {
    /// A top-level collection.
    pub fn root(name: impl Into<String>) -> Result<Self, StoreError> {
        let name = name.into();
        validate_segment(&name)?;
        Ok(Self(vec![name]))
    }

    /// A top-level collection with a built-in name known to be a valid
    /// segment.
    pub(crate) fn builtin(name: &'static str) -> Self {
        Self(vec![name.to_string()])
    }

    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        let segments = split(raw)?;
        if segments.len() % 2 == 0 {
            return Err(StoreError::InvalidPath(format!(
                "`{raw}` names a document, not a collection"
            )));
        }
        Ok(Self(segments))
    }

    /// The document `id` inside this collection.
    pub fn doc(&self, id: impl AsRef<str>) -> Result<DocumentPath, StoreError> {
        let id = id.as_ref();
        validate_segment(id)?;
        let mut segments = self.0.clone();
        segments.push(id.to_string());
        Ok(DocumentPath(segments))
    }

    /// Last segment: the collection's own name.
    pub fn name(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or_default()
    }

    /// The document this collection is nested under, if any.
    pub fn parent(&self) -> Option<DocumentPath> {
        if self.0.len() < 3 {
            return None;
        }
        Some(DocumentPath(self.0[..self.0.len() - 1].to_vec()))
    }
}

impl DocumentPath {
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        let segments = split(raw)?;
        if segments.len() % 2 == 1 {
            return Err(StoreError::InvalidPath(format!(
                "`{raw}` names a collection, not a document"
            )));
        }
        Ok(Self(segments))
    }

    /// A sub-collection nested under this document.
    pub fn collection(&self, name: impl AsRef<str>) -> Result<CollectionPath, StoreError> {
        let name = name.as_ref();
        validate_segment(name)?;
        let mut segments = self.0.clone();
        segments.push(name.to_string());
        Ok(CollectionPath(segments))
    }

    /// The document id (last segment).
    pub fn id(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or_default()
    }

    /// The collection containing this document.
    pub fn parent(&self) -> CollectionPath {
        CollectionPath(self.0[..self.0.len() - 1].to_vec())
    }
}

impl core::fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

impl core::fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}
