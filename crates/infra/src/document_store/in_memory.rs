use std::collections::BTreeMap;
use std::sync::RwLock;

use super::path::{CollectionPath, DocumentPath};
use super::r#trait::{Document, DocumentStore, Fields, StoreError};

/// In-memory document store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    docs: RwLock<BTreeMap<DocumentPath, Fields>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents across all collections.
    pub fn len(&self) -> Result<usize, StoreError> {
        self.docs
            .read()
            .map(|d| d.len())
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn list_collection(&self, path: &CollectionPath) -> Result<Vec<Document>, StoreError> {
        let docs = self
            .docs
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;

        Ok(docs
            .iter()
            .filter(|(p, _)| &p.parent() == path)
            .map(|(p, fields)| Document::new(p.clone(), fields.clone()))
            .collect())
    }

    fn get_document(&self, path: &DocumentPath) -> Result<Option<Document>, StoreError> {
        let docs = self
            .docs
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;

        Ok(docs
            .get(path)
            .map(|fields| Document::new(path.clone(), fields.clone())))
    }

    fn write_document(
        &self,
        path: &DocumentPath,
        fields: Fields,
        merge: bool,
    ) -> Result<(), StoreError> {
        let mut docs = self
            .docs
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;

        match docs.get_mut(path) {
            Some(existing) if merge => existing.extend(fields),
            _ => {
                docs.insert(path.clone(), fields);
            }
        }
        Ok(())
    }
}
