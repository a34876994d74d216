//! Document store abstraction (the only external collaborator of the core).

pub mod in_memory;
pub mod path;
pub mod r#trait;

pub use in_memory::InMemoryDocumentStore;
pub use path::{CollectionPath, DocumentPath};
pub use r#trait::{to_fields, Document, DocumentStore, Fields, StoreError};
