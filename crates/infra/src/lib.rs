//! Infrastructure layer: document store, config, persistence and history.

pub mod catalog;
pub mod config;
pub mod document_store;
pub mod history;
pub mod persistence;

mod integration_tests;

pub use catalog::{CatalogError, CatalogReader};
pub use config::{Collections, ConfigError, StoreConfig};
pub use document_store::{DocumentStore, InMemoryDocumentStore, StoreError};
pub use history::{DailyActivity, HistoryError, HistoryReader, LogKind, LogLine, LogSummary};
pub use persistence::{ItemWriteFailure, PersistReport, PersistenceFailure, SubmissionWriter};
