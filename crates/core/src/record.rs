//! Audit records: immutable facts handed to the external store.

use chrono::{DateTime, Utc};

/// A persisted audit artifact.
///
/// Records are:
/// - **immutable** (corrections are new records, never edits)
/// - **versioned** (schema evolution of the stored document)
/// - stamped with the business time they were recorded at
pub trait AuditRecord: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable record kind (e.g. "inventory.stock_count").
    fn record_type(&self) -> &'static str;

    /// Schema version of the stored document.
    fn schema_version(&self) -> u32;

    /// When the record was produced.
    fn recorded_at(&self) -> DateTime<Utc>;
}
