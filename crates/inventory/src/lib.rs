//! Stock-count reconciliation domain.
//!
//! This crate contains business rules for counting stock, implemented purely
//! as deterministic domain logic with no IO or storage.

pub mod catalog;
pub mod count;
pub mod packaging;
pub mod reconcile;
pub mod record;
pub mod session;
pub mod submission;
pub mod waste;

pub use catalog::CatalogItem;
pub use count::{CountEntry, CountField};
pub use packaging::PackagingRatio;
pub use reconcile::{
    compute_total, reconcile, reconcile_item, CountStatus, ItemReconciliation,
    ReconciliationResult,
};
pub use record::{StockCountRecord, VarianceLog, WasteLog, WasteRecord};
pub use session::{CountingSession, PendingBatch, RowRejection};
pub use submission::{decide_submission, CountSubmission, SubmissionDecision};
pub use waste::{
    assess_waste, assess_waste_batch, WasteAdjustment, WasteBatch, WasteEntry, WasteSubmission,
};
