//! The variance gate applied when a batch of counts is submitted.
//!
//! Two-step, re-entrant protocol:
//!
//! ```text
//! decide_submission(results, false)
//!   ├─ no variance ──────────────▶ Accept (all results)
//!   └─ variance ─▶ NeedsConfirmation
//!                    ├─ "recount"        → caller aborts, edits entries
//!                    └─ "submit anyway"  → decide_submission(results, true) ─▶ Accept
//! ```

use chrono::{DateTime, Utc};

use stockcount_core::{CountDate, DomainError, DomainResult, ItemId, LogId};

use crate::reconcile::ItemReconciliation;
use crate::record::{StockCountRecord, VarianceLog};

/// What the caller must do with a batch of reconciliations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionDecision {
    /// Persist every record.
    ///
    /// `overridden` is true when the user explicitly chose to submit despite
    /// variance.
    Accept {
        records: Vec<ItemReconciliation>,
        overridden: bool,
    },
    /// At least one item differs from stock on hand and no override was given.
    ///
    /// `ready` holds the zero-variance items; they pass the gate on their own
    /// and may be persisted without waiting for confirmation.
    NeedsConfirmation {
        with_variance: Vec<ItemReconciliation>,
        ready: Vec<ItemReconciliation>,
    },
}

impl SubmissionDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmissionDecision::Accept { .. })
    }

    /// Items the user must recount or explicitly override.
    pub fn offending_items(&self) -> Vec<&ItemId> {
        match self {
            SubmissionDecision::Accept { .. } => vec![],
            SubmissionDecision::NeedsConfirmation { with_variance, .. } => {
                with_variance.iter().map(|r| &r.item_id).collect()
            }
        }
    }

    /// Build the records to persist for an accepted decision.
    ///
    /// `date` is the counting session's day; records are filed under it even
    /// when `recorded_at` falls on the next UTC day.
    ///
    /// Fails with a conflict when the decision still needs confirmation.
    pub fn into_submission(
        self,
        log_id: LogId,
        date: CountDate,
        recorded_at: DateTime<Utc>,
    ) -> DomainResult<CountSubmission> {
        match self {
            SubmissionDecision::Accept { records, overridden } => {
                CountSubmission::build(log_id, date, recorded_at, &records, overridden)
            }
            SubmissionDecision::NeedsConfirmation { with_variance, .. } => {
                Err(DomainError::conflict(format!(
                    "{} item(s) have variance and need confirmation",
                    with_variance.len()
                )))
            }
        }
    }
}

/// Apply the variance gate to a batch.
///
/// Zero-variance items never block. With `override_requested` every result
/// is accepted, so calling this twice with an override yields the same
/// decision.
pub fn decide_submission(
    results: &[ItemReconciliation],
    override_requested: bool,
) -> SubmissionDecision {
    let (with_variance, zero_variance): (Vec<_>, Vec<_>) =
        results.iter().cloned().partition(ItemReconciliation::has_variance);

    if with_variance.is_empty() || override_requested {
        let overridden = override_requested && !with_variance.is_empty();
        return SubmissionDecision::Accept {
            records: results.to_vec(),
            overridden,
        };
    }

    SubmissionDecision::NeedsConfirmation {
        with_variance,
        ready: zero_variance,
    }
}

/// Everything one save action writes: the session-level log and its
/// per-item records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountSubmission {
    pub date: CountDate,
    pub log: VarianceLog,
    pub records: Vec<StockCountRecord>,
}

impl CountSubmission {
    /// Fails with a conflict when an item appears more than once.
    pub fn build(
        log_id: LogId,
        date: CountDate,
        recorded_at: DateTime<Utc>,
        results: &[ItemReconciliation],
        overridden: bool,
    ) -> DomainResult<Self> {
        let records: Vec<StockCountRecord> = results
            .iter()
            .map(|r| StockCountRecord::new(date, recorded_at, r, overridden))
            .collect();
        let log = VarianceLog::new(log_id, recorded_at, &records, overridden)?;
        Ok(Self { date, log, records })
    }

    pub fn item_ids(&self) -> Vec<ItemId> {
        self.records.iter().map(|r| r.item_id().clone()).collect()
    }
}
