//! Waste adjustments: counted loss attributed to a reason and taken off the
//! expected stock.
//!
//! Waste uses the same [`compute_total`] conversion as stock counts.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use stockcount_core::{DomainError, DomainResult, ItemId, LogId};

use crate::catalog::CatalogItem;
use crate::count::CountEntry;
use crate::reconcile::compute_total;
use crate::record::{WasteLog, WasteRecord};
use crate::session::RowRejection;

/// A staff-entered waste line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WasteEntry {
    pub item_id: ItemId,
    pub entry: CountEntry,
    pub reason: String,
}

/// Derived, validated waste adjustment for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WasteAdjustment {
    pub item_id: ItemId,
    pub item_name: String,
    pub entry: CountEntry,
    pub total_wasted: i64,
    pub expected_before: i64,
    pub expected_after: i64,
    pub reason: String,
}

impl WasteAdjustment {
    /// Signed stock movement caused by the waste (always negative).
    pub fn variance(&self) -> i64 {
        self.expected_after - self.expected_before
    }
}

/// Validate a waste line against its catalog item.
///
/// A blank entry yields `Ok(None)`. A reason is mandatory, the wasted
/// quantity must be positive, and waste may not exceed stock on hand.
pub fn assess_waste(
    item: &CatalogItem,
    entry: &CountEntry,
    reason: &str,
) -> DomainResult<Option<WasteAdjustment>> {
    if entry.is_blank() {
        return Ok(None);
    }

    let total_wasted = compute_total(entry, item.ratio())?;
    if total_wasted == 0 {
        return Err(DomainError::validation("waste quantity must be greater than zero"));
    }

    let reason = reason.trim();
    if reason.is_empty() {
        return Err(DomainError::validation("a waste reason is required"));
    }

    let expected_before = item.expected_stock();
    if total_wasted > expected_before {
        return Err(DomainError::invariant(format!(
            "waste of {total_wasted} exceeds stock on hand of {expected_before}"
        )));
    }

    Ok(Some(WasteAdjustment {
        item_id: item.item_id().clone(),
        item_name: item.name().to_string(),
        entry: *entry,
        total_wasted,
        expected_before,
        expected_after: expected_before - total_wasted,
        reason: reason.to_string(),
    }))
}

/// Result of assessing a whole waste form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WasteBatch {
    pub adjustments: Vec<WasteAdjustment>,
    pub rejected: Vec<RowRejection>,
}

impl WasteBatch {
    /// Build the waste log and its records.
    pub fn into_submission(
        self,
        log_id: LogId,
        recorded_at: DateTime<Utc>,
    ) -> DomainResult<WasteSubmission> {
        let records: Vec<WasteRecord> = self
            .adjustments
            .iter()
            .map(|a| WasteRecord::new(recorded_at, a))
            .collect();
        let log = WasteLog::new(log_id, recorded_at, &records)?;
        Ok(WasteSubmission {
            log,
            records,
            adjustments: self.adjustments,
        })
    }
}

/// Assess every waste line; bad rows are rejected individually.
///
/// An item may appear at most once per batch.
pub fn assess_waste_batch(catalog: &[CatalogItem], entries: &[WasteEntry]) -> WasteBatch {
    let mut batch = WasteBatch::default();
    let mut seen = BTreeSet::new();

    for line in entries {
        let Some(item) = catalog.iter().find(|i| i.item_id() == &line.item_id) else {
            batch.rejected.push(RowRejection {
                item_id: line.item_id.clone(),
                error: DomainError::not_found(),
            });
            continue;
        };

        if line.entry.is_blank() {
            continue;
        }

        if !seen.insert(line.item_id.clone()) {
            batch.rejected.push(RowRejection {
                item_id: line.item_id.clone(),
                error: DomainError::conflict("item appears more than once in this waste log"),
            });
            continue;
        }

        match assess_waste(item, &line.entry, &line.reason) {
            Ok(Some(adjustment)) => batch.adjustments.push(adjustment),
            Ok(None) => {}
            Err(error) => batch.rejected.push(RowRejection {
                item_id: line.item_id.clone(),
                error,
            }),
        }
    }

    batch
}

/// Everything one waste save writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WasteSubmission {
    pub log: WasteLog,
    pub records: Vec<WasteRecord>,
    pub adjustments: Vec<WasteAdjustment>,
}
