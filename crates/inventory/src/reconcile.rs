//! Stock-count reconciliation.
//!
//! Every screen that compares a physical count against stock on hand goes
//! through these functions. They are pure: no IO, no clock, no randomness.

use serde::{Deserialize, Serialize};

use stockcount_core::{DomainError, DomainResult, ItemId};

use crate::count::CountEntry;
use crate::packaging::PackagingRatio;

/// Outcome classification of a single count.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountStatus {
    /// Counted quantity equals stock on hand.
    Completed,
    /// Counted quantity differs from stock on hand.
    RecordedWithVariance,
}

impl CountStatus {
    pub fn from_variance(variance: i64) -> Self {
        if variance == 0 {
            CountStatus::Completed
        } else {
            CountStatus::RecordedWithVariance
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CountStatus::Completed => "completed",
            CountStatus::RecordedWithVariance => "recorded_with_variance",
        }
    }
}

impl core::fmt::Display for CountStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived result of comparing one count against expected stock.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationResult {
    pub total_counted: i64,
    pub expected: i64,
    pub variance: i64,
    pub status: CountStatus,
}

impl ReconciliationResult {
    pub fn has_variance(&self) -> bool {
        self.variance != 0
    }

    /// Variance weighted by a unit price (smallest currency unit).
    ///
    /// Returns `None` on overflow.
    pub fn variance_value(&self, unit_price: i64) -> Option<i64> {
        self.variance.checked_mul(unit_price)
    }
}

/// Canonical unit count of an entry:
/// `boxes * innerPerBox * unitsPerInner + innerPacks * unitsPerInner + units`.
///
/// Blank fields contribute zero. Negative fields fail with
/// [`DomainError::InvalidInput`]; so does a total that does not fit in `i64`.
pub fn compute_total(entry: &CountEntry, ratio: PackagingRatio) -> DomainResult<i64> {
    entry.validate()?;

    let boxes = i128::from(entry.boxes.unwrap_or(0));
    let inner_packs = i128::from(entry.inner_packs.unwrap_or(0));
    let units = i128::from(entry.units.unwrap_or(0));

    // Each term is at most i64::MAX * u32::MAX^2 < 2^127.
    let total = boxes * ratio.units_per_box()
        + inner_packs * i128::from(ratio.units_per_inner())
        + units;

    i64::try_from(total)
        .map_err(|_| DomainError::invalid_input("total", format!("{total} units is out of range")))
}

/// Compare an entry against expected stock.
pub fn reconcile(
    entry: &CountEntry,
    ratio: PackagingRatio,
    expected: i64,
) -> DomainResult<ReconciliationResult> {
    let total_counted = compute_total(entry, ratio)?;
    let variance = total_counted.checked_sub(expected).ok_or_else(|| {
        DomainError::invalid_input(
            "total",
            format!("variance of {total_counted} against {expected} is out of range"),
        )
    })?;

    Ok(ReconciliationResult {
        total_counted,
        expected,
        variance,
        status: CountStatus::from_variance(variance),
    })
}

/// A reconciliation tied to the item and raw entry it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemReconciliation {
    pub item_id: ItemId,
    pub entry: CountEntry,
    pub result: ReconciliationResult,
}

impl ItemReconciliation {
    pub fn has_variance(&self) -> bool {
        self.result.has_variance()
    }
}

/// Reconcile one item's entry.
///
/// An all-blank entry means the item was not counted this session and yields
/// `Ok(None)`; it is never treated as a zero count.
pub fn reconcile_item(
    item_id: &ItemId,
    entry: &CountEntry,
    ratio: PackagingRatio,
    expected: i64,
) -> DomainResult<Option<ItemReconciliation>> {
    if entry.is_blank() {
        return Ok(None);
    }
    let result = reconcile(entry, ratio, expected)?;
    Ok(Some(ItemReconciliation {
        item_id: item_id.clone(),
        entry: *entry,
        result,
    }))
}
