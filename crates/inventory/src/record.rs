//! Audit records produced by count and waste submissions.
//!
//! Records have no mutators. A correction is a new record written under a
//! new log; the serialized field names are the stored document's field names.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockcount_core::{AuditRecord, CountDate, DomainError, DomainResult, ItemId, LogId};

use crate::count::CountEntry;
use crate::reconcile::{CountStatus, ItemReconciliation, ReconciliationResult};
use crate::waste::WasteAdjustment;

/// Audit artifact for one item in one count submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockCountRecord {
    item_id: ItemId,
    date: CountDate,
    timestamp: DateTime<Utc>,
    boxes_count: Option<i64>,
    inner_count: Option<i64>,
    units_count: Option<i64>,
    total_counted: i64,
    expected_stock: i64,
    variance: i64,
    status: CountStatus,
    override_applied: bool,
}

impl StockCountRecord {
    /// `overridden` marks a submission confirmed through "submit anyway";
    /// only records that actually carry variance are flagged.
    pub fn new(
        date: CountDate,
        recorded_at: DateTime<Utc>,
        reconciliation: &ItemReconciliation,
        overridden: bool,
    ) -> Self {
        let ItemReconciliation { item_id, entry, result } = reconciliation;
        Self {
            item_id: item_id.clone(),
            date,
            timestamp: recorded_at,
            boxes_count: entry.boxes,
            inner_count: entry.inner_packs,
            units_count: entry.units,
            total_counted: result.total_counted,
            expected_stock: result.expected,
            variance: result.variance,
            status: result.status,
            override_applied: overridden && result.has_variance(),
        }
    }

    pub fn item_id(&self) -> &ItemId {
        &self.item_id
    }

    pub fn date(&self) -> CountDate {
        self.date
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn entry(&self) -> CountEntry {
        CountEntry {
            boxes: self.boxes_count,
            inner_packs: self.inner_count,
            units: self.units_count,
        }
    }

    pub fn result(&self) -> ReconciliationResult {
        ReconciliationResult {
            total_counted: self.total_counted,
            expected: self.expected_stock,
            variance: self.variance,
            status: self.status,
        }
    }

    pub fn total_counted(&self) -> i64 {
        self.total_counted
    }

    pub fn variance(&self) -> i64 {
        self.variance
    }

    pub fn status(&self) -> CountStatus {
        self.status
    }

    pub fn override_applied(&self) -> bool {
        self.override_applied
    }
}

impl AuditRecord for StockCountRecord {
    fn record_type(&self) -> &'static str {
        "inventory.stock_count"
    }

    fn schema_version(&self) -> u32 {
        1
    }

    fn recorded_at(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Child records are keyed by item id, so a log may name each item once.
fn ensure_unique<'a>(item_ids: impl Iterator<Item = &'a ItemId>) -> DomainResult<()> {
    let mut seen = BTreeSet::new();
    for id in item_ids {
        if !seen.insert(id) {
            return Err(DomainError::conflict(format!(
                "item `{id}` appears more than once in one log"
            )));
        }
    }
    Ok(())
}

/// Session-level aggregate written once per save action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VarianceLog {
    id: LogId,
    timestamp: DateTime<Utc>,
    total_variance: i64,
    item_ids: Vec<ItemId>,
    overridden: bool,
}

impl VarianceLog {
    pub fn new(
        id: LogId,
        recorded_at: DateTime<Utc>,
        records: &[StockCountRecord],
        overridden: bool,
    ) -> DomainResult<Self> {
        if records.is_empty() {
            return Err(DomainError::validation(
                "a variance log needs at least one stock count record",
            ));
        }
        ensure_unique(records.iter().map(|r| &r.item_id))?;
        let total_variance = records
            .iter()
            .try_fold(0i64, |sum, r| sum.checked_add(r.variance))
            .ok_or_else(|| DomainError::invariant("total variance is out of range"))?;

        Ok(Self {
            id,
            timestamp: recorded_at,
            total_variance,
            item_ids: records.iter().map(|r| r.item_id.clone()).collect(),
            overridden,
        })
    }

    pub fn id(&self) -> LogId {
        self.id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn total_variance(&self) -> i64 {
        self.total_variance
    }

    pub fn item_ids(&self) -> &[ItemId] {
        &self.item_ids
    }

    pub fn overridden(&self) -> bool {
        self.overridden
    }
}

impl AuditRecord for VarianceLog {
    fn record_type(&self) -> &'static str {
        "inventory.variance_log"
    }

    fn schema_version(&self) -> u32 {
        1
    }

    fn recorded_at(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Per-item waste entry inside a waste log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WasteRecord {
    item_id: ItemId,
    item_name: String,
    timestamp: DateTime<Utc>,
    boxes_count: Option<i64>,
    inner_count: Option<i64>,
    units_count: Option<i64>,
    total_waste: i64,
    stock_before: i64,
    stock_after: i64,
    reason: String,
}

impl WasteRecord {
    pub fn new(recorded_at: DateTime<Utc>, adjustment: &WasteAdjustment) -> Self {
        Self {
            item_id: adjustment.item_id.clone(),
            item_name: adjustment.item_name.clone(),
            timestamp: recorded_at,
            boxes_count: adjustment.entry.boxes,
            inner_count: adjustment.entry.inner_packs,
            units_count: adjustment.entry.units,
            total_waste: adjustment.total_wasted,
            stock_before: adjustment.expected_before,
            stock_after: adjustment.expected_after,
            reason: adjustment.reason.clone(),
        }
    }

    pub fn item_id(&self) -> &ItemId {
        &self.item_id
    }

    pub fn item_name(&self) -> &str {
        &self.item_name
    }

    pub fn total_waste(&self) -> i64 {
        self.total_waste
    }

    pub fn stock_after(&self) -> i64 {
        self.stock_after
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl AuditRecord for WasteRecord {
    fn record_type(&self) -> &'static str {
        "inventory.waste_item"
    }

    fn schema_version(&self) -> u32 {
        1
    }

    fn recorded_at(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Waste log written once per waste save action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WasteLog {
    id: LogId,
    timestamp: DateTime<Utc>,
    total_waste: i64,
    item_ids: Vec<ItemId>,
}

impl WasteLog {
    pub fn new(id: LogId, recorded_at: DateTime<Utc>, records: &[WasteRecord]) -> DomainResult<Self> {
        if records.is_empty() {
            return Err(DomainError::validation("a waste log needs at least one waste record"));
        }
        ensure_unique(records.iter().map(|r| &r.item_id))?;
        let total_waste = records
            .iter()
            .try_fold(0i64, |sum, r| sum.checked_add(r.total_waste))
            .ok_or_else(|| DomainError::invariant("total waste is out of range"))?;

        Ok(Self {
            id,
            timestamp: recorded_at,
            total_waste,
            item_ids: records.iter().map(|r| r.item_id.clone()).collect(),
        })
    }

    pub fn id(&self) -> LogId {
        self.id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn total_waste(&self) -> i64 {
        self.total_waste
    }

    pub fn item_ids(&self) -> &[ItemId] {
        &self.item_ids
    }
}

impl AuditRecord for WasteLog {
    fn record_type(&self) -> &'static str {
        "inventory.waste_log"
    }

    fn schema_version(&self) -> u32 {
        1
    }

    fn recorded_at(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packaging::PackagingRatio;
    use crate::reconcile::reconcile_item;

    fn test_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-04-24T19:53:01Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn short_count() -> ItemReconciliation {
        short_count_of("item01")
    }

    fn short_count_of(item_id: &str) -> ItemReconciliation {
        let ratio = PackagingRatio::new(10, 5).unwrap();
        reconcile_item(
            &ItemId::parse(item_id).unwrap(),
            &CountEntry { boxes: Some(2), inner_packs: None, units: Some(0) },
            ratio,
            108,
        )
        .unwrap()
        .unwrap()
    }

    #[test]
    fn stock_count_record_serializes_with_document_field_names() {
        let record = StockCountRecord::new(CountDate::of(test_time()), test_time(), &short_count(), true);
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["itemId"], "item01");
        assert_eq!(json["date"], "2025-04-24");
        assert_eq!(json["boxesCount"], 2);
        assert!(json["innerCount"].is_null());
        assert_eq!(json["totalCounted"], 100);
        assert_eq!(json["variance"], -8);
        assert_eq!(json["status"], "recorded_with_variance");
        assert_eq!(json["overrideApplied"], true);
        assert!(json.get("reason").is_none());

        let back: StockCountRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
        assert_eq!(back.entry(), short_count().entry);
        assert_eq!(back.result(), short_count().result);
    }

    #[test]
    fn variance_log_sums_child_variances() {
        let date = CountDate::of(test_time());
        let a = StockCountRecord::new(date, test_time(), &short_count_of("item01"), true);
        let b = StockCountRecord::new(date, test_time(), &short_count_of("item02"), true);
        let log = VarianceLog::new(LogId::new(), test_time(), &[a, b], true).unwrap();
        assert_eq!(log.total_variance(), -16);
        assert_eq!(log.item_ids().len(), 2);
        assert_eq!(log.record_type(), "inventory.variance_log");
    }

    #[test]
    fn variance_log_rejects_repeated_item() {
        let date = CountDate::of(test_time());
        let a = StockCountRecord::new(date, test_time(), &short_count(), true);
        let err = VarianceLog::new(LogId::new(), test_time(), &[a.clone(), a], true).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn empty_logs_are_rejected() {
        assert!(VarianceLog::new(LogId::new(), test_time(), &[], false).is_err());
        assert!(WasteLog::new(LogId::new(), test_time(), &[]).is_err());
    }
}
