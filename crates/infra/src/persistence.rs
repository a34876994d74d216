//! Writing count and waste submissions to the document store.
//!
//! ## Write plan
//!
//! A save action is one logical unit:
//!
//! ```text
//! 1. encode every document        (failure: nothing written)
//! 2. write the log header + day   (failure: no item write attempted)
//! 3. write every item's documents (always all attempted)
//! 4. report succeeded / failed items
//! ```
//!
//! Every document is keyed by log id, date or item id, so a retry of the same
//! submission rewrites identical content. Callers either persist the same
//! submission again or re-attempt just the failed items with
//! `SubmissionWriter::retry_count` / `retry_waste`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use thiserror::Error;
use tracing::{debug, info, warn};

use stockcount_core::{AuditRecord, ItemId, LogId};
use stockcount_inventory::{CountSubmission, WasteSubmission};

use crate::config::Collections;
use crate::document_store::{to_fields, DocumentPath, DocumentStore, Fields, StoreError};

/// One item whose documents could not all be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemWriteFailure {
    pub item_id: ItemId,
    pub error: StoreError,
}

/// Persistence failure for a save action.
///
/// Always names the log, so the caller can retry the same submission.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PersistenceFailure {
    /// A document could not be encoded; nothing was written.
    #[error("log {log_id}: could not encode documents: {error}")]
    Encode { log_id: LogId, error: StoreError },

    /// The log header or day aggregate failed; no item write was attempted.
    #[error("log {log_id}: header not written, no items attempted: {error}")]
    NotAttempted { log_id: LogId, error: StoreError },

    /// Some item writes failed. The log header is inconsistent with its
    /// children until the submission is retried.
    #[error(
        "log {log_id}: {} of {} item(s) failed",
        .failed.len(),
        .failed.len() + .succeeded.len()
    )]
    Partial {
        log_id: LogId,
        succeeded: Vec<ItemId>,
        failed: Vec<ItemWriteFailure>,
    },
}

impl PersistenceFailure {
    pub fn log_id(&self) -> LogId {
        match self {
            PersistenceFailure::Encode { log_id, .. }
            | PersistenceFailure::NotAttempted { log_id, .. }
            | PersistenceFailure::Partial { log_id, .. } => *log_id,
        }
    }

    /// Items that must be retried (all of them unless the batch was partial).
    pub fn failed_items(&self) -> Vec<&ItemId> {
        match self {
            PersistenceFailure::Partial { failed, .. } => {
                failed.iter().map(|f| &f.item_id).collect()
            }
            _ => vec![],
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            PersistenceFailure::Encode { .. } => false,
            PersistenceFailure::NotAttempted { error, .. } => error.is_retryable(),
            PersistenceFailure::Partial { failed, .. } => {
                failed.iter().all(|f| f.error.is_retryable())
            }
        }
    }
}

/// Outcome of a fully persisted save action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistReport {
    pub log_id: LogId,
    pub written: Vec<ItemId>,
}

struct Write {
    path: DocumentPath,
    fields: Fields,
    merge: bool,
}

struct ItemWrites {
    item_id: ItemId,
    writes: Vec<Write>,
}

/// Encode an audit record with its type/version stamp.
fn record_fields<R: AuditRecord + Serialize>(record: &R) -> Result<Fields, StoreError> {
    let mut fields = to_fields(record)?;
    fields.insert("recordType".to_string(), json!(record.record_type()));
    fields.insert("schemaVersion".to_string(), json!(record.schema_version()));
    Ok(fields)
}

/// Persists submissions built by the inventory domain.
#[derive(Debug, Clone)]
pub struct SubmissionWriter<S> {
    store: S,
    collections: Collections,
}

impl<S: DocumentStore> SubmissionWriter<S> {
    pub fn new(store: S, collections: Collections) -> Self {
        Self { store, collections }
    }

    /// Persist a stock count: variance log, day aggregate, and per-item
    /// records under both the day and the log.
    pub fn persist_count(
        &self,
        submission: &CountSubmission,
    ) -> Result<PersistReport, PersistenceFailure> {
        let log_id = submission.log.id();
        let (header, items) = self
            .plan_count(submission)
            .map_err(|error| PersistenceFailure::Encode { log_id, error })?;
        let report = self.execute(log_id, header, items)?;
        info!(
            %log_id,
            date = %submission.date,
            items = report.written.len(),
            total_variance = submission.log.total_variance(),
            overridden = submission.log.overridden(),
            "stock count persisted"
        );
        Ok(report)
    }

    /// Persist a waste log and decrement each item's stock on hand.
    ///
    /// The stock update writes the absolute post-waste quantity with a merge,
    /// so retries do not decrement twice.
    pub fn persist_waste(
        &self,
        submission: &WasteSubmission,
    ) -> Result<PersistReport, PersistenceFailure> {
        let log_id = submission.log.id();
        let (header, items) = self
            .plan_waste(submission)
            .map_err(|error| PersistenceFailure::Encode { log_id, error })?;
        let report = self.execute(log_id, header, items)?;
        info!(
            %log_id,
            items = report.written.len(),
            total_waste = submission.log.total_waste(),
            "waste log persisted"
        );
        Ok(report)
    }

    /// Re-attempt only the items a previous [`persist_count`] reported as
    /// failed, against the same log. Any other failure retries everything.
    ///
    /// [`persist_count`]: Self::persist_count
    pub fn retry_count(
        &self,
        submission: &CountSubmission,
        previous: &PersistenceFailure,
    ) -> Result<PersistReport, PersistenceFailure> {
        let log_id = submission.log.id();
        let (header, items) = self
            .plan_count(submission)
            .map_err(|error| PersistenceFailure::Encode { log_id, error })?;
        let report = self.execute(log_id, header, retain_failed(items, previous))?;
        info!(%log_id, items = report.written.len(), "stock count retry persisted");
        Ok(report)
    }

    /// Waste counterpart of [`retry_count`](Self::retry_count).
    pub fn retry_waste(
        &self,
        submission: &WasteSubmission,
        previous: &PersistenceFailure,
    ) -> Result<PersistReport, PersistenceFailure> {
        let log_id = submission.log.id();
        let (header, items) = self
            .plan_waste(submission)
            .map_err(|error| PersistenceFailure::Encode { log_id, error })?;
        let report = self.execute(log_id, header, retain_failed(items, previous))?;
        info!(%log_id, items = report.written.len(), "waste log retry persisted");
        Ok(report)
    }

    fn plan_count(
        &self,
        submission: &CountSubmission,
    ) -> Result<(Vec<Write>, Vec<ItemWrites>), StoreError> {
        let log = &submission.log;
        let log_path = self.collections.inventory_log().doc(log.id().to_string())?;
        let day_path = self
            .collections
            .stock_counts()
            .doc(submission.date.to_string())?;

        let header = vec![
            Write {
                path: log_path.clone(),
                fields: record_fields(log)?,
                merge: false,
            },
            Write {
                path: day_path.clone(),
                fields: day_fields(submission.date.to_string(), log.timestamp()),
                merge: true,
            },
        ];

        let day_items = day_path.collection(Collections::DAY_ITEMS)?;
        let log_items = log_path.collection(Collections::VARIANT_ITEMS)?;

        let mut items = Vec::with_capacity(submission.records.len());
        for record in &submission.records {
            let mut fields = record_fields(record)?;
            fields.insert("logId".to_string(), json!(log.id()));
            let id = record.item_id().as_str();
            items.push(ItemWrites {
                item_id: record.item_id().clone(),
                writes: vec![
                    Write {
                        path: day_items.doc(id)?,
                        fields: fields.clone(),
                        merge: false,
                    },
                    Write {
                        path: log_items.doc(id)?,
                        fields,
                        merge: false,
                    },
                ],
            });
        }
        Ok((header, items))
    }

    fn plan_waste(
        &self,
        submission: &WasteSubmission,
    ) -> Result<(Vec<Write>, Vec<ItemWrites>), StoreError> {
        let log = &submission.log;
        let log_path = self.collections.waste_logs().doc(log.id().to_string())?;
        let header = vec![Write {
            path: log_path.clone(),
            fields: record_fields(log)?,
            merge: false,
        }];

        let waste_items = log_path.collection(Collections::WASTE_ITEMS)?;
        let mut items = Vec::with_capacity(submission.records.len());
        for record in &submission.records {
            let mut fields = record_fields(record)?;
            fields.insert("logId".to_string(), json!(log.id()));
            let id = record.item_id().as_str();

            let mut stock = Fields::new();
            stock.insert("totalStockOnHand".to_string(), json!(record.stock_after()));
            stock.insert("lastWasteAt".to_string(), json!(log.timestamp()));
            stock.insert("lastWasteLogId".to_string(), json!(log.id()));

            items.push(ItemWrites {
                item_id: record.item_id().clone(),
                writes: vec![
                    Write {
                        path: waste_items.doc(id)?,
                        fields,
                        merge: false,
                    },
                    Write {
                        path: self.collections.inventory().doc(id)?,
                        fields: stock,
                        merge: true,
                    },
                ],
            });
        }
        Ok((header, items))
    }

    fn write(&self, write: Write) -> Result<(), StoreError> {
        debug!(path = %write.path, merge = write.merge, "writing document");
        self.store.write_document(&write.path, write.fields, write.merge)
    }

    fn execute(
        &self,
        log_id: LogId,
        header: Vec<Write>,
        items: Vec<ItemWrites>,
    ) -> Result<PersistReport, PersistenceFailure> {
        for write in header {
            if let Err(error) = self.write(write) {
                warn!(%log_id, %error, "log header failed; no items attempted");
                return Err(PersistenceFailure::NotAttempted { log_id, error });
            }
        }

        let mut succeeded = Vec::with_capacity(items.len());
        let mut failed = Vec::new();
        for ItemWrites { item_id, writes } in items {
            // Every item is attempted even after an earlier one fails.
            let outcome = writes.into_iter().try_for_each(|w| self.write(w));
            match outcome {
                Ok(()) => succeeded.push(item_id),
                Err(error) => failed.push(ItemWriteFailure { item_id, error }),
            }
        }

        if failed.is_empty() {
            return Ok(PersistReport {
                log_id,
                written: succeeded,
            });
        }

        for f in &failed {
            warn!(%log_id, item_id = %f.item_id, error = %f.error, "item write failed");
        }
        Err(PersistenceFailure::Partial {
            log_id,
            succeeded,
            failed,
        })
    }
}

fn retain_failed(items: Vec<ItemWrites>, previous: &PersistenceFailure) -> Vec<ItemWrites> {
    match previous {
        PersistenceFailure::Partial { failed, .. } => items
            .into_iter()
            .filter(|w| failed.iter().any(|f| f.item_id == w.item_id))
            .collect(),
        _ => items,
    }
}

fn day_fields(date: String, at: DateTime<Utc>) -> Fields {
    let mut fields = Fields::new();
    fields.insert("date".to_string(), JsonValue::String(date));
    fields.insert("lastUpdated".to_string(), json!(at));
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document_store::{CollectionPath, Document, InMemoryDocumentStore};
    use std::collections::BTreeSet;
    use std::sync::{Arc, Mutex};
    use stockcount_core::CountDate;

    use stockcount_inventory::{
        assess_waste_batch, decide_submission, reconcile_item, CatalogItem, CountEntry,
        PackagingRatio, WasteEntry,
    };

    /// Store wrapper that fails writes to chosen document ids.
    struct FlakyStore {
        inner: InMemoryDocumentStore,
        fail_ids: Mutex<BTreeSet<String>>,
    }

    impl FlakyStore {
        fn failing(ids: &[&str]) -> Self {
            Self {
                inner: InMemoryDocumentStore::new(),
                fail_ids: Mutex::new(ids.iter().map(|s| s.to_string()).collect()),
            }
        }

        fn heal(&self) {
            self.fail_ids.lock().unwrap().clear();
        }
    }

    impl DocumentStore for FlakyStore {
        fn list_collection(&self, path: &CollectionPath) -> Result<Vec<Document>, StoreError> {
            self.inner.list_collection(path)
        }

        fn get_document(&self, path: &DocumentPath) -> Result<Option<Document>, StoreError> {
            self.inner.get_document(path)
        }

        fn write_document(
            &self,
            path: &DocumentPath,
            fields: Fields,
            merge: bool,
        ) -> Result<(), StoreError> {
            if self.fail_ids.lock().unwrap().contains(path.id()) {
                return Err(StoreError::Unavailable(format!("injected failure for {path}")));
            }
            self.inner.write_document(path, fields, merge)
        }
    }

    fn test_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-04-24T19:53:01Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn id(s: &str) -> ItemId {
        ItemId::parse(s).unwrap()
    }

    fn count_submission(log_id: LogId) -> CountSubmission {
        let ratio = PackagingRatio::new(10, 5).unwrap();
        let results = vec![
            reconcile_item(&id("item01"), &CountEntry::new(2, 1, 3), ratio, 108).unwrap().unwrap(),
            reconcile_item(&id("item02"), &CountEntry::new(2, 0, 0), ratio, 108).unwrap().unwrap(),
        ];
        decide_submission(&results, true)
            .into_submission(log_id, CountDate::of(test_time()), test_time())
            .unwrap()
    }

    fn doc(store: &impl DocumentStore, path: &str) -> Option<Document> {
        store.get_document(&DocumentPath::parse(path).unwrap()).unwrap()
    }

    #[test]
    fn count_writes_log_day_and_item_records() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let writer = SubmissionWriter::new(store.clone(), Collections::default());
        let log_id = LogId::new();

        let report = writer.persist_count(&count_submission(log_id)).unwrap();
        assert_eq!(report.written, vec![id("item01"), id("item02")]);

        let log = doc(&store, &format!("inventoryLog/{log_id}")).unwrap();
        assert_eq!(log.i64_field("totalVariance"), Some(-8));
        assert_eq!(log.str_field("recordType"), Some("inventory.variance_log"));

        let day = doc(&store, "stockCounts/2025-04-24").unwrap();
        assert_eq!(day.str_field("date"), Some("2025-04-24"));

        let item = doc(&store, "stockCounts/2025-04-24/items/item02").unwrap();
        assert_eq!(item.i64_field("variance"), Some(-8));
        assert_eq!(item.str_field("status"), Some("recorded_with_variance"));
        assert_eq!(item.str_field("logId"), Some(log_id.to_string().as_str()));

        let copy = doc(&store, &format!("inventoryLog/{log_id}/variantItems/item02")).unwrap();
        assert_eq!(copy.fields, item.fields);
    }

    #[test]
    fn day_aggregate_merge_keeps_existing_fields() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let mut existing = Fields::new();
        existing.insert("managerName".to_string(), json!("Adam Cole"));
        store
            .write_document(&DocumentPath::parse("stockCounts/2025-04-24").unwrap(), existing, false)
            .unwrap();

        SubmissionWriter::new(store.clone(), Collections::default())
            .persist_count(&count_submission(LogId::new()))
            .unwrap();

        let day = doc(&store, "stockCounts/2025-04-24").unwrap();
        assert_eq!(day.str_field("managerName"), Some("Adam Cole"));
        assert!(day.get("lastUpdated").is_some());
    }

    #[test]
    fn partial_failure_names_items_and_retry_completes() {
        let store = Arc::new(FlakyStore::failing(&["item02"]));
        let writer = SubmissionWriter::new(store.clone(), Collections::default());
        let submission = count_submission(LogId::new());

        let err = writer.persist_count(&submission).unwrap_err();
        match &err {
            PersistenceFailure::Partial { succeeded, failed, .. } => {
                assert_eq!(succeeded, &vec![id("item01")]);
                assert_eq!(failed.len(), 1);
                assert_eq!(failed[0].item_id, id("item02"));
            }
            other => panic!("unexpected failure: {other:?}"),
        }
        assert_eq!(err.failed_items(), vec![&id("item02")]);
        assert!(err.is_retryable());
        assert_eq!(err.log_id(), submission.log.id());

        store.heal();
        let report = writer.retry_count(&submission, &err).unwrap();
        assert_eq!(report.written, vec![id("item02")]);
        assert!(doc(&*store, "stockCounts/2025-04-24/items/item02").is_some());
    }

    #[test]
    fn header_failure_attempts_no_items() {
        let submission = count_submission(LogId::new());
        let store = Arc::new(FlakyStore::failing(&["2025-04-24"]));
        let writer = SubmissionWriter::new(store.clone(), Collections::default());

        let err = writer.persist_count(&submission).unwrap_err();
        assert!(matches!(err, PersistenceFailure::NotAttempted { .. }));
        assert!(err.failed_items().is_empty());
        assert!(doc(&*store, &format!("inventoryLog/{}/variantItems/item01", submission.log.id())).is_none());
    }

    #[test]
    fn waste_decrements_stock_with_merge() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let mut item = Fields::new();
        item.insert("itemName".to_string(), json!("Chicken Fries"));
        item.insert("totalStockOnHand".to_string(), json!(836));
        store
            .write_document(&DocumentPath::parse("inventory/item01").unwrap(), item, false)
            .unwrap();

        let catalog = vec![CatalogItem::new(
            id("item01"),
            "Chicken Fries",
            PackagingRatio::new(10, 5).unwrap(),
            836,
        )];
        let batch = assess_waste_batch(
            &catalog,
            &[WasteEntry {
                item_id: id("item01"),
                entry: CountEntry::new(0, 1, 3),
                reason: "expired".to_string(),
            }],
        );
        let submission = batch.into_submission(LogId::new(), test_time()).unwrap();

        let writer = SubmissionWriter::new(store.clone(), Collections::default());
        writer.persist_waste(&submission).unwrap();
        // Retrying must not decrement twice.
        writer.persist_waste(&submission).unwrap();

        let item = doc(&store, "inventory/item01").unwrap();
        assert_eq!(item.i64_field("totalStockOnHand"), Some(828));
        assert_eq!(item.str_field("itemName"), Some("Chicken Fries"));

        let log_id = submission.log.id();
        let log = doc(&store, &format!("wasteLogs/{log_id}")).unwrap();
        assert_eq!(log.i64_field("totalWaste"), Some(8));
        let line = doc(&store, &format!("wasteLogs/{log_id}/wasteItems/item01")).unwrap();
        assert_eq!(line.str_field("reason"), Some("expired"));
    }
}
