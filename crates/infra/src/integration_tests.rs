//! End-to-end flows over the in-memory document store.
//!
//! Catalog → session → variance gate → persistence → history
//!
//! Verifies:
//! - Zero-variance items save immediately and variance items wait for
//!   confirmation
//! - Overridden submissions are flagged and keep their variance
//! - Partial write failures are reported per item and retries complete
//! - Waste decrements stock on hand once, even when retried

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::{Arc, Mutex};

    use chrono::{DateTime, Utc};
    use serde_json::json;

    use stockcount_core::{CountDate, ItemId, LogId, SessionId};
    use stockcount_inventory::{
        assess_waste_batch, decide_submission, CountEntry, CountingSession, SubmissionDecision,
        WasteEntry,
    };

    use crate::catalog::CatalogReader;
    use crate::config::Collections;
    use crate::document_store::{
        CollectionPath, Document, DocumentPath, DocumentStore, Fields, InMemoryDocumentStore,
        StoreError,
    };
    use crate::history::{HistoryReader, LogKind};
    use crate::persistence::{PersistenceFailure, SubmissionWriter};

    /// Fails every write whose path contains one of the given segments until
    /// healed.
    #[derive(Default)]
    struct FaultyStore {
        inner: InMemoryDocumentStore,
        broken: Mutex<BTreeSet<String>>,
    }

    impl FaultyStore {
        fn break_segment(&self, segment: &str) {
            self.broken.lock().unwrap().insert(segment.to_string());
        }

        fn heal(&self) {
            self.broken.lock().unwrap().clear();
        }
    }

    impl DocumentStore for FaultyStore {
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
            let rendered = path.to_string();
            let broken = self.broken.lock().unwrap();
            if rendered.split('/').any(|s| broken.contains(s)) {
                return Err(StoreError::Unavailable(format!("write to {rendered} timed out")));
            }
            drop(broken);
            self.inner.write_document(path, fields, merge)
        }
    }

    fn setup() {
        stockcount_observability::init();
    }

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn id(s: &str) -> ItemId {
        ItemId::parse(s).unwrap()
    }

    fn seed_catalog(store: &impl DocumentStore) {
        let items = [
            ("item01", json!({ "itemName": "Chicken Fries", "totalStockOnHand": 836, "innerPerBox": 10, "unitsPerInner": 5 })),
            ("item02", json!({ "itemName": "Veg Nuggets", "totalStockOnHand": 108, "innerPerBox": 10, "unitsPerInner": 5 })),
            ("item03", json!({ "itemName": "Hash Browns", "totalStockOnHand": 40, "innerPerBox": 4, "unitsPerInner": 10 })),
        ];
        for (item_id, value) in items {
            let serde_json::Value::Object(fields) = value else {
                panic!("expected object");
            };
            store
                .write_document(&DocumentPath::parse(&format!("inventory/{item_id}")).unwrap(), fields, false)
                .unwrap();
        }
    }

    fn counted_session(store: &Arc<impl DocumentStore>) -> CountingSession {
        let reader = CatalogReader::new(store.clone(), Collections::default());
        let date = CountDate::of(at("2025-04-24T19:53:01Z"));
        let session = reader.open_session(SessionId::new(), date).unwrap();

        session
            // 16*50 + 7*5 + 1 = 836: matches stock on hand.
            .with_entry(&id("item01"), CountEntry::new(16, 7, 1))
            .unwrap()
            // 2*50 = 100 against 108: short by 8.
            .with_entry(&id("item02"), CountEntry::parse("2", "", "").unwrap())
            .unwrap()
            .with_all_applied(true)
    }

    #[test]
    fn variance_gate_then_override_persists_everything() {
        setup();
        let store = Arc::new(InMemoryDocumentStore::new());
        seed_catalog(&store);
        let writer = SubmissionWriter::new(store.clone(), Collections::default());

        let session = counted_session(&store);
        let batch = session.pending();
        assert_eq!(batch.results.len(), 2);
        assert!(batch.rejected.is_empty());

        // First attempt: only the matching item goes through.
        let SubmissionDecision::NeedsConfirmation { with_variance, ready } = batch.decide(false) else {
            panic!("variance must need confirmation");
        };
        assert_eq!(with_variance.len(), 1);
        assert_eq!(with_variance[0].item_id, id("item02"));

        let ready = decide_submission(&ready, false)
            .into_submission(LogId::new(), session.date(), at("2025-04-24T19:53:01Z"))
            .unwrap();
        writer.persist_count(&ready).unwrap();
        let session = session.with_submitted(ready.item_ids().iter());
        assert!(session.is_submitted(&id("item01")));
        assert!(session.with_entry(&id("item01"), CountEntry::new(1, 0, 0)).is_err());

        // "Submit anyway" for the rest.
        let decision = session.pending().decide(true);
        assert!(decision.is_accepted());
        let forced = decision
            .into_submission(LogId::new(), session.date(), at("2025-04-24T19:55:00Z"))
            .unwrap();
        assert!(forced.log.overridden());
        writer.persist_count(&forced).unwrap();

        let day_item = store
            .get_document(&DocumentPath::parse("stockCounts/2025-04-24/items/item02").unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(day_item.i64_field("variance"), Some(-8));
        assert_eq!(day_item.get("overrideApplied"), Some(&json!(true)));

        let history = HistoryReader::new(store.clone(), Collections::default());
        let days = history.daily_activity().unwrap();
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].logs.len(), 2);
        assert_eq!(days[0].total_variance, -8);

        let lines = history
            .variance_lines(&forced.log.id().to_string())
            .unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].item_name, "Veg Nuggets");
        assert_eq!(lines[0].total, 100);
    }

    #[test]
    fn invalid_rows_are_rejected_without_blocking_the_batch() {
        let store = Arc::new(InMemoryDocumentStore::new());
        seed_catalog(&store);

        let session = counted_session(&store)
            .with_entry(&id("item03"), CountEntry::parse("", "", "12").unwrap())
            .unwrap()
            .with_entry(&id("item03"), CountEntry::new(0, 0, -3))
            .unwrap()
            .with_all_applied(true);

        let batch = session.pending();
        assert_eq!(batch.rejected.len(), 1);
        assert_eq!(batch.rejected[0].item_id, id("item03"));
        assert!(batch.rejected[0].error.is_invalid_input());
        assert_eq!(batch.results.len(), 2);
    }

    #[test]
    fn partial_failure_then_retry_leaves_consistent_log() {
        setup();
        let store = Arc::new(FaultyStore::default());
        seed_catalog(&store);
        let writer = SubmissionWriter::new(store.clone(), Collections::default());

        let submission = counted_session(&store)
            .submit(true, LogId::new(), at("2025-04-24T19:53:01Z"))
            .unwrap();

        store.break_segment("item02");
        let err = writer.persist_count(&submission).unwrap_err();
        let PersistenceFailure::Partial { succeeded, failed, log_id } = &err else {
            panic!("expected a partial failure, got {err:?}");
        };
        assert_eq!(*log_id, submission.log.id());
        assert_eq!(succeeded, &vec![id("item01")]);
        assert_eq!(failed[0].item_id, id("item02"));
        assert!(err.is_retryable());

        store.heal();
        let report = writer.persist_count(&submission).unwrap();
        assert_eq!(report.written, vec![id("item01"), id("item02")]);

        let history = HistoryReader::new(store.clone(), Collections::default());
        let lines = history
            .variance_lines(&submission.log.id().to_string())
            .unwrap();
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn waste_flow_updates_stock_and_history() {
        setup();
        let store = Arc::new(InMemoryDocumentStore::new());
        seed_catalog(&store);
        let reader = CatalogReader::new(store.clone(), Collections::default());
        let catalog = reader.load().unwrap();

        let batch = assess_waste_batch(
            &catalog,
            &[
                WasteEntry {
                    item_id: id("item01"),
                    entry: CountEntry::new(0, 1, 3),
                    reason: "expired".to_string(),
                },
                WasteEntry {
                    item_id: id("item03"),
                    entry: CountEntry::new(2, 0, 0),
                    reason: "dropped".to_string(),
                },
            ],
        );
        // item03 holds 40 units; two boxes are 80.
        assert_eq!(batch.rejected.len(), 1);
        assert_eq!(batch.rejected[0].item_id, id("item03"));

        let submission = batch
            .into_submission(LogId::new(), at("2025-04-24T21:00:00Z"))
            .unwrap();
        let writer = SubmissionWriter::new(store.clone(), Collections::default());
        writer.persist_waste(&submission).unwrap();
        writer.persist_waste(&submission).unwrap();

        let reloaded = reader.load().unwrap();
        assert_eq!(reloaded[0].expected_stock(), 828);
        assert_eq!(reloaded[2].expected_stock(), 40);

        let history = HistoryReader::new(store.clone(), Collections::default());
        let days = history.daily_activity().unwrap();
        assert_eq!(days[0].total_waste, 8);
        assert_eq!(days[0].logs[0].kind, LogKind::Waste);

        let lines = history
            .waste_lines(&submission.log.id().to_string())
            .unwrap();
        assert_eq!(lines[0].item_name, "Chicken Fries");
        assert_eq!(lines[0].reason.as_deref(), Some("expired"));
    }

    #[test]
    fn deleted_catalog_items_still_show_in_history() {
        let store = Arc::new(InMemoryDocumentStore::new());
        seed_catalog(&store);
        let writer = SubmissionWriter::new(store.clone(), Collections::default());

        let submission = counted_session(&store)
            .submit(true, LogId::new(), at("2025-04-24T19:53:01Z"))
            .unwrap();
        writer.persist_count(&submission).unwrap();

        // Simulate deletion by replacing the catalog with an unrelated store view.
        let fresh = Arc::new(InMemoryDocumentStore::new());
        for doc in store
            .list_collection(&CollectionPath::parse("inventoryLog").unwrap())
            .unwrap()
        {
            fresh.write_document(&doc.path, doc.fields.clone(), false).unwrap();
            let items = doc.path.collection(Collections::VARIANT_ITEMS).unwrap();
            for line in store.list_collection(&items).unwrap() {
                fresh.write_document(&line.path, line.fields, false).unwrap();
            }
        }

        let lines = HistoryReader::new(fresh, Collections::default())
            .variance_lines(&submission.log.id().to_string())
            .unwrap();
        assert!(lines.iter().all(|l| l.item_name == crate::catalog::DELETED_ITEM_NAME));
    }
}
