//! Read side of count and waste logs.
//!
//! Logs are grouped by the calendar day of their timestamp (UTC), newest day
//! first, with daily totals. Line items resolve display names against the
//! current catalog; items removed since are shown as "Deleted Item".
//!
//! Old documents are decoded tolerantly: a log whose timestamp cannot be read
//! is skipped with a warning instead of failing the whole view.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{debug, warn};

use stockcount_core::{CountDate, DomainError, ItemId};

use crate::catalog::{CatalogReader, DELETED_ITEM_NAME};
use crate::config::Collections;
use crate::document_store::{CollectionPath, Document, DocumentStore, StoreError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("log not found: {0}")]
    LogNotFound(String),

    #[error("cannot decode {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: DomainError,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogKind {
    Count,
    Waste,
}

/// Header of one stored log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSummary {
    /// Document id; older logs predate typed ids.
    pub log_id: String,
    pub kind: LogKind,
    pub timestamp: DateTime<Utc>,
    /// Total variance for count logs, total waste for waste logs.
    pub total: i64,
}

/// All logs of one calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyActivity {
    pub date: CountDate,
    /// Newest first.
    pub logs: Vec<LogSummary>,
    pub total_variance: i64,
    pub total_waste: i64,
}

/// One item line inside a log, with its resolved display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub item_id: ItemId,
    pub item_name: String,
    pub boxes: Option<i64>,
    pub inner_packs: Option<i64>,
    pub units: Option<i64>,
    /// Units counted (count logs) or wasted (waste logs).
    pub total: i64,
    /// Count logs only.
    pub variance: Option<i64>,
    pub reason: Option<String>,
}

/// Read a log timestamp: RFC 3339 text, epoch milliseconds, or an exported
/// `{seconds, nanoseconds}` object.
pub fn parse_timestamp(value: &JsonValue) -> Option<DateTime<Utc>> {
    match value {
        JsonValue::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        JsonValue::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        JsonValue::Object(map) => {
            let seconds = map.get("seconds").or_else(|| map.get("_seconds"))?.as_i64()?;
            let nanos = map
                .get("nanoseconds")
                .or_else(|| map.get("_nanoseconds"))
                .and_then(JsonValue::as_u64)
                .unwrap_or(0);
            DateTime::from_timestamp(seconds, u32::try_from(nanos).ok()?)
        }
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct HistoryReader<S> {
    store: S,
    collections: Collections,
    catalog: CatalogReader<S>,
}

impl<S: DocumentStore + Clone> HistoryReader<S> {
    pub fn new(store: S, collections: Collections) -> Self {
        let catalog = CatalogReader::new(store.clone(), collections.clone());
        Self {
            store,
            collections,
            catalog,
        }
    }

    /// Count and waste logs grouped by day, newest day first.
    pub fn daily_activity(&self) -> Result<Vec<DailyActivity>, HistoryError> {
        let mut days: BTreeMap<CountDate, DailyActivity> = BTreeMap::new();

        let sources = [
            (LogKind::Count, self.collections.inventory_log(), "totalVariance"),
            (LogKind::Waste, self.collections.waste_logs(), "totalWaste"),
        ];
        for (kind, collection, total_field) in sources {
            for doc in self.store.list_collection(collection)? {
                let Some(summary) = summarize(&doc, kind, total_field) else {
                    continue;
                };
                let date = CountDate::of(summary.timestamp);
                let day = days.entry(date).or_insert_with(|| DailyActivity {
                    date,
                    logs: Vec::new(),
                    total_variance: 0,
                    total_waste: 0,
                });
                let total = match kind {
                    LogKind::Count => &mut day.total_variance,
                    LogKind::Waste => &mut day.total_waste,
                };
                let Some(sum) = total.checked_add(summary.total) else {
                    warn!(path = %doc.path, total = summary.total, "daily total out of range; log skipped");
                    continue;
                };
                *total = sum;
                day.logs.push(summary);
            }
        }

        let mut out: Vec<DailyActivity> = days.into_values().rev().collect();
        for day in &mut out {
            day.logs
                .sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.log_id.cmp(&b.log_id)));
        }
        debug!(days = out.len(), "history loaded");
        Ok(out)
    }

    /// Per-item lines of a count log.
    pub fn variance_lines(&self, log_id: &str) -> Result<Vec<LogLine>, HistoryError> {
        let items = self.lines_collection(self.collections.inventory_log(), log_id, Collections::VARIANT_ITEMS)?;
        let mut names = NameCache::default();
        items
            .iter()
            .map(|doc| -> Result<LogLine, HistoryError> {
                let item_id = line_item_id(doc)?;
                let item_name = names.resolve(&self.catalog, &item_id, None)?;
                Ok(LogLine {
                    item_name,
                    boxes: doc.i64_field("boxesCount"),
                    inner_packs: doc.i64_field("innerCount"),
                    units: doc.i64_field("unitsCount"),
                    total: doc.i64_field("totalCounted").unwrap_or(0),
                    variance: Some(doc.i64_field("variance").unwrap_or(0)),
                    reason: doc.str_field("reason").map(str::to_string),
                    item_id,
                })
            })
            .collect()
    }

    /// Per-item lines of a waste log.
    pub fn waste_lines(&self, log_id: &str) -> Result<Vec<LogLine>, HistoryError> {
        let items = self.lines_collection(self.collections.waste_logs(), log_id, Collections::WASTE_ITEMS)?;
        let mut names = NameCache::default();
        items
            .iter()
            .map(|doc| -> Result<LogLine, HistoryError> {
                let item_id = line_item_id(doc)?;
                let item_name = names.resolve(&self.catalog, &item_id, doc.str_field("itemName"))?;
                Ok(LogLine {
                    item_name,
                    boxes: doc.i64_field("boxesCount"),
                    inner_packs: doc.i64_field("innerCount"),
                    units: doc.i64_field("unitsCount"),
                    total: doc.i64_field("totalWaste").unwrap_or(0),
                    variance: None,
                    reason: doc.str_field("reason").map(str::to_string),
                    item_id,
                })
            })
            .collect()
    }

    fn lines_collection(
        &self,
        logs: &CollectionPath,
        log_id: &str,
        sub: &str,
    ) -> Result<Vec<Document>, HistoryError> {
        let log_path = logs.doc(log_id)?;
        if self.store.get_document(&log_path)?.is_none() {
            return Err(HistoryError::LogNotFound(log_path.to_string()));
        }
        Ok(self.store.list_collection(&log_path.collection(sub)?)?)
    }
}

fn summarize(doc: &Document, kind: LogKind, total_field: &str) -> Option<LogSummary> {
    let Some(timestamp) = doc.get("timestamp").and_then(parse_timestamp) else {
        warn!(path = %doc.path, "log has no readable timestamp; skipped");
        return None;
    };
    Some(LogSummary {
        log_id: doc.id().to_string(),
        kind,
        timestamp,
        total: doc.i64_field(total_field).unwrap_or(0),
    })
}

/// Item id of a line: the stored `itemId` (possibly a legacy
/// `inventory/{id}` reference), else the document id.
fn line_item_id(doc: &Document) -> Result<ItemId, HistoryError> {
    let decode = |source| HistoryError::Decode {
        path: doc.path.to_string(),
        source,
    };
    match doc.str_field("itemId") {
        Some(reference) => ItemId::from_reference(reference).map_err(decode),
        None => ItemId::parse(doc.id()).map_err(decode),
    }
}

#[derive(Default)]
struct NameCache(BTreeMap<ItemId, Option<String>>);

impl NameCache {
    fn resolve<S: DocumentStore>(
        &mut self,
        catalog: &CatalogReader<S>,
        item_id: &ItemId,
        stored: Option<&str>,
    ) -> Result<String, StoreError> {
        let current = match self.0.get(item_id) {
            Some(name) => name.clone(),
            None => {
                let name = catalog.item_name(item_id)?;
                self.0.insert(item_id.clone(), name.clone());
                name
            }
        };
        Ok(current
            .or_else(|| stored.map(str::to_string))
            .unwrap_or_else(|| DELETED_ITEM_NAME.to_string()))
    }
}
