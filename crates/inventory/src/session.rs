//! Counting session state.
//!
//! A `CountingSession` is an immutable value: every user action returns a new
//! session instead of flipping flags in place. Catalog order is preserved for
//! display and batch ordering.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use stockcount_core::{CountDate, DomainError, DomainResult, ItemId, LogId, SessionId};

use crate::catalog::CatalogItem;
use crate::count::{CountEntry, CountField};
use crate::reconcile::{reconcile_item, ItemReconciliation};
use crate::submission::{decide_submission, CountSubmission, SubmissionDecision};

/// A row that could not be reconciled. Only this row is blocked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowRejection {
    pub item_id: ItemId,
    pub error: DomainError,
}

/// Reconciled view of the ticked, not-yet-submitted rows of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingBatch {
    pub results: Vec<ItemReconciliation>,
    pub rejected: Vec<RowRejection>,
    /// Ticked rows left entirely blank; they were never counted.
    pub skipped: Vec<ItemId>,
}

impl PendingBatch {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Run the variance gate over the valid rows.
    pub fn decide(&self, override_requested: bool) -> SubmissionDecision {
        decide_submission(&self.results, override_requested)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountingSession {
    id: SessionId,
    date: CountDate,
    items: Vec<CatalogItem>,
    entries: BTreeMap<ItemId, CountEntry>,
    applied: BTreeSet<ItemId>,
    submitted: BTreeSet<ItemId>,
}

impl CountingSession {
    /// Open a session over a catalog snapshot. Item ids must be unique.
    pub fn start(id: SessionId, date: CountDate, items: Vec<CatalogItem>) -> DomainResult<Self> {
        let mut seen = BTreeSet::new();
        for item in &items {
            if !seen.insert(item.item_id().clone()) {
                return Err(DomainError::validation(format!(
                    "duplicate catalog item `{}`",
                    item.item_id()
                )));
            }
        }
        Ok(Self {
            id,
            date,
            items,
            entries: BTreeMap::new(),
            applied: BTreeSet::new(),
            submitted: BTreeSet::new(),
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn date(&self) -> CountDate {
        self.date
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn item(&self, item_id: &ItemId) -> Option<&CatalogItem> {
        self.items.iter().find(|i| i.item_id() == item_id)
    }

    /// The entry for an item; blank until something is typed.
    pub fn entry(&self, item_id: &ItemId) -> CountEntry {
        self.entries.get(item_id).copied().unwrap_or_default()
    }

    pub fn is_applied(&self, item_id: &ItemId) -> bool {
        self.applied.contains(item_id)
    }

    pub fn is_submitted(&self, item_id: &ItemId) -> bool {
        self.submitted.contains(item_id)
    }

    /// Items whose name matches a case-insensitive search, in catalog order.
    pub fn search(&self, query: &str) -> Vec<&CatalogItem> {
        self.items.iter().filter(|i| i.matches_search(query)).collect()
    }

    fn ensure_editable(&self, item_id: &ItemId) -> DomainResult<()> {
        if self.item(item_id).is_none() {
            return Err(DomainError::not_found());
        }
        if self.is_submitted(item_id) {
            return Err(DomainError::conflict(format!(
                "item `{item_id}` was already submitted in this session"
            )));
        }
        Ok(())
    }

    /// Replace an item's entry.
    pub fn with_entry(&self, item_id: &ItemId, entry: CountEntry) -> DomainResult<Self> {
        self.ensure_editable(item_id)?;
        let mut next = self.clone();
        if entry.is_blank() {
            next.entries.remove(item_id);
        } else {
            next.entries.insert(item_id.clone(), entry);
        }
        Ok(next)
    }

    /// Edit one field of an item's entry from the text the user typed.
    ///
    /// Text that is not a whole non-negative number is rejected and the
    /// session is left unchanged. Empty text clears the field.
    pub fn with_field_text(&self, item_id: &ItemId, field: CountField, raw: &str) -> DomainResult<Self> {
        self.ensure_editable(item_id)?;
        let entry = self.entry(item_id).with_text(field, raw)?;
        self.with_entry(item_id, entry)
    }

    /// Money value of the variance in `results`, using each item's unit
    /// price. Unpriced items contribute nothing; `None` on overflow.
    pub fn variance_value(&self, results: &[ItemReconciliation]) -> Option<i64> {
        results.iter().try_fold(0i64, |sum, r| {
            match self.item(&r.item_id).and_then(CatalogItem::unit_price) {
                Some(price) => sum.checked_add(r.result.variance_value(price)?),
                None => Some(sum),
            }
        })
    }

    /// Tick or untick an item for the next save.
    pub fn toggle_applied(&self, item_id: &ItemId) -> DomainResult<Self> {
        self.ensure_editable(item_id)?;
        let mut next = self.clone();
        if !next.applied.remove(item_id) {
            next.applied.insert(item_id.clone());
        }
        Ok(next)
    }

    /// "Tick all": ticks every unsubmitted item that has data, or clears
    /// every tick.
    pub fn with_all_applied(&self, on: bool) -> Self {
        let mut next = self.clone();
        next.applied = if on {
            self.items
                .iter()
                .map(CatalogItem::item_id)
                .filter(|id| !self.is_submitted(id) && !self.entry(id).is_blank())
                .cloned()
                .collect()
        } else {
            BTreeSet::new()
        };
        next
    }

    /// Reconcile every ticked, unsubmitted row in catalog order.
    pub fn pending(&self) -> PendingBatch {
        let mut batch = PendingBatch::default();
        for item in &self.items {
            let id = item.item_id();
            if !self.is_applied(id) || self.is_submitted(id) {
                continue;
            }
            let entry = self.entry(id);
            match reconcile_item(id, &entry, item.ratio(), item.expected_stock()) {
                Ok(Some(result)) => batch.results.push(result),
                Ok(None) => batch.skipped.push(id.clone()),
                Err(error) => batch.rejected.push(RowRejection {
                    item_id: id.clone(),
                    error,
                }),
            }
        }
        batch
    }

    /// Reconcile the pending rows, apply the variance gate and build the
    /// records under this session's date.
    ///
    /// Rejected rows stay out of the submission; [`pending`](Self::pending)
    /// reports them. Fails with a conflict while variance still needs
    /// confirmation.
    pub fn submit(
        &self,
        override_requested: bool,
        log_id: LogId,
        recorded_at: DateTime<Utc>,
    ) -> DomainResult<CountSubmission> {
        self.pending()
            .decide(override_requested)
            .into_submission(log_id, self.date, recorded_at)
    }

    /// Lock items whose records were persisted. They leave the applied set
    /// and can no longer be edited in this session.
    pub fn with_submitted<'a>(&self, item_ids: impl IntoIterator<Item = &'a ItemId>) -> Self {
        let mut next = self.clone();
        for id in item_ids {
            if self.item(id).is_some() {
                next.applied.remove(id);
                next.submitted.insert(id.clone());
            }
        }
        next
    }
}
