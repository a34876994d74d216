//! Catalog loading: `inventory/{itemId}` documents → [`CatalogItem`]s.
//!
//! Catalog documents are hand-maintained, so missing or malformed optional
//! fields fall back to defaults instead of failing the whole load:
//!
//! | Field | Default |
//! |---|---|
//! | `itemName` | `"Unknown Item"` |
//! | `unit` | `"EA"` |
//! | `innerPerBox`, `unitsPerInner` | `1` (also when zero or negative) |
//! | `totalStockOnHand` | `0` |
//! | `price` | none (decimal currency, converted to cents) |

use thiserror::Error;
use tracing::{debug, warn};

use stockcount_core::{CountDate, DomainError, ItemId, SessionId};
use stockcount_inventory::{CatalogItem, CountingSession, PackagingRatio};

use crate::config::Collections;
use crate::document_store::{Document, DocumentStore, StoreError};

pub const UNKNOWN_ITEM_NAME: &str = "Unknown Item";
pub const DELETED_ITEM_NAME: &str = "Deleted Item";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("catalog document {path}: {source}")]
    Domain {
        path: String,
        #[source]
        source: DomainError,
    },
}

/// Reads catalog items and stock on hand from the store.
#[derive(Debug, Clone)]
pub struct CatalogReader<S> {
    store: S,
    collections: Collections,
}

impl<S: DocumentStore> CatalogReader<S> {
    pub fn new(store: S, collections: Collections) -> Self {
        Self { store, collections }
    }

    /// Load every catalog item, ordered by id.
    pub fn load(&self) -> Result<Vec<CatalogItem>, CatalogError> {
        let docs = self.store.list_collection(self.collections.inventory())?;
        let items = docs
            .iter()
            .map(|doc| {
                catalog_item_from_document(doc).map_err(|source| CatalogError::Domain {
                    path: doc.path.to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!(items = items.len(), "catalog loaded");
        Ok(items)
    }

    /// Open a counting session over the current catalog.
    pub fn open_session(
        &self,
        session_id: SessionId,
        date: CountDate,
    ) -> Result<CountingSession, CatalogError> {
        let items = self.load()?;
        CountingSession::start(session_id, date, items).map_err(|source| CatalogError::Domain {
            path: self.collections.inventory().to_string(),
            source,
        })
    }

    /// Display name of an item; `None` when the catalog document is gone.
    pub fn item_name(&self, item_id: &ItemId) -> Result<Option<String>, StoreError> {
        let path = self.collections.inventory().doc(item_id.as_str())?;
        Ok(self.store.get_document(&path)?.map(|doc| {
            doc.str_field("itemName")
                .unwrap_or(UNKNOWN_ITEM_NAME)
                .to_string()
        }))
    }
}

/// Map one catalog document to a domain item, applying field defaults.
pub fn catalog_item_from_document(doc: &Document) -> Result<CatalogItem, DomainError> {
    let id = ItemId::parse(doc.id())?;
    let name = doc.str_field("itemName").unwrap_or(UNKNOWN_ITEM_NAME);
    let unit = doc.str_field("unit").unwrap_or(CatalogItem::DEFAULT_UNIT);

    let ratio = PackagingRatio::new(
        ratio_field(doc, "innerPerBox"),
        ratio_field(doc, "unitsPerInner"),
    )?;

    let expected = match doc.get("totalStockOnHand") {
        None => 0,
        Some(_) => doc.i64_field("totalStockOnHand").unwrap_or_else(|| {
            warn!(path = %doc.path, "totalStockOnHand is not a whole number; using 0");
            0
        }),
    };

    let mut item = CatalogItem::new(id, name, ratio, expected).with_unit(unit);
    if let Some(price) = price_in_cents(doc) {
        item = item.with_unit_price(price);
    }
    Ok(item)
}

fn ratio_field(doc: &Document, field: &str) -> u32 {
    match doc.get(field) {
        None => 1,
        Some(_) => match doc.i64_field(field).and_then(|v| u32::try_from(v).ok()) {
            Some(v) if v >= 1 => v,
            _ => {
                warn!(path = %doc.path, field, "packaging ratio is not a positive integer; using 1");
                1
            }
        },
    }
}

fn price_in_cents(doc: &Document) -> Option<i64> {
    let price = doc.get("price")?.as_f64()?;
    if !price.is_finite() || price < 0.0 || price > 1.0e15 {
        warn!(path = %doc.path, price, "ignoring out-of-range price");
        return None;
    }
    Some((price * 100.0).round() as i64)
}
