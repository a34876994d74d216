use serde::Serialize;

use stockcount_core::{Entity, ItemId};

use crate::packaging::PackagingRatio;

/// Snapshot of a catalog item as loaded for a counting session.
///
/// `expected_stock` is the store's prior belief about on-hand quantity in
/// atomic units; the reconciler only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    id: ItemId,
    name: String,
    unit: String,
    ratio: PackagingRatio,
    expected_stock: i64,
    unit_price: Option<i64>,
}

impl CatalogItem {
    pub const DEFAULT_UNIT: &'static str = "EA";

    pub fn new(id: ItemId, name: impl Into<String>, ratio: PackagingRatio, expected_stock: i64) -> Self {
        Self {
            id,
            name: name.into(),
            unit: Self::DEFAULT_UNIT.to_string(),
            ratio,
            expected_stock,
            unit_price: None,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    /// Price per atomic unit, in the smallest currency unit.
    pub fn with_unit_price(mut self, unit_price: i64) -> Self {
        self.unit_price = Some(unit_price);
        self
    }

    pub fn item_id(&self) -> &ItemId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn ratio(&self) -> PackagingRatio {
        self.ratio
    }

    pub fn expected_stock(&self) -> i64 {
        self.expected_stock
    }

    pub fn unit_price(&self) -> Option<i64> {
        self.unit_price
    }

    /// Case-insensitive substring match on the item name.
    pub fn matches_search(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        query.is_empty() || self.name.to_lowercase().contains(&query)
    }
}

impl Entity for CatalogItem {
    type Id = ItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_ignores_case_and_blank_queries() {
        let item = CatalogItem::new(
            ItemId::parse("item01").unwrap(),
            "Chicken Fries",
            PackagingRatio::new(10, 5).unwrap(),
            836,
        );
        assert!(item.matches_search("fries"));
        assert!(item.matches_search("CHICKEN"));
        assert!(item.matches_search(""));
        assert!(!item.matches_search("nuggets"));
        assert_eq!(item.unit(), "EA");
    }
}
