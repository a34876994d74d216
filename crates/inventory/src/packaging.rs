use serde::Serialize;

use stockcount_core::{DomainError, DomainResult, ValueObject};

/// Packaging ratio of a catalog item: how many inner packs sit in a box and
/// how many atomic units sit in an inner pack.
///
/// Immutable for the duration of a count.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackagingRatio {
    inner_per_box: u32,
    units_per_inner: u32,
}

impl ValueObject for PackagingRatio {}

impl PackagingRatio {
    /// One unit per inner, one inner per box.
    pub const UNIT: Self = Self {
        inner_per_box: 1,
        units_per_inner: 1,
    };

    pub fn new(inner_per_box: u32, units_per_inner: u32) -> DomainResult<Self> {
        if inner_per_box == 0 {
            return Err(DomainError::validation("innerPerBox must be at least 1"));
        }
        if units_per_inner == 0 {
            return Err(DomainError::validation("unitsPerInner must be at least 1"));
        }
        Ok(Self {
            inner_per_box,
            units_per_inner,
        })
    }

    pub fn inner_per_box(&self) -> u32 {
        self.inner_per_box
    }

    pub fn units_per_inner(&self) -> u32 {
        self.units_per_inner
    }

    /// Atomic units in one full box. Cannot overflow: both factors are `u32`.
    pub fn units_per_box(&self) -> i128 {
        i128::from(self.inner_per_box) * i128::from(self.units_per_inner)
    }
}

impl Default for PackagingRatio {
    fn default() -> Self {
        Self::UNIT
    }
}
