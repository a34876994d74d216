use serde::{Deserialize, Serialize};

use stockcount_core::{DomainError, DomainResult, ValueObject};

/// One of the three packaging levels a staff member can fill in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CountField {
    Boxes,
    InnerPacks,
    Units,
}

impl CountField {
    pub const ALL: [CountField; 3] = [CountField::Boxes, CountField::InnerPacks, CountField::Units];

    pub fn as_str(&self) -> &'static str {
        match self {
            CountField::Boxes => "boxes",
            CountField::InnerPacks => "innerPacks",
            CountField::Units => "units",
        }
    }
}

impl core::fmt::Display for CountField {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A staff-entered observation for one item.
///
/// `None` means the field was left blank. Values are kept signed so that a
/// negative entry reaches validation and is reported instead of being
/// clamped or wrapped.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountEntry {
    pub boxes: Option<i64>,
    pub inner_packs: Option<i64>,
    pub units: Option<i64>,
}

impl ValueObject for CountEntry {}

impl CountEntry {
    /// An entry with every field blank.
    pub const fn blank() -> Self {
        Self {
            boxes: None,
            inner_packs: None,
            units: None,
        }
    }

    /// An entry with every field filled in.
    pub const fn new(boxes: i64, inner_packs: i64, units: i64) -> Self {
        Self {
            boxes: Some(boxes),
            inner_packs: Some(inner_packs),
            units: Some(units),
        }
    }

    /// Parse the three text inputs of a count row.
    ///
    /// Empty or whitespace-only text is blank. Anything else must be a
    /// non-negative whole number.
    pub fn parse(boxes: &str, inner_packs: &str, units: &str) -> DomainResult<Self> {
        Ok(Self {
            boxes: parse_field(CountField::Boxes, boxes)?,
            inner_packs: parse_field(CountField::InnerPacks, inner_packs)?,
            units: parse_field(CountField::Units, units)?,
        })
    }

    pub fn get(&self, field: CountField) -> Option<i64> {
        match field {
            CountField::Boxes => self.boxes,
            CountField::InnerPacks => self.inner_packs,
            CountField::Units => self.units,
        }
    }

    /// Return a copy with one field replaced.
    pub fn with(self, field: CountField, value: Option<i64>) -> Self {
        let mut next = self;
        match field {
            CountField::Boxes => next.boxes = value,
            CountField::InnerPacks => next.inner_packs = value,
            CountField::Units => next.units = value,
        }
        next
    }

    /// Return a copy with one field replaced by parsed text.
    pub fn with_text(self, field: CountField, raw: &str) -> DomainResult<Self> {
        Ok(self.with(field, parse_field(field, raw)?))
    }

    /// True when no field was filled in: the item was not counted.
    pub fn is_blank(&self) -> bool {
        self.boxes.is_none() && self.inner_packs.is_none() && self.units.is_none()
    }

    /// Reject negative fields. Blank fields are always valid.
    pub fn validate(&self) -> DomainResult<()> {
        for field in CountField::ALL {
            if let Some(v) = self.get(field) {
                if v < 0 {
                    return Err(DomainError::invalid_input(
                        field.as_str(),
                        format!("must not be negative (got {v})"),
                    ));
                }
            }
        }
        Ok(())
    }
}

fn parse_field(field: CountField, raw: &str) -> DomainResult<Option<i64>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let value: i64 = trimmed.parse().map_err(|_| {
        DomainError::invalid_input(field.as_str(), format!("`{trimmed}` is not a whole number"))
    })?;
    if value < 0 {
        return Err(DomainError::invalid_input(
            field.as_str(),
            format!("must not be negative (got {value})"),
        ));
    }
    Ok(Some(value))
}
