//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. Packaging ratios
/// and count entries are value objects: to "change" one, build a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
