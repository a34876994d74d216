//! `stockcount-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no storage concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod record;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{CountDate, ItemId, LogId, SessionId};
pub use record::AuditRecord;
pub use value_object::ValueObject;
