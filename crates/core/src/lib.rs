//! `volunteerdesk-core`: shared domain building blocks.
//!
//! This crate contains **pure domain** primitives (no storage, no transport):
//! typed identifiers, the domain error model, and the soft-delete lifecycle
//! shared by every record type.

pub mod entity;
pub mod error;
pub mod id;
pub mod soft_delete;
pub mod validate;

pub use entity::Entity;
pub use error::{DomainError, DomainResult, FieldError, FieldErrors};
pub use id::{ActivityId, DocumentId, ShiftId, TodoId, UserId, WorkAreaId};
pub use soft_delete::{DeleteOutcome, DeletionMarker, RestoreOutcome, SoftDelete};
