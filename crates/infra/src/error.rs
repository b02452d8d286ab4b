use thiserror::Error;

use volunteerdesk_auth::{AuthzError, DenialKind, UnresolvedScope};
use volunteerdesk_core::{DomainError, Entity, FieldErrors};

use crate::read_model::StoreError;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Failures surfaced by the mediator, bulk actions and import.
///
/// `Denied` is never folded into `NotFound`: a record the caller may not
/// touch is reported as forbidden.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("forbidden: {kind} ({})", .kind.message())]
    Denied { kind: DenialKind },

    #[error(transparent)]
    UnresolvedScope(#[from] UnresolvedScope),

    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid request: {0}")]
    Invalid(String),

    #[error("store failure: {0}")]
    Store(#[from] StoreError),
}

impl ServiceError {
    pub fn denied(kind: DenialKind) -> Self {
        Self::Denied { kind }
    }

    pub fn not_found<E: Entity>(id: &E::Id) -> Self {
        Self::NotFound {
            kind: E::KIND,
            id: id.to_string(),
        }
    }

    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.push(field, message);
        Self::Validation(errors)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn denial(&self) -> Option<DenialKind> {
        match self {
            Self::Denied { kind } => Some(*kind),
            _ => None,
        }
    }
}

impl From<AuthzError> for ServiceError {
    fn from(value: AuthzError) -> Self {
        Self::Denied { kind: value.kind }
    }
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(errors) => Self::Validation(errors),
            DomainError::Conflict(msg) => Self::Conflict(msg),
            DomainError::NotFound => Self::NotFound {
                kind: "record",
                id: String::new(),
            },
            DomainError::InvariantViolation(msg) | DomainError::InvalidId(msg) => Self::Invalid(msg),
        }
    }
}
