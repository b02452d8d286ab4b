//! Area resolution: which work area scopes a resource.
//!
//! Implemented per resource type. Types that are not area-scoped (todos,
//! documents) have no implementation, so asking for their area does not
//! compile.

use serde::Serialize;
use thiserror::Error;

use volunteerdesk_core::WorkAreaId;

use crate::ResourceKind;

/// A resource that should resolve to a work area but does not.
///
/// This is a data-integrity fault (missing area, dangling parent), not a
/// permission problem.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[error("{kind} {id} has no resolvable work area: {detail}")]
pub struct UnresolvedScope {
    pub kind: ResourceKind,
    pub id: String,
    pub detail: String,
}

impl UnresolvedScope {
    pub fn new(kind: ResourceKind, id: impl ToString, detail: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.to_string(),
            detail: detail.into(),
        }
    }
}

/// Resolve the scoping work area of `R`, following at most one parent hop.
pub trait ScopeResolver<R: ?Sized> {
    fn resolve_area(&self, resource: &R) -> Result<WorkAreaId, UnresolvedScope>;
}

impl<R: ?Sized, S: ScopeResolver<R> + ?Sized> ScopeResolver<R> for &S {
    fn resolve_area(&self, resource: &R) -> Result<WorkAreaId, UnresolvedScope> {
        (**self).resolve_area(resource)
    }
}
