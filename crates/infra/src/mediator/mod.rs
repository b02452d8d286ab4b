//! Request mediator: the single path from a request to a store mutation.
//!
//! Every operation runs the same pipeline:
//!
//! ```text
//! request (actor id, time, input)
//!   ↓
//! 1. Resolve the subject from the identity store (fresh, never cached)
//!   ↓
//! 2. Resolve the scoping work area (activities, shifts)
//!   ↓
//! 3. Evaluate the policy; a denial stops here with no write
//!   ↓
//! 4. Validate the input
//!   ↓
//! 5. Write through the record store, re-checking the record under its lock
//! ```
//!
//! Step 5 never writes back a copy read earlier: the change is applied to the
//! live record inside `modify` or `transaction`, after checking that it is
//! still live and still scoped the way step 3 saw it.
//!
//! Listings check the type-level target first, then drop rows the caller may
//! not read (deleted rows included). Single-record reads report those as
//! `Denied`.

mod activities;
mod areas;
mod documents;
mod shifts;
mod todos;
mod users;

pub use activities::{ActivityFilter, AreaActivities};
pub use documents::{CategoryDocuments, DocumentFilter};
pub use shifts::{ScheduledShift, ShiftFilter};
pub use todos::TodoFilter;
pub use users::UserFilter;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, warn};

use volunteerdesk_activities::{Activity, Shift};
use volunteerdesk_auth::{
    Action, AuthorizationExplanation, Decision, DenialKind, Policy, Subject, Target,
    UnresolvedScope, User, WorkArea,
};
use volunteerdesk_core::{
    ActivityId, DeleteOutcome, DocumentId, Entity, RestoreOutcome, ShiftId, SoftDelete, TodoId,
    UserId, WorkAreaId,
};
use volunteerdesk_secretariat::{Document, Todo};

use crate::config::Settings;
use crate::error::{ServiceError, ServiceResult};
use crate::identity::{IdentityStore, SharedStore, WorkAreaRegistry};
use crate::read_model::InMemoryRecordStore;

/// Who is asking, and when.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    pub actor: Option<UserId>,
    pub now: DateTime<Utc>,
}

impl RequestContext {
    pub fn new(actor: Option<UserId>) -> Self {
        Self {
            actor,
            now: Utc::now(),
        }
    }

    pub fn as_user(actor: UserId) -> Self {
        Self::new(Some(actor))
    }

    pub fn anonymous() -> Self {
        Self::new(None)
    }

    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }
}

/// One store per record type.
#[derive(Clone)]
pub struct Stores {
    pub users: SharedStore<UserId, User>,
    pub areas: SharedStore<WorkAreaId, WorkArea>,
    pub activities: SharedStore<ActivityId, Activity>,
    pub shifts: SharedStore<ShiftId, Shift>,
    pub todos: SharedStore<TodoId, Todo>,
    pub documents: SharedStore<DocumentId, Document>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(InMemoryRecordStore::new()),
            areas: Arc::new(InMemoryRecordStore::new()),
            activities: Arc::new(InMemoryRecordStore::new()),
            shifts: Arc::new(InMemoryRecordStore::new()),
            todos: Arc::new(InMemoryRecordStore::new()),
            documents: Arc::new(InMemoryRecordStore::new()),
        }
    }
}

impl core::fmt::Debug for Stores {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct Mediator {
    stores: Stores,
    identity: IdentityStore,
    registry: WorkAreaRegistry,
    settings: Settings,
}

impl Mediator {
    pub fn new(stores: Stores, settings: Settings) -> Self {
        Self {
            identity: IdentityStore::new(stores.users.clone()),
            registry: WorkAreaRegistry::new(stores.areas.clone()),
            stores,
            settings,
        }
    }

    pub fn in_memory(settings: Settings) -> Self {
        Self::new(Stores::in_memory(), settings)
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    pub fn identity(&self) -> &IdentityStore {
        &self.identity
    }

    pub fn registry(&self) -> &WorkAreaRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Policy for the current registry state; the secretariat code is
    /// resolved on every call so a later-created area takes effect.
    pub fn policy(&self) -> Policy {
        Policy::new(
            self.registry
                .by_code(&self.settings.secretariat_area)
                .map(|a| a.id),
        )
    }

    pub fn subject(&self, ctx: &RequestContext) -> Option<Subject> {
        ctx.actor.and_then(|id| self.identity.get_subject(id))
    }

    /// Explain what the policy would decide for the request's actor.
    pub fn explain(&self, ctx: &RequestContext, action: Action, target: &Target) -> AuthorizationExplanation {
        let subject = self.subject(ctx);
        self.policy().explain(subject.as_ref(), action, target)
    }

    /// Evaluate and log; on allow, return the acting user's id.
    fn authorize(&self, subject: Option<&Subject>, action: Action, target: &Target) -> ServiceResult<UserId> {
        match (self.policy().evaluate(subject, action, target), subject) {
            (Decision::Allow, Some(subject)) => Ok(subject.user_id),
            (Decision::Allow, None) => Err(ServiceError::denied(DenialKind::Unauthenticated)),
            (Decision::Deny(kind), _) => {
                warn!(
                    actor = ?subject.map(|s| s.user_id),
                    action = %action,
                    resource = %target.kind(),
                    reason = %kind,
                    "request denied"
                );
                Err(ServiceError::denied(kind))
            }
        }
    }

    /// Authorize against an area-scoped target whose area may not resolve.
    ///
    /// An unresolved area is logged as a data fault. If the policy would deny
    /// only because of it, the fault itself is returned.
    fn authorize_scoped(
        &self,
        subject: Option<&Subject>,
        action: Action,
        resolved: Result<WorkAreaId, UnresolvedScope>,
        target: fn(Option<WorkAreaId>) -> Target,
    ) -> ServiceResult<UserId> {
        match resolved {
            Ok(area) => self.authorize(subject, action, &target(Some(area))),
            Err(fault) => {
                error!(kind = %fault.kind, id = %fault.id, detail = %fault.detail, "unresolved work area");
                match self.authorize(subject, action, &target(None)) {
                    Err(ServiceError::Denied {
                        kind: DenialKind::UnresolvedArea,
                    }) => Err(ServiceError::UnresolvedScope(fault)),
                    other => other,
                }
            }
        }
    }

    /// Apply `change` to the live record under the store's write lock.
    ///
    /// The record must still be live and `unchanged` must hold for it, so a
    /// decision taken on an earlier read still applies. A failed check or a
    /// failed `change` writes nothing.
    fn update_live<V>(
        store: &SharedStore<V::Id, V>,
        id: &V::Id,
        unchanged: impl Fn(&V) -> bool,
        mut change: impl FnMut(&mut V) -> ServiceResult<()>,
    ) -> ServiceResult<V>
    where
        V: Entity + SoftDelete + Clone,
    {
        let mut outcome: ServiceResult<()> = Ok(());
        let updated = store.modify(id, &mut |record: &mut V| {
            outcome = if record.is_deleted() {
                Err(ServiceError::not_found::<V>(id))
            } else if !unchanged(record) {
                Err(changed_meanwhile::<V>(id))
            } else {
                let mut draft = record.clone();
                let result = change(&mut draft);
                if result.is_ok() {
                    *record = draft;
                }
                result
            };
        })?;
        outcome?;
        updated.ok_or_else(|| ServiceError::not_found::<V>(id))
    }

    /// Soft-delete one record under the store's write lock.
    fn soft_delete_in<V: Entity + SoftDelete>(
        store: &SharedStore<V::Id, V>,
        id: &V::Id,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> ServiceResult<DeleteOutcome> {
        let mut outcome = DeleteOutcome::AlreadyDeleted;
        store
            .modify(id, &mut |record: &mut V| outcome = record.soft_delete(Some(actor), now))?
            .ok_or_else(|| ServiceError::not_found::<V>(id))?;
        Ok(outcome)
    }

    fn restore_in<V: Entity + SoftDelete>(
        store: &SharedStore<V::Id, V>,
        id: &V::Id,
    ) -> ServiceResult<RestoreOutcome> {
        let mut outcome = RestoreOutcome::NotDeleted;
        store
            .modify(id, &mut |record: &mut V| outcome = record.restore())?
            .ok_or_else(|| ServiceError::not_found::<V>(id))?;
        Ok(outcome)
    }
}

/// The record's scope changed between the policy check and the write.
fn changed_meanwhile<E: Entity>(id: &E::Id) -> ServiceError {
    ServiceError::conflict(format!("{} {id} changed while the request ran, retry", E::KIND))
}

/// Read action for a record: deleted rows need `read_deleted`.
fn read_action<V: SoftDelete>(record: &V) -> Action {
    if record.is_deleted() {
        Action::ReadDeleted
    } else {
        Action::Read
    }
}
