//! Soft-delete lifecycle shared by every stored record.
//!
//! State machine: `Active -> Deleted -> Active (restore)`. Both transitions are
//! idempotent: deleting a deleted record or restoring a live one is a no-op
//! reported through the outcome enums, never an error.
//!
//! Authorization is not checked here; callers evaluate policy first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::UserId;

/// Soft-delete marker, timestamp and deleting actor.
///
/// The actor is a weak reference: purging that user clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionMarker {
    is_deleted: bool,
    deleted_at: Option<DateTime<Utc>>,
    deleted_by: Option<UserId>,
}

impl DeletionMarker {
    pub fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    pub fn deleted_by(&self) -> Option<UserId> {
        self.deleted_by
    }

    /// Drop the actor reference if it points at `user_id`.
    pub fn forget_actor(&mut self, user_id: UserId) {
        if self.deleted_by == Some(user_id) {
            self.deleted_by = None;
        }
    }

    fn mark(&mut self, actor: Option<UserId>, at: DateTime<Utc>) {
        self.is_deleted = true;
        self.deleted_at = Some(at);
        self.deleted_by = actor;
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted,
    AlreadyDeleted,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RestoreOutcome {
    Restored,
    NotDeleted,
}

/// Records that support soft deletion.
///
/// Implementors expose their `DeletionMarker`; the transitions are provided.
/// `on_soft_deleted` / `on_restored` let a type adjust extra state (a user
/// loses its active flag, for instance).
pub trait SoftDelete {
    fn deletion(&self) -> &DeletionMarker;

    fn deletion_mut(&mut self) -> &mut DeletionMarker;

    fn on_soft_deleted(&mut self) {}

    fn on_restored(&mut self) {}

    fn is_deleted(&self) -> bool {
        self.deletion().is_deleted()
    }

    fn soft_delete(&mut self, actor: Option<UserId>, at: DateTime<Utc>) -> DeleteOutcome {
        if self.is_deleted() {
            return DeleteOutcome::AlreadyDeleted;
        }
        self.deletion_mut().mark(actor, at);
        self.on_soft_deleted();
        DeleteOutcome::Deleted
    }

    fn restore(&mut self) -> RestoreOutcome {
        if !self.is_deleted() {
            return RestoreOutcome::NotDeleted;
        }
        self.deletion_mut().clear();
        self.on_restored();
        RestoreOutcome::Restored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Card {
        deletion: DeletionMarker,
        hooks: u32,
    }

    impl SoftDelete for Card {
        fn deletion(&self) -> &DeletionMarker {
            &self.deletion
        }

        fn deletion_mut(&mut self) -> &mut DeletionMarker {
            &mut self.deletion
        }

        fn on_soft_deleted(&mut self) {
            self.hooks += 1;
        }
    }

    #[test]
    fn delete_sets_marker_timestamp_and_actor() {
        let mut card = Card::default();
        let actor = UserId::new();
        let now = Utc::now();

        assert_eq!(card.soft_delete(Some(actor), now), DeleteOutcome::Deleted);
        assert!(card.is_deleted());
        assert_eq!(card.deletion().deleted_at(), Some(now));
        assert_eq!(card.deletion().deleted_by(), Some(actor));
    }

    #[test]
    fn second_delete_is_a_noop() {
        let mut card = Card::default();
        let first_at = Utc::now();
        card.soft_delete(Some(UserId::new()), first_at);
        let after_first = card.clone();

        let outcome = card.soft_delete(Some(UserId::new()), first_at + Duration::minutes(5));

        assert_eq!(outcome, DeleteOutcome::AlreadyDeleted);
        assert_eq!(card, after_first);
        assert_eq!(card.hooks, 1);
    }

    #[test]
    fn restore_clears_every_field() {
        let mut card = Card::default();
        card.soft_delete(Some(UserId::new()), Utc::now());

        assert_eq!(card.restore(), RestoreOutcome::Restored);
        assert_eq!(card.deletion, DeletionMarker::default());
    }

    #[test]
    fn restoring_a_live_record_reports_not_deleted() {
        let mut card = Card::default();
        assert_eq!(card.restore(), RestoreOutcome::NotDeleted);
    }

    #[test]
    fn forget_actor_only_clears_matching_user() {
        let mut card = Card::default();
        let actor = UserId::new();
        card.soft_delete(Some(actor), Utc::now());

        card.deletion_mut().forget_actor(UserId::new());
        assert_eq!(card.deletion().deleted_by(), Some(actor));

        card.deletion_mut().forget_actor(actor);
        assert_eq!(card.deletion().deleted_by(), None);
        assert!(card.is_deleted());
    }
}
