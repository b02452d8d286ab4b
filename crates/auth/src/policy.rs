//! Role/area-scoped policy evaluation.
//!
//! `Policy::evaluate` is pure: no IO, no panics, no mutable state. Callers
//! resolve the subject and the target's scoping area first, then ask.
//!
//! Rules, first match wins:
//! 1. No subject, inactive or soft-deleted subject: deny.
//! 2. Superadmin: allow.
//! 3. `read`: open for areas, activities, shifts and todos; documents by
//!    visibility; users for admins within their scope, plus one's own profile.
//! 4. `create`/`update`/`delete`/`read_deleted`: never for base users; todos
//!    for any admin; documents for secretariat admins; activities and shifts
//!    inside the subject's areas; users that are base or share an area, never
//!    granting superadmin.
//! 5. `restore`, `purge`, and writes to work areas: superadmin only.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use volunteerdesk_core::WorkAreaId;

use crate::{Action, Role, Subject, Target, UserTarget, Visibility};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    Unauthenticated,
    InactiveSubject,
    BaseRoleReadOnly,
    AdminRequired,
    OutsideWorkArea,
    SecretariatRequired,
    DocumentVisibility,
    SuperadminRequired,
    RoleEscalation,
    UnresolvedArea,
    NoMatchingRule,
}

impl DenialKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenialKind::Unauthenticated => "unauthenticated",
            DenialKind::InactiveSubject => "inactive_subject",
            DenialKind::BaseRoleReadOnly => "base_role_read_only",
            DenialKind::AdminRequired => "admin_required",
            DenialKind::OutsideWorkArea => "outside_work_area",
            DenialKind::SecretariatRequired => "secretariat_required",
            DenialKind::DocumentVisibility => "document_visibility",
            DenialKind::SuperadminRequired => "superadmin_required",
            DenialKind::RoleEscalation => "role_escalation",
            DenialKind::UnresolvedArea => "unresolved_area",
            DenialKind::NoMatchingRule => "no_matching_rule",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            DenialKind::Unauthenticated => "no authenticated user",
            DenialKind::InactiveSubject => "the account is inactive or deleted",
            DenialKind::BaseRoleReadOnly => "base users have read-only access",
            DenialKind::AdminRequired => "only admins may do this",
            DenialKind::OutsideWorkArea => "the resource belongs to a work area the user does not manage",
            DenialKind::SecretariatRequired => "only admins of the secretariat area may do this",
            DenialKind::DocumentVisibility => "the document is not visible to this user",
            DenialKind::SuperadminRequired => "only superadmins may do this",
            DenialKind::RoleEscalation => "only superadmins may grant the superadmin role",
            DenialKind::UnresolvedArea => "the resource has no resolvable work area",
            DenialKind::NoMatchingRule => "no rule grants this action",
        }
    }
}

impl core::fmt::Display for DenialKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "reason", rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Deny(DenialKind),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn denial(&self) -> Option<DenialKind> {
        match self {
            Decision::Allow => None,
            Decision::Deny(kind) => Some(*kind),
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("forbidden: {kind} ({})", .kind.message())]
pub struct AuthzError {
    pub kind: DenialKind,
}

/// The authorization policy.
///
/// The only configuration is which work area counts as the secretariat; when
/// it is unknown no admin qualifies as secretariat staff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Policy {
    secretariat_area: Option<WorkAreaId>,
}

impl Policy {
    pub fn new(secretariat_area: Option<WorkAreaId>) -> Self {
        Self { secretariat_area }
    }

    pub fn secretariat_area(&self) -> Option<WorkAreaId> {
        self.secretariat_area
    }

    /// Whether `subject` is an admin assigned to the secretariat area.
    pub fn is_secretariat(&self, subject: &Subject) -> bool {
        subject.role == Role::Admin
            && self
                .secretariat_area
                .is_some_and(|area| subject.work_areas.contains(&area))
    }

    pub fn evaluate(&self, subject: Option<&Subject>, action: Action, target: &Target) -> Decision {
        let Some(subject) = subject else {
            return Decision::Deny(DenialKind::Unauthenticated);
        };
        if !subject.can_act() {
            return Decision::Deny(DenialKind::InactiveSubject);
        }
        if subject.is_superadmin() {
            return Decision::Allow;
        }

        match action {
            Action::Read => self.read_rule(subject, target),
            Action::Create | Action::Update | Action::Delete | Action::ReadDeleted => {
                self.write_rule(subject, target)
            }
            Action::Restore | Action::Purge => Decision::Deny(DenialKind::SuperadminRequired),
        }
    }

    /// `evaluate` as a `Result`, for `?` at call sites.
    pub fn authorize(
        &self,
        subject: Option<&Subject>,
        action: Action,
        target: &Target,
    ) -> Result<(), AuthzError> {
        match self.evaluate(subject, action, target) {
            Decision::Allow => Ok(()),
            Decision::Deny(kind) => Err(AuthzError { kind }),
        }
    }

    fn read_rule(&self, subject: &Subject, target: &Target) -> Decision {
        match target {
            Target::WorkArea | Target::Activity { .. } | Target::Shift { .. } | Target::Todo => {
                Decision::Allow
            }
            Target::Document { visibility: None } => Decision::Allow,
            Target::Document {
                visibility: Some(visibility),
            } => self.document_read(subject, *visibility),
            Target::UserDirectory => admin_only(subject),
            Target::User(user) => {
                if user.user_id == Some(subject.user_id) {
                    return Decision::Allow;
                }
                if !subject.is_admin() {
                    return Decision::Deny(DenialKind::AdminRequired);
                }
                within_user_scope(subject, user)
            }
        }
    }

    fn document_read(&self, subject: &Subject, visibility: Visibility) -> Decision {
        let visible = match visibility {
            Visibility::Tutti => true,
            Visibility::Admin => subject.is_admin(),
            Visibility::Segreteria => self.is_secretariat(subject),
        };
        if visible {
            Decision::Allow
        } else {
            Decision::Deny(DenialKind::DocumentVisibility)
        }
    }

    fn write_rule(&self, subject: &Subject, target: &Target) -> Decision {
        if subject.role == Role::Base {
            return Decision::Deny(DenialKind::BaseRoleReadOnly);
        }

        match target {
            Target::Todo => Decision::Allow,
            Target::Document { .. } => {
                if self.is_secretariat(subject) {
                    Decision::Allow
                } else {
                    Decision::Deny(DenialKind::SecretariatRequired)
                }
            }
            Target::Activity { area } | Target::Shift { area } => match area {
                None => Decision::Deny(DenialKind::UnresolvedArea),
                Some(area) if subject.administers(*area) => Decision::Allow,
                Some(_) => Decision::Deny(DenialKind::OutsideWorkArea),
            },
            Target::User(user) => {
                if user.requested_role == Some(Role::Superadmin) {
                    return Decision::Deny(DenialKind::RoleEscalation);
                }
                within_user_scope(subject, user)
            }
            Target::WorkArea => Decision::Deny(DenialKind::SuperadminRequired),
            Target::UserDirectory => Decision::Deny(DenialKind::NoMatchingRule),
        }
    }
}

fn admin_only(subject: &Subject) -> Decision {
    if subject.is_admin() {
        Decision::Allow
    } else {
        Decision::Deny(DenialKind::AdminRequired)
    }
}

/// An admin's reach over other users: base users, or users sharing an area.
fn within_user_scope(subject: &Subject, user: &UserTarget) -> Decision {
    if user.role == Role::Base || subject.shares_area_with(&user.work_areas) {
        Decision::Allow
    } else {
        Decision::Deny(DenialKind::OutsideWorkArea)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use proptest::prelude::*;
    use volunteerdesk_core::UserId;

    fn subject(role: Role, areas: &[WorkAreaId]) -> Subject {
        Subject::new(UserId::new(), role).with_areas(areas.iter().copied())
    }

    fn user_target(role: Role, areas: &[WorkAreaId]) -> Target {
        Target::User(UserTarget {
            user_id: Some(UserId::new()),
            role,
            work_areas: areas.iter().copied().collect(),
            requested_role: None,
        })
    }

    #[test]
    fn missing_subject_is_denied() {
        let policy = Policy::default();
        assert_eq!(
            policy.evaluate(None, Action::Read, &Target::Todo),
            Decision::Deny(DenialKind::Unauthenticated)
        );
    }

    #[test]
    fn inactive_superadmin_is_denied() {
        let policy = Policy::default();
        let mut root = subject(Role::Superadmin, &[]);
        root.is_active = false;
        assert_eq!(
            policy.evaluate(Some(&root), Action::Read, &Target::WorkArea),
            Decision::Deny(DenialKind::InactiveSubject)
        );
    }

    #[test]
    fn admin_scope_on_activities_and_shifts() {
        let (a, b) = (WorkAreaId::new(), WorkAreaId::new());
        let policy = Policy::default();
        let admin = subject(Role::Admin, &[a]);

        for action in [Action::Update, Action::Delete] {
            assert!(policy.evaluate(Some(&admin), action, &Target::activity(a)).is_allowed());
            assert_eq!(
                policy.evaluate(Some(&admin), action, &Target::activity(b)),
                Decision::Deny(DenialKind::OutsideWorkArea)
            );
            assert!(policy.evaluate(Some(&admin), action, &Target::shift(a)).is_allowed());
            assert!(!policy.evaluate(Some(&admin), action, &Target::shift(b)).is_allowed());
        }
    }

    #[test]
    fn unresolved_area_is_denied_for_writes_but_readable() {
        let policy = Policy::default();
        let admin = subject(Role::Admin, &[WorkAreaId::new()]);
        assert_eq!(
            policy.evaluate(Some(&admin), Action::Update, &Target::activity(None)),
            Decision::Deny(DenialKind::UnresolvedArea)
        );
        assert!(policy.evaluate(Some(&admin), Action::Read, &Target::activity(None)).is_allowed());
    }

    #[test]
    fn document_visibility() {
        let secretariat = WorkAreaId::new();
        let policy = Policy::new(Some(secretariat));
        let staff = subject(Role::Admin, &[secretariat]);
        let other_admin = subject(Role::Admin, &[WorkAreaId::new()]);
        let base = subject(Role::Base, &[secretariat]);

        let restricted = Target::document(Visibility::Segreteria);
        assert!(policy.evaluate(Some(&staff), Action::Read, &restricted).is_allowed());
        assert_eq!(
            policy.evaluate(Some(&other_admin), Action::Read, &restricted),
            Decision::Deny(DenialKind::DocumentVisibility)
        );
        assert!(!policy.evaluate(Some(&base), Action::Read, &restricted).is_allowed());

        let admins_only = Target::document(Visibility::Admin);
        assert!(policy.evaluate(Some(&other_admin), Action::Read, &admins_only).is_allowed());
        assert!(!policy.evaluate(Some(&base), Action::Read, &admins_only).is_allowed());

        let public = Target::document(Visibility::Tutti);
        assert!(policy.evaluate(Some(&base), Action::Read, &public).is_allowed());
        assert!(policy.evaluate(Some(&base), Action::Read, &Target::documents()).is_allowed());
    }

    #[test]
    fn document_writes_need_secretariat() {
        let secretariat = WorkAreaId::new();
        let policy = Policy::new(Some(secretariat));
        let staff = subject(Role::Admin, &[secretariat]);
        let other_admin = subject(Role::Admin, &[WorkAreaId::new()]);

        assert!(policy.evaluate(Some(&staff), Action::Create, &Target::documents()).is_allowed());
        assert_eq!(
            policy.evaluate(Some(&other_admin), Action::Create, &Target::documents()),
            Decision::Deny(DenialKind::SecretariatRequired)
        );
    }

    #[test]
    fn unknown_secretariat_area_grants_nobody() {
        let policy = Policy::new(None);
        let admin = subject(Role::Admin, &[WorkAreaId::new()]);
        assert!(!policy.is_secretariat(&admin));
        assert!(
            !policy
                .evaluate(Some(&admin), Action::Read, &Target::document(Visibility::Segreteria))
                .is_allowed()
        );
    }

    #[test]
    fn user_scope_for_admins() {
        let (a, b) = (WorkAreaId::new(), WorkAreaId::new());
        let policy = Policy::default();
        let admin = subject(Role::Admin, &[a]);

        assert!(policy.evaluate(Some(&admin), Action::Read, &Target::UserDirectory).is_allowed());
        assert!(policy.evaluate(Some(&admin), Action::Update, &user_target(Role::Base, &[b])).is_allowed());
        assert!(policy.evaluate(Some(&admin), Action::Update, &user_target(Role::Admin, &[a, b])).is_allowed());
        assert_eq!(
            policy.evaluate(Some(&admin), Action::Read, &user_target(Role::Admin, &[b])),
            Decision::Deny(DenialKind::OutsideWorkArea)
        );
    }

    #[test]
    fn base_reads_only_own_profile() {
        let policy = Policy::default();
        let base = subject(Role::Base, &[]);
        let own = Target::User(UserTarget {
            user_id: Some(base.user_id),
            role: Role::Base,
            work_areas: BTreeSet::new(),
            requested_role: None,
        });

        assert!(policy.evaluate(Some(&base), Action::Read, &own).is_allowed());
        assert_eq!(
            policy.evaluate(Some(&base), Action::Update, &own),
            Decision::Deny(DenialKind::BaseRoleReadOnly)
        );
        assert_eq!(
            policy.evaluate(Some(&base), Action::Read, &Target::UserDirectory),
            Decision::Deny(DenialKind::AdminRequired)
        );
    }

    #[test]
    fn granting_superadmin_is_escalation() {
        let a = WorkAreaId::new();
        let policy = Policy::default();
        let admin = subject(Role::Admin, &[a]);

        assert_eq!(
            policy.evaluate(
                Some(&admin),
                Action::Create,
                &Target::new_user(Role::Superadmin, BTreeSet::from([a]))
            ),
            Decision::Deny(DenialKind::RoleEscalation)
        );
    }

    #[test]
    fn work_areas_and_restore_are_superadmin_only() {
        let policy = Policy::default();
        let admin = subject(Role::Admin, &[WorkAreaId::new()]);
        assert_eq!(
            policy.evaluate(Some(&admin), Action::Create, &Target::WorkArea),
            Decision::Deny(DenialKind::SuperadminRequired)
        );
        assert_eq!(
            policy.evaluate(Some(&admin), Action::Restore, &Target::Todo),
            Decision::Deny(DenialKind::SuperadminRequired)
        );
    }

    #[test]
    fn authorize_maps_denials_to_errors() {
        let policy = Policy::default();
        let base = subject(Role::Base, &[]);
        let err = policy.authorize(Some(&base), Action::Delete, &Target::Todo).unwrap_err();
        assert_eq!(err.kind, DenialKind::BaseRoleReadOnly);
        assert!(err.to_string().contains("base_role_read_only"));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Properties
    // ─────────────────────────────────────────────────────────────────────────

    fn any_action() -> impl Strategy<Value = Action> {
        prop::sample::select(Action::ALL.to_vec())
    }

    fn any_role() -> impl Strategy<Value = Role> {
        prop::sample::select(Role::ALL.to_vec())
    }

    fn any_visibility() -> impl Strategy<Value = Visibility> {
        prop::sample::select(vec![Visibility::Tutti, Visibility::Admin, Visibility::Segreteria])
    }

    /// Targets drawn from a pool of four areas, so overlaps are common.
    fn any_target(pool: Vec<WorkAreaId>) -> impl Strategy<Value = Target> {
        let area = prop::option::of(prop::sample::select(pool.clone()));
        let areas = prop::collection::btree_set(prop::sample::select(pool), 0..3);
        prop_oneof![
            Just(Target::WorkArea),
            Just(Target::Todo),
            Just(Target::UserDirectory),
            area.clone().prop_map(|area| Target::Activity { area }),
            area.prop_map(|area| Target::Shift { area }),
            prop::option::of(any_visibility()).prop_map(|visibility| Target::Document { visibility }),
            (any_role(), areas, prop::option::of(any_role())).prop_map(
                |(role, work_areas, requested_role)| Target::User(UserTarget {
                    user_id: Some(UserId::new()),
                    role,
                    work_areas,
                    requested_role,
                })
            ),
        ]
    }

    fn pool() -> Vec<WorkAreaId> {
        (0..4).map(|_| WorkAreaId::new()).collect()
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 1000, ..ProptestConfig::default() })]

        #[test]
        fn superadmin_is_always_allowed(target in any_target(pool()), action in any_action()) {
            let policy = Policy::new(Some(WorkAreaId::new()));
            let root = Subject::new(UserId::new(), Role::Superadmin);
            prop_assert!(policy.evaluate(Some(&root), action, &target).is_allowed());
        }

        #[test]
        fn base_never_writes(
            target in any_target(pool()),
            action in prop::sample::select(vec![
                Action::Create, Action::Update, Action::Delete, Action::ReadDeleted, Action::Restore,
                Action::Purge,
            ]),
        ) {
            let policy = Policy::default();
            let base = Subject::new(UserId::new(), Role::Base);
            prop_assert!(!policy.evaluate(Some(&base), action, &target).is_allowed());
        }

        #[test]
        fn admin_outside_area_cannot_write_scoped_resources(
            is_shift in any::<bool>(),
            action in prop::sample::select(vec![Action::Create, Action::Update, Action::Delete]),
        ) {
            let policy = Policy::default();
            let admin = Subject::new(UserId::new(), Role::Admin).with_areas([WorkAreaId::new()]);
            let elsewhere = WorkAreaId::new();
            let target = if is_shift { Target::shift(elsewhere) } else { Target::activity(elsewhere) };
            prop_assert_eq!(
                policy.evaluate(Some(&admin), action, &target),
                Decision::Deny(DenialKind::OutsideWorkArea)
            );
        }

        #[test]
        fn inactive_subjects_are_always_denied(
            target in any_target(pool()),
            action in any_action(),
            role in any_role(),
            deleted in any::<bool>(),
        ) {
            let policy = Policy::default();
            let mut s = Subject::new(UserId::new(), role);
            if deleted { s.is_deleted = true } else { s.is_active = false }
            prop_assert_eq!(
                policy.evaluate(Some(&s), action, &target),
                Decision::Deny(DenialKind::InactiveSubject)
            );
        }
    }
}
