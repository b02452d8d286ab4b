//! What a request wants to do, and to what.

use std::collections::BTreeSet;

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use volunteerdesk_core::{DomainError, UserId, WorkAreaId};

use crate::{Role, User};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Read,
    /// Administrative view including soft-deleted rows.
    ReadDeleted,
    Create,
    Update,
    Delete,
    Restore,
    /// Hard delete, bypassing the soft-delete lifecycle.
    Purge,
}

impl Action {
    pub const ALL: [Action; 7] = [
        Action::Read,
        Action::ReadDeleted,
        Action::Create,
        Action::Update,
        Action::Delete,
        Action::Restore,
        Action::Purge,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::ReadDeleted => "read_deleted",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Restore => "restore",
            Action::Purge => "purge",
        }
    }

    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Action::Create | Action::Update | Action::Delete | Action::ReadDeleted
        )
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| DomainError::validation("action", format!("unknown action '{s}'")))
    }
}

/// Document audience. Persisted as a plain string.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Every authenticated user.
    #[default]
    Tutti,
    /// Admins and superadmins.
    Admin,
    /// Admins assigned to the secretariat area.
    Segreteria,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Tutti => "tutti",
            Visibility::Admin => "admin",
            Visibility::Segreteria => "segreteria",
        }
    }
}

impl FromStr for Visibility {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tutti" => Ok(Visibility::Tutti),
            "admin" => Ok(Visibility::Admin),
            "segreteria" => Ok(Visibility::Segreteria),
            other => Err(DomainError::validation(
                "visibility",
                format!("'{other}' is not one of tutti, admin, segreteria"),
            )),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    User,
    WorkArea,
    Activity,
    Shift,
    Todo,
    Document,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::User => "user",
            ResourceKind::WorkArea => "work_area",
            ResourceKind::Activity => "activity",
            ResourceKind::Shift => "shift",
            ResourceKind::Todo => "todo",
            ResourceKind::Document => "document",
        }
    }
}

impl core::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user as the object of an action.
///
/// For `create`, `user_id` is `None` and `role`/`work_areas` describe the
/// account being requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTarget {
    pub user_id: Option<UserId>,
    pub role: Role,
    pub work_areas: BTreeSet<WorkAreaId>,
    /// Role the request wants to set, if it sets one.
    pub requested_role: Option<Role>,
}

impl UserTarget {
    pub fn requesting(mut self, role: Role) -> Self {
        self.requested_role = Some(role);
        self
    }
}

impl From<&User> for UserTarget {
    fn from(user: &User) -> Self {
        Self {
            user_id: Some(user.id),
            role: user.role,
            work_areas: user.work_areas.clone(),
            requested_role: None,
        }
    }
}

/// The object of an authorization check.
///
/// Object-level targets carry the facts the policy needs (resolved area,
/// document visibility, target user's role and areas). Type-level targets
/// (listings, creation before an instance exists) leave those facts out or
/// carry the requested values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Target {
    WorkArea,
    /// `area` is `None` only when resolution failed.
    Activity { area: Option<WorkAreaId> },
    Shift { area: Option<WorkAreaId> },
    Todo,
    /// `visibility` is `None` for a listing; items are filtered one by one.
    Document { visibility: Option<Visibility> },
    User(UserTarget),
    /// The user listing as a whole.
    UserDirectory,
}

impl Target {
    pub fn activity(area: impl Into<Option<WorkAreaId>>) -> Self {
        Target::Activity { area: area.into() }
    }

    pub fn shift(area: impl Into<Option<WorkAreaId>>) -> Self {
        Target::Shift { area: area.into() }
    }

    pub fn document(visibility: Visibility) -> Self {
        Target::Document {
            visibility: Some(visibility),
        }
    }

    pub fn documents() -> Self {
        Target::Document { visibility: None }
    }

    pub fn user(user: &User) -> Self {
        Target::User(UserTarget::from(user))
    }

    /// A user account that does not exist yet.
    pub fn new_user(role: Role, work_areas: BTreeSet<WorkAreaId>) -> Self {
        Target::User(UserTarget {
            user_id: None,
            role,
            work_areas,
            requested_role: Some(role),
        })
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            Target::WorkArea => ResourceKind::WorkArea,
            Target::Activity { .. } => ResourceKind::Activity,
            Target::Shift { .. } => ResourceKind::Shift,
            Target::Todo => ResourceKind::Todo,
            Target::Document { .. } => ResourceKind::Document,
            Target::User(_) | Target::UserDirectory => ResourceKind::User,
        }
    }
}
