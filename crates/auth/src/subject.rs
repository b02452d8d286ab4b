use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use volunteerdesk_core::{UserId, WorkAreaId};

use crate::Role;

/// The authenticated identity a request acts as.
///
/// Resolved fresh per request from the identity store; nothing here is cached
/// across requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub user_id: UserId,
    pub role: Role,
    pub work_areas: BTreeSet<WorkAreaId>,
    pub is_active: bool,
    pub is_deleted: bool,
}

impl Subject {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self {
            user_id,
            role,
            work_areas: BTreeSet::new(),
            is_active: true,
            is_deleted: false,
        }
    }

    pub fn with_areas(mut self, areas: impl IntoIterator<Item = WorkAreaId>) -> Self {
        self.work_areas.extend(areas);
        self
    }

    /// Active and not soft-deleted.
    pub fn can_act(&self) -> bool {
        self.is_active && !self.is_deleted
    }

    pub fn is_superadmin(&self) -> bool {
        self.role == Role::Superadmin
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Whether this subject holds admin authority over `area`.
    ///
    /// A base user's area set never grants authority.
    pub fn administers(&self, area: WorkAreaId) -> bool {
        match self.role {
            Role::Superadmin => true,
            Role::Admin => self.work_areas.contains(&area),
            Role::Base => false,
        }
    }

    pub fn shares_area_with(&self, areas: &BTreeSet<WorkAreaId>) -> bool {
        !self.work_areas.is_disjoint(areas)
    }
}
