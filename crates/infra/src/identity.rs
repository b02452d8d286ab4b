//! Identity store (users) and work-area registry over record stores.

use std::sync::Arc;

use volunteerdesk_auth::{Subject, User, WorkArea};
use volunteerdesk_core::{UserId, WorkAreaId};

use crate::read_model::RecordStore;

pub type SharedStore<K, V> = Arc<dyn RecordStore<K, V>>;

#[derive(Clone)]
pub struct IdentityStore {
    users: SharedStore<UserId, User>,
}

impl IdentityStore {
    pub fn new(users: SharedStore<UserId, User>) -> Self {
        Self { users }
    }

    pub fn store(&self) -> &SharedStore<UserId, User> {
        &self.users
    }

    /// The acting identity for `id`. `None` for unknown (or purged) users;
    /// soft-deleted and inactive users are returned and denied by policy.
    pub fn get_subject(&self, id: UserId) -> Option<Subject> {
        self.users.get(&id).map(|u| u.to_subject())
    }

    pub fn get_user(&self, id: UserId) -> Option<User> {
        self.users.get(&id)
    }

    /// Username lookup over every user, soft-deleted included.
    pub fn find_by_username(&self, username: &str) -> Option<User> {
        self.users.list().into_iter().find(|u| u.username == username)
    }

    /// Email lookup (case-insensitive) over every user, soft-deleted included.
    pub fn find_by_email(&self, email: &str) -> Option<User> {
        let email = email.trim().to_lowercase();
        self.users.list().into_iter().find(|u| u.email == email)
    }

    pub fn username_taken(&self, username: &str, except: Option<UserId>) -> bool {
        username_in_use(self.users.list().iter(), username, except)
    }

    pub fn email_taken(&self, email: &str, except: Option<UserId>) -> bool {
        email_in_use(self.users.list().iter(), email, except)
    }
}

/// Whether a user other than `except` holds `username`.
pub(crate) fn username_in_use<'a>(
    mut users: impl Iterator<Item = &'a User>,
    username: &str,
    except: Option<UserId>,
) -> bool {
    let username = username.trim();
    users.any(|u| u.username == username && Some(u.id) != except)
}

/// Whether a user other than `except` holds `email`, ignoring case.
pub(crate) fn email_in_use<'a>(
    mut users: impl Iterator<Item = &'a User>,
    email: &str,
    except: Option<UserId>,
) -> bool {
    let email = email.trim().to_lowercase();
    users.any(|u| u.email == email && Some(u.id) != except)
}

impl core::fmt::Debug for IdentityStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IdentityStore").finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct WorkAreaRegistry {
    areas: SharedStore<WorkAreaId, WorkArea>,
}

impl WorkAreaRegistry {
    pub fn new(areas: SharedStore<WorkAreaId, WorkArea>) -> Self {
        Self { areas }
    }

    pub fn store(&self) -> &SharedStore<WorkAreaId, WorkArea> {
        &self.areas
    }

    pub fn get_area(&self, id: WorkAreaId) -> Option<WorkArea> {
        self.areas.get(&id)
    }

    pub fn by_code(&self, code: &str) -> Option<WorkArea> {
        self.areas.list().into_iter().find(|a| a.code == code)
    }

    pub fn is_active(&self, id: WorkAreaId) -> bool {
        self.get_area(id).is_some_and(|a| a.is_active)
    }

    pub fn list(&self) -> Vec<WorkArea> {
        self.areas.list()
    }
}

/// Area names are unique ignoring ASCII case.
pub(crate) fn area_name_in_use<'a>(
    mut areas: impl Iterator<Item = &'a WorkArea>,
    name: &str,
    except: Option<WorkAreaId>,
) -> bool {
    let name = name.trim();
    areas.any(|a| a.name.eq_ignore_ascii_case(name) && Some(a.id) != except)
}

impl core::fmt::Debug for WorkAreaRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WorkAreaRegistry").finish_non_exhaustive()
    }
}
