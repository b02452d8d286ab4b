//! User records: identity, role and area assignment.
//!
//! Uniqueness of username/email and the activeness of assigned areas are
//! checked by the identity store, which sees every user; this module only
//! validates a single record.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use volunteerdesk_core::{
    DeletionMarker, DomainResult, Entity, FieldErrors, SoftDelete, UserId, WorkAreaId, validate,
};

use crate::{Role, Subject};

// ─────────────────────────────────────────────────────────────────────────────
// User
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    /// Always stored lowercase.
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub work_areas: BTreeSet<WorkAreaId>,
    pub is_active: bool,
    pub deletion: DeletionMarker,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn create(input: NewUser, now: DateTime<Utc>) -> DomainResult<Self> {
        let mut errors = FieldErrors::new();

        let username = validate::required(&mut errors, "username", &input.username);
        validate::max_len(&mut errors, "username", &username, 150);
        if !username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
        {
            errors.push("username", "only letters, digits and @/./+/-/_ are allowed");
        }

        let email = normalize_email(&mut errors, &input.email);

        errors.into_result()?;

        Ok(Self {
            id: UserId::new(),
            username,
            email,
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            phone: normalize_phone(input.phone),
            role: input.role,
            work_areas: input.work_areas,
            is_active: true,
            deletion: DeletionMarker::default(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a profile update. All-or-nothing on validation failure.
    pub fn apply(&mut self, patch: UserPatch, now: DateTime<Utc>) -> DomainResult<()> {
        let mut errors = FieldErrors::new();
        let email = patch
            .email
            .as_deref()
            .map(|e| normalize_email(&mut errors, e));
        errors.into_result()?;

        if let Some(email) = email {
            self.email = email;
        }
        if let Some(first_name) = patch.first_name {
            self.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = patch.last_name {
            self.last_name = last_name.trim().to_string();
        }
        if let Some(phone) = patch.phone {
            self.phone = normalize_phone(phone);
        }
        if let Some(role) = patch.role {
            self.role = role;
        }
        if let Some(areas) = patch.work_areas {
            self.work_areas = areas;
        }
        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn full_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }

    /// Active and not soft-deleted.
    pub fn can_authenticate(&self) -> bool {
        self.is_active && !self.is_deleted()
    }

    pub fn to_subject(&self) -> Subject {
        Subject {
            user_id: self.id,
            role: self.role,
            work_areas: self.work_areas.clone(),
            is_active: self.is_active,
            is_deleted: self.is_deleted(),
        }
    }
}

fn normalize_email(errors: &mut FieldErrors, raw: &str) -> String {
    let email = validate::required(errors, "email", raw).to_lowercase();
    if !email.is_empty() && !validate::is_email(&email) {
        errors.push("email", "not a valid email address");
    }
    email
}

fn normalize_phone(phone: Option<String>) -> Option<String> {
    phone
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
}

impl Entity for User {
    type Id = UserId;
    const KIND: &'static str = "user";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl SoftDelete for User {
    fn deletion(&self) -> &DeletionMarker {
        &self.deletion
    }

    fn deletion_mut(&mut self) -> &mut DeletionMarker {
        &mut self.deletion
    }

    fn on_soft_deleted(&mut self) {
        self.is_active = false;
    }

    fn on_restored(&mut self) {
        self.is_active = true;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Inputs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub work_areas: BTreeSet<WorkAreaId>,
}

/// Partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserPatch {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<Option<String>>,
    pub role: Option<Role>,
    pub work_areas: Option<BTreeSet<WorkAreaId>>,
    pub is_active: Option<bool>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.phone.is_none()
            && self.role.is_none()
            && self.work_areas.is_none()
            && self.is_active.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use volunteerdesk_core::{DeleteOutcome, RestoreOutcome};

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            first_name: "Giulia".to_string(),
            last_name: "Bianchi".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn create_normalizes_email_and_defaults_to_base() {
        let user = User::create(new_user("giulia", "  Giulia.B@Example.ORG "), Utc::now()).unwrap();
        assert_eq!(user.email, "giulia.b@example.org");
        assert_eq!(user.role, Role::Base);
        assert!(user.can_authenticate());
        assert_eq!(user.full_name(), "Giulia Bianchi");
    }

    #[test]
    fn create_reports_every_invalid_field() {
        let err = User::create(new_user("bad name", "nope"), Utc::now()).unwrap_err();
        let fields = err.field_errors().unwrap();
        assert!(fields.has("username"));
        assert!(fields.has("email"));
    }

    #[test]
    fn soft_delete_deactivates_and_restore_reactivates() {
        let mut user = User::create(new_user("luca", "luca@example.org"), Utc::now()).unwrap();
        let admin = UserId::new();

        assert_eq!(user.soft_delete(Some(admin), Utc::now()), DeleteOutcome::Deleted);
        assert!(!user.is_active);
        assert!(!user.can_authenticate());
        assert!(user.to_subject().is_deleted);

        assert_eq!(user.restore(), RestoreOutcome::Restored);
        assert!(user.is_active);
        assert!(user.deletion().deleted_by().is_none());
    }

    #[test]
    fn patch_with_bad_email_leaves_user_untouched() {
        let mut user = User::create(new_user("anna", "anna@example.org"), Utc::now()).unwrap();
        let before = user.clone();

        let result = user.apply(
            UserPatch {
                email: Some("broken".to_string()),
                role: Some(Role::Admin),
                ..Default::default()
            },
            Utc::now(),
        );

        assert!(result.is_err());
        assert_eq!(user, before);
    }

    #[test]
    fn full_name_falls_back_to_username() {
        let mut input = new_user("marco", "marco@example.org");
        input.first_name.clear();
        input.last_name.clear();
        let user = User::create(input, Utc::now()).unwrap();
        assert_eq!(user.full_name(), "marco");
    }
}
