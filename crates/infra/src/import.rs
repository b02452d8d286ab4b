//! User import.
//!
//! Rows arrive already decoded (the CLI reads them from JSON). Every row is
//! validated before anything is written; one bad row means nothing is
//! created and the report lists every failing row, numbered from 1. The
//! uniqueness checks and the insert share one transaction on the user store.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use volunteerdesk_auth::{Action, NewUser, Role, Target, User};
use volunteerdesk_core::{DomainError, FieldErrors, WorkAreaId, validate};

use crate::error::{ServiceError, ServiceResult};
use crate::identity::{email_in_use, username_in_use};
use crate::mediator::{Mediator, RequestContext};
use crate::read_model::transact;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportRow {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Blank means `base`.
    pub role: Option<String>,
    pub phone: Option<String>,
    /// Comma-separated work-area codes.
    pub work_area_codes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowFailure {
    pub row: usize,
    pub errors: FieldErrors,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub total_rows: usize,
    pub created: Vec<User>,
    pub failures: Vec<RowFailure>,
}

impl ImportReport {
    pub fn committed(&self) -> bool {
        self.failures.is_empty() && !self.created.is_empty()
    }
}

impl Mediator {
    pub fn import_users(&self, ctx: &RequestContext, rows: Vec<ImportRow>) -> ServiceResult<ImportReport> {
        let subject = self.subject(ctx);
        let policy = self.policy();

        let blank = Target::new_user(Role::Base, BTreeSet::new());
        if let Some(kind) = policy.evaluate(subject.as_ref(), Action::Create, &blank).denial() {
            warn!(actor = ?ctx.actor, reason = %kind, "import rejected");
            return Err(ServiceError::denied(kind));
        }
        if rows.is_empty() {
            return Err(ServiceError::Invalid("import contains no rows".to_string()));
        }
        let limit = self.settings().import_max_rows;
        if rows.len() > limit {
            return Err(ServiceError::Invalid(format!(
                "import has {} rows, the limit is {limit}",
                rows.len()
            )));
        }

        let total_rows = rows.len();
        let report = transact(&*self.stores().users, |users| -> ServiceResult<ImportReport> {
            let mut report = ImportReport {
                total_rows,
                ..Default::default()
            };
            let mut usernames = HashSet::new();
            let mut emails = HashSet::new();
            let mut accepted: Vec<User> = Vec::with_capacity(total_rows);

            for (index, row) in rows.iter().enumerate() {
                let mut errors = FieldErrors::new();

                let username = validate::required(&mut errors, "username", &row.username);
                let email = validate::required(&mut errors, "email", &row.email).to_lowercase();
                validate::required(&mut errors, "first_name", &row.first_name);
                validate::required(&mut errors, "last_name", &row.last_name);

                if !username.is_empty()
                    && (username_in_use(users.values(), &username, None)
                        || !usernames.insert(username.clone()))
                {
                    errors.push("username", format!("username '{username}' already exists"));
                }
                if !email.is_empty()
                    && (email_in_use(users.values(), &email, None) || !emails.insert(email.clone()))
                {
                    errors.push("email", format!("email '{email}' already exists"));
                }

                let role = match row.role.as_deref().map(str::trim) {
                    None | Some("") => Some(Role::Base),
                    Some(raw) => match raw.parse::<Role>() {
                        Ok(role) => Some(role),
                        Err(_) => {
                            errors.push("role", format!("unknown role '{raw}'"));
                            None
                        }
                    },
                };
                let work_areas = self.resolve_area_codes(&mut errors, &row.work_area_codes);

                let denial = role.and_then(|role| {
                    let target = Target::new_user(role, work_areas.clone());
                    policy.evaluate(subject.as_ref(), Action::Create, &target).denial()
                });
                if let Some(kind) = denial {
                    errors.push("permission", kind.message());
                }

                let input = NewUser {
                    username,
                    email,
                    first_name: row.first_name.clone(),
                    last_name: row.last_name.clone(),
                    phone: row.phone.clone(),
                    role: role.unwrap_or_default(),
                    work_areas,
                };
                match User::create(input, ctx.now) {
                    Ok(user) if errors.is_empty() => accepted.push(user),
                    Ok(_) => {}
                    Err(DomainError::Validation(found)) => {
                        let fresh: Vec<_> =
                            found.iter().filter(|e| !errors.has(&e.field)).cloned().collect();
                        for e in fresh {
                            errors.push(e.field, e.message);
                        }
                    }
                    Err(other) => errors.push("row", other.to_string()),
                }

                if !errors.is_empty() {
                    report.failures.push(RowFailure {
                        row: index + 1,
                        errors,
                    });
                }
            }

            if report.failures.is_empty() {
                for user in &accepted {
                    users.insert(user.id, user.clone());
                }
                report.created = accepted;
            }
            Ok(report)
        })?;

        if report.committed() {
            info!(actor = ?ctx.actor, created = report.created.len(), "users imported");
        } else {
            warn!(
                actor = ?ctx.actor,
                rows = report.total_rows,
                failed_rows = report.failures.len(),
                "import rejected, nothing created"
            );
        }
        Ok(report)
    }

    /// Codes must name active work areas; blanks are skipped.
    fn resolve_area_codes(&self, errors: &mut FieldErrors, codes: &str) -> BTreeSet<WorkAreaId> {
        let mut areas = BTreeSet::new();
        for code in codes.split(',').map(str::trim).filter(|c| !c.is_empty()) {
            match self.registry().by_code(code) {
                Some(area) if area.is_active => {
                    areas.insert(area.id);
                }
                _ => errors.push("work_area_codes", format!("work area '{code}' is unknown or inactive")),
            }
        }
        areas
    }
}
