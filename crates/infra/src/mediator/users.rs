use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::info;

use volunteerdesk_auth::{Action, DenialKind, NewUser, Role, Target, User, UserPatch, UserTarget};
use volunteerdesk_core::{DeleteOutcome, RestoreOutcome, SoftDelete, UserId, WorkAreaId};

use super::{Mediator, RequestContext, changed_meanwhile, read_action};
use crate::error::{ServiceError, ServiceResult};
use crate::identity::{email_in_use, username_in_use};
use crate::read_model::{RecordStore, SoftDeleteQueries, Transaction, transact};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub area: Option<WorkAreaId>,
    pub is_active: Option<bool>,
    /// Case-insensitive match on username, names or email.
    pub search: Option<String>,
    pub include_deleted: bool,
}

impl UserFilter {
    fn matches(&self, user: &User) -> bool {
        if self.role.is_some_and(|r| r != user.role) {
            return false;
        }
        if self.area.is_some_and(|a| !user.work_areas.contains(&a)) {
            return false;
        }
        if self.is_active.is_some_and(|active| active != user.is_active) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                [&user.username, &user.first_name, &user.last_name, &user.email]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&term))
            }
            _ => true,
        }
    }
}

impl Mediator {
    pub fn create_user(&self, ctx: &RequestContext, input: NewUser) -> ServiceResult<User> {
        let subject = self.subject(ctx);
        let actor = self.authorize(
            subject.as_ref(),
            Action::Create,
            &Target::new_user(input.role, input.work_areas.clone()),
        )?;

        self.check_assignable_areas(&input.work_areas, &BTreeSet::new())?;
        let user = User::create(input, ctx.now)?;

        transact(&*self.stores.users, |users| -> ServiceResult<()> {
            check_unique_user(users, &user, None)?;
            users.insert(user.id, user.clone());
            Ok(())
        })?;
        info!(actor = %actor, user_id = %user.id, role = %user.role, "user created");
        Ok(user)
    }

    pub fn update_user(&self, ctx: &RequestContext, id: UserId, patch: UserPatch) -> ServiceResult<User> {
        let subject = self.subject(ctx);
        let current = self
            .stores
            .users
            .get_active(&id)
            .ok_or_else(|| ServiceError::not_found::<User>(&id))?;

        let mut target = UserTarget::from(&current);
        target.requested_role = patch.role;
        let actor = self.authorize(subject.as_ref(), Action::Update, &Target::User(target))?;

        if patch.is_active == Some(false) && id == actor {
            return Err(ServiceError::conflict("cannot deactivate your own account"));
        }
        if let Some(areas) = &patch.work_areas {
            self.check_assignable_areas(areas, &current.work_areas)?;
        }

        let mut preview = current.clone();
        preview.apply(patch.clone(), ctx.now)?;

        // The resulting account must stay within the actor's reach too.
        if preview.role != current.role || preview.work_areas != current.work_areas {
            let after = UserTarget::from(&preview).requesting(preview.role);
            self.authorize(subject.as_ref(), Action::Update, &Target::User(after))?;
        }

        let updated = transact(&*self.stores.users, |users| -> ServiceResult<User> {
            let live = users.get(&id).ok_or_else(|| ServiceError::not_found::<User>(&id))?;
            if live.is_deleted() {
                return Err(ServiceError::not_found::<User>(&id));
            }
            if live.role != current.role || live.work_areas != current.work_areas {
                return Err(changed_meanwhile::<User>(&id));
            }
            let mut updated = live.clone();
            updated.apply(patch.clone(), ctx.now)?;
            check_unique_user(users, &updated, Some(id))?;
            users.insert(id, updated.clone());
            Ok(updated)
        })?;
        info!(actor = %actor, user_id = %id, "user updated");
        Ok(updated)
    }

    /// A user by id. Soft-deleted users need `read_deleted`.
    pub fn get_user(&self, ctx: &RequestContext, id: UserId) -> ServiceResult<User> {
        let subject = self.subject(ctx);
        let user = self
            .stores
            .users
            .get(&id)
            .ok_or_else(|| ServiceError::not_found::<User>(&id))?;
        self.authorize(subject.as_ref(), read_action(&user), &Target::user(&user))?;
        Ok(user)
    }

    /// The caller's own profile.
    pub fn me(&self, ctx: &RequestContext) -> ServiceResult<User> {
        let subject = self.subject(ctx);
        let user = ctx
            .actor
            .and_then(|id| self.identity.get_user(id))
            .ok_or(ServiceError::denied(DenialKind::Unauthenticated))?;
        self.authorize(subject.as_ref(), Action::Read, &Target::user(&user))?;
        Ok(user)
    }

    /// Users visible to the caller: everyone for superadmins; base users and
    /// users sharing an area for admins.
    pub fn list_users(&self, ctx: &RequestContext, filter: &UserFilter) -> ServiceResult<Vec<User>> {
        let subject = self.subject(ctx);
        self.authorize(subject.as_ref(), Action::Read, &Target::UserDirectory)?;

        let policy = self.policy();
        let records = if filter.include_deleted {
            self.stores.users.find_all()
        } else {
            self.stores.users.find_active()
        };
        let mut users: Vec<User> = records
            .into_iter()
            .filter(|u| {
                policy
                    .evaluate(subject.as_ref(), read_action(u), &Target::user(u))
                    .is_allowed()
            })
            .filter(|u| filter.matches(u))
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    pub fn delete_user(&self, ctx: &RequestContext, id: UserId) -> ServiceResult<DeleteOutcome> {
        let subject = self.subject(ctx);
        let user = self
            .stores
            .users
            .get(&id)
            .ok_or_else(|| ServiceError::not_found::<User>(&id))?;
        let actor = self.authorize(subject.as_ref(), Action::Delete, &Target::user(&user))?;
        if id == actor {
            return Err(ServiceError::conflict("cannot delete your own account"));
        }

        let outcome = Self::soft_delete_in(&self.stores.users, &id, actor, ctx.now)?;
        info!(actor = %actor, user_id = %id, outcome = ?outcome, "user soft-deleted");
        Ok(outcome)
    }

    pub fn restore_user(&self, ctx: &RequestContext, id: UserId) -> ServiceResult<RestoreOutcome> {
        let subject = self.subject(ctx);
        let user = self
            .stores
            .users
            .get(&id)
            .ok_or_else(|| ServiceError::not_found::<User>(&id))?;
        let actor = self.authorize(subject.as_ref(), Action::Restore, &Target::user(&user))?;

        let outcome = Self::restore_in(&self.stores.users, &id)?;
        info!(actor = %actor, user_id = %id, outcome = ?outcome, "user restored");
        Ok(outcome)
    }

    /// Hard-delete a user and null every reference to it. Returns how many
    /// other records were touched.
    pub fn purge_user(&self, ctx: &RequestContext, id: UserId) -> ServiceResult<usize> {
        let subject = self.subject(ctx);
        let user = self
            .stores
            .users
            .get(&id)
            .ok_or_else(|| ServiceError::not_found::<User>(&id))?;
        let actor = self.authorize(subject.as_ref(), Action::Purge, &Target::user(&user))?;
        if id == actor {
            return Err(ServiceError::conflict("cannot purge your own account"));
        }

        let removed = transact(&*self.stores.users, |users| -> ServiceResult<usize> {
            users
                .remove(&id)
                .ok_or_else(|| ServiceError::not_found::<User>(&id))?;
            Ok(forget_in(users, |u| u.deletion.deleted_by() == Some(id), |u| {
                u.deletion.forget_actor(id)
            }))
        })?;
        let touched = removed
            + forget_across(
                &*self.stores.activities,
                |a| a.created_by == Some(id) || a.deletion.deleted_by() == Some(id),
                |a| a.forget_user(id),
            )?
            + forget_across(
                &*self.stores.shifts,
                |s| s.created_by == Some(id) || s.deletion.deleted_by() == Some(id),
                |s| s.forget_user(id),
            )?
            + forget_across(
                &*self.stores.todos,
                |t| {
                    t.assignee == Some(id)
                        || t.created_by == Some(id)
                        || t.deletion.deleted_by() == Some(id)
                },
                |t| t.forget_user(id),
            )?
            + forget_across(
                &*self.stores.documents,
                |d| d.uploaded_by == Some(id) || d.deletion.deleted_by() == Some(id),
                |d| d.forget_user(id),
            )?;

        info!(actor = %actor, user_id = %id, references_cleared = touched, "user purged");
        Ok(touched)
    }

    /// Newly assigned areas must exist and be active; areas the user already
    /// has are kept even when inactive.
    pub(crate) fn check_assignable_areas(
        &self,
        requested: &BTreeSet<WorkAreaId>,
        existing: &BTreeSet<WorkAreaId>,
    ) -> ServiceResult<()> {
        match requested
            .difference(existing)
            .find(|id| !self.registry.is_active(**id))
        {
            Some(id) => Err(ServiceError::validation(
                "work_areas",
                format!("work area {id} is unknown or inactive"),
            )),
            None => Ok(()),
        }
    }

    /// Read-only helper for subject-less contexts such as the CLI.
    pub fn user_by_username(&self, username: &str) -> Option<User> {
        self.identity.find_by_username(username)
    }
}

fn check_unique_user(
    users: &dyn Transaction<UserId, User>,
    user: &User,
    except: Option<UserId>,
) -> ServiceResult<()> {
    if username_in_use(users.values(), &user.username, except) {
        return Err(ServiceError::conflict(format!(
            "username '{}' already exists",
            user.username
        )));
    }
    if email_in_use(users.values(), &user.email, except) {
        return Err(ServiceError::conflict(format!("email '{}' already exists", user.email)));
    }
    Ok(())
}

/// Clear a purged user from every record that references it.
fn forget_in<K, V>(
    records: &mut dyn Transaction<K, V>,
    references: impl Fn(&V) -> bool,
    forget: impl Fn(&mut V),
) -> usize {
    let mut count = 0;
    for record in records.values_mut().filter(|r| references(r)) {
        forget(record);
        count += 1;
    }
    count
}

/// `forget_in` over one whole store, under its write lock.
fn forget_across<K, V>(
    store: &dyn RecordStore<K, V>,
    references: impl Fn(&V) -> bool,
    forget: impl Fn(&mut V),
) -> ServiceResult<usize> {
    transact(store, |records| -> ServiceResult<usize> {
        Ok(forget_in(records, &references, &forget))
    })
}
