//! Bulk user actions.
//!
//! Items are checked one by one and failures are collected. The checks and
//! the writes run in one transaction on the user store, so every item is
//! judged against the state it is written over. A request to hand out the
//! superadmin role is checked once up front and rejects the whole batch.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use volunteerdesk_auth::{Action, Role, Target, UserTarget};
use volunteerdesk_core::{SoftDelete, UserId};

use crate::error::{ServiceError, ServiceResult};
use crate::mediator::{Mediator, RequestContext};
use crate::read_model::transact;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BulkAction {
    Activate,
    Deactivate,
    Delete,
    AssignRole { role: Role },
}

impl BulkAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Activate => "activate",
            Self::Deactivate => "deactivate",
            Self::Delete => "delete",
            Self::AssignRole { .. } => "assign_role",
        }
    }

    fn policy_action(&self) -> Action {
        match self {
            Self::Delete => Action::Delete,
            _ => Action::Update,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkFailure {
    pub user_id: UserId,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkReport {
    pub success_count: usize,
    pub failure_count: usize,
    pub failures: Vec<BulkFailure>,
}

impl BulkReport {
    fn fail(&mut self, user_id: UserId, reason: impl Into<String>) {
        self.failure_count += 1;
        self.failures.push(BulkFailure {
            user_id,
            reason: reason.into(),
        });
    }
}

impl Mediator {
    pub fn bulk_users(
        &self,
        ctx: &RequestContext,
        action: BulkAction,
        ids: &[UserId],
    ) -> ServiceResult<BulkReport> {
        let subject = self.subject(ctx);
        let policy = self.policy();

        if let BulkAction::AssignRole { role } = action {
            let grant = Target::User(UserTarget {
                user_id: None,
                role: Role::Base,
                work_areas: Default::default(),
                requested_role: Some(role),
            });
            if let Some(kind) = policy.evaluate(subject.as_ref(), Action::Update, &grant).denial() {
                warn!(
                    actor = ?ctx.actor,
                    action = action.as_str(),
                    role = %role,
                    reason = %kind,
                    items = ids.len(),
                    "bulk batch rejected"
                );
                return Err(ServiceError::denied(kind));
            }
        }

        let report = transact(&*self.stores().users, |users| -> ServiceResult<BulkReport> {
            let mut report = BulkReport::default();
            for &id in ids {
                let Some(record) = users.get_mut(&id) else {
                    report.fail(id, "user not found");
                    continue;
                };
                if record.is_deleted() && action != BulkAction::Delete {
                    report.fail(id, "user is deleted");
                    continue;
                }
                if ctx.actor == Some(id) && matches!(action, BulkAction::Deactivate | BulkAction::Delete) {
                    report.fail(id, format!("cannot {} your own account", action.as_str()));
                    continue;
                }

                let mut before = UserTarget::from(&*record);
                if let BulkAction::AssignRole { role } = action {
                    before.requested_role = Some(role);
                }
                if let Some(kind) = policy
                    .evaluate(subject.as_ref(), action.policy_action(), &Target::User(before))
                    .denial()
                {
                    report.fail(id, kind.message());
                    continue;
                }

                let mut updated = record.clone();
                match action {
                    BulkAction::Activate => updated.is_active = true,
                    BulkAction::Deactivate => updated.is_active = false,
                    BulkAction::Delete => {
                        updated.soft_delete(ctx.actor, ctx.now);
                    }
                    BulkAction::AssignRole { role } => {
                        updated.role = role;
                        let after = UserTarget::from(&updated).requesting(role);
                        if let Some(kind) = policy
                            .evaluate(subject.as_ref(), Action::Update, &Target::User(after))
                            .denial()
                        {
                            report.fail(id, kind.message());
                            continue;
                        }
                    }
                }
                if action != BulkAction::Delete {
                    updated.updated_at = ctx.now;
                }
                *record = updated;
                report.success_count += 1;
            }
            Ok(report)
        })?;

        info!(
            actor = ?ctx.actor,
            action = action.as_str(),
            succeeded = report.success_count,
            failed = report.failure_count,
            "bulk user action completed"
        );
        Ok(report)
    }
}
