//! Serializable explanations of policy decisions, for audit logs and the CLI.

use serde::Serialize;

use volunteerdesk_core::{UserId, WorkAreaId};

use crate::{Action, Decision, DenialKind, Policy, Role, Subject, Target};

/// Why a request was (or would be) allowed or denied.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub action: Action,
    pub target: Target,
    pub granted: bool,
    /// Human-readable summary of the deciding rule.
    pub reason: String,
    pub subject: Option<SubjectState>,
    pub denial_reason: Option<DenialReason>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubjectState {
    pub user_id: UserId,
    pub role: Role,
    pub work_areas: Vec<WorkAreaId>,
    pub is_active: bool,
    pub is_deleted: bool,
    pub is_secretariat: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DenialReason {
    pub kind: DenialKind,
    pub message: String,
    pub suggestions: Vec<String>,
}

impl Policy {
    pub fn explain(
        &self,
        subject: Option<&Subject>,
        action: Action,
        target: &Target,
    ) -> AuthorizationExplanation {
        let decision = self.evaluate(subject, action, target);

        let state = subject.map(|s| SubjectState {
            user_id: s.user_id,
            role: s.role,
            work_areas: s.work_areas.iter().copied().collect(),
            is_active: s.is_active,
            is_deleted: s.is_deleted,
            is_secretariat: self.is_secretariat(s),
        });

        match decision {
            Decision::Allow => AuthorizationExplanation {
                action,
                target: target.clone(),
                granted: true,
                reason: allow_reason(subject, action, target),
                subject: state,
                denial_reason: None,
            },
            Decision::Deny(kind) => AuthorizationExplanation {
                action,
                target: target.clone(),
                granted: false,
                reason: format!("{action} on {} denied: {}", target.kind(), kind.message()),
                subject: state,
                denial_reason: Some(DenialReason {
                    kind,
                    message: kind.message().to_string(),
                    suggestions: suggestions(kind),
                }),
            },
        }
    }
}

fn allow_reason(subject: Option<&Subject>, action: Action, target: &Target) -> String {
    let kind = target.kind();
    match (subject.map(|s| s.role), action, target) {
        (Some(Role::Superadmin), _, _) => "superadmins may do anything".to_string(),
        (_, Action::Read, Target::User(t)) if subject.is_some_and(|s| t.user_id == Some(s.user_id)) => {
            "users may read their own profile".to_string()
        }
        (_, Action::Read, Target::Document { visibility: Some(v) }) => {
            format!("document visibility '{}' includes this user", v.as_str())
        }
        (_, Action::Read, Target::User(_) | Target::UserDirectory) => {
            "admins may read users within their work areas".to_string()
        }
        (_, Action::Read, _) => format!("any authenticated user may read {kind}"),
        (_, _, Target::Todo) => "any admin may manage todos".to_string(),
        (_, _, Target::Document { .. }) => "secretariat admins may manage documents".to_string(),
        (_, _, Target::Activity { .. } | Target::Shift { .. }) => {
            format!("the {kind} belongs to one of the user's work areas")
        }
        (_, _, Target::User(_)) => "the user is base or shares a work area with the admin".to_string(),
        _ => format!("{action} on {kind} is allowed"),
    }
}

fn suggestions(kind: DenialKind) -> Vec<String> {
    let hints: &[&str] = match kind {
        DenialKind::Unauthenticated => &["Authenticate before calling this operation"],
        DenialKind::InactiveSubject => &["Reactivate or restore the account (superadmin)"],
        DenialKind::BaseRoleReadOnly | DenialKind::AdminRequired => {
            &["Ask a superadmin to grant the admin role"]
        }
        DenialKind::OutsideWorkArea => &[
            "Ask a superadmin to assign the relevant work area",
            "Ask an admin of that work area to perform the change",
        ],
        DenialKind::SecretariatRequired | DenialKind::DocumentVisibility => {
            &["Ask a superadmin to assign the secretariat work area"]
        }
        DenialKind::SuperadminRequired | DenialKind::RoleEscalation => {
            &["Ask a superadmin to perform this operation"]
        }
        DenialKind::UnresolvedArea => &["Fix the record's work area (data integrity fault)"],
        DenialKind::NoMatchingRule => &[],
    };
    hints.iter().map(|h| h.to_string()).collect()
}
