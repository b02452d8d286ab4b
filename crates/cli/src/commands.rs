//! Command handlers. Each returns the JSON value printed on stdout.

use std::collections::HashMap;

use anyhow::{Context, Result, anyhow, bail};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use volunteerdesk_activities::{Activity, AreaResolver};
use volunteerdesk_auth::{Action, ScopeResolver, Target};
use volunteerdesk_core::{ActivityId, DocumentId, ShiftId, UserId, WorkAreaId};
use volunteerdesk_infra::{ImportReport, ImportRow, Mediator, RequestContext};

/// Resource named on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Resource {
    User,
    Users,
    WorkArea,
    Activity,
    Shift,
    Todo,
    Document,
}

/// Resolve `--as <username>` to a request context.
pub fn context_for(mediator: &Mediator, username: Option<&str>) -> Result<RequestContext> {
    match username {
        None => Ok(RequestContext::anonymous()),
        Some(name) => mediator
            .user_by_username(name)
            .map(|u| RequestContext::as_user(u.id))
            .ok_or_else(|| anyhow!("no user named '{name}' in the fixture")),
    }
}

/// Build the policy target for a resource and optional id (a username is
/// accepted for users). Area-scoped records resolve their area here.
pub fn resolve_target(mediator: &Mediator, resource: Resource, id: Option<&str>) -> Result<Target> {
    let stores = mediator.stores();
    let lookup: HashMap<ActivityId, Activity> = stores
        .activities
        .list()
        .into_iter()
        .map(|a| (a.id, a))
        .collect();
    let resolver = AreaResolver::new(&lookup);

    let target = match (resource, id) {
        (Resource::WorkArea, _) => Target::WorkArea,
        (Resource::Todo, _) => Target::Todo,
        (Resource::Users, _) | (Resource::User, None) => Target::UserDirectory,
        (Resource::User, Some(key)) => {
            let user = match key.parse::<UserId>() {
                Ok(id) => mediator.identity().get_user(id),
                Err(_) => mediator.user_by_username(key),
            }
            .ok_or_else(|| anyhow!("user '{key}' not found"))?;
            Target::user(&user)
        }
        (Resource::Document, None) => Target::documents(),
        (Resource::Document, Some(key)) => {
            let id: DocumentId = key.parse().context("invalid document id")?;
            let document = stores
                .documents
                .get(&id)
                .ok_or_else(|| anyhow!("document {id} not found"))?;
            Target::document(document.visibility)
        }
        (Resource::Activity, None) => Target::activity(None),
        (Resource::Activity, Some(key)) => {
            let id: ActivityId = key.parse().context("invalid activity id")?;
            let activity = lookup.get(&id).ok_or_else(|| anyhow!("activity {id} not found"))?;
            Target::activity(area_or_log(resolver.resolve_area(activity)))
        }
        (Resource::Shift, None) => Target::shift(None),
        (Resource::Shift, Some(key)) => {
            let id: ShiftId = key.parse().context("invalid shift id")?;
            let shift = stores.shifts.get(&id).ok_or_else(|| anyhow!("shift {id} not found"))?;
            Target::shift(area_or_log(resolver.resolve_area(&shift)))
        }
    };
    Ok(target)
}

fn area_or_log(resolved: Result<WorkAreaId, volunteerdesk_auth::UnresolvedScope>) -> Option<WorkAreaId> {
    resolved
        .inspect_err(|fault| error!(kind = %fault.kind, id = %fault.id, detail = %fault.detail, "unresolved work area"))
        .ok()
}

pub fn explain(mediator: &Mediator, ctx: &RequestContext, action: &str, target: &Target) -> Result<Value> {
    let action: Action = action.parse()?;
    let explanation = mediator.explain(ctx, action, target);
    info!(
        actor = ?ctx.actor,
        action = %action,
        resource = %target.kind(),
        granted = explanation.granted,
        "explained"
    );
    Ok(serde_json::to_value(explanation)?)
}

pub fn import(mediator: &Mediator, ctx: &RequestContext, rows: Vec<ImportRow>) -> Result<ImportReport> {
    let report = mediator.import_users(ctx, rows)?;
    if !report.failures.is_empty() {
        info!(failed_rows = report.failures.len(), "import produced no users");
    }
    Ok(report)
}

pub fn parse_rows(raw: &str) -> Result<Vec<ImportRow>> {
    let rows: Vec<ImportRow> = serde_json::from_str(raw).context("rows must be a JSON array of objects")?;
    if rows.is_empty() {
        bail!("the row file is empty");
    }
    Ok(rows)
}

/// A user assignment pointing at a missing or inactive work area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AreaFinding {
    pub username: String,
    pub work_area: WorkAreaId,
    pub problem: &'static str,
}

/// Users (soft-deleted excluded) whose area assignments are stale.
pub fn audit_areas(mediator: &Mediator) -> Vec<AreaFinding> {
    let registry = mediator.registry();
    let mut findings = Vec::new();
    for user in mediator.stores().users.list() {
        if user.deletion.is_deleted() {
            continue;
        }
        for &area in &user.work_areas {
            let problem = match registry.get_area(area) {
                None => "unknown",
                Some(a) if !a.is_active => "inactive",
                Some(_) => continue,
            };
            findings.push(AreaFinding {
                username: user.username.clone(),
                work_area: area,
                problem,
            });
        }
    }
    findings.sort_by(|a, b| a.username.cmp(&b.username));
    findings
}
