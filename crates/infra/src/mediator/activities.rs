use serde::{Deserialize, Serialize};
use tracing::info;

use volunteerdesk_activities::{Activity, ActivityLookup, ActivityPatch, AreaResolver, NewActivity};
use volunteerdesk_auth::{Action, ScopeResolver, Target, WorkArea};
use volunteerdesk_core::{ActivityId, DeleteOutcome, RestoreOutcome, SoftDelete, WorkAreaId};

use super::{Mediator, RequestContext, read_action};
use crate::error::{ServiceError, ServiceResult};
use crate::identity::SharedStore;
use crate::read_model::SoftDeleteQueries;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityFilter {
    pub area: Option<WorkAreaId>,
    pub include_inactive: bool,
    pub include_deleted: bool,
}

/// Active activities of one active area.
#[derive(Debug, Clone, Serialize)]
pub struct AreaActivities {
    pub area: WorkArea,
    pub activities: Vec<Activity>,
}

/// Activity lookups straight from the store.
#[derive(Clone, Copy)]
pub(crate) struct StoredActivities<'a>(pub(crate) &'a SharedStore<ActivityId, Activity>);

impl ActivityLookup for StoredActivities<'_> {
    fn activity(&self, id: ActivityId) -> Option<Activity> {
        self.0.get(&id)
    }
}

pub(crate) fn activity_target(area: Option<WorkAreaId>) -> Target {
    Target::Activity { area }
}

impl Mediator {
    pub(crate) fn resolver(&self) -> AreaResolver<StoredActivities<'_>> {
        AreaResolver::new(StoredActivities(&self.stores.activities))
    }

    pub fn create_activity(&self, ctx: &RequestContext, input: NewActivity) -> ServiceResult<Activity> {
        let subject = self.subject(ctx);
        let actor = self.authorize(subject.as_ref(), Action::Create, &Target::activity(input.work_area))?;

        if !self.registry.is_active(input.work_area) {
            return Err(ServiceError::validation("work_area", "unknown or inactive work area"));
        }
        let activity = Activity::create(input, actor, ctx.now)?;

        self.stores.activities.upsert(activity.id, activity.clone())?;
        info!(actor = %actor, activity_id = %activity.id, "activity created");
        Ok(activity)
    }

    /// Update an activity. Moving it to another area needs authority over
    /// both the old and the new area.
    pub fn update_activity(
        &self,
        ctx: &RequestContext,
        id: ActivityId,
        patch: ActivityPatch,
    ) -> ServiceResult<Activity> {
        let subject = self.subject(ctx);
        let current = self
            .stores
            .activities
            .get_active(&id)
            .ok_or_else(|| ServiceError::not_found::<Activity>(&id))?;
        let resolved = self.resolver().resolve_area(&current);
        let actor = self.authorize_scoped(subject.as_ref(), Action::Update, resolved, activity_target)?;

        if let Some(new_area) = patch.work_area.filter(|a| Some(*a) != current.work_area) {
            self.authorize(subject.as_ref(), Action::Update, &Target::activity(new_area))?;
            if !self.registry.is_active(new_area) {
                return Err(ServiceError::validation("work_area", "unknown or inactive work area"));
            }
        }

        let updated = Self::update_live(
            &self.stores.activities,
            &id,
            |live| live.work_area == current.work_area,
            |record| Ok(record.apply(patch.clone(), ctx.now)?),
        )?;
        info!(actor = %actor, activity_id = %id, "activity updated");
        Ok(updated)
    }

    pub fn get_activity(&self, ctx: &RequestContext, id: ActivityId) -> ServiceResult<Activity> {
        let subject = self.subject(ctx);
        let activity = self
            .stores
            .activities
            .get(&id)
            .ok_or_else(|| ServiceError::not_found::<Activity>(&id))?;
        let resolved = self.resolver().resolve_area(&activity);
        self.authorize_scoped(subject.as_ref(), read_action(&activity), resolved, activity_target)?;
        Ok(activity)
    }

    /// Activities sorted by name.
    pub fn list_activities(
        &self,
        ctx: &RequestContext,
        filter: &ActivityFilter,
    ) -> ServiceResult<Vec<Activity>> {
        let subject = self.subject(ctx);
        self.authorize(subject.as_ref(), Action::Read, &Target::activity(filter.area))?;

        let policy = self.policy();
        let records = if filter.include_deleted {
            self.stores.activities.find_all()
        } else {
            self.stores.activities.find_active()
        };
        let mut activities: Vec<Activity> = records
            .into_iter()
            .filter(|a| filter.area.is_none() || a.work_area == filter.area)
            .filter(|a| filter.include_inactive || a.is_active)
            .filter(|a| {
                !a.is_deleted()
                    || policy
                        .evaluate(subject.as_ref(), Action::ReadDeleted, &activity_target(a.work_area))
                        .is_allowed()
            })
            .collect();
        activities.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(activities)
    }

    /// Active activities grouped under their active area, areas by name.
    pub fn activities_by_area(&self, ctx: &RequestContext) -> ServiceResult<Vec<AreaActivities>> {
        let activities = self.list_activities(ctx, &ActivityFilter::default())?;
        let groups = self
            .list_areas(ctx, false)?
            .into_iter()
            .map(|area| AreaActivities {
                activities: activities
                    .iter()
                    .filter(|a| a.work_area == Some(area.id))
                    .cloned()
                    .collect(),
                area,
            })
            .filter(|group| !group.activities.is_empty())
            .collect();
        Ok(groups)
    }

    pub fn delete_activity(&self, ctx: &RequestContext, id: ActivityId) -> ServiceResult<DeleteOutcome> {
        let subject = self.subject(ctx);
        let activity = self
            .stores
            .activities
            .get(&id)
            .ok_or_else(|| ServiceError::not_found::<Activity>(&id))?;
        let resolved = self.resolver().resolve_area(&activity);
        let actor = self.authorize_scoped(subject.as_ref(), Action::Delete, resolved, activity_target)?;

        let outcome = Self::soft_delete_in(&self.stores.activities, &id, actor, ctx.now)?;
        info!(actor = %actor, activity_id = %id, outcome = ?outcome, "activity soft-deleted");
        Ok(outcome)
    }

    pub fn restore_activity(&self, ctx: &RequestContext, id: ActivityId) -> ServiceResult<RestoreOutcome> {
        let subject = self.subject(ctx);
        let activity = self
            .stores
            .activities
            .get(&id)
            .ok_or_else(|| ServiceError::not_found::<Activity>(&id))?;
        let resolved = self.resolver().resolve_area(&activity);
        let actor = self.authorize_scoped(subject.as_ref(), Action::Restore, resolved, activity_target)?;

        let outcome = Self::restore_in(&self.stores.activities, &id)?;
        info!(actor = %actor, activity_id = %id, outcome = ?outcome, "activity restored");
        Ok(outcome)
    }
}
