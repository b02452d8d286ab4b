use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::info;

use volunteerdesk_activities::{Activity, NewShift, Shift, ShiftPatch};
use volunteerdesk_auth::{Action, ScopeResolver, Target};
use volunteerdesk_core::{ActivityId, DeleteOutcome, RestoreOutcome, ShiftId, SoftDelete, WorkAreaId};

use super::{Mediator, RequestContext, read_action};
use crate::error::{ServiceError, ServiceResult};
use crate::read_model::SoftDeleteQueries;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShiftFilter {
    pub activity: Option<ActivityId>,
    pub area: Option<WorkAreaId>,
    /// Inclusive date bounds.
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// Only shifts that have not started yet.
    pub upcoming: bool,
    pub include_inactive: bool,
    pub include_deleted: bool,
}

/// A shift with the parent activity details a schedule view needs.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduledShift {
    #[serde(flatten)]
    pub shift: Shift,
    pub activity_name: String,
    pub work_area: Option<WorkAreaId>,
    pub color: String,
    /// The shift's own link, else the activity's.
    pub enrollment_link: Option<String>,
}

pub(crate) fn shift_target(area: Option<WorkAreaId>) -> Target {
    Target::Shift { area }
}

/// Parse `YYYY-MM` into the first and last day of that month.
pub(crate) fn month_bounds(month: &str) -> ServiceResult<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::parse_from_str(&format!("{}-01", month.trim()), "%Y-%m-%d")
        .map_err(|_| ServiceError::validation("month", "expected YYYY-MM"))?;
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .ok_or_else(|| ServiceError::validation("month", "month out of range"))?;
    Ok((first, last))
}

impl Mediator {
    /// Create a shift under a live activity; the area comes from the parent.
    pub fn create_shift(&self, ctx: &RequestContext, input: NewShift) -> ServiceResult<Shift> {
        let subject = self.subject(ctx);
        let parent = self
            .stores
            .activities
            .get_active(&input.activity_id)
            .ok_or_else(|| ServiceError::not_found::<Activity>(&input.activity_id))?;
        let resolved = self.resolver().resolve_area(&parent);
        let area = resolved.as_ref().ok().copied();
        let actor = self.authorize_scoped(subject.as_ref(), Action::Create, resolved, shift_target)?;

        // The new shift lands in the parent's area, which must still be open.
        if !area.is_some_and(|area| self.registry.is_active(area)) {
            return Err(ServiceError::validation(
                "activity_id",
                "the activity's work area is unknown or inactive",
            ));
        }
        let shift = Shift::create(input, actor, ctx.now)?;

        self.stores.shifts.upsert(shift.id, shift.clone())?;
        info!(actor = %actor, shift_id = %shift.id, activity_id = %shift.activity_id, "shift created");
        Ok(shift)
    }

    pub fn update_shift(&self, ctx: &RequestContext, id: ShiftId, patch: ShiftPatch) -> ServiceResult<Shift> {
        let subject = self.subject(ctx);
        let current = self
            .stores
            .shifts
            .get_active(&id)
            .ok_or_else(|| ServiceError::not_found::<Shift>(&id))?;
        let resolved = self.resolver().resolve_area(&current);
        let actor = self.authorize_scoped(subject.as_ref(), Action::Update, resolved, shift_target)?;

        let updated = Self::update_live(
            &self.stores.shifts,
            &id,
            |live| live.activity_id == current.activity_id,
            |record| Ok(record.apply(patch.clone(), ctx.now)?),
        )?;
        info!(actor = %actor, shift_id = %id, "shift updated");
        Ok(updated)
    }

    pub fn get_shift(&self, ctx: &RequestContext, id: ShiftId) -> ServiceResult<Shift> {
        let subject = self.subject(ctx);
        let shift = self
            .stores
            .shifts
            .get(&id)
            .ok_or_else(|| ServiceError::not_found::<Shift>(&id))?;
        let resolved = self.resolver().resolve_area(&shift);
        self.authorize_scoped(subject.as_ref(), read_action(&shift), resolved, shift_target)?;
        Ok(shift)
    }

    /// Shifts ordered by date and start time. Shifts of deleted activities
    /// only appear with `include_deleted`, of inactive ones with
    /// `include_inactive`.
    pub fn list_shifts(&self, ctx: &RequestContext, filter: &ShiftFilter) -> ServiceResult<Vec<ScheduledShift>> {
        let subject = self.subject(ctx);
        self.authorize(subject.as_ref(), Action::Read, &shift_target(filter.area))?;

        let policy = self.policy();
        let now = ctx.now.naive_utc();
        let records = if filter.include_deleted {
            self.stores.shifts.find_all()
        } else {
            self.stores.shifts.find_active()
        };

        let mut shifts: Vec<ScheduledShift> = records
            .into_iter()
            .filter_map(|shift| {
                let parent = self.stores.activities.get(&shift.activity_id)?;
                if parent.is_deleted() && !filter.include_deleted {
                    return None;
                }
                if !filter.include_inactive && !(shift.is_active && parent.is_active) {
                    return None;
                }
                if filter.activity.is_some_and(|id| id != parent.id)
                    || filter.area.is_some_and(|area| parent.work_area != Some(area))
                    || filter.from.is_some_and(|from| shift.date < from)
                    || filter.to.is_some_and(|to| shift.date > to)
                    || (filter.upcoming && !shift.is_upcoming(now))
                {
                    return None;
                }
                if shift.is_deleted()
                    && !policy
                        .evaluate(subject.as_ref(), Action::ReadDeleted, &shift_target(parent.work_area))
                        .is_allowed()
                {
                    return None;
                }
                Some(ScheduledShift {
                    enrollment_link: shift.effective_enrollment_link(&parent).map(str::to_string),
                    activity_name: parent.name,
                    work_area: parent.work_area,
                    color: parent.color,
                    shift,
                })
            })
            .collect();
        shifts.sort_by_key(|s| (s.shift.date, s.shift.start_time));
        Ok(shifts)
    }

    /// Shifts within a calendar month given as `YYYY-MM`.
    pub fn shift_calendar(&self, ctx: &RequestContext, month: &str) -> ServiceResult<Vec<ScheduledShift>> {
        let (from, to) = month_bounds(month)?;
        self.list_shifts(
            ctx,
            &ShiftFilter {
                from: Some(from),
                to: Some(to),
                ..Default::default()
            },
        )
    }

    pub fn shifts_today(&self, ctx: &RequestContext) -> ServiceResult<Vec<ScheduledShift>> {
        let today = ctx.now.date_naive();
        self.list_shifts(
            ctx,
            &ShiftFilter {
                from: Some(today),
                to: Some(today),
                ..Default::default()
            },
        )
    }

    /// The next `limit` shifts that have not started yet.
    pub fn upcoming_shifts(&self, ctx: &RequestContext, limit: usize) -> ServiceResult<Vec<ScheduledShift>> {
        let mut shifts = self.list_shifts(
            ctx,
            &ShiftFilter {
                upcoming: true,
                ..Default::default()
            },
        )?;
        shifts.truncate(limit);
        Ok(shifts)
    }

    pub fn delete_shift(&self, ctx: &RequestContext, id: ShiftId) -> ServiceResult<DeleteOutcome> {
        let subject = self.subject(ctx);
        let shift = self
            .stores
            .shifts
            .get(&id)
            .ok_or_else(|| ServiceError::not_found::<Shift>(&id))?;
        let resolved = self.resolver().resolve_area(&shift);
        let actor = self.authorize_scoped(subject.as_ref(), Action::Delete, resolved, shift_target)?;

        let outcome = Self::soft_delete_in(&self.stores.shifts, &id, actor, ctx.now)?;
        info!(actor = %actor, shift_id = %id, outcome = ?outcome, "shift soft-deleted");
        Ok(outcome)
    }

    pub fn restore_shift(&self, ctx: &RequestContext, id: ShiftId) -> ServiceResult<RestoreOutcome> {
        let subject = self.subject(ctx);
        let shift = self
            .stores
            .shifts
            .get(&id)
            .ok_or_else(|| ServiceError::not_found::<Shift>(&id))?;
        let resolved = self.resolver().resolve_area(&shift);
        let actor = self.authorize_scoped(subject.as_ref(), Action::Restore, resolved, shift_target)?;

        let outcome = Self::restore_in(&self.stores.shifts, &id)?;
        info!(actor = %actor, shift_id = %id, outcome = ?outcome, "shift restored");
        Ok(outcome)
    }
}
