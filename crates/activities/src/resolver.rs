//! Area resolution for activities (direct) and shifts (one hop via the parent).

use std::collections::HashMap;
use std::sync::Arc;

use volunteerdesk_auth::{ResourceKind, ScopeResolver, UnresolvedScope};
use volunteerdesk_core::{ActivityId, WorkAreaId};

use crate::{Activity, Shift};

/// Read access to activities by id, soft-deleted ones included.
pub trait ActivityLookup {
    fn activity(&self, id: ActivityId) -> Option<Activity>;
}

impl<L: ActivityLookup + ?Sized> ActivityLookup for Arc<L> {
    fn activity(&self, id: ActivityId) -> Option<Activity> {
        (**self).activity(id)
    }
}

impl<L: ActivityLookup + ?Sized> ActivityLookup for &L {
    fn activity(&self, id: ActivityId) -> Option<Activity> {
        (**self).activity(id)
    }
}

impl ActivityLookup for HashMap<ActivityId, Activity> {
    fn activity(&self, id: ActivityId) -> Option<Activity> {
        self.get(&id).cloned()
    }
}

#[derive(Debug, Clone)]
pub struct AreaResolver<L> {
    activities: L,
}

impl<L> AreaResolver<L> {
    pub fn new(activities: L) -> Self {
        Self { activities }
    }
}

impl<L> ScopeResolver<Activity> for AreaResolver<L> {
    fn resolve_area(&self, activity: &Activity) -> Result<WorkAreaId, UnresolvedScope> {
        activity.work_area.ok_or_else(|| {
            UnresolvedScope::new(ResourceKind::Activity, activity.id, "activity has no work area")
        })
    }
}

impl<L: ActivityLookup> ScopeResolver<Shift> for AreaResolver<L> {
    fn resolve_area(&self, shift: &Shift) -> Result<WorkAreaId, UnresolvedScope> {
        let parent = self.activities.activity(shift.activity_id).ok_or_else(|| {
            UnresolvedScope::new(
                ResourceKind::Shift,
                shift.id,
                format!("parent activity {} is missing", shift.activity_id),
            )
        })?;
        parent.work_area.ok_or_else(|| {
            UnresolvedScope::new(
                ResourceKind::Shift,
                shift.id,
                format!("parent activity {} has no work area", parent.id),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NewActivity, NewShift};
    use chrono::{NaiveDate, NaiveTime, Utc};
    use volunteerdesk_core::UserId;

    fn activity(area: WorkAreaId) -> Activity {
        Activity::create(
            NewActivity {
                name: "Doposcuola".to_string(),
                description: String::new(),
                work_area: area,
                color: None,
                enrollment_link: None,
            },
            UserId::new(),
            Utc::now(),
        )
        .unwrap()
    }

    fn shift_of(activity_id: ActivityId) -> Shift {
        Shift::create(
            NewShift {
                activity_id,
                title: "Pomeriggio".to_string(),
                date: NaiveDate::from_ymd_opt(2026, 5, 4).unwrap(),
                start_time: NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
                available_slots: 4,
                enrollment_link: None,
                notes: String::new(),
            },
            UserId::new(),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn shift_resolves_through_parent() {
        let area = WorkAreaId::new();
        let parent = activity(area);
        let shift = shift_of(parent.id);
        let resolver = AreaResolver::new(HashMap::from([(parent.id, parent.clone())]));

        assert_eq!(resolver.resolve_area(&parent), Ok(area));
        assert_eq!(resolver.resolve_area(&shift), Ok(area));
    }

    #[test]
    fn missing_parent_or_area_is_unresolved() {
        let resolver = AreaResolver::new(HashMap::new());
        let orphan = shift_of(ActivityId::new());
        let err = resolver.resolve_area(&orphan).unwrap_err();
        assert_eq!(err.kind, ResourceKind::Shift);

        let mut broken = activity(WorkAreaId::new());
        broken.work_area = None;
        assert!(resolver.resolve_area(&broken).is_err());

        let resolver = AreaResolver::new(HashMap::from([(broken.id, broken.clone())]));
        assert!(resolver.resolve_area(&shift_of(broken.id)).is_err());
    }
}
