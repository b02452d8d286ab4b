//! Shifts: dated time slots of an activity.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use volunteerdesk_core::{
    ActivityId, DeletionMarker, DomainResult, Entity, FieldErrors, ShiftId, SoftDelete, UserId,
    validate,
};

use crate::Activity;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shift {
    pub id: ShiftId,
    pub activity_id: ActivityId,
    pub title: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// 0 means unlimited.
    pub available_slots: u32,
    /// Overrides the activity's link when set.
    pub enrollment_link: Option<String>,
    pub notes: String,
    pub is_active: bool,
    pub created_by: Option<UserId>,
    pub deletion: DeletionMarker,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewShift {
    pub activity_id: ActivityId,
    pub title: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[serde(default)]
    pub available_slots: u32,
    #[serde(default)]
    pub enrollment_link: Option<String>,
    #[serde(default)]
    pub notes: String,
}

/// Partial update. A shift never changes activity; recreate it instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShiftPatch {
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub available_slots: Option<u32>,
    pub enrollment_link: Option<Option<String>>,
    pub notes: Option<String>,
    pub is_active: Option<bool>,
}

fn check_times(errors: &mut FieldErrors, start: NaiveTime, end: NaiveTime) {
    if start >= end {
        errors.push("end_time", "must be after start_time");
    }
}

impl Shift {
    pub fn create(input: NewShift, created_by: UserId, now: DateTime<Utc>) -> DomainResult<Self> {
        let mut errors = FieldErrors::new();

        let title = validate::required(&mut errors, "title", &input.title);
        validate::max_len(&mut errors, "title", &title, 200);
        check_times(&mut errors, input.start_time, input.end_time);
        let enrollment_link =
            validate::optional_link(&mut errors, "enrollment_link", input.enrollment_link.as_deref());

        errors.into_result()?;

        Ok(Self {
            id: ShiftId::new(),
            activity_id: input.activity_id,
            title,
            date: input.date,
            start_time: input.start_time,
            end_time: input.end_time,
            available_slots: input.available_slots,
            enrollment_link,
            notes: input.notes.trim().to_string(),
            is_active: true,
            created_by: Some(created_by),
            deletion: DeletionMarker::default(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a patch; the start/end check runs on the merged times.
    pub fn apply(&mut self, patch: ShiftPatch, now: DateTime<Utc>) -> DomainResult<()> {
        let mut errors = FieldErrors::new();

        let title = patch
            .title
            .as_deref()
            .map(|t| validate::required(&mut errors, "title", t));
        let start = patch.start_time.unwrap_or(self.start_time);
        let end = patch.end_time.unwrap_or(self.end_time);
        check_times(&mut errors, start, end);
        let link = patch
            .enrollment_link
            .as_ref()
            .map(|l| validate::optional_link(&mut errors, "enrollment_link", l.as_deref()));

        errors.into_result()?;

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(date) = patch.date {
            self.date = date;
        }
        self.start_time = start;
        self.end_time = end;
        if let Some(slots) = patch.available_slots {
            self.available_slots = slots;
        }
        if let Some(link) = link {
            self.enrollment_link = link;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes.trim().to_string();
        }
        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn is_unlimited(&self) -> bool {
        self.available_slots == 0
    }

    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.start_time)
    }

    /// Not started yet as of `now` (local wall-clock).
    pub fn is_upcoming(&self, now: NaiveDateTime) -> bool {
        self.starts_at() >= now
    }

    /// The shift's own link, else the parent activity's.
    pub fn effective_enrollment_link<'a>(&'a self, parent: &'a Activity) -> Option<&'a str> {
        self.enrollment_link
            .as_deref()
            .or(parent.enrollment_link.as_deref())
    }

    /// Null every reference to a purged user.
    pub fn forget_user(&mut self, user_id: UserId) {
        if self.created_by == Some(user_id) {
            self.created_by = None;
        }
        self.deletion.forget_actor(user_id);
    }
}

impl Entity for Shift {
    type Id = ShiftId;
    const KIND: &'static str = "shift";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl SoftDelete for Shift {
    fn deletion(&self) -> &DeletionMarker {
        &self.deletion
    }

    fn deletion_mut(&mut self) -> &mut DeletionMarker {
        &mut self.deletion
    }
}
