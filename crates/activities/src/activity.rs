use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use volunteerdesk_core::{
    ActivityId, DeletionMarker, DomainResult, Entity, FieldErrors, SoftDelete, UserId, WorkAreaId,
    validate,
};

pub const DEFAULT_ACTIVITY_COLOR: &str = "#1976d2";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    pub name: String,
    pub description: String,
    /// `None` only as a data-integrity fault; every write path requires an area.
    pub work_area: Option<WorkAreaId>,
    pub color: String,
    /// Default enrollment link for the activity's shifts.
    pub enrollment_link: Option<String>,
    pub is_active: bool,
    pub created_by: Option<UserId>,
    pub deletion: DeletionMarker,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewActivity {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub work_area: WorkAreaId,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub enrollment_link: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Moving to another area; the caller must hold authority over both.
    pub work_area: Option<WorkAreaId>,
    pub color: Option<String>,
    pub enrollment_link: Option<Option<String>>,
    pub is_active: Option<bool>,
}

impl Activity {
    pub fn create(input: NewActivity, created_by: UserId, now: DateTime<Utc>) -> DomainResult<Self> {
        let mut errors = FieldErrors::new();

        let name = validate::required(&mut errors, "name", &input.name);
        validate::max_len(&mut errors, "name", &name, 200);
        let color = input
            .color
            .unwrap_or_else(|| DEFAULT_ACTIVITY_COLOR.to_string());
        validate::hex_color(&mut errors, "color", &color);
        let enrollment_link =
            validate::optional_link(&mut errors, "enrollment_link", input.enrollment_link.as_deref());

        errors.into_result()?;

        Ok(Self {
            id: ActivityId::new(),
            name,
            description: input.description.trim().to_string(),
            work_area: Some(input.work_area),
            color,
            enrollment_link,
            is_active: true,
            created_by: Some(created_by),
            deletion: DeletionMarker::default(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply(&mut self, patch: ActivityPatch, now: DateTime<Utc>) -> DomainResult<()> {
        let mut errors = FieldErrors::new();

        let name = patch
            .name
            .as_deref()
            .map(|n| validate::required(&mut errors, "name", n));
        if let Some(color) = &patch.color {
            validate::hex_color(&mut errors, "color", color);
        }
        let link = patch
            .enrollment_link
            .as_ref()
            .map(|l| validate::optional_link(&mut errors, "enrollment_link", l.as_deref()));

        errors.into_result()?;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description.trim().to_string();
        }
        if let Some(area) = patch.work_area {
            self.work_area = Some(area);
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
        if let Some(link) = link {
            self.enrollment_link = link;
        }
        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Null every reference to a purged user.
    pub fn forget_user(&mut self, user_id: UserId) {
        if self.created_by == Some(user_id) {
            self.created_by = None;
        }
        self.deletion.forget_actor(user_id);
    }
}

impl Entity for Activity {
    type Id = ActivityId;
    const KIND: &'static str = "activity";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl SoftDelete for Activity {
    fn deletion(&self) -> &DeletionMarker {
        &self.deletion
    }

    fn deletion_mut(&mut self) -> &mut DeletionMarker {
        &mut self.deletion
    }
}
