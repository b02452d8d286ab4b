//! Work areas: the unit of admin authority.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use volunteerdesk_core::{DomainResult, Entity, FieldErrors, WorkAreaId, validate};

pub const DEFAULT_AREA_COLOR: &str = "#1976d2";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkArea {
    pub id: WorkAreaId,
    /// Unique slug, e.g. `segreteria`.
    pub code: String,
    pub name: String,
    pub description: String,
    pub color: String,
    pub icon: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewWorkArea {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

/// Partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkAreaPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<Option<String>>,
    pub is_active: Option<bool>,
}

impl WorkArea {
    /// Validate and build a new, active area. Uniqueness of code and name is
    /// the registry's job.
    pub fn create(input: NewWorkArea, now: DateTime<Utc>) -> DomainResult<Self> {
        let mut errors = FieldErrors::new();

        let code = input.code.trim().to_string();
        if code.is_empty() {
            errors.push("code", "required");
        } else if !validate::is_slug(&code) {
            errors.push("code", "only lowercase letters, digits, '-' and '_' are allowed");
        }
        validate::max_len(&mut errors, "code", &code, 50);

        let name = validate::required(&mut errors, "name", &input.name);
        validate::max_len(&mut errors, "name", &name, 100);

        let color = input.color.unwrap_or_else(|| DEFAULT_AREA_COLOR.to_string());
        validate::hex_color(&mut errors, "color", &color);

        errors.into_result()?;

        Ok(Self {
            id: WorkAreaId::new(),
            code,
            name,
            description: input.description.trim().to_string(),
            color,
            icon: input.icon,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a patch. The code is immutable once created.
    pub fn apply(&mut self, patch: WorkAreaPatch, now: DateTime<Utc>) -> DomainResult<()> {
        let mut errors = FieldErrors::new();

        let name = patch
            .name
            .map(|n| validate::required(&mut errors, "name", &n));
        if let Some(color) = &patch.color {
            validate::hex_color(&mut errors, "color", color);
        }
        errors.into_result()?;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description.trim().to_string();
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
        if let Some(icon) = patch.icon {
            self.icon = icon;
        }
        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
        self.updated_at = now;
        Ok(())
    }
}

impl Entity for WorkArea {
    type Id = WorkAreaId;
    const KIND: &'static str = "work_area";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
