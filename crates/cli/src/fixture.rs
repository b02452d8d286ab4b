//! JSON fixture holding every record type, loaded into in-memory stores.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use volunteerdesk_activities::{Activity, Shift};
use volunteerdesk_auth::{User, WorkArea};
use volunteerdesk_infra::{Mediator, Settings, Stores};
use volunteerdesk_secretariat::{Document, Todo};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Fixture {
    pub users: Vec<User>,
    pub areas: Vec<WorkArea>,
    pub activities: Vec<Activity>,
    pub shifts: Vec<Shift>,
    pub todos: Vec<Todo>,
    pub documents: Vec<Document>,
}

impl Fixture {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read fixture {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("invalid fixture {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("failed to write fixture {}", path.display()))
    }

    pub fn into_mediator(self, settings: Settings) -> Result<Mediator> {
        let stores = Stores::in_memory();
        stores.users.upsert_all(self.users.into_iter().map(|r| (r.id, r)).collect())?;
        stores.areas.upsert_all(self.areas.into_iter().map(|r| (r.id, r)).collect())?;
        stores
            .activities
            .upsert_all(self.activities.into_iter().map(|r| (r.id, r)).collect())?;
        stores.shifts.upsert_all(self.shifts.into_iter().map(|r| (r.id, r)).collect())?;
        stores.todos.upsert_all(self.todos.into_iter().map(|r| (r.id, r)).collect())?;
        stores
            .documents
            .upsert_all(self.documents.into_iter().map(|r| (r.id, r)).collect())?;
        Ok(Mediator::new(stores, settings))
    }

    /// Snapshot every store, soft-deleted rows included.
    pub fn from_mediator(mediator: &Mediator) -> Self {
        let stores = mediator.stores();
        Self {
            users: stores.users.list(),
            areas: stores.areas.list(),
            activities: stores.activities.list(),
            shifts: stores.shifts.list(),
            todos: stores.todos.list(),
            documents: stores.documents.list(),
        }
    }
}
