use tracing::info;

use volunteerdesk_auth::{Action, NewWorkArea, Target, WorkArea, WorkAreaPatch};
use volunteerdesk_core::WorkAreaId;

use super::{Mediator, RequestContext};
use crate::error::{ServiceError, ServiceResult};
use crate::identity::area_name_in_use;
use crate::read_model::transact;

fn name_conflict(name: &str) -> ServiceError {
    ServiceError::conflict(format!("work area name '{name}' already exists"))
}

impl Mediator {
    pub fn create_area(&self, ctx: &RequestContext, input: NewWorkArea) -> ServiceResult<WorkArea> {
        let subject = self.subject(ctx);
        let actor = self.authorize(subject.as_ref(), Action::Create, &Target::WorkArea)?;

        let area = WorkArea::create(input, ctx.now)?;
        transact(&*self.stores.areas, |areas| -> ServiceResult<()> {
            if areas.values().any(|a| a.code == area.code) {
                return Err(ServiceError::conflict(format!(
                    "work area code '{}' already exists",
                    area.code
                )));
            }
            if area_name_in_use(areas.values(), &area.name, None) {
                return Err(name_conflict(&area.name));
            }
            areas.insert(area.id, area.clone());
            Ok(())
        })?;
        info!(actor = %actor, area_id = %area.id, code = %area.code, "work area created");
        Ok(area)
    }

    pub fn update_area(
        &self,
        ctx: &RequestContext,
        id: WorkAreaId,
        patch: WorkAreaPatch,
    ) -> ServiceResult<WorkArea> {
        let subject = self.subject(ctx);
        if self.registry.get_area(id).is_none() {
            return Err(ServiceError::not_found::<WorkArea>(&id));
        }
        let actor = self.authorize(subject.as_ref(), Action::Update, &Target::WorkArea)?;

        let updated = transact(&*self.stores.areas, |areas| -> ServiceResult<WorkArea> {
            let mut updated = areas
                .get(&id)
                .cloned()
                .ok_or_else(|| ServiceError::not_found::<WorkArea>(&id))?;
            let previous_name = updated.name.clone();
            updated.apply(patch.clone(), ctx.now)?;
            if updated.name != previous_name && area_name_in_use(areas.values(), &updated.name, Some(id)) {
                return Err(name_conflict(&updated.name));
            }
            areas.insert(id, updated.clone());
            Ok(updated)
        })?;
        info!(actor = %actor, area_id = %id, is_active = updated.is_active, "work area updated");
        Ok(updated)
    }

    /// Existing assignments to the area are kept as read-only context.
    pub fn deactivate_area(&self, ctx: &RequestContext, id: WorkAreaId) -> ServiceResult<WorkArea> {
        self.update_area(
            ctx,
            id,
            WorkAreaPatch {
                is_active: Some(false),
                ..Default::default()
            },
        )
    }

    pub fn get_area(&self, ctx: &RequestContext, id: WorkAreaId) -> ServiceResult<WorkArea> {
        let subject = self.subject(ctx);
        let area = self
            .registry
            .get_area(id)
            .ok_or_else(|| ServiceError::not_found::<WorkArea>(&id))?;
        self.authorize(subject.as_ref(), Action::Read, &Target::WorkArea)?;
        Ok(area)
    }

    /// Areas sorted by name; inactive ones only on request.
    pub fn list_areas(&self, ctx: &RequestContext, include_inactive: bool) -> ServiceResult<Vec<WorkArea>> {
        let subject = self.subject(ctx);
        self.authorize(subject.as_ref(), Action::Read, &Target::WorkArea)?;

        let mut areas: Vec<WorkArea> = self
            .registry
            .list()
            .into_iter()
            .filter(|a| include_inactive || a.is_active)
            .collect();
        areas.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(areas)
    }
}
