use serde::{Deserialize, Serialize};
use tracing::info;

use volunteerdesk_auth::{Action, Target, Visibility};
use volunteerdesk_core::{DeleteOutcome, DocumentId, RestoreOutcome};
use volunteerdesk_secretariat::{Document, DocumentCategory, DocumentPatch, NewDocument};

use super::{Mediator, RequestContext, read_action};
use crate::error::{ServiceError, ServiceResult};
use crate::read_model::SoftDeleteQueries;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentFilter {
    pub category: Option<DocumentCategory>,
    pub visibility: Option<Visibility>,
    pub include_deleted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryDocuments {
    pub category: DocumentCategory,
    pub documents: Vec<Document>,
}

impl Mediator {
    pub fn create_document(&self, ctx: &RequestContext, input: NewDocument) -> ServiceResult<Document> {
        let subject = self.subject(ctx);
        let actor = self.authorize(subject.as_ref(), Action::Create, &Target::document(input.visibility))?;

        let document = Document::create(input, actor, self.settings.document_max_bytes, ctx.now)?;

        self.stores.documents.upsert(document.id, document.clone())?;
        info!(
            actor = %actor,
            document_id = %document.id,
            visibility = document.visibility.as_str(),
            "document created"
        );
        Ok(document)
    }

    pub fn update_document(
        &self,
        ctx: &RequestContext,
        id: DocumentId,
        patch: DocumentPatch,
    ) -> ServiceResult<Document> {
        let subject = self.subject(ctx);
        let current = self
            .stores
            .documents
            .get_active(&id)
            .ok_or_else(|| ServiceError::not_found::<Document>(&id))?;
        let actor = self.authorize(subject.as_ref(), Action::Update, &Target::document(current.visibility))?;

        let max_bytes = self.settings.document_max_bytes;
        let updated = Self::update_live(
            &self.stores.documents,
            &id,
            |live| live.visibility == current.visibility,
            |record| Ok(record.apply(patch.clone(), max_bytes, ctx.now)?),
        )?;
        info!(actor = %actor, document_id = %id, "document updated");
        Ok(updated)
    }

    /// A document by id; hidden documents are reported as denied.
    pub fn get_document(&self, ctx: &RequestContext, id: DocumentId) -> ServiceResult<Document> {
        let subject = self.subject(ctx);
        let document = self
            .stores
            .documents
            .get(&id)
            .ok_or_else(|| ServiceError::not_found::<Document>(&id))?;
        self.authorize(
            subject.as_ref(),
            read_action(&document),
            &Target::document(document.visibility),
        )?;
        Ok(document)
    }

    /// Documents visible to the caller, newest first.
    pub fn list_documents(&self, ctx: &RequestContext, filter: &DocumentFilter) -> ServiceResult<Vec<Document>> {
        let subject = self.subject(ctx);
        self.authorize(subject.as_ref(), Action::Read, &Target::documents())?;

        let policy = self.policy();
        let records = if filter.include_deleted {
            self.stores.documents.find_all()
        } else {
            self.stores.documents.find_active()
        };
        let mut documents: Vec<Document> = records
            .into_iter()
            .filter(|d| filter.category.is_none_or(|c| c == d.category))
            .filter(|d| filter.visibility.is_none_or(|v| v == d.visibility))
            .filter(|d| {
                policy
                    .evaluate(subject.as_ref(), read_action(d), &Target::document(d.visibility))
                    .is_allowed()
            })
            .collect();
        documents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(documents)
    }

    /// Visible documents grouped by category; empty categories are omitted.
    pub fn documents_by_category(&self, ctx: &RequestContext) -> ServiceResult<Vec<CategoryDocuments>> {
        let documents = self.list_documents(ctx, &DocumentFilter::default())?;
        Ok(DocumentCategory::ALL
            .into_iter()
            .map(|category| CategoryDocuments {
                category,
                documents: documents
                    .iter()
                    .filter(|d| d.category == category)
                    .cloned()
                    .collect(),
            })
            .filter(|group| !group.documents.is_empty())
            .collect())
    }

    pub fn recent_documents(&self, ctx: &RequestContext, limit: usize) -> ServiceResult<Vec<Document>> {
        let mut documents = self.list_documents(ctx, &DocumentFilter::default())?;
        documents.truncate(limit);
        Ok(documents)
    }

    pub fn delete_document(&self, ctx: &RequestContext, id: DocumentId) -> ServiceResult<DeleteOutcome> {
        let subject = self.subject(ctx);
        let document = self
            .stores
            .documents
            .get(&id)
            .ok_or_else(|| ServiceError::not_found::<Document>(&id))?;
        let actor = self.authorize(subject.as_ref(), Action::Delete, &Target::document(document.visibility))?;

        let outcome = Self::soft_delete_in(&self.stores.documents, &id, actor, ctx.now)?;
        info!(actor = %actor, document_id = %id, outcome = ?outcome, "document soft-deleted");
        Ok(outcome)
    }

    pub fn restore_document(&self, ctx: &RequestContext, id: DocumentId) -> ServiceResult<RestoreOutcome> {
        let subject = self.subject(ctx);
        let document = self
            .stores
            .documents
            .get(&id)
            .ok_or_else(|| ServiceError::not_found::<Document>(&id))?;
        let actor = self.authorize(subject.as_ref(), Action::Restore, &Target::document(document.visibility))?;

        let outcome = Self::restore_in(&self.stores.documents, &id)?;
        info!(actor = %actor, document_id = %id, outcome = ?outcome, "document restored");
        Ok(outcome)
    }
}
