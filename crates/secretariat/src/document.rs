//! Document library metadata. File bytes live in external storage.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use volunteerdesk_auth::Visibility;
use volunteerdesk_core::{
    DeletionMarker, DocumentId, DomainError, DomainResult, Entity, FieldErrors, SoftDelete,
    UserId, validate,
};

pub const ALLOWED_EXTENSIONS: [&str; 11] = [
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "txt", "jpg", "jpeg", "png",
];

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    Organigramma,
    Guida,
    Modulo,
    Regolamento,
    Verbale,
    #[default]
    Altro,
}

impl DocumentCategory {
    pub const ALL: [DocumentCategory; 6] = [
        DocumentCategory::Organigramma,
        DocumentCategory::Guida,
        DocumentCategory::Modulo,
        DocumentCategory::Regolamento,
        DocumentCategory::Verbale,
        DocumentCategory::Altro,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentCategory::Organigramma => "organigramma",
            DocumentCategory::Guida => "guida",
            DocumentCategory::Modulo => "modulo",
            DocumentCategory::Regolamento => "regolamento",
            DocumentCategory::Verbale => "verbale",
            DocumentCategory::Altro => "altro",
        }
    }
}

impl FromStr for DocumentCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| DomainError::validation("category", format!("unknown category '{s}'")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    pub description: String,
    pub file_name: String,
    pub size_bytes: u64,
    pub category: DocumentCategory,
    pub visibility: Visibility,
    pub uploaded_by: Option<UserId>,
    pub deletion: DeletionMarker,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewDocument {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub file_name: String,
    pub size_bytes: u64,
    #[serde(default)]
    pub category: DocumentCategory,
    #[serde(default)]
    pub visibility: Visibility,
}

/// Partial update. A replacement file sets both `file_name` and `size_bytes`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub file_name: Option<String>,
    pub size_bytes: Option<u64>,
    pub category: Option<DocumentCategory>,
    pub visibility: Option<Visibility>,
}

fn check_file(errors: &mut FieldErrors, file_name: &str, size_bytes: u64, max_bytes: u64) {
    match extension(file_name) {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => {}
        _ => errors.push(
            "file",
            format!("extension not allowed; use one of {}", ALLOWED_EXTENSIONS.join(", ")),
        ),
    }
    if size_bytes > max_bytes {
        errors.push(
            "file",
            format!("file is too large (max {:.0} MB)", max_bytes as f64 / (1024.0 * 1024.0)),
        );
    }
}

fn extension(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    (!stem.is_empty() && !ext.is_empty()).then(|| ext.to_ascii_lowercase())
}

impl Document {
    pub fn create(
        input: NewDocument,
        uploaded_by: UserId,
        max_bytes: u64,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let mut errors = FieldErrors::new();
        let title = validate::required(&mut errors, "title", &input.title);
        validate::max_len(&mut errors, "title", &title, 200);
        let file_name = input.file_name.trim().to_string();
        check_file(&mut errors, &file_name, input.size_bytes, max_bytes);
        errors.into_result()?;

        Ok(Self {
            id: DocumentId::new(),
            title,
            description: input.description.trim().to_string(),
            file_name,
            size_bytes: input.size_bytes,
            category: input.category,
            visibility: input.visibility,
            uploaded_by: Some(uploaded_by),
            deletion: DeletionMarker::default(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply(&mut self, patch: DocumentPatch, max_bytes: u64, now: DateTime<Utc>) -> DomainResult<()> {
        let mut errors = FieldErrors::new();
        let title = patch
            .title
            .as_deref()
            .map(|t| validate::required(&mut errors, "title", t));
        let file_name = patch
            .file_name
            .as_deref()
            .map(str::trim)
            .unwrap_or(self.file_name.as_str())
            .to_string();
        let size_bytes = patch.size_bytes.unwrap_or(self.size_bytes);
        if patch.file_name.is_some() || patch.size_bytes.is_some() {
            check_file(&mut errors, &file_name, size_bytes, max_bytes);
        }
        errors.into_result()?;

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description.trim().to_string();
        }
        self.file_name = file_name;
        self.size_bytes = size_bytes;
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(visibility) = patch.visibility {
            self.visibility = visibility;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Lowercase extension without the dot.
    pub fn file_extension(&self) -> Option<String> {
        extension(&self.file_name)
    }

    /// Size in MiB, rounded to two decimals.
    pub fn file_size_mb(&self) -> f64 {
        (self.size_bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0
    }

    pub fn forget_user(&mut self, user_id: UserId) {
        if self.uploaded_by == Some(user_id) {
            self.uploaded_by = None;
        }
        self.deletion.forget_actor(user_id);
    }
}

impl Entity for Document {
    type Id = DocumentId;
    const KIND: &'static str = "document";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl SoftDelete for Document {
    fn deletion(&self) -> &DeletionMarker {
        &self.deletion
    }

    fn deletion_mut(&mut self) -> &mut DeletionMarker {
        &mut self.deletion
    }
}
