//! `volunteerdesk-secretariat`: to-do board and document library.
//!
//! Neither record is area-scoped: todos are writable by any admin, documents
//! by secretariat admins, with per-document read visibility.

pub mod board;
pub mod document;
pub mod todo;

pub use board::{TodoBoard, TodoStats};
pub use document::{
    ALLOWED_EXTENSIONS, Document, DocumentCategory, DocumentPatch, NewDocument,
};
pub use todo::{NewTodo, Priority, Todo, TodoPatch, TodoStatus};
pub use volunteerdesk_auth::Visibility;
