use core::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use volunteerdesk_core::{
    DeletionMarker, DomainError, DomainResult, Entity, FieldErrors, SoftDelete, TodoId, UserId,
    validate,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl TodoStatus {
    pub const ALL: [TodoStatus; 3] = [TodoStatus::Todo, TodoStatus::InProgress, TodoStatus::Done];

    pub fn as_str(&self) -> &'static str {
        match self {
            TodoStatus::Todo => "todo",
            TodoStatus::InProgress => "in_progress",
            TodoStatus::Done => "done",
        }
    }
}

impl FromStr for TodoStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TodoStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| DomainError::validation("status", format!("unknown status '{s}'")))
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: TodoId,
    pub title: String,
    pub description: String,
    pub status: TodoStatus,
    pub priority: Priority,
    pub assignee: Option<UserId>,
    pub created_by: Option<UserId>,
    /// Set on entering `done`, cleared on leaving it.
    pub completed_at: Option<DateTime<Utc>>,
    pub deletion: DeletionMarker,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTodo {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TodoStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub assignee: Option<UserId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TodoStatus>,
    pub priority: Option<Priority>,
    pub assignee: Option<Option<UserId>>,
}

impl Todo {
    pub fn create(input: NewTodo, created_by: UserId, now: DateTime<Utc>) -> DomainResult<Self> {
        let mut errors = FieldErrors::new();
        let title = validate::required(&mut errors, "title", &input.title);
        validate::max_len(&mut errors, "title", &title, 200);
        errors.into_result()?;

        let mut todo = Self {
            id: TodoId::new(),
            title,
            description: input.description.trim().to_string(),
            status: TodoStatus::Todo,
            priority: input.priority,
            assignee: input.assignee,
            created_by: Some(created_by),
            completed_at: None,
            deletion: DeletionMarker::default(),
            created_at: now,
            updated_at: now,
        };
        todo.set_status(input.status, now);
        Ok(todo)
    }

    pub fn apply(&mut self, patch: TodoPatch, now: DateTime<Utc>) -> DomainResult<()> {
        let mut errors = FieldErrors::new();
        let title = patch
            .title
            .as_deref()
            .map(|t| validate::required(&mut errors, "title", t));
        errors.into_result()?;

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description.trim().to_string();
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(assignee) = patch.assignee {
            self.assignee = assignee;
        }
        if let Some(status) = patch.status {
            self.set_status(status, now);
        }
        self.updated_at = now;
        Ok(())
    }

    /// Move to `status`, maintaining the completion timestamp.
    pub fn set_status(&mut self, status: TodoStatus, now: DateTime<Utc>) {
        match (self.status == TodoStatus::Done, status == TodoStatus::Done) {
            (false, true) => self.completed_at = Some(now),
            (true, false) => self.completed_at = None,
            _ => {}
        }
        self.status = status;
        self.updated_at = now;
    }

    pub fn is_done(&self) -> bool {
        self.status == TodoStatus::Done
    }

    /// Open and older than `window`.
    pub fn is_overdue(&self, now: DateTime<Utc>, window: Duration) -> bool {
        !self.is_done() && now - self.created_at > window
    }

    /// Null every reference to a purged user.
    pub fn forget_user(&mut self, user_id: UserId) {
        if self.assignee == Some(user_id) {
            self.assignee = None;
        }
        if self.created_by == Some(user_id) {
            self.created_by = None;
        }
        self.deletion.forget_actor(user_id);
    }
}

impl Entity for Todo {
    type Id = TodoId;
    const KIND: &'static str = "todo";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl SoftDelete for Todo {
    fn deletion(&self) -> &DeletionMarker {
        &self.deletion
    }

    fn deletion_mut(&mut self) -> &mut DeletionMarker {
        &mut self.deletion
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn todo(title: &str) -> Todo {
        Todo::create(
            NewTodo {
                title: title.to_string(),
                ..Default::default()
            },
            UserId::new(),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn blank_title_is_rejected() {
        let err = Todo::create(NewTodo::default(), UserId::new(), Utc::now()).unwrap_err();
        assert!(err.field_errors().unwrap().has("title"));
    }

    #[test]
    fn completion_timestamp_follows_done() {
        let mut t = todo("Rinnovo assicurazione");
        let now = Utc::now();

        t.set_status(TodoStatus::InProgress, now);
        assert_eq!(t.completed_at, None);

        t.set_status(TodoStatus::Done, now);
        assert_eq!(t.completed_at, Some(now));

        t.set_status(TodoStatus::Done, now + Duration::hours(1));
        assert_eq!(t.completed_at, Some(now));

        t.set_status(TodoStatus::Todo, now);
        assert_eq!(t.completed_at, None);
    }

    #[test]
    fn created_done_gets_a_completion_time() {
        let t = Todo::create(
            NewTodo {
                title: "Già fatto".to_string(),
                status: TodoStatus::Done,
                ..Default::default()
            },
            UserId::new(),
            Utc::now(),
        )
        .unwrap();
        assert!(t.completed_at.is_some());
    }

    #[test]
    fn overdue_after_window_unless_done() {
        let mut t = todo("Verbale assemblea");
        let later = t.created_at + Duration::days(8);
        assert!(t.is_overdue(later, Duration::days(7)));
        assert!(!t.is_overdue(t.created_at + Duration::days(6), Duration::days(7)));

        t.set_status(TodoStatus::Done, later);
        assert!(!t.is_overdue(later, Duration::days(7)));
    }

    #[test]
    fn forget_user_clears_references() {
        let mut t = todo("Chiamare fornitore");
        let user = UserId::new();
        t.assignee = Some(user);
        t.created_by = Some(user);
        t.soft_delete(Some(user), Utc::now());

        t.forget_user(user);
        assert_eq!(t.assignee, None);
        assert_eq!(t.created_by, None);
        assert_eq!(t.deletion.deleted_by(), None);
    }
}
