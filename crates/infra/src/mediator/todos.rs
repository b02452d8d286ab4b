use serde::{Deserialize, Serialize};
use tracing::info;

use volunteerdesk_auth::{Action, Target};
use volunteerdesk_core::{DeleteOutcome, RestoreOutcome, TodoId, UserId};
use volunteerdesk_secretariat::{NewTodo, Priority, Todo, TodoBoard, TodoPatch, TodoStats, TodoStatus};

use super::{Mediator, RequestContext, read_action};
use crate::error::{ServiceError, ServiceResult};
use crate::read_model::SoftDeleteQueries;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TodoFilter {
    pub status: Option<TodoStatus>,
    pub priority: Option<Priority>,
    pub assignee: Option<UserId>,
    pub include_deleted: bool,
}

impl TodoFilter {
    fn matches(&self, todo: &Todo) -> bool {
        self.status.is_none_or(|s| s == todo.status)
            && self.priority.is_none_or(|p| p == todo.priority)
            && self.assignee.is_none_or(|a| todo.assignee == Some(a))
    }
}

impl Mediator {
    pub fn create_todo(&self, ctx: &RequestContext, input: NewTodo) -> ServiceResult<Todo> {
        let subject = self.subject(ctx);
        let actor = self.authorize(subject.as_ref(), Action::Create, &Target::Todo)?;

        if let Some(assignee) = input.assignee {
            self.check_assignee(assignee)?;
        }
        let todo = Todo::create(input, actor, ctx.now)?;

        self.stores.todos.upsert(todo.id, todo.clone())?;
        info!(actor = %actor, todo_id = %todo.id, "todo created");
        Ok(todo)
    }

    pub fn update_todo(&self, ctx: &RequestContext, id: TodoId, patch: TodoPatch) -> ServiceResult<Todo> {
        let subject = self.subject(ctx);
        let current = self
            .stores
            .todos
            .get_active(&id)
            .ok_or_else(|| ServiceError::not_found::<Todo>(&id))?;
        let actor = self.authorize(subject.as_ref(), Action::Update, &Target::Todo)?;

        if let Some(Some(assignee)) = patch.assignee {
            if current.assignee != Some(assignee) {
                self.check_assignee(assignee)?;
            }
        }
        let updated = Self::update_live(
            &self.stores.todos,
            &id,
            |_| true,
            |record| Ok(record.apply(patch.clone(), ctx.now)?),
        )?;
        info!(actor = %actor, todo_id = %id, status = updated.status.as_str(), "todo updated");
        Ok(updated)
    }

    pub fn mark_todo_done(&self, ctx: &RequestContext, id: TodoId) -> ServiceResult<Todo> {
        self.update_todo(
            ctx,
            id,
            TodoPatch {
                status: Some(TodoStatus::Done),
                ..Default::default()
            },
        )
    }

    pub fn get_todo(&self, ctx: &RequestContext, id: TodoId) -> ServiceResult<Todo> {
        let subject = self.subject(ctx);
        let todo = self
            .stores
            .todos
            .get(&id)
            .ok_or_else(|| ServiceError::not_found::<Todo>(&id))?;
        self.authorize(subject.as_ref(), read_action(&todo), &Target::Todo)?;
        Ok(todo)
    }

    /// Todos by priority (high first), then oldest first. Deleted todos are
    /// listed on request to callers allowed `read_deleted`, and dropped for
    /// everyone else.
    pub fn list_todos(&self, ctx: &RequestContext, filter: &TodoFilter) -> ServiceResult<Vec<Todo>> {
        let subject = self.subject(ctx);
        self.authorize(subject.as_ref(), Action::Read, &Target::Todo)?;

        let policy = self.policy();
        let records = if filter.include_deleted {
            self.stores.todos.find_all()
        } else {
            self.stores.todos.find_active()
        };
        let mut todos: Vec<Todo> = records
            .into_iter()
            .filter(|t| filter.matches(t))
            .filter(|t| {
                policy
                    .evaluate(subject.as_ref(), read_action(t), &Target::Todo)
                    .is_allowed()
            })
            .collect();
        todos.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.created_at.cmp(&b.created_at)));
        Ok(todos)
    }

    pub fn todo_board(&self, ctx: &RequestContext) -> ServiceResult<TodoBoard> {
        let todos = self.list_todos(ctx, &TodoFilter::default())?;
        Ok(TodoBoard::from_todos(todos))
    }

    /// Todos assigned to the caller.
    pub fn my_todos(&self, ctx: &RequestContext) -> ServiceResult<Vec<Todo>> {
        let subject = self.subject(ctx);
        let actor = self.authorize(subject.as_ref(), Action::Read, &Target::Todo)?;
        self.list_todos(
            ctx,
            &TodoFilter {
                assignee: Some(actor),
                ..Default::default()
            },
        )
    }

    pub fn todo_stats(&self, ctx: &RequestContext) -> ServiceResult<TodoStats> {
        let todos = self.list_todos(ctx, &TodoFilter::default())?;
        Ok(TodoStats::compute(&todos, ctx.now, self.settings.todo_overdue_window()))
    }

    pub fn delete_todo(&self, ctx: &RequestContext, id: TodoId) -> ServiceResult<DeleteOutcome> {
        let subject = self.subject(ctx);
        if self.stores.todos.get(&id).is_none() {
            return Err(ServiceError::not_found::<Todo>(&id));
        }
        let actor = self.authorize(subject.as_ref(), Action::Delete, &Target::Todo)?;

        let outcome = Self::soft_delete_in(&self.stores.todos, &id, actor, ctx.now)?;
        info!(actor = %actor, todo_id = %id, outcome = ?outcome, "todo soft-deleted");
        Ok(outcome)
    }

    pub fn restore_todo(&self, ctx: &RequestContext, id: TodoId) -> ServiceResult<RestoreOutcome> {
        let subject = self.subject(ctx);
        if self.stores.todos.get(&id).is_none() {
            return Err(ServiceError::not_found::<Todo>(&id));
        }
        let actor = self.authorize(subject.as_ref(), Action::Restore, &Target::Todo)?;

        let outcome = Self::restore_in(&self.stores.todos, &id)?;
        info!(actor = %actor, todo_id = %id, outcome = ?outcome, "todo restored");
        Ok(outcome)
    }

    /// Assignees must be live, active accounts.
    fn check_assignee(&self, id: UserId) -> ServiceResult<()> {
        match self.identity.get_user(id) {
            Some(user) if user.can_authenticate() => Ok(()),
            Some(_) => Err(ServiceError::validation("assignee", "user is inactive")),
            None => Err(ServiceError::validation("assignee", format!("user {id} not found"))),
        }
    }
}
