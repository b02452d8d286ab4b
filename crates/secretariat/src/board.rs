//! Todo board views and statistics.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::{Priority, Todo, TodoStatus};

/// Todos grouped by status column, highest priority first, then oldest first.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TodoBoard {
    pub todo: Vec<Todo>,
    pub in_progress: Vec<Todo>,
    pub done: Vec<Todo>,
}

impl TodoBoard {
    pub fn from_todos(todos: impl IntoIterator<Item = Todo>) -> Self {
        let mut board = Self::default();
        for todo in todos {
            match todo.status {
                TodoStatus::Todo => board.todo.push(todo),
                TodoStatus::InProgress => board.in_progress.push(todo),
                TodoStatus::Done => board.done.push(todo),
            }
        }
        for column in [&mut board.todo, &mut board.in_progress, &mut board.done] {
            column.sort_by(|a, b| {
                b.priority
                    .cmp(&a.priority)
                    .then(a.created_at.cmp(&b.created_at))
            });
        }
        board
    }

    pub fn len(&self) -> usize {
        self.todo.len() + self.in_progress.len() + self.done.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TodoStats {
    pub total: usize,
    pub todo: usize,
    pub in_progress: usize,
    pub done: usize,
    /// Not done and high priority.
    pub high_priority_open: usize,
    pub overdue: usize,
}

impl TodoStats {
    pub fn compute<'a>(
        todos: impl IntoIterator<Item = &'a Todo>,
        now: DateTime<Utc>,
        overdue_window: Duration,
    ) -> Self {
        todos.into_iter().fold(Self::default(), |mut stats, todo| {
            stats.total += 1;
            match todo.status {
                TodoStatus::Todo => stats.todo += 1,
                TodoStatus::InProgress => stats.in_progress += 1,
                TodoStatus::Done => stats.done += 1,
            }
            if !todo.is_done() && todo.priority == Priority::High {
                stats.high_priority_open += 1;
            }
            if todo.is_overdue(now, overdue_window) {
                stats.overdue += 1;
            }
            stats
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NewTodo;
    use volunteerdesk_core::UserId;

    fn todo(title: &str, status: TodoStatus, priority: Priority, at: DateTime<Utc>) -> Todo {
        Todo::create(
            NewTodo {
                title: title.to_string(),
                status,
                priority,
                ..Default::default()
            },
            UserId::new(),
            at,
        )
        .unwrap()
    }

    #[test]
    fn board_groups_and_orders_columns() {
        let t0 = Utc::now();
        let todos = vec![
            todo("low", TodoStatus::Todo, Priority::Low, t0),
            todo("high-late", TodoStatus::Todo, Priority::High, t0 + Duration::minutes(2)),
            todo("high-early", TodoStatus::Todo, Priority::High, t0 + Duration::minutes(1)),
            todo("doing", TodoStatus::InProgress, Priority::Medium, t0),
            todo("done", TodoStatus::Done, Priority::Low, t0),
        ];

        let board = TodoBoard::from_todos(todos);
        let titles: Vec<&str> = board.todo.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["high-early", "high-late", "low"]);
        assert_eq!(board.in_progress.len(), 1);
        assert_eq!(board.done.len(), 1);
        assert_eq!(board.len(), 5);
    }

    #[test]
    fn stats_count_open_high_priority_and_overdue() {
        let old = Utc::now() - Duration::days(10);
        let todos = vec![
            todo("a", TodoStatus::Todo, Priority::High, old),
            todo("b", TodoStatus::Done, Priority::High, old),
            todo("c", TodoStatus::InProgress, Priority::Low, Utc::now()),
        ];

        let stats = TodoStats::compute(&todos, Utc::now(), Duration::days(7));
        assert_eq!(
            stats,
            TodoStats {
                total: 3,
                todo: 1,
                in_progress: 1,
                done: 1,
                high_priority_open: 1,
                overdue: 1,
            }
        );
    }
}
