//! In-memory task store backing the board views.
//!
//! The store is the single source of truth for rendering. Every mutation
//! notifies the registered observers synchronously, in registration order.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{Assignee, Status, Tag, Task, TaskId};

/// What changed in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    Replaced { count: usize },
    Upserted(TaskId),
    Removed(TaskId),
}

pub type Observer = Box<dyn FnMut(&StoreChange) + Send>;

/// Assignee and tag filters; `None` means "all".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub assignee: Option<Assignee>,
    pub tag: Option<Tag>,
}

impl TaskFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn matches(&self, task: &Task) -> bool {
        let assignee_ok = self
            .assignee
            .as_ref()
            .map(|assignee| &task.assignee == assignee)
            .unwrap_or(true);
        let tag_ok = self.tag.as_ref().map(|tag| task.has_tag(tag)).unwrap_or(true);
        assignee_ok && tag_ok
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BoardCounts {
    pub total: usize,
    pub completed: usize,
    pub due_today: usize,
}

/// Tasks grouped into the three board columns, each sorted by position.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BoardColumns {
    pub todo: Vec<Task>,
    pub in_progress: Vec<Task>,
    pub done: Vec<Task>,
}

impl BoardColumns {
    pub fn column(&self, status: Status) -> &[Task] {
        match status {
            Status::Todo => &self.todo,
            Status::InProgress => &self.in_progress,
            Status::Done => &self.done,
        }
    }

    fn column_mut(&mut self, status: Status) -> &mut Vec<Task> {
        match status {
            Status::Todo => &mut self.todo,
            Status::InProgress => &mut self.in_progress,
            Status::Done => &mut self.done,
        }
    }
}

#[derive(Default)]
pub struct TaskStore {
    tasks: Vec<Task>,
    observers: Vec<Observer>,
}

impl fmt::Debug for TaskStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskStore")
            .field("tasks", &self.tasks)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            observers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, observer: Observer) {
        self.observers.push(observer);
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| &task.id == id)
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.get(id).is_some()
    }

    /// Swap in a complete list (initial load, manual refresh).
    pub fn replace_all(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
        let change = StoreChange::Replaced {
            count: self.tasks.len(),
        };
        self.notify(&change);
    }

    /// Replace the task with the same id in place, or append it.
    pub fn upsert(&mut self, task: Task) {
        let id = task.id.clone();
        match self.tasks.iter_mut().find(|existing| existing.id == id) {
            Some(existing) => *existing = task,
            None => self.tasks.push(task),
        }
        self.notify(&StoreChange::Upserted(id));
    }

    /// Remove a task by id; absence is not an error.
    pub fn remove(&mut self, id: &TaskId) -> Option<Task> {
        let index = self.tasks.iter().position(|task| &task.id == id)?;
        let removed = self.tasks.remove(index);
        self.notify(&StoreChange::Removed(id.clone()));
        Some(removed)
    }

    /// Resolve an exact id or a unique, case-insensitive id prefix.
    pub fn resolve_id(&self, input: &str) -> Result<TaskId> {
        let needle = input.trim().to_ascii_lowercase();
        if needle.is_empty() {
            return Err(Error::InvalidArgument("task id cannot be empty".to_string()));
        }

        if let Some(task) = self
            .tasks
            .iter()
            .find(|task| task.id.as_str().eq_ignore_ascii_case(&needle))
        {
            return Ok(task.id.clone());
        }

        let mut matches: Vec<&TaskId> = self
            .tasks
            .iter()
            .map(|task| &task.id)
            .filter(|id| id.as_str().to_ascii_lowercase().starts_with(&needle))
            .collect();
        matches.sort();
        matches.dedup();
        match matches.as_slice() {
            [] => Err(Error::TaskNotFound(input.trim().to_string())),
            [only] => Ok((*only).clone()),
            many => Err(Error::InvalidArgument(format!(
                "ambiguous task id '{}': {}",
                input.trim(),
                many.iter()
                    .map(|id| id.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
        }
    }

    /// Members of one status group in display order.
    pub fn column(&self, status: Status) -> Vec<&Task> {
        column_of(&self.tasks, status)
    }

    pub fn max_position(&self, status: Status) -> Option<i64> {
        self.tasks
            .iter()
            .filter(|task| task.status == status)
            .map(|task| task.position)
            .max()
    }

    /// Position for a task appended to `status`.
    pub fn next_position(&self, status: Status) -> i64 {
        self.max_position(status).map(|max| max + 1).unwrap_or(0)
    }

    pub fn filtered(&self, filter: &TaskFilter) -> Vec<&Task> {
        self.tasks.iter().filter(|task| filter.matches(task)).collect()
    }

    pub fn grouped_by_status(&self, filter: &TaskFilter) -> BoardColumns {
        let mut columns = BoardColumns::default();
        for task in self.tasks.iter().filter(|task| filter.matches(task)) {
            columns.column_mut(task.status).push(task.clone());
        }
        for status in Status::ALL {
            columns
                .column_mut(status)
                .sort_by_key(|task| task.position);
        }
        columns
    }

    /// Counts over the filtered subset; `due_today` excludes done tasks.
    pub fn counts(&self, filter: &TaskFilter, today: NaiveDate) -> BoardCounts {
        let subset = self.filtered(filter);
        BoardCounts {
            total: subset.len(),
            completed: subset.iter().filter(|task| task.status.is_done()).count(),
            due_today: subset
                .iter()
                .filter(|task| !task.status.is_done() && task.is_due_on(today))
                .count(),
        }
    }

    fn notify(&mut self, change: &StoreChange) {
        for observer in self.observers.iter_mut() {
            observer(change);
        }
    }
}

/// Stable-sorted members of one status group.
pub fn column_of(tasks: &[Task], status: Status) -> Vec<&Task> {
    let mut column: Vec<&Task> = tasks.iter().filter(|task| task.status == status).collect();
    column.sort_by_key(|task| task.position);
    column
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BoardConfig;
    use crate::model::TaskDraft;
    use chrono::Utc;
    use std::sync::{Arc, Mutex};

    fn task(id: &str, status: Status, position: i64, tags: &[&str]) -> Task {
        let mut draft = TaskDraft::quick(format!("task {id}"), status, &BoardConfig::default());
        draft.tags = tags.iter().map(|tag| Tag::new(*tag)).collect();
        draft.into_task(TaskId::from(id), position, Utc::now())
    }

    #[test]
    fn tag_filter_matches_sets_containing_tag() {
        let store = TaskStore::with_tasks(vec![
            task("a", Status::Todo, 0, &["A"]),
            task("b", Status::Todo, 1, &["B"]),
            task("ab", Status::Todo, 2, &["A", "B"]),
            task("none", Status::Todo, 3, &[]),
        ]);

        let only_a = TaskFilter {
            assignee: None,
            tag: Some(Tag::new("A")),
        };
        let ids: Vec<&str> = store.filtered(&only_a).iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "ab"]);
        assert_eq!(store.filtered(&TaskFilter::all()).len(), 4);
    }

    #[test]
    fn columns_are_sorted_stably_by_position() {
        let store = TaskStore::with_tasks(vec![
            task("late", Status::Todo, 5, &[]),
            task("tie-1", Status::Todo, 1, &[]),
            task("tie-2", Status::Todo, 1, &[]),
            task("doing", Status::InProgress, 0, &[]),
        ]);
        let columns = store.grouped_by_status(&TaskFilter::all());
        let ids: Vec<&str> = columns.todo.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["tie-1", "tie-2", "late"]);
        assert_eq!(columns.column(Status::InProgress).len(), 1);
        assert!(columns.done.is_empty());
    }

    #[test]
    fn counts_cover_total_completed_and_due_today() {
        let today = Utc::now().date_naive();
        let mut due = task("due", Status::Todo, 0, &["A"]);
        due.due_date = Some(today);
        let mut due_done = task("due-done", Status::Done, 0, &[]);
        due_done.due_date = Some(today);
        let store = TaskStore::with_tasks(vec![
            due,
            due_done,
            task("d2", Status::Done, 1, &["A"]),
            task("p", Status::InProgress, 0, &[]),
            task("t", Status::Todo, 1, &[]),
        ]);

        let counts = store.counts(&TaskFilter::all(), today);
        assert_eq!(
            counts,
            BoardCounts {
                total: 5,
                completed: 2,
                due_today: 1
            }
        );

        let tagged = TaskFilter {
            assignee: None,
            tag: Some(Tag::new("A")),
        };
        let counts = store.counts(&tagged, today);
        assert_eq!((counts.completed, counts.total), (1, 2));
    }

    #[test]
    fn observers_see_every_mutation() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut store = TaskStore::new();
        store.subscribe(Box::new(move |change| {
            sink.lock().unwrap().push(change.clone());
        }));

        store.replace_all(vec![task("a", Status::Todo, 0, &[])]);
        store.upsert(task("b", Status::Todo, 1, &[]));
        store.remove(&TaskId::from("a"));
        store.remove(&TaskId::from("missing"));

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                StoreChange::Replaced { count: 1 },
                StoreChange::Upserted(TaskId::from("b")),
                StoreChange::Removed(TaskId::from("a")),
            ]
        );
    }

    #[test]
    fn upsert_replaces_in_place() {
        let mut store = TaskStore::with_tasks(vec![
            task("a", Status::Todo, 0, &[]),
            task("b", Status::Todo, 1, &[]),
        ]);
        let mut changed = task("a", Status::Done, 9, &[]);
        changed.title = "renamed".to_string();
        store.upsert(changed);
        assert_eq!(store.len(), 2);
        assert_eq!(store.tasks()[0].title, "renamed");
    }

    #[test]
    fn resolve_id_accepts_unique_prefix() {
        let store = TaskStore::with_tasks(vec![
            task("01abc", Status::Todo, 0, &[]),
            task("01abd", Status::Todo, 1, &[]),
            task("02xyz", Status::Todo, 2, &[]),
        ]);
        assert_eq!(store.resolve_id("02").unwrap(), TaskId::from("02xyz"));
        assert_eq!(store.resolve_id("01ABC").unwrap(), TaskId::from("01abc"));
        assert!(matches!(
            store.resolve_id("01ab"),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(store.resolve_id("zz"), Err(Error::TaskNotFound(_))));
    }

    #[test]
    fn next_position_starts_at_zero() {
        let store = TaskStore::with_tasks(vec![task("a", Status::Todo, 4, &[])]);
        assert_eq!(store.next_position(Status::Todo), 5);
        assert_eq!(store.next_position(Status::Done), 0);
    }
}
