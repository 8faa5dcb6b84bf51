//! Recurrence scheduling: successor tasks for completed recurring tasks.

use chrono::{DateTime, Days, Months, NaiveDate, Utc};

use crate::model::{Recurrence, Status, StatusChange, Task, TaskId};

/// Advance `due` by one recurrence period.
///
/// Monthly steps clamp to the last valid day of the target month, so
/// 2024-01-31 becomes 2024-02-29.
pub fn next_due_date(due: NaiveDate, recurrence: Recurrence) -> Option<NaiveDate> {
    match recurrence {
        Recurrence::None => None,
        Recurrence::Daily => due.checked_add_days(Days::new(1)),
        Recurrence::Weekly => due.checked_add_days(Days::new(7)),
        Recurrence::Monthly => due.checked_add_months(Months::new(1)),
    }
}

/// True when `change` on `task` should spawn a successor.
pub fn should_spawn(task: &Task, change: &StatusChange) -> bool {
    change.entered_done() && task.recurrence.is_recurring() && task.due_date.is_some()
}

/// Build the successor of a just-completed recurring task.
///
/// `todo_max_position` is the largest position currently in the todo group.
pub fn successor(
    source: &Task,
    todo_max_position: Option<i64>,
    now: DateTime<Utc>,
) -> Option<Task> {
    let due = source.due_date?;
    let next_due = next_due_date(due, source.recurrence)?;
    Some(Task {
        id: TaskId::generate(),
        title: source.title.clone(),
        description: source.description.clone(),
        status: Status::Todo,
        priority: source.priority,
        assignee: source.assignee.clone(),
        due_date: Some(next_due),
        tags: source.tags.clone(),
        recurrence: source.recurrence,
        position: todo_max_position.map(|max| max + 1).unwrap_or(0),
        created_at: now,
        updated_at: now,
        completed_at: None,
    })
}
