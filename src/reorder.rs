//! Position reconciliation for drag-and-drop moves.
//!
//! The reconciler only computes what changes; the caller applies the plan to
//! the store and writes every touched task to the backend.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{Status, StatusChange, Task, TaskId};
use crate::store::{column_of, TaskStore};

/// Where a dragged card was released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTarget {
    /// Onto a column body: append to that status group.
    Column(Status),
    /// Onto another card: take its slot.
    Task(TaskId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionUpdate {
    pub id: TaskId,
    pub position: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovePlan {
    pub task_id: TaskId,
    pub from: Status,
    pub to: Status,
    /// Every task whose position differs from its prior value.
    pub positions: Vec<PositionUpdate>,
}

impl MovePlan {
    pub fn status_changed(&self) -> bool {
        self.from != self.to
    }

    /// Apply the plan to the store. Touched tasks get `updated_at = now`;
    /// the dragged task goes through [`Task::set_status`].
    pub fn apply(&self, store: &mut TaskStore, now: DateTime<Utc>) -> (Vec<Task>, StatusChange) {
        let mut touched = Vec::new();
        let mut change = StatusChange {
            from: self.from,
            to: self.from,
        };

        if self.status_changed() && !self.positions.iter().any(|update| update.id == self.task_id) {
            if let Some(mut task) = store.get(&self.task_id).cloned() {
                change = task.set_status(self.to, now);
                task.updated_at = now;
                store.upsert(task.clone());
                touched.push(task);
            }
        }

        for update in &self.positions {
            let Some(mut task) = store.get(&update.id).cloned() else {
                continue;
            };
            task.position = update.position;
            if update.id == self.task_id {
                change = task.set_status(self.to, now);
            }
            task.updated_at = now;
            store.upsert(task.clone());
            touched.push(task);
        }

        (touched, change)
    }
}

/// Compute the writes for dropping `dragged` onto `target`.
///
/// Returns `Ok(None)` when nothing changes, including a card dropped onto
/// itself.
pub fn plan_move(tasks: &[Task], dragged: &TaskId, target: &DropTarget) -> Result<Option<MovePlan>> {
    let moving = tasks
        .iter()
        .find(|task| &task.id == dragged)
        .ok_or_else(|| Error::TaskNotFound(dragged.to_string()))?;

    match target {
        DropTarget::Column(status) => Ok(append_to_column(tasks, moving, *status)),
        DropTarget::Task(target_id) if target_id == dragged => Ok(None),
        DropTarget::Task(target_id) => {
            let target = tasks
                .iter()
                .find(|task| &task.id == target_id)
                .ok_or_else(|| Error::TaskNotFound(target_id.to_string()))?;
            if target.status == moving.status {
                Ok(reorder_within_group(tasks, moving, target))
            } else {
                Ok(Some(insert_into_group(moving, target)))
            }
        }
    }
}

fn append_to_column(tasks: &[Task], moving: &Task, status: Status) -> Option<MovePlan> {
    let position = tasks
        .iter()
        .filter(|task| task.status == status && task.id != moving.id)
        .map(|task| task.position)
        .max()
        .map(|max| max + 1)
        .unwrap_or(0);

    if moving.status == status && moving.position == position {
        return None;
    }

    Some(MovePlan {
        task_id: moving.id.clone(),
        from: moving.status,
        to: status,
        positions: vec![PositionUpdate {
            id: moving.id.clone(),
            position,
        }],
    })
}

/// The dragged card shares the target's position slot; ties sort by store
/// insertion order, so it lands next to the target.
fn insert_into_group(moving: &Task, target: &Task) -> MovePlan {
    MovePlan {
        task_id: moving.id.clone(),
        from: moving.status,
        to: target.status,
        positions: vec![PositionUpdate {
            id: moving.id.clone(),
            position: target.position,
        }],
    }
}

fn reorder_within_group(tasks: &[Task], moving: &Task, target: &Task) -> Option<MovePlan> {
    let mut column = column_of(tasks, moving.status);
    let from = column.iter().position(|task| task.id == moving.id)?;
    let to = column.iter().position(|task| task.id == target.id)?;

    let dragged = column.remove(from);
    column.insert(to, dragged);

    let positions: Vec<PositionUpdate> = column
        .iter()
        .enumerate()
        .filter(|(index, task)| task.position != *index as i64)
        .map(|(index, task)| PositionUpdate {
            id: task.id.clone(),
            position: index as i64,
        })
        .collect();

    if positions.is_empty() {
        return None;
    }

    Some(MovePlan {
        task_id: moving.id.clone(),
        from: moving.status,
        to: moving.status,
        positions,
    })
}
