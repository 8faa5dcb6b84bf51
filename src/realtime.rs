//! Merging realtime change notifications into the local store.
//!
//! Notifications are applied one at a time in arrival order. Inserts and
//! deletes are idempotent by id presence; updates carrying the `updated_at`
//! the store already holds are echoes of local writes and are dropped.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{Status, Task, TaskId};
use crate::store::TaskStore;

/// A row change pushed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "record", rename_all = "snake_case")]
pub enum ChangeNotification {
    Insert(Task),
    Update(Task),
    Delete(TaskId),
}

impl ChangeNotification {
    pub fn task_id(&self) -> &TaskId {
        match self {
            ChangeNotification::Insert(task) | ChangeNotification::Update(task) => &task.id,
            ChangeNotification::Delete(id) => id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeOutcome {
    Inserted,
    DuplicateInsert,
    Replaced,
    EchoSuppressed,
    Removed,
    AbsentDelete,
}

impl MergeOutcome {
    pub fn changed_store(self) -> bool {
        matches!(
            self,
            MergeOutcome::Inserted | MergeOutcome::Replaced | MergeOutcome::Removed
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub outcome: MergeOutcome,
    /// The update moved the task into done from a known open status.
    pub celebrate: bool,
}

/// Last status observed per task, kept apart from the store so local and
/// remote transitions share one record and fire a celebration once.
#[derive(Debug, Clone, Default)]
pub struct StatusTracker {
    last: HashMap<TaskId, Status>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything and record the statuses of `tasks`.
    pub fn seed<'a>(&mut self, tasks: impl IntoIterator<Item = &'a Task>) {
        self.last.clear();
        for task in tasks {
            self.last.insert(task.id.clone(), task.status);
        }
    }

    /// Record `status` for `id`; true when this is a transition into done
    /// from a known open status.
    pub fn observe(&mut self, id: &TaskId, status: Status) -> bool {
        let previous = self.last.insert(id.clone(), status);
        matches!(previous, Some(prev) if !prev.is_done()) && status.is_done()
    }

    pub fn forget(&mut self, id: &TaskId) {
        self.last.remove(id);
    }

    pub fn last_status(&self, id: &TaskId) -> Option<Status> {
        self.last.get(id).copied()
    }
}

/// Apply one notification to the store.
pub fn merge(
    store: &mut TaskStore,
    tracker: &mut StatusTracker,
    notification: ChangeNotification,
) -> MergeReport {
    match notification {
        ChangeNotification::Insert(task) => {
            if store.contains(&task.id) {
                return report(MergeOutcome::DuplicateInsert);
            }
            tracker.observe(&task.id, task.status);
            store.upsert(task);
            report(MergeOutcome::Inserted)
        }
        ChangeNotification::Update(task) => {
            let outcome = match store.get(&task.id) {
                Some(local) if local.updated_at == task.updated_at => {
                    return report(MergeOutcome::EchoSuppressed);
                }
                Some(_) => MergeOutcome::Replaced,
                None => MergeOutcome::Inserted,
            };
            let celebrate = tracker.observe(&task.id, task.status);
            store.upsert(task);
            MergeReport { outcome, celebrate }
        }
        ChangeNotification::Delete(id) => {
            tracker.forget(&id);
            match store.remove(&id) {
                Some(_) => report(MergeOutcome::Removed),
                None => report(MergeOutcome::AbsentDelete),
            }
        }
    }
}

fn report(outcome: MergeOutcome) -> MergeReport {
    MergeReport {
        outcome,
        celebrate: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BoardConfig;
    use crate::model::TaskDraft;
    use chrono::{Duration, Utc};

    fn task(id: &str, status: Status) -> Task {
        TaskDraft::quick(format!("task {id}"), status, &BoardConfig::default()).into_task(
            TaskId::from(id),
            0,
            Utc::now(),
        )
    }

    fn setup(tasks: Vec<Task>) -> (TaskStore, StatusTracker) {
        let mut tracker = StatusTracker::new();
        tracker.seed(&tasks);
        (TaskStore::with_tasks(tasks), tracker)
    }

    #[test]
    fn insert_skips_known_ids() {
        let existing = task("a", Status::Todo);
        let (mut store, mut tracker) = setup(vec![existing.clone()]);

        let report = merge(&mut store, &mut tracker, ChangeNotification::Insert(existing));
        assert_eq!(report.outcome, MergeOutcome::DuplicateInsert);
        assert_eq!(store.len(), 1);

        let report = merge(&mut store, &mut tracker, ChangeNotification::Insert(task("b", Status::Todo)));
        assert_eq!(report.outcome, MergeOutcome::Inserted);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn update_with_same_timestamp_is_echo() {
        let local = task("a", Status::Todo);
        let (mut store, mut tracker) = setup(vec![local.clone()]);

        let mut echo = local.clone();
        echo.title = "stale intermediate".to_string();
        let report = merge(&mut store, &mut tracker, ChangeNotification::Update(echo));
        assert_eq!(report.outcome, MergeOutcome::EchoSuppressed);
        assert_eq!(store.get(&local.id).unwrap().title, local.title);
    }

    #[test]
    fn update_with_new_timestamp_replaces_wholesale() {
        let local = task("a", Status::Todo);
        let (mut store, mut tracker) = setup(vec![local.clone()]);

        let mut remote = local.clone();
        remote.title = "edited elsewhere".to_string();
        remote.position = 42;
        remote.updated_at = local.updated_at + Duration::seconds(5);
        let report = merge(&mut store, &mut tracker, ChangeNotification::Update(remote.clone()));
        assert_eq!(report.outcome, MergeOutcome::Replaced);
        assert_eq!(store.get(&local.id), Some(&remote));
    }

    #[test]
    fn duplicate_update_delivery_converges() {
        let local = task("a", Status::Todo);
        let (mut store, mut tracker) = setup(vec![local.clone()]);
        let mut remote = local.clone();
        remote.updated_at = local.updated_at + Duration::seconds(1);
        remote.title = "once".to_string();

        merge(&mut store, &mut tracker, ChangeNotification::Update(remote.clone()));
        let after_once = store.tasks().to_vec();
        let second = merge(&mut store, &mut tracker, ChangeNotification::Update(remote));
        assert_eq!(second.outcome, MergeOutcome::EchoSuppressed);
        assert_eq!(store.tasks(), after_once.as_slice());
    }

    #[test]
    fn delete_is_idempotent() {
        let (mut store, mut tracker) = setup(vec![task("a", Status::Todo)]);
        let first = merge(&mut store, &mut tracker, ChangeNotification::Delete(TaskId::from("a")));
        let second = merge(&mut store, &mut tracker, ChangeNotification::Delete(TaskId::from("a")));
        assert_eq!(first.outcome, MergeOutcome::Removed);
        assert_eq!(second.outcome, MergeOutcome::AbsentDelete);
        assert!(store.is_empty());
    }

    #[test]
    fn remote_completion_celebrates_once() {
        let local = task("a", Status::InProgress);
        let (mut store, mut tracker) = setup(vec![local.clone()]);

        let mut done = local.clone();
        done.set_status(Status::Done, Utc::now());
        done.updated_at = local.updated_at + Duration::seconds(1);
        let report = merge(&mut store, &mut tracker, ChangeNotification::Update(done.clone()));
        assert!(report.celebrate);

        let mut retitled = done.clone();
        retitled.title = "still done".to_string();
        retitled.updated_at = done.updated_at + Duration::seconds(1);
        let report = merge(&mut store, &mut tracker, ChangeNotification::Update(retitled));
        assert!(!report.celebrate);
    }

    #[test]
    fn local_transition_prevents_double_fire() {
        let local = task("a", Status::Todo);
        let (mut store, mut tracker) = setup(vec![local.clone()]);

        // Local optimistic completion records done first.
        assert!(tracker.observe(&local.id, Status::Done));

        let mut confirmed = local.clone();
        confirmed.set_status(Status::Done, Utc::now());
        confirmed.updated_at = local.updated_at + Duration::seconds(1);
        let report = merge(&mut store, &mut tracker, ChangeNotification::Update(confirmed));
        assert_eq!(report.outcome, MergeOutcome::Replaced);
        assert!(!report.celebrate);
    }

    #[test]
    fn update_for_unknown_task_inserts() {
        let (mut store, mut tracker) = setup(Vec::new());
        let report = merge(&mut store, &mut tracker, ChangeNotification::Update(task("z", Status::Done)));
        assert_eq!(report.outcome, MergeOutcome::Inserted);
        assert!(!report.celebrate);
        assert_eq!(tracker.last_status(&TaskId::from("z")), Some(Status::Done));
    }

    #[test]
    fn notification_json_shape() {
        let json = serde_json::to_value(ChangeNotification::Delete(TaskId::from("a"))).unwrap();
        assert_eq!(json["event"], "delete");
        assert_eq!(json["record"], "a");
    }
}
