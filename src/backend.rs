//! Backend collaborator: row CRUD, activity log and change notifications.
//!
//! The managed service is opaque to the board. [`MemoryBackend`] stands in
//! for it in tests and embedded use; the file-backed variant lives in
//! [`crate::storage`].

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::activity::{self, ActivityEntry};
use crate::error::{Error, Result};
use crate::model::{Task, TaskId};
use crate::realtime::ChangeNotification;

/// Row-level operations the board issues against the backend.
pub trait Backend {
    /// All tasks ordered by position.
    fn fetch_tasks(&mut self) -> Result<Vec<Task>>;
    fn insert_task(&mut self, task: &Task) -> Result<()>;
    fn update_task(&mut self, task: &Task) -> Result<()>;
    fn delete_task(&mut self, id: &TaskId) -> Result<()>;
    fn append_activity(&mut self, entry: &ActivityEntry) -> Result<()>;
    /// Newest first, at most `limit` entries.
    fn recent_activity(&mut self, task_id: &TaskId, limit: usize) -> Result<Vec<ActivityEntry>>;
}

/// Persistent channel of row changes for the task table.
pub trait ChangeFeed {
    fn subscribe(&self) -> UnboundedReceiver<ChangeNotification>;
}

/// Operations that can be made to fail once, for exercising error paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOp {
    Fetch,
    Insert,
    Update,
    Delete,
    AppendActivity,
    RecentActivity,
}

impl BackendOp {
    fn name(self) -> &'static str {
        match self {
            BackendOp::Fetch => "fetch",
            BackendOp::Insert => "insert",
            BackendOp::Update => "update",
            BackendOp::Delete => "delete",
            BackendOp::AppendActivity => "activity insert",
            BackendOp::RecentActivity => "activity read",
        }
    }
}

#[derive(Debug, Default)]
struct Shared {
    tasks: Vec<Task>,
    activity: Vec<ActivityEntry>,
    subscribers: Vec<UnboundedSender<ChangeNotification>>,
    failures: HashSet<BackendOp>,
}

impl Shared {
    fn take_failure(&mut self, op: BackendOp) -> Result<()> {
        if self.failures.remove(&op) {
            tracing::debug!(op = op.name(), "injected backend failure");
            return Err(Error::backend(op.name(), "injected failure"));
        }
        Ok(())
    }

    fn broadcast(&mut self, notification: ChangeNotification) {
        self.subscribers
            .retain(|subscriber| subscriber.send(notification.clone()).is_ok());
    }
}

/// In-process backend shared by every clone of the handle.
///
/// Writes are stored as given, including the client-stamped `updated_at`,
/// and broadcast to every subscriber, the writer included.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    shared: Arc<Mutex<Shared>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let backend = Self::default();
        if let Ok(mut shared) = backend.shared.lock() {
            shared.tasks = tasks;
        }
        backend
    }

    /// Make the next call of `op` fail.
    pub fn fail_next(&self, op: BackendOp) {
        if let Ok(mut shared) = self.shared.lock() {
            shared.failures.insert(op);
        }
    }

    /// Stored rows, in storage order.
    pub fn rows(&self) -> Vec<Task> {
        self.shared
            .lock()
            .map(|shared| shared.tasks.clone())
            .unwrap_or_default()
    }

    pub fn activity(&self) -> Vec<ActivityEntry> {
        self.shared
            .lock()
            .map(|shared| shared.activity.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Shared>> {
        self.shared
            .lock()
            .map_err(|_| Error::OperationFailed("memory backend lock poisoned".to_string()))
    }
}

impl Backend for MemoryBackend {
    fn fetch_tasks(&mut self) -> Result<Vec<Task>> {
        let mut shared = self.lock()?;
        shared.take_failure(BackendOp::Fetch)?;
        let mut tasks = shared.tasks.clone();
        tasks.sort_by_key(|task| task.position);
        Ok(tasks)
    }

    fn insert_task(&mut self, task: &Task) -> Result<()> {
        let mut shared = self.lock()?;
        shared.take_failure(BackendOp::Insert)?;
        if shared.tasks.iter().any(|existing| existing.id == task.id) {
            return Err(Error::backend(
                "insert",
                format!("duplicate task id {}", task.id),
            ));
        }
        shared.tasks.push(task.clone());
        shared.broadcast(ChangeNotification::Insert(task.clone()));
        Ok(())
    }

    fn update_task(&mut self, task: &Task) -> Result<()> {
        let mut shared = self.lock()?;
        shared.take_failure(BackendOp::Update)?;
        let row = shared
            .tasks
            .iter_mut()
            .find(|existing| existing.id == task.id)
            .ok_or_else(|| Error::backend("update", format!("no row for {}", task.id)))?;
        *row = task.clone();
        shared.broadcast(ChangeNotification::Update(task.clone()));
        Ok(())
    }

    fn delete_task(&mut self, id: &TaskId) -> Result<()> {
        let mut shared = self.lock()?;
        shared.take_failure(BackendOp::Delete)?;
        let before = shared.tasks.len();
        shared.tasks.retain(|task| &task.id != id);
        if shared.tasks.len() != before {
            shared.broadcast(ChangeNotification::Delete(id.clone()));
        }
        Ok(())
    }

    fn append_activity(&mut self, entry: &ActivityEntry) -> Result<()> {
        let mut shared = self.lock()?;
        shared.take_failure(BackendOp::AppendActivity)?;
        shared.activity.push(entry.clone());
        Ok(())
    }

    fn recent_activity(&mut self, task_id: &TaskId, limit: usize) -> Result<Vec<ActivityEntry>> {
        let mut shared = self.lock()?;
        shared.take_failure(BackendOp::RecentActivity)?;
        Ok(activity::recent_for_task(&shared.activity, task_id, limit))
    }
}

impl ChangeFeed for MemoryBackend {
    fn subscribe(&self) -> UnboundedReceiver<ChangeNotification> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut shared) = self.shared.lock() {
            shared.subscribers.push(tx);
        }
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BoardConfig;
    use crate::model::{Status, TaskDraft};
    use chrono::Utc;

    fn task(id: &str, position: i64) -> Task {
        TaskDraft::quick(format!("task {id}"), Status::Todo, &BoardConfig::default()).into_task(
            TaskId::from(id),
            position,
            Utc::now(),
        )
    }

    #[test]
    fn fetch_orders_by_position() {
        let mut backend = MemoryBackend::with_tasks(vec![task("b", 2), task("a", 1)]);
        let ids: Vec<String> = backend
            .fetch_tasks()
            .unwrap()
            .into_iter()
            .map(|task| task.id.to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn writes_broadcast_to_every_subscriber() {
        let mut writer = MemoryBackend::new();
        let reader = writer.clone();
        let mut own = writer.subscribe();
        let mut other = reader.subscribe();

        let row = task("a", 0);
        writer.insert_task(&row).unwrap();
        writer.delete_task(&row.id).unwrap();
        writer.delete_task(&row.id).unwrap();

        for rx in [&mut own, &mut other] {
            assert_eq!(rx.try_recv().unwrap(), ChangeNotification::Insert(row.clone()));
            assert_eq!(rx.try_recv().unwrap(), ChangeNotification::Delete(row.id.clone()));
            assert!(rx.try_recv().is_err());
        }
    }

    #[test]
    fn injected_failure_fires_once() {
        let mut backend = MemoryBackend::new();
        backend.fail_next(BackendOp::Insert);
        let row = task("a", 0);
        assert!(matches!(backend.insert_task(&row), Err(Error::Backend { .. })));
        backend.insert_task(&row).unwrap();
        assert_eq!(backend.rows().len(), 1);
    }

    #[test]
    fn update_of_missing_row_is_rejected() {
        let mut backend = MemoryBackend::new();
        assert!(backend.update_task(&task("ghost", 0)).is_err());
    }
}
