//! Board controller: user intents over the store and the backend.
//!
//! Every intent mutates the store optimistically first and then issues the
//! backend write. Write failures become toasts; only validation problems
//! come back as errors.

use std::collections::VecDeque;

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::Serialize;

use crate::activity::{ActivityAction, ActivityEntry};
use crate::backend::Backend;
use crate::config::BoardConfig;
use crate::error::{Error, Result};
use crate::model::{Status, StatusChange, Task, TaskDraft, TaskId};
use crate::realtime::{self, ChangeNotification, MergeReport, StatusTracker};
use crate::recurrence;
use crate::reorder::{self, DropTarget};
use crate::store::{BoardColumns, BoardCounts, Observer, TaskFilter, TaskStore};

/// Source of "now" and of the local calendar date.
pub trait Clock: Send {
    fn now(&self) -> DateTime<Utc>;
    fn today(&self) -> NaiveDate;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Clock pinned to one instant; `today` is that instant's UTC date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }

    fn today(&self) -> NaiveDate {
        self.0.date_naive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastLevel {
    Info,
    Warning,
    Error,
}

/// Transient UI signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    Toast { level: ToastLevel, message: String },
    Celebrate { task_id: TaskId },
}

/// What a move actually did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveOutcome {
    pub task_id: TaskId,
    pub from: Status,
    pub to: Status,
    pub touched: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub successor: Option<TaskId>,
}

pub struct Board<B: Backend> {
    backend: B,
    store: TaskStore,
    tracker: StatusTracker,
    config: BoardConfig,
    actor: String,
    clock: Box<dyn Clock>,
    notices: VecDeque<Notice>,
}

impl<B: Backend> Board<B> {
    pub fn new(backend: B, config: BoardConfig, actor: impl Into<String>) -> Self {
        Self {
            backend,
            store: TaskStore::new(),
            tracker: StatusTracker::new(),
            config,
            actor: actor.into(),
            clock: Box::new(SystemClock),
            notices: VecDeque::new(),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn set_clock(&mut self, clock: impl Clock + 'static) {
        self.clock = Box::new(clock);
    }

    pub fn subscribe(&mut self, observer: Observer) {
        self.store.subscribe(observer);
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn tasks(&self) -> &[Task] {
        self.store.tasks()
    }

    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.store.get(id)
    }

    pub fn resolve_id(&self, input: &str) -> Result<TaskId> {
        self.store.resolve_id(input)
    }

    pub fn columns(&self, filter: &TaskFilter) -> BoardColumns {
        self.store.grouped_by_status(filter)
    }

    pub fn counts(&self, filter: &TaskFilter) -> BoardCounts {
        self.store.counts(filter, self.clock.today())
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    /// Initial load: fetch everything and seed the status tracker.
    pub fn load(&mut self) -> Result<()> {
        self.refresh()
    }

    /// Replace the store with the authoritative rows. On failure the store
    /// keeps its prior contents.
    pub fn refresh(&mut self) -> Result<()> {
        match self.backend.fetch_tasks() {
            Ok(tasks) => {
                tracing::debug!(count = tasks.len(), "board refreshed");
                self.tracker.seed(&tasks);
                self.store.replace_all(tasks);
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to load tasks");
                Err(err)
            }
        }
    }

    /// Create a task from a submitted form.
    pub fn create(&mut self, draft: TaskDraft) -> Result<TaskId> {
        let draft = draft.validate(&self.config)?;
        let now = self.clock.now();
        let position = self.store.next_position(draft.status);
        let task = draft.into_task(TaskId::generate(), position, now);
        let id = task.id.clone();

        self.tracker.observe(&id, task.status);
        self.store.upsert(task.clone());

        if let Err(err) = self.backend.insert_task(&task) {
            self.write_failed("create task", &err);
            return Ok(id);
        }
        tracing::info!(task = %id, status = %task.status, "task created");
        self.log_activity(ActivityEntry::new(
            id.clone(),
            ActivityAction::Created,
            &self.actor,
            now,
        ));
        Ok(id)
    }

    /// Create a task with only a title, using board defaults.
    pub fn quick_add(&mut self, title: &str, status: Status) -> Result<TaskId> {
        let draft = TaskDraft::quick(title, status, &self.config);
        self.create(draft)
    }

    /// Apply a submitted edit form to an existing task.
    pub fn edit(&mut self, id: &TaskId, draft: TaskDraft) -> Result<()> {
        let draft = draft.validate(&self.config)?;
        let mut task = self
            .store
            .get(id)
            .cloned()
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;
        let changes = draft.changed_fields(&task);
        if changes.is_empty() {
            return Ok(());
        }

        let now = self.clock.now();
        if draft.status != task.status {
            task.position = self.store.next_position(draft.status);
        }
        let change = draft.apply_to(&mut task, now);
        self.store.upsert(task.clone());
        let celebrate = self.tracker.observe(id, task.status);
        if celebrate {
            self.notices.push_back(Notice::Celebrate {
                task_id: id.clone(),
            });
        }

        if let Err(err) = self.backend.update_task(&task) {
            self.write_failed("update task", &err);
            return Ok(());
        }
        tracing::info!(task = %id, changes = ?changes, "task updated");
        self.log_activity(ActivityEntry::updated(id.clone(), &changes, &self.actor, now));
        self.after_transition(&task, change, now);
        Ok(())
    }

    /// Drag-and-drop move. Returns `None` when nothing had to change.
    pub fn move_task(&mut self, id: &TaskId, target: DropTarget) -> Result<Option<MoveOutcome>> {
        let Some(plan) = reorder::plan_move(self.store.tasks(), id, &target)? else {
            tracing::debug!(task = %id, "drop produced no changes");
            return Ok(None);
        };

        let now = self.clock.now();
        let (touched, change) = plan.apply(&mut self.store, now);
        if self.tracker.observe(id, change.to) {
            self.notices.push_back(Notice::Celebrate {
                task_id: id.clone(),
            });
        }

        let mut failed = false;
        for task in &touched {
            if let Err(err) = self.backend.update_task(task) {
                self.write_failed("save task order", &err);
                failed = true;
                break;
            }
        }
        tracing::info!(
            task = %id,
            from = %plan.from,
            to = %plan.to,
            touched = touched.len(),
            "task moved"
        );

        let mut successor = None;
        if !failed {
            if let Some(task) = self.store.get(id).cloned() {
                successor = self.after_transition(&task, change, now);
            }
        }

        Ok(Some(MoveOutcome {
            task_id: id.clone(),
            from: plan.from,
            to: plan.to,
            touched: touched.len(),
            successor,
        }))
    }

    /// Mark a task done by dropping it on the done column. A task that is
    /// already done stays where it is.
    pub fn complete(&mut self, id: &TaskId) -> Result<Option<MoveOutcome>> {
        match self.store.get(id) {
            Some(task) if task.status.is_done() => {
                tracing::debug!(task = %id, "task already done");
                Ok(None)
            }
            _ => self.move_task(id, DropTarget::Column(Status::Done)),
        }
    }

    /// Delete a task. A failed delete re-fetches authoritative state.
    pub fn delete(&mut self, id: &TaskId) -> Result<()> {
        if !self.store.contains(id) {
            return Err(Error::TaskNotFound(id.to_string()));
        }
        self.store.remove(id);
        self.tracker.forget(id);

        if let Err(err) = self.backend.delete_task(id) {
            self.write_failed("delete task", &err);
            if let Err(err) = self.refresh() {
                tracing::error!(error = %err, "refresh after failed delete also failed");
            }
            return Ok(());
        }
        tracing::info!(task = %id, "task deleted");
        let now = self.clock.now();
        self.log_activity(ActivityEntry::new(
            id.clone(),
            ActivityAction::Deleted,
            &self.actor,
            now,
        ));
        Ok(())
    }

    /// Most recent activity for a task, newest first.
    pub fn history(&mut self, id: &TaskId) -> Result<Vec<ActivityEntry>> {
        self.backend
            .recent_activity(id, self.config.activity_limit)
            .inspect_err(|err| tracing::error!(task = %id, error = %err, "failed to load activity"))
    }

    /// Reconcile one realtime notification.
    pub fn apply_notification(&mut self, notification: ChangeNotification) -> MergeReport {
        let id = notification.task_id().clone();
        let report = realtime::merge(&mut self.store, &mut self.tracker, notification);
        tracing::trace!(task = %id, outcome = ?report.outcome, "realtime notification");
        if report.celebrate {
            self.notices.push_back(Notice::Celebrate { task_id: id });
        }
        report
    }

    /// Activity logging and recurrence after a status transition that the
    /// backend accepted.
    fn after_transition(&mut self, task: &Task, change: StatusChange, now: DateTime<Utc>) -> Option<TaskId> {
        if !change.changed() {
            return None;
        }
        self.log_activity(ActivityEntry::transition(
            task.id.clone(),
            change.from,
            change.to,
            &self.actor,
            now,
        ));
        if recurrence::should_spawn(task, &change) {
            return self.spawn_successor(task, now);
        }
        None
    }

    /// Best effort: a failure here never undoes the source completion.
    fn spawn_successor(&mut self, source: &Task, now: DateTime<Utc>) -> Option<TaskId> {
        let next = recurrence::successor(source, self.store.max_position(Status::Todo), now)?;
        let id = next.id.clone();

        self.tracker.observe(&id, next.status);
        self.store.upsert(next.clone());

        if let Err(err) = self.backend.insert_task(&next) {
            tracing::warn!(source = %source.id, error = %err, "recurring successor not created");
            self.notices.push_back(Notice::Toast {
                level: ToastLevel::Warning,
                message: format!("Could not create the next '{}' task: {err}", source.title),
            });
            return None;
        }
        tracing::info!(source = %source.id, task = %id, due = ?next.due_date, "recurring successor created");
        self.log_activity(ActivityEntry::recurring_successor(
            id.clone(),
            &source.id,
            &self.actor,
            now,
        ));
        Some(id)
    }

    fn log_activity(&mut self, entry: ActivityEntry) {
        if let Err(err) = self.backend.append_activity(&entry) {
            tracing::warn!(
                task = %entry.task_id,
                action = entry.action.as_str(),
                error = %err,
                "activity entry dropped"
            );
        }
    }

    fn write_failed(&mut self, what: &str, err: &Error) {
        tracing::warn!(error = %err, "failed to {what}");
        self.notices.push_back(Notice::Toast {
            level: ToastLevel::Error,
            message: format!("Failed to {what}: {err}"),
        });
    }
}
