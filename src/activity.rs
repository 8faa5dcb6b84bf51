//! Append-only activity history per task.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::model::{Status, TaskId};

/// Entries shown per task unless the board config overrides it.
pub const DEFAULT_ACTIVITY_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    Created,
    Updated,
    Moved,
    Completed,
    Deleted,
}

impl ActivityAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityAction::Created => "created",
            ActivityAction::Updated => "updated",
            ActivityAction::Moved => "moved",
            ActivityAction::Completed => "completed",
            ActivityAction::Deleted => "deleted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: Uuid,
    pub task_id: TaskId,
    pub action: ActivityAction,
    pub actor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl ActivityEntry {
    pub fn new(
        task_id: TaskId,
        action: ActivityAction,
        actor: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_id,
            action,
            actor: actor.into(),
            details: None,
            created_at,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// `moved` or `completed`, depending on where the task landed.
    pub fn transition(
        task_id: TaskId,
        from: Status,
        to: Status,
        actor: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let action = if to.is_done() && !from.is_done() {
            ActivityAction::Completed
        } else {
            ActivityAction::Moved
        };
        Self::new(task_id, action, actor, created_at)
            .with_details(json!({ "from": from, "to": to }))
    }

    pub fn updated(
        task_id: TaskId,
        changes: &[&str],
        actor: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self::new(task_id, ActivityAction::Updated, actor, created_at)
            .with_details(json!({ "changes": changes }))
    }

    pub fn recurring_successor(
        task_id: TaskId,
        source: &TaskId,
        actor: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self::new(task_id, ActivityAction::Created, actor, created_at)
            .with_details(json!({ "recurring_from": source }))
    }
}

/// Entries for one task, newest first, at most `limit`.
pub fn recent_for_task(entries: &[ActivityEntry], task_id: &TaskId, limit: usize) -> Vec<ActivityEntry> {
    let mut matching: Vec<ActivityEntry> = entries
        .iter()
        .filter(|entry| &entry.task_id == task_id)
        .cloned()
        .collect();
    // Stable sort keeps later appends first among equal timestamps after the reverse.
    matching.reverse();
    matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    matching.truncate(limit);
    matching
}
