//! Task model for the board.
//!
//! A task lives in exactly one status group. Order inside a group is the
//! ascending `position`, ties broken by a stable sort. `completed_at` is
//! present exactly when the status is [`Status::Done`].

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::config::BoardConfig;
use crate::error::{Error, Result};

/// Opaque task identifier (lowercase ULID when generated locally).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generate a fresh client-side id.
    pub fn generate() -> Self {
        Self(Ulid::new().to_string().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Todo,
    InProgress,
    Done,
}

impl Status {
    /// Column order on the board.
    pub const ALL: [Status; 3] = [Status::Todo, Status::InProgress, Status::Done];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Todo => "todo",
            Status::InProgress => "in_progress",
            Status::Done => "done",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Status::Todo => "To Do",
            Status::InProgress => "In Progress",
            Status::Done => "Done",
        }
    }

    pub fn is_done(self) -> bool {
        self == Status::Done
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "todo" | "to_do" => Ok(Status::Todo),
            "in_progress" | "doing" => Ok(Status::InProgress),
            "done" => Ok(Status::Done),
            _ => Err(Error::InvalidArgument(format!(
                "unknown status '{}' (expected todo|in_progress|done)",
                value.trim()
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(Error::InvalidArgument(format!(
                "unknown priority '{other}' (expected low|medium|high)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Recurrence {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
}

impl Recurrence {
    pub fn as_str(self) -> &'static str {
        match self {
            Recurrence::None => "none",
            Recurrence::Daily => "daily",
            Recurrence::Weekly => "weekly",
            Recurrence::Monthly => "monthly",
        }
    }

    pub fn is_recurring(self) -> bool {
        self != Recurrence::None
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Recurrence {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(Recurrence::None),
            "daily" => Ok(Recurrence::Daily),
            "weekly" => Ok(Recurrence::Weekly),
            "monthly" => Ok(Recurrence::Monthly),
            other => Err(Error::InvalidArgument(format!(
                "unknown recurrence '{other}' (expected none|daily|weekly|monthly)"
            ))),
        }
    }
}

/// Member of the configured user roster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Assignee(String);

impl Assignee {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Assignee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Entry of the configured tag vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(String);

impl Tag {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: Status,
    #[serde(default)]
    pub priority: Priority,
    pub assignee: Assignee,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub tags: BTreeSet<Tag>,
    #[serde(default)]
    pub recurrence: Recurrence,
    pub position: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Outcome of a status assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub from: Status,
    pub to: Status,
}

impl StatusChange {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }

    pub fn entered_done(&self) -> bool {
        !self.from.is_done() && self.to.is_done()
    }

    pub fn left_done(&self) -> bool {
        self.from.is_done() && !self.to.is_done()
    }
}

impl Task {
    /// Assign a status and keep `completed_at` in step with it.
    pub fn set_status(&mut self, status: Status, now: DateTime<Utc>) -> StatusChange {
        let change = StatusChange {
            from: self.status,
            to: status,
        };
        self.status = status;
        if status.is_done() {
            if self.completed_at.is_none() || change.entered_done() {
                self.completed_at = Some(now);
            }
        } else {
            self.completed_at = None;
        }
        change
    }

    pub fn has_tag(&self, tag: &Tag) -> bool {
        self.tags.contains(tag)
    }

    pub fn is_due_on(&self, day: NaiveDate) -> bool {
        self.due_date == Some(day)
    }
}

/// Form input for creating or editing a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub status: Status,
    pub priority: Priority,
    pub assignee: Assignee,
    pub due_date: Option<NaiveDate>,
    pub tags: BTreeSet<Tag>,
    pub recurrence: Recurrence,
}

impl TaskDraft {
    /// Draft with board defaults, as used by quick-add.
    pub fn quick(title: impl Into<String>, status: Status, config: &BoardConfig) -> Self {
        Self {
            title: title.into(),
            description: None,
            status,
            priority: config.default_priority,
            assignee: config.default_assignee(),
            due_date: None,
            tags: BTreeSet::new(),
            recurrence: Recurrence::None,
        }
    }

    /// Draft prefilled from an existing task, as an edit form opens.
    pub fn from_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status,
            priority: task.priority,
            assignee: task.assignee.clone(),
            due_date: task.due_date,
            tags: task.tags.clone(),
            recurrence: task.recurrence,
        }
    }

    /// Trim text fields and check roster and vocabulary membership.
    pub fn validate(mut self, config: &BoardConfig) -> Result<Self> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(Error::EmptyTitle);
        }
        self.title = title.to_string();
        self.description = self
            .description
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        if !config.has_user(self.assignee.as_str()) {
            return Err(Error::UnknownAssignee(self.assignee.to_string()));
        }
        if let Some(tag) = self.tags.iter().find(|tag| !config.has_tag(tag.as_str())) {
            return Err(Error::UnknownTag(tag.to_string()));
        }
        Ok(self)
    }

    /// Names of the fields this draft would change on `task`.
    pub fn changed_fields(&self, task: &Task) -> Vec<&'static str> {
        let mut changes = Vec::new();
        if self.title != task.title {
            changes.push("title");
        }
        if self.description != task.description {
            changes.push("description");
        }
        if self.status != task.status {
            changes.push("status");
        }
        if self.priority != task.priority {
            changes.push("priority");
        }
        if self.assignee != task.assignee {
            changes.push("assignee");
        }
        if self.due_date != task.due_date {
            changes.push("due_date");
        }
        if self.tags != task.tags {
            changes.push("tags");
        }
        if self.recurrence != task.recurrence {
            changes.push("recurrence");
        }
        changes
    }

    /// Build a new task from a validated draft.
    pub fn into_task(self, id: TaskId, position: i64, now: DateTime<Utc>) -> Task {
        let completed_at = self.status.is_done().then_some(now);
        Task {
            id,
            title: self.title,
            description: self.description,
            status: self.status,
            priority: self.priority,
            assignee: self.assignee,
            due_date: self.due_date,
            tags: self.tags,
            recurrence: self.recurrence,
            position,
            created_at: now,
            updated_at: now,
            completed_at,
        }
    }

    /// Copy the form fields onto `task`; status goes through [`Task::set_status`].
    pub fn apply_to(self, task: &mut Task, now: DateTime<Utc>) -> StatusChange {
        task.title = self.title;
        task.description = self.description;
        task.priority = self.priority;
        task.assignee = self.assignee;
        task.due_date = self.due_date;
        task.tags = self.tags;
        task.recurrence = self.recurrence;
        task.updated_at = now;
        task.set_status(self.status, now)
    }
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_due_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|err| {
        Error::InvalidArgument(format!("invalid due date '{}': {err}", value.trim()))
    })
}
