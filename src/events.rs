//! Board events for external integrations.
//!
//! Each CLI mutation can be mirrored as one JSON line on stdout or appended
//! to a file (`--events -` or `--events <path>`).

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::board::{Notice, ToastLevel};
use crate::error::{Error, Result};
use crate::model::TaskId;

pub const EVENT_SCHEMA_VERSION: &str = "tandem.event.v1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventDestination {
    Stdout,
    File(PathBuf),
}

impl EventDestination {
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        let trimmed = raw?.trim();
        match trimmed {
            "" => None,
            "-" => Some(EventDestination::Stdout),
            path => Some(EventDestination::File(PathBuf::from(path))),
        }
    }

    pub fn open(&self) -> Result<EventSink> {
        match self {
            EventDestination::Stdout => Ok(EventSink::stdout()),
            EventDestination::File(path) => EventSink::file(path),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    TaskCreated,
    TaskUpdated,
    TaskMoved,
    TaskCompleted,
    TaskDeleted,
    TaskCelebrated,
    Toast,
}

#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub schema_version: &'static str,
    pub event: EventKind,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Event {
    pub fn new(event: EventKind, actor: Option<String>) -> Self {
        Self {
            schema_version: EVENT_SCHEMA_VERSION,
            event,
            timestamp: Utc::now(),
            actor,
            task_id: None,
            data: None,
        }
    }

    pub fn for_task(mut self, task_id: &TaskId) -> Self {
        self.task_id = Some(task_id.clone());
        self
    }

    pub fn with_data<T: Serialize>(mut self, data: T) -> Result<Self> {
        self.data = Some(serde_json::to_value(data)?);
        Ok(self)
    }

    /// Event mirroring a board notice.
    pub fn from_notice(notice: &Notice, actor: Option<String>) -> Result<Self> {
        match notice {
            Notice::Celebrate { task_id } => {
                Ok(Event::new(EventKind::TaskCelebrated, actor).for_task(task_id))
            }
            Notice::Toast { level, message } => Event::new(EventKind::Toast, actor)
                .with_data(serde_json::json!({ "level": level, "message": message })),
        }
    }
}

/// JSONL writer for events.
pub struct EventSink {
    writer: Box<dyn Write + Send>,
}

impl EventSink {
    pub fn stdout() -> Self {
        Self {
            writer: Box::new(std::io::stdout()),
        }
    }

    /// Append to `path`, creating it if necessary.
    pub fn file(path: &Path) -> Result<Self> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self {
            writer: Box::new(file),
        })
    }

    pub fn emit(&mut self, event: &Event) -> Result<()> {
        let serialized = serde_json::to_vec(event)?;
        self.writer.write_all(&serialized)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush().map_err(Error::Io)?;
        Ok(())
    }
}

/// True for notices that should be surfaced as warnings.
pub fn is_warning(notice: &Notice) -> bool {
    matches!(
        notice,
        Notice::Toast {
            level: ToastLevel::Warning | ToastLevel::Error,
            ..
        }
    )
}
