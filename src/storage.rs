//! File-backed board state for the CLI
//!
//! # Directory Structure
//!
//! ```text
//! .tandem.toml                  # Board configuration
//! .tandem/
//!   actor                       # Persisted actor identity
//!   tasks.json                  # Task snapshot (atomic rewrite, locked)
//!   activity.jsonl              # Append-only activity log
//! ```

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::activity::{self, ActivityEntry};
use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::lock::{self, FileLock, DEFAULT_LOCK_TIMEOUT_MS};
use crate::model::{Task, TaskId};

/// Name of the board data directory
pub const DATA_DIR: &str = ".tandem";

const TASKS_FILE: &str = "tasks.json";
const ACTIVITY_FILE: &str = "activity.jsonl";
const TASKS_SCHEMA_VERSION: &str = "tandem.tasks.v1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub tasks: Vec<Task>,
}

impl TaskSnapshot {
    pub fn empty() -> Self {
        Self {
            schema_version: TASKS_SCHEMA_VERSION.to_string(),
            generated_at: Utc::now(),
            tasks: Vec::new(),
        }
    }
}

/// Paths and IO helpers rooted at a board directory
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to the `.tandem/` directory
    pub fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    pub fn tasks_file(&self) -> PathBuf {
        self.data_dir().join(TASKS_FILE)
    }

    pub fn activity_file(&self) -> PathBuf {
        self.data_dir().join(ACTIVITY_FILE)
    }

    pub fn actor_file(&self) -> PathBuf {
        self.data_dir().join("actor")
    }

    /// Create `.tandem/` with an empty snapshot if missing
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(self.data_dir())?;
        let tasks_file = self.tasks_file();
        if !tasks_file.exists() {
            self.write_json(&tasks_file, &TaskSnapshot::empty())?;
        }
        let activity_file = self.activity_file();
        if !activity_file.exists() {
            File::create(&activity_file)?;
        }
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.data_dir().exists()
    }

    pub fn write_json<T: Serialize>(&self, path: &Path, data: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(data)?;
        lock::write_atomic(path, json.as_bytes())
    }

    pub fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Append one record as a JSON line; callers hold the file lock
    pub fn append_jsonl<T: Serialize>(&self, path: &Path, record: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(record)?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        writeln!(file, "{}", json)?;
        file.sync_all()?;
        Ok(())
    }

    pub fn read_jsonl<T: DeserializeOwned>(&self, path: &Path) -> Result<Vec<T>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(File::open(path)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        Ok(records)
    }

    /// Read the persisted actor identity
    pub fn read_actor(&self) -> Option<String> {
        fs::read_to_string(self.actor_file())
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn write_actor(&self, actor: &str) -> Result<()> {
        lock::write_atomic(self.actor_file(), format!("{actor}\n").as_bytes())
    }
}

/// [`Backend`] over the `.tandem/` directory. It has no change feed; each
/// CLI invocation loads the snapshot afresh.
#[derive(Debug, Clone)]
pub struct FileBackend {
    storage: Storage,
    lock_timeout_ms: u64,
}

impl FileBackend {
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    fn load_snapshot(&self) -> Result<TaskSnapshot> {
        let path = self.storage.tasks_file();
        if !path.exists() {
            return Ok(TaskSnapshot::empty());
        }
        let snapshot: TaskSnapshot = self.storage.read_json(&path)?;
        if snapshot.schema_version != TASKS_SCHEMA_VERSION {
            return Err(Error::OperationFailed(format!(
                "unsupported task snapshot schema '{}'",
                snapshot.schema_version
            )));
        }
        Ok(snapshot)
    }

    fn modify_snapshot<F>(&self, op: &'static str, f: F) -> Result<()>
    where
        F: FnOnce(&mut Vec<Task>) -> Result<()>,
    {
        let path = self.storage.tasks_file();
        let _lock = FileLock::acquire(lock::lock_path_for(&path), self.lock_timeout_ms)?;
        let mut snapshot = self.load_snapshot()?;
        f(&mut snapshot.tasks)?;
        snapshot.generated_at = Utc::now();
        self.storage.write_json(&path, &snapshot)?;
        tracing::debug!(op, tasks = snapshot.tasks.len(), "task snapshot written");
        Ok(())
    }
}

impl Backend for FileBackend {
    fn fetch_tasks(&mut self) -> Result<Vec<Task>> {
        let mut tasks = self.load_snapshot()?.tasks;
        tasks.sort_by_key(|task| task.position);
        Ok(tasks)
    }

    fn insert_task(&mut self, task: &Task) -> Result<()> {
        self.modify_snapshot("insert", |tasks| {
            if tasks.iter().any(|existing| existing.id == task.id) {
                return Err(Error::backend("insert", format!("duplicate task id {}", task.id)));
            }
            tasks.push(task.clone());
            Ok(())
        })
    }

    fn update_task(&mut self, task: &Task) -> Result<()> {
        self.modify_snapshot("update", |tasks| {
            let row = tasks
                .iter_mut()
                .find(|existing| existing.id == task.id)
                .ok_or_else(|| Error::backend("update", format!("no row for {}", task.id)))?;
            *row = task.clone();
            Ok(())
        })
    }

    fn delete_task(&mut self, id: &TaskId) -> Result<()> {
        self.modify_snapshot("delete", |tasks| {
            tasks.retain(|task| &task.id != id);
            Ok(())
        })
    }

    fn append_activity(&mut self, entry: &ActivityEntry) -> Result<()> {
        let path = self.storage.activity_file();
        let _lock = FileLock::acquire(lock::lock_path_for(&path), self.lock_timeout_ms)?;
        self.storage.append_jsonl(&path, entry)
    }

    fn recent_activity(&mut self, task_id: &TaskId, limit: usize) -> Result<Vec<ActivityEntry>> {
        let entries: Vec<ActivityEntry> = self.storage.read_jsonl(&self.storage.activity_file())?;
        Ok(activity::recent_for_task(&entries, task_id, limit))
    }
}
