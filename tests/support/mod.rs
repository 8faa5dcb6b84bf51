#![allow(dead_code)]

use std::cell::Cell;
use std::path::Path;

use assert_cmd::Command;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde_json::Value;
use tempfile::TempDir;

use tandem::board::{Board, Clock, FixedClock};
use tandem::config::BoardConfig;
use tandem::model::{Status, Task, TaskDraft, TaskId};

pub struct TestBoard {
    dir: TempDir,
}

impl TestBoard {
    /// Temp dir with `tandem init` already run.
    pub fn init() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let board = Self { dir };
        board.cmd().arg("init").assert().success();
        board
    }

    pub fn empty() -> Self {
        Self {
            dir: tempfile::tempdir().expect("failed to create tempdir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = tandem_cmd();
        cmd.current_dir(self.path());
        cmd.env_remove("TANDEM_ACTOR");
        cmd.env_remove("TANDEM_DIR");
        cmd
    }

    /// Run with `--json` and return the `data` payload.
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self
            .cmd()
            .args(args)
            .arg("--json")
            .output()
            .expect("run tandem");
        assert!(
            output.status.success(),
            "tandem {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        let value: Value = serde_json::from_slice(&output.stdout).expect("json output");
        value["data"].clone()
    }

    /// Create a task and return its id.
    pub fn quick(&self, title: &str, status: &str) -> String {
        let data = self.json(&["quick", title, "--status", status]);
        data["task"]["id"].as_str().expect("task id").to_string()
    }
}

pub fn tandem_cmd() -> Command {
    Command::cargo_bin("tandem").expect("binary")
}

pub fn fixed_clock() -> FixedClock {
    FixedClock(Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap())
}

/// Clock that advances one second per reading, starting `offset_secs` after
/// the fixed test instant.
pub struct StepClock {
    start: DateTime<Utc>,
    ticks: Cell<i64>,
}

impl StepClock {
    pub fn new(offset_secs: i64) -> Self {
        Self {
            start: fixed_clock().0 + Duration::seconds(offset_secs),
            ticks: Cell::new(0),
        }
    }
}

impl Clock for StepClock {
    fn now(&self) -> DateTime<Utc> {
        let tick = self.ticks.get();
        self.ticks.set(tick + 1);
        self.start + Duration::seconds(tick)
    }

    fn today(&self) -> NaiveDate {
        self.start.date_naive()
    }
}

/// Loaded board whose clock never collides with another client's.
pub fn board_on<B: tandem::backend::Backend>(backend: B, actor: &str, offset_secs: i64) -> Board<B> {
    let mut board =
        Board::new(backend, BoardConfig::default(), actor).with_clock(StepClock::new(offset_secs));
    board.load().expect("load board");
    board
}

pub fn task(id: &str, status: Status, position: i64) -> Task {
    TaskDraft::quick(format!("task {id}"), status, &BoardConfig::default()).into_task(
        TaskId::from(id),
        position,
        fixed_clock().0,
    )
}

pub fn ids(tasks: &[Task]) -> Vec<String> {
    tasks.iter().map(|task| task.id.to_string()).collect()
}
