//! Shared setup for commands that operate on an existing board.

use std::path::PathBuf;

use serde::Serialize;

use crate::actor;
use crate::board::{Board, Notice};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::events::{self, Event, EventDestination, EventKind, EventSink};
use crate::model::TaskId;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::storage::{FileBackend, Storage};

use super::GlobalOptions;

pub(crate) fn board_root(dir: Option<PathBuf>) -> Result<PathBuf> {
    match dir {
        Some(path) => Ok(path),
        None => Ok(std::env::current_dir()?),
    }
}

pub(crate) struct BoardContext {
    pub board: Board<FileBackend>,
    pub actor: String,
    events: Option<EventSink>,
    events_to_stdout: bool,
    event_warnings: Vec<String>,
    json: bool,
    quiet: bool,
}

impl BoardContext {
    /// Open the board at `--dir` and load its tasks.
    pub fn load(globals: GlobalOptions) -> Result<Self> {
        let root = board_root(globals.dir)?;
        let storage = Storage::new(root.clone());
        if !storage.is_initialized() {
            return Err(Error::NotInitialized(root));
        }
        let config = Config::load_from_dir(&root);
        let actor = actor::resolve_actor(&storage, &config, globals.actor.as_deref());

        let destination = EventDestination::parse(globals.events.as_deref());
        let events = destination.as_ref().map(|dest| dest.open()).transpose()?;
        let events_to_stdout = matches!(destination, Some(EventDestination::Stdout));

        let mut board = Board::new(FileBackend::new(storage), config.board, actor.clone());
        board.load()?;
        tracing::debug!(root = %root.display(), actor = %actor, tasks = board.tasks().len(), "board opened");

        Ok(Self {
            board,
            actor,
            events,
            events_to_stdout,
            event_warnings: Vec::new(),
            json: globals.json,
            quiet: globals.quiet,
        })
    }

    pub fn output_options(&self) -> OutputOptions {
        OutputOptions {
            json: self.json && !self.events_to_stdout,
            quiet: self.quiet || self.events_to_stdout,
        }
    }

    /// Emit one task event; failures become output warnings.
    pub fn emit(&mut self, kind: EventKind, task_id: &TaskId, data: impl Serialize) {
        let Some(sink) = self.events.as_mut() else {
            return;
        };
        let result = Event::new(kind, Some(self.actor.clone()))
            .for_task(task_id)
            .with_data(data)
            .and_then(|event| sink.emit(&event));
        if let Err(err) = result {
            self.event_warnings.push(format!("event output failed: {err}"));
        }
    }

    /// Drain board notices into `human` and the event stream, then print.
    pub fn finish<T: Serialize>(
        mut self,
        command: &str,
        data: &T,
        mut human: HumanOutput,
    ) -> Result<()> {
        for notice in self.board.drain_notices() {
            if let Some(sink) = self.events.as_mut() {
                let result = Event::from_notice(&notice, Some(self.actor.clone()))
                    .and_then(|event| sink.emit(&event));
                if let Err(err) = result {
                    self.event_warnings.push(format!("event output failed: {err}"));
                }
            }
            match &notice {
                Notice::Celebrate { task_id } => {
                    let title = self
                        .board
                        .task(task_id)
                        .map(|task| task.title.clone())
                        .unwrap_or_else(|| task_id.to_string());
                    human.push_detail(format!("Nice work! '{title}' is done"));
                }
                Notice::Toast { message, .. } if events::is_warning(&notice) => {
                    human.push_warning(message.clone());
                }
                Notice::Toast { message, .. } => human.push_detail(message.clone()),
            }
        }
        for warning in self.event_warnings.drain(..) {
            human.push_warning(warning);
        }
        emit_success(self.output_options(), command, data, Some(&human))
    }
}
