//! tandem task command implementations.

use serde::Serialize;

use crate::activity::ActivityEntry;
use crate::board::MoveOutcome;
use crate::error::{Error, Result};
use crate::events::EventKind;
use crate::model::{parse_due_date, Assignee, Status, Tag, Task, TaskDraft, TaskId};
use crate::output::HumanOutput;
use crate::reorder::DropTarget;

use super::context::BoardContext;
use super::{GlobalOptions, TaskFields};

pub struct AddOptions {
    pub title: String,
    pub fields: TaskFields,
    pub globals: GlobalOptions,
}

pub struct QuickOptions {
    pub title: String,
    pub status: String,
    pub globals: GlobalOptions,
}

pub struct MoveOptions {
    pub id: String,
    pub to: Option<String>,
    pub onto: Option<String>,
    pub globals: GlobalOptions,
}

pub struct EditOptions {
    pub id: String,
    pub title: Option<String>,
    pub fields: TaskFields,
    pub clear_due: bool,
    pub clear_tags: bool,
    pub clear_description: bool,
    pub globals: GlobalOptions,
}

pub struct IdOptions {
    pub id: String,
    pub globals: GlobalOptions,
}

#[derive(Serialize)]
struct TaskOutput<'a> {
    task: &'a Task,
}

#[derive(Serialize)]
struct MoveOutput<'a> {
    moved: bool,
    task: &'a Task,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<&'a MoveOutcome>,
}

#[derive(Serialize)]
struct DeleteOutput<'a> {
    id: &'a TaskId,
    title: &'a str,
}

#[derive(Serialize)]
struct HistoryOutput<'a> {
    id: &'a TaskId,
    total: usize,
    entries: &'a [ActivityEntry],
}

pub fn run_add(options: AddOptions) -> Result<()> {
    let mut ctx = BoardContext::load(options.globals)?;
    let mut draft = TaskDraft::quick(options.title, Status::Todo, ctx.board.config());
    apply_fields(&mut draft, options.fields)?;

    let id = ctx.board.create(draft)?;
    finish_created(ctx, "add", &id)
}

pub fn run_quick(options: QuickOptions) -> Result<()> {
    let mut ctx = BoardContext::load(options.globals)?;
    let status: Status = options.status.parse()?;
    let id = ctx.board.quick_add(&options.title, status)?;
    finish_created(ctx, "quick", &id)
}

fn finish_created(mut ctx: BoardContext, command: &str, id: &TaskId) -> Result<()> {
    let task = current_task(&ctx, id)?;
    ctx.emit(EventKind::TaskCreated, id, &task);

    let mut human = HumanOutput::new("Task created");
    push_task_summary(&mut human, &task);
    human.push_next_step(format!("tandem move {} --to in_progress", short_id(id)));

    ctx.finish(command, &TaskOutput { task: &task }, human)
}

pub fn run_move(options: MoveOptions) -> Result<()> {
    let mut ctx = BoardContext::load(options.globals)?;
    let id = ctx.board.resolve_id(&options.id)?;
    let target = match (options.to, options.onto) {
        (Some(status), None) => DropTarget::Column(status.parse()?),
        (None, Some(onto)) => DropTarget::Task(ctx.board.resolve_id(&onto)?),
        _ => {
            return Err(Error::InvalidArgument(
                "exactly one of --to or --onto is required".to_string(),
            ))
        }
    };

    let outcome = ctx.board.move_task(&id, target)?;
    finish_moved(ctx, "move", &id, outcome)
}

pub fn run_done(options: IdOptions) -> Result<()> {
    let mut ctx = BoardContext::load(options.globals)?;
    let id = ctx.board.resolve_id(&options.id)?;
    let outcome = ctx.board.complete(&id)?;
    finish_moved(ctx, "done", &id, outcome)
}

fn finish_moved(
    mut ctx: BoardContext,
    command: &str,
    id: &TaskId,
    outcome: Option<MoveOutcome>,
) -> Result<()> {
    let task = current_task(&ctx, id)?;

    let header = match &outcome {
        None => "Task not moved: already in place".to_string(),
        Some(outcome) if outcome.from != outcome.to => {
            format!("Task moved: {} -> {}", outcome.from.label(), outcome.to.label())
        }
        Some(outcome) => format!("Task reordered in {}", outcome.to.label()),
    };
    let mut human = HumanOutput::new(header);
    push_task_summary(&mut human, &task);

    if let Some(outcome) = &outcome {
        let kind = if outcome.to.is_done() && !outcome.from.is_done() {
            EventKind::TaskCompleted
        } else {
            EventKind::TaskMoved
        };
        ctx.emit(kind, id, outcome);
        human.push_summary("Touched", outcome.touched.to_string());

        if let Some(next_id) = &outcome.successor {
            if let Some(next) = ctx.board.task(next_id).cloned() {
                ctx.emit(EventKind::TaskCreated, next_id, &next);
                human.push_detail(format!(
                    "Next occurrence {} due {}",
                    short_id(next_id),
                    format_due(&next)
                ));
            }
        }
    }

    let output = MoveOutput {
        moved: outcome.is_some(),
        task: &task,
        outcome: outcome.as_ref(),
    };
    ctx.finish(command, &output, human)
}

pub fn run_edit(options: EditOptions) -> Result<()> {
    let mut ctx = BoardContext::load(options.globals)?;
    let id = ctx.board.resolve_id(&options.id)?;
    let before = current_task(&ctx, &id)?;

    let mut draft = TaskDraft::from_task(&before);
    if let Some(title) = options.title {
        draft.title = title;
    }
    if options.clear_due {
        draft.due_date = None;
    }
    if options.clear_tags {
        draft.tags.clear();
    }
    if options.clear_description {
        draft.description = None;
    }
    apply_fields(&mut draft, options.fields)?;

    let known: Vec<TaskId> = ctx.board.tasks().iter().map(|task| task.id.clone()).collect();
    ctx.board.edit(&id, draft)?;
    let task = current_task(&ctx, &id)?;

    let changed = task != before;
    let mut human = HumanOutput::new(if changed {
        "Task updated"
    } else {
        "Task unchanged"
    });
    push_task_summary(&mut human, &task);
    if changed {
        ctx.emit(EventKind::TaskUpdated, &id, &task);
    }

    let spawned: Vec<Task> = ctx
        .board
        .tasks()
        .iter()
        .filter(|candidate| !known.contains(&candidate.id))
        .cloned()
        .collect();
    for next in &spawned {
        ctx.emit(EventKind::TaskCreated, &next.id, next);
        human.push_detail(format!(
            "Next occurrence {} due {}",
            short_id(&next.id),
            format_due(next)
        ));
    }

    ctx.finish("edit", &TaskOutput { task: &task }, human)
}

pub fn run_rm(options: IdOptions) -> Result<()> {
    let mut ctx = BoardContext::load(options.globals)?;
    let id = ctx.board.resolve_id(&options.id)?;
    let task = current_task(&ctx, &id)?;

    ctx.board.delete(&id)?;
    let removed = ctx.board.task(&id).is_none();
    if removed {
        ctx.emit(EventKind::TaskDeleted, &id, &task);
    }

    let mut human = HumanOutput::new(if removed {
        "Task deleted"
    } else {
        "Task not deleted"
    });
    human.push_summary("ID", id.to_string());
    human.push_summary("Title", task.title.clone());

    let output = DeleteOutput {
        id: &id,
        title: &task.title,
    };
    ctx.finish("rm", &output, human)
}

pub fn run_history(options: IdOptions) -> Result<()> {
    let mut ctx = BoardContext::load(options.globals)?;
    let id = ctx.board.resolve_id(&options.id)?;
    let task = current_task(&ctx, &id)?;
    let entries = ctx.board.history(&id)?;

    let mut human = HumanOutput::new(format!("History: {}", task.title));
    human.push_summary("ID", id.to_string());
    human.push_summary("Entries", entries.len().to_string());
    for entry in &entries {
        let mut line = format!(
            "{} {} {}",
            entry.created_at.format("%Y-%m-%d %H:%M"),
            entry.actor,
            entry.action.as_str()
        );
        if let Some(details) = &entry.details {
            line.push_str(&format!(" {details}"));
        }
        human.push_detail(line);
    }

    let output = HistoryOutput {
        id: &id,
        total: entries.len(),
        entries: &entries,
    };
    ctx.finish("history", &output, human)
}

fn apply_fields(draft: &mut TaskDraft, fields: TaskFields) -> Result<()> {
    if let Some(description) = fields.description {
        draft.description = Some(description);
    }
    if let Some(status) = fields.status {
        draft.status = status.parse()?;
    }
    if let Some(priority) = fields.priority {
        draft.priority = priority.parse()?;
    }
    if let Some(assignee) = fields.assignee {
        draft.assignee = Assignee::new(assignee.trim());
    }
    if let Some(due) = fields.due {
        draft.due_date = Some(parse_due_date(&due)?);
    }
    draft
        .tags
        .extend(fields.tags.iter().map(|tag| Tag::new(tag.trim())));
    if let Some(recur) = fields.recur {
        draft.recurrence = recur.parse()?;
    }
    Ok(())
}

fn current_task(ctx: &BoardContext, id: &TaskId) -> Result<Task> {
    ctx.board
        .task(id)
        .cloned()
        .ok_or_else(|| Error::TaskNotFound(id.to_string()))
}

fn push_task_summary(human: &mut HumanOutput, task: &Task) {
    human.push_summary("ID", task.id.to_string());
    human.push_summary("Title", task.title.clone());
    human.push_summary("Status", task.status.label());
    human.push_summary("Assignee", task.assignee.to_string());
    human.push_summary("Priority", task.priority.as_str());
    if task.due_date.is_some() {
        human.push_summary("Due", format_due(task));
    }
    if !task.tags.is_empty() {
        let tags: Vec<&str> = task.tags.iter().map(Tag::as_str).collect();
        human.push_summary("Tags", tags.join(", "));
    }
    if task.recurrence.is_recurring() {
        human.push_summary("Repeats", task.recurrence.as_str());
    }
}

pub(crate) fn format_due(task: &Task) -> String {
    task.due_date
        .map(|due| due.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub(crate) fn short_id(id: &TaskId) -> &str {
    let value = id.as_str();
    value.get(..10).unwrap_or(value)
}
