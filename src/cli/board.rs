//! tandem board and stats commands.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{Assignee, Status, Tag};
use crate::output::HumanOutput;
use crate::store::{BoardColumns, BoardCounts, TaskFilter};

use super::context::BoardContext;
use super::task::{format_due, short_id};
use super::GlobalOptions;

pub struct BoardOptions {
    pub assignee: Option<String>,
    pub tag: Option<String>,
    pub globals: GlobalOptions,
}

#[derive(Serialize)]
struct BoardOutput {
    counts: BoardCounts,
    columns: BoardColumns,
}

#[derive(Serialize)]
struct StatsOutput {
    counts: BoardCounts,
    by_status: Vec<StatusCount>,
}

#[derive(Serialize)]
struct StatusCount {
    status: Status,
    count: usize,
}

pub fn run_board(options: BoardOptions) -> Result<()> {
    let ctx = BoardContext::load(options.globals)?;
    let filter = build_filter(&ctx, options.assignee, options.tag)?;
    let columns = ctx.board.columns(&filter);
    let counts = ctx.board.counts(&filter);

    let mut human = HumanOutput::new("Board");
    push_counts(&mut human, &counts);
    push_filter(&mut human, &filter);
    for status in Status::ALL {
        let column = columns.column(status);
        human.push_detail(format!("{} ({})", status.label(), column.len()));
        for task in column {
            let mut line = format!(
                "  {} [{}] {} @{}",
                short_id(&task.id),
                task.priority,
                task.title,
                task.assignee
            );
            if task.due_date.is_some() {
                line.push_str(&format!(" due {}", format_due(task)));
            }
            if !task.tags.is_empty() {
                let tags: Vec<String> = task.tags.iter().map(|tag| format!("#{tag}")).collect();
                line.push(' ');
                line.push_str(&tags.join(" "));
            }
            human.push_detail(line);
        }
    }

    ctx.finish("board", &BoardOutput { counts, columns }, human)
}

pub fn run_stats(options: BoardOptions) -> Result<()> {
    let ctx = BoardContext::load(options.globals)?;
    let filter = build_filter(&ctx, options.assignee, options.tag)?;
    let columns = ctx.board.columns(&filter);
    let counts = ctx.board.counts(&filter);

    let by_status: Vec<StatusCount> = Status::ALL
        .into_iter()
        .map(|status| StatusCount {
            status,
            count: columns.column(status).len(),
        })
        .collect();

    let mut human = HumanOutput::new("Board stats");
    push_counts(&mut human, &counts);
    push_filter(&mut human, &filter);
    for entry in &by_status {
        human.push_detail(format!("{}: {}", entry.status.label(), entry.count));
    }

    ctx.finish("stats", &StatsOutput { counts, by_status }, human)
}

fn build_filter(
    ctx: &BoardContext,
    assignee: Option<String>,
    tag: Option<String>,
) -> Result<TaskFilter> {
    let config = ctx.board.config();
    let assignee = assignee
        .map(|name| {
            let name = name.trim();
            if config.has_user(name) {
                Ok(Assignee::new(name))
            } else {
                Err(Error::UnknownAssignee(name.to_string()))
            }
        })
        .transpose()?;
    let tag = tag
        .map(|value| {
            let value = value.trim();
            if config.has_tag(value) {
                Ok(Tag::new(value))
            } else {
                Err(Error::UnknownTag(value.to_string()))
            }
        })
        .transpose()?;
    Ok(TaskFilter { assignee, tag })
}

fn push_counts(human: &mut HumanOutput, counts: &BoardCounts) {
    human.push_summary(
        "Completed",
        format!("{}/{}", counts.completed, counts.total),
    );
    human.push_summary("Due today", counts.due_today.to_string());
}

fn push_filter(human: &mut HumanOutput, filter: &TaskFilter) {
    if let Some(assignee) = &filter.assignee {
        human.push_summary("Assignee", assignee.to_string());
    }
    if let Some(tag) = &filter.tag {
        human.push_summary("Tag", tag.to_string());
    }
}
