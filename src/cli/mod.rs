//! Command-line interface for tandem
//!
//! This module defines the CLI structure using clap derive macros.
//! Each group of subcommands is implemented in its own submodule.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::error::Result;

mod actor;
mod board;
mod context;
mod init;
mod task;

/// tandem - a shared kanban board for two
///
/// Tasks live in three columns (todo, in progress, done) and can be
/// reordered, assigned, tagged and scheduled to recur.
#[derive(Parser, Debug)]
#[command(name = "tandem")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Board directory (defaults to current directory)
    #[arg(long, global = true, env = "TANDEM_DIR")]
    pub dir: Option<PathBuf>,

    /// Actor identity recorded in the activity log
    #[arg(long, global = true)]
    pub actor: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit JSONL events to a file or '-' for stdout
    #[arg(long, global = true)]
    pub events: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Fields shared by task create and edit forms
#[derive(Args, Debug, Default, Clone)]
pub struct TaskFields {
    /// Longer description
    #[arg(short, long)]
    pub description: Option<String>,

    /// Column: todo, in_progress, done
    #[arg(short, long)]
    pub status: Option<String>,

    /// Priority: low, medium, high
    #[arg(short, long)]
    pub priority: Option<String>,

    /// Assignee (one of the configured users)
    #[arg(short, long)]
    pub assignee: Option<String>,

    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    pub due: Option<String>,

    /// Tag (repeatable)
    #[arg(short, long = "tag")]
    pub tags: Vec<String>,

    /// Recurrence: none, daily, weekly, monthly
    #[arg(long)]
    pub recur: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a board in the current directory
    Init,

    /// Show or persist the actor identity
    Actor {
        /// Name to persist in .tandem/actor
        name: Option<String>,
    },

    /// Create a task
    Add {
        /// Task title
        title: String,

        #[command(flatten)]
        fields: TaskFields,
    },

    /// Create a task with only a title
    Quick {
        /// Task title
        title: String,

        /// Column to add to
        #[arg(short, long, default_value = "todo")]
        status: String,
    },

    /// Show the board columns
    Board {
        /// Only tasks assigned to this user
        #[arg(short, long)]
        assignee: Option<String>,

        /// Only tasks with this tag
        #[arg(short, long)]
        tag: Option<String>,
    },

    /// Drag a task to a column or onto another task
    Move {
        /// Task ID (or unique prefix)
        id: String,

        /// Drop onto this column
        #[arg(long, conflicts_with = "onto", required_unless_present = "onto")]
        to: Option<String>,

        /// Drop onto this task's slot
        #[arg(long)]
        onto: Option<String>,
    },

    /// Edit a task
    Edit {
        /// Task ID (or unique prefix)
        id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        #[command(flatten)]
        fields: TaskFields,

        /// Remove the due date
        #[arg(long, conflicts_with = "due")]
        clear_due: bool,

        /// Remove all tags before adding any given with --tag
        #[arg(long)]
        clear_tags: bool,

        /// Remove the description
        #[arg(long, conflicts_with = "description")]
        clear_description: bool,
    },

    /// Mark a task done
    Done {
        /// Task ID (or unique prefix)
        id: String,
    },

    /// Delete a task
    #[command(alias = "delete")]
    Rm {
        /// Task ID (or unique prefix)
        id: String,
    },

    /// Show recent activity for a task
    History {
        /// Task ID (or unique prefix)
        id: String,
    },

    /// Show board statistics
    Stats {
        /// Only tasks assigned to this user
        #[arg(short, long)]
        assignee: Option<String>,

        /// Only tasks with this tag
        #[arg(short, long)]
        tag: Option<String>,
    },
}

/// Global flags carried into every command
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub dir: Option<PathBuf>,
    pub actor: Option<String>,
    pub json: bool,
    pub quiet: bool,
    pub events: Option<String>,
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let globals = GlobalOptions {
            dir: self.dir,
            actor: self.actor,
            json: self.json,
            quiet: self.quiet,
            events: self.events,
        };

        match self.command {
            Commands::Init => init::run(globals),
            Commands::Actor { name } => actor::run(globals, name),
            Commands::Add { title, fields } => task::run_add(task::AddOptions {
                title,
                fields,
                globals,
            }),
            Commands::Quick { title, status } => task::run_quick(task::QuickOptions {
                title,
                status,
                globals,
            }),
            Commands::Board { assignee, tag } => board::run_board(board::BoardOptions {
                assignee,
                tag,
                globals,
            }),
            Commands::Move { id, to, onto } => task::run_move(task::MoveOptions {
                id,
                to,
                onto,
                globals,
            }),
            Commands::Edit {
                id,
                title,
                fields,
                clear_due,
                clear_tags,
                clear_description,
            } => task::run_edit(task::EditOptions {
                id,
                title,
                fields,
                clear_due,
                clear_tags,
                clear_description,
                globals,
            }),
            Commands::Done { id } => task::run_done(task::IdOptions { id, globals }),
            Commands::Rm { id } => task::run_rm(task::IdOptions { id, globals }),
            Commands::History { id } => task::run_history(task::IdOptions { id, globals }),
            Commands::Stats { assignee, tag } => board::run_stats(board::BoardOptions {
                assignee,
                tag,
                globals,
            }),
        }
    }
}
