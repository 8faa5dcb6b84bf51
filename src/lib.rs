//! tandem - shared kanban board library
//!
//! Core of a two-user kanban board: tasks in three status columns, kept in
//! an in-memory store that is reconciled with a backend and with realtime
//! change notifications from the other user's session.
//!
//! # Core Concepts
//!
//! - **Task Store**: the single in-memory source of truth for rendering
//! - **Position Reconciler**: turns a drag-and-drop into position writes
//! - **Realtime Merge**: applies remote inserts, updates and deletes,
//!   suppressing echoes of local writes
//! - **Recurrence**: completing a recurring task schedules its successor
//!
//! # Module Organization
//!
//! - `model`: tasks, statuses, drafts and validation
//! - `store`: in-memory task store, filters and counts
//! - `reorder`: drop-target position planning
//! - `realtime`: change notifications and merging
//! - `recurrence`: due-date advancement and successor tasks
//! - `activity`: per-task activity log entries
//! - `board`: user intents over store and backend
//! - `backend`: backend traits and the in-memory backend
//! - `storage`: file-backed board under `.tandem/`
//! - `dispatcher`: single-owner tokio event loop
//! - `cli`, `output`, `events`, `actor`, `config`: CLI plumbing

pub mod activity;
pub mod actor;
pub mod backend;
pub mod board;
pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod lock;
pub mod model;
pub mod output;
pub mod realtime;
pub mod recurrence;
pub mod reorder;
pub mod storage;
pub mod store;

pub use error::{Error, Result};
