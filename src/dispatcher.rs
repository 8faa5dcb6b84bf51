//! Single-owner event loop for a live board.
//!
//! The [`Board`] moves into a tokio task. User commands and realtime
//! notifications are handled one at a time by that task, so no two handlers
//! ever touch the store concurrently.

use tokio::sync::{mpsc, oneshot};

use crate::activity::ActivityEntry;
use crate::backend::Backend;
use crate::board::{Board, MoveOutcome, Notice};
use crate::error::{Error, Result};
use crate::model::{Status, Task, TaskDraft, TaskId};
use crate::realtime::ChangeNotification;
use crate::reorder::DropTarget;
use crate::store::{BoardColumns, BoardCounts, TaskFilter};

type Reply<T> = oneshot::Sender<T>;

enum Command<B: Backend> {
    Refresh(Reply<Result<()>>),
    Create(TaskDraft, Reply<Result<TaskId>>),
    QuickAdd(String, Status, Reply<Result<TaskId>>),
    Edit(TaskId, TaskDraft, Reply<Result<()>>),
    Move(TaskId, DropTarget, Reply<Result<Option<MoveOutcome>>>),
    Delete(TaskId, Reply<Result<()>>),
    History(TaskId, Reply<Result<Vec<ActivityEntry>>>),
    Tasks(Reply<Vec<Task>>),
    Columns(TaskFilter, Reply<(BoardColumns, BoardCounts)>),
    DrainNotices(Reply<Vec<Notice>>),
    Shutdown(Reply<Board<B>>),
}

/// Cloneable handle to a board running in its own task.
pub struct BoardHandle<B: Backend> {
    tx: mpsc::UnboundedSender<Command<B>>,
}

impl<B: Backend> Clone for BoardHandle<B> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

/// Move `board` into a tokio task and return a handle to it.
///
/// When `feed` is given its notifications are merged between commands.
pub fn spawn<B>(board: Board<B>, feed: Option<mpsc::UnboundedReceiver<ChangeNotification>>) -> BoardHandle<B>
where
    B: Backend + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(run(board, rx, feed));
    BoardHandle { tx }
}

async fn run<B: Backend>(
    mut board: Board<B>,
    mut commands: mpsc::UnboundedReceiver<Command<B>>,
    mut feed: Option<mpsc::UnboundedReceiver<ChangeNotification>>,
) {
    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    tracing::debug!("all board handles dropped");
                    return;
                };
                if let Some(reply) = handle(&mut board, command) {
                    let _ = reply.send(board);
                    return;
                }
            }
            notification = next_notification(&mut feed) => {
                match notification {
                    Some(notification) => {
                        board.apply_notification(notification);
                    }
                    None => {
                        tracing::warn!("realtime feed closed");
                        feed = None;
                    }
                }
            }
        }
    }
}

async fn next_notification(
    feed: &mut Option<mpsc::UnboundedReceiver<ChangeNotification>>,
) -> Option<ChangeNotification> {
    match feed {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Run one command; returns the shutdown reply when the loop should stop.
fn handle<B: Backend>(board: &mut Board<B>, command: Command<B>) -> Option<Reply<Board<B>>> {
    match command {
        Command::Refresh(reply) => {
            let _ = reply.send(board.refresh());
        }
        Command::Create(draft, reply) => {
            let _ = reply.send(board.create(draft));
        }
        Command::QuickAdd(title, status, reply) => {
            let _ = reply.send(board.quick_add(&title, status));
        }
        Command::Edit(id, draft, reply) => {
            let _ = reply.send(board.edit(&id, draft));
        }
        Command::Move(id, target, reply) => {
            let _ = reply.send(board.move_task(&id, target));
        }
        Command::Delete(id, reply) => {
            let _ = reply.send(board.delete(&id));
        }
        Command::History(id, reply) => {
            let _ = reply.send(board.history(&id));
        }
        Command::Tasks(reply) => {
            let _ = reply.send(board.tasks().to_vec());
        }
        Command::Columns(filter, reply) => {
            let _ = reply.send((board.columns(&filter), board.counts(&filter)));
        }
        Command::DrainNotices(reply) => {
            let _ = reply.send(board.drain_notices());
        }
        Command::Shutdown(reply) => return Some(reply),
    }
    None
}

impl<B: Backend> BoardHandle<B> {
    async fn request<T>(&self, build: impl FnOnce(Reply<T>) -> Command<B>) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .map_err(|_| Error::DispatcherClosed)?;
        rx.await.map_err(|_| Error::DispatcherClosed)
    }

    pub async fn refresh(&self) -> Result<()> {
        self.request(Command::Refresh).await?
    }

    pub async fn create(&self, draft: TaskDraft) -> Result<TaskId> {
        self.request(|reply| Command::Create(draft, reply)).await?
    }

    pub async fn quick_add(&self, title: impl Into<String>, status: Status) -> Result<TaskId> {
        let title = title.into();
        self.request(|reply| Command::QuickAdd(title, status, reply))
            .await?
    }

    pub async fn edit(&self, id: TaskId, draft: TaskDraft) -> Result<()> {
        self.request(|reply| Command::Edit(id, draft, reply)).await?
    }

    pub async fn move_task(&self, id: TaskId, target: DropTarget) -> Result<Option<MoveOutcome>> {
        self.request(|reply| Command::Move(id, target, reply)).await?
    }

    pub async fn complete(&self, id: TaskId) -> Result<Option<MoveOutcome>> {
        self.move_task(id, DropTarget::Column(Status::Done)).await
    }

    pub async fn delete(&self, id: TaskId) -> Result<()> {
        self.request(|reply| Command::Delete(id, reply)).await?
    }

    pub async fn history(&self, id: TaskId) -> Result<Vec<ActivityEntry>> {
        self.request(|reply| Command::History(id, reply)).await?
    }

    pub async fn tasks(&self) -> Result<Vec<Task>> {
        self.request(Command::Tasks).await
    }

    pub async fn columns(&self, filter: TaskFilter) -> Result<(BoardColumns, BoardCounts)> {
        self.request(|reply| Command::Columns(filter, reply)).await
    }

    pub async fn drain_notices(&self) -> Result<Vec<Notice>> {
        self.request(Command::DrainNotices).await
    }

    /// Stop the loop and take the board back.
    pub async fn shutdown(self) -> Result<Board<B>> {
        self.request(Command::Shutdown).await
    }
}
