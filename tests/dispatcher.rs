mod support;

use std::time::Duration;

use tandem::backend::{ChangeFeed, MemoryBackend};
use tandem::board::Notice;
use tandem::dispatcher;
use tandem::error::Error;
use tandem::model::Status;
use tandem::reorder::DropTarget;
use tandem::store::TaskFilter;

use support::board_on;

/// Poll until `check` holds; the feed is merged asynchronously.
async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

#[tokio::test]
async fn commands_round_trip_through_the_loop() {
    let backend = MemoryBackend::new();
    let handle = dispatcher::spawn(board_on(backend.clone(), "alex", 0), None);

    let id = handle.quick_add("Buy milk", Status::Todo).await.unwrap();
    let outcome = handle
        .move_task(id.clone(), DropTarget::Column(Status::Done))
        .await
        .unwrap()
        .expect("moved");
    assert_eq!(outcome.to, Status::Done);

    let (columns, counts) = handle.columns(TaskFilter::all()).await.unwrap();
    assert_eq!(columns.done.len(), 1);
    assert_eq!(counts.completed, 1);
    assert_eq!(
        handle.drain_notices().await.unwrap(),
        vec![Notice::Celebrate { task_id: id.clone() }]
    );

    let history = handle.history(id).await.unwrap();
    assert_eq!(history.len(), 2);

    let board = handle.shutdown().await.unwrap();
    assert_eq!(board.tasks().len(), 1);
    assert_eq!(backend.rows().len(), 1);
}

#[tokio::test]
async fn realtime_feed_is_merged_between_commands() {
    let backend = MemoryBackend::new();
    let alex = dispatcher::spawn(board_on(backend.clone(), "alex", 0), Some(backend.subscribe()));
    let sam = dispatcher::spawn(board_on(backend.clone(), "sam", 1000), Some(backend.subscribe()));

    let id = alex.quick_add("Pay rent", Status::InProgress).await.unwrap();
    eventually(|| {
        let sam = sam.clone();
        async move { sam.tasks().await.map(|tasks| tasks.len() == 1).unwrap_or(false) }
    })
    .await;

    sam.complete(id.clone()).await.unwrap().expect("moved");
    eventually(|| {
        let alex = alex.clone();
        let id = id.clone();
        async move {
            alex.tasks()
                .await
                .map(|tasks| tasks.iter().any(|task| task.id == id && task.status == Status::Done))
                .unwrap_or(false)
        }
    })
    .await;

    assert_eq!(
        alex.drain_notices().await.unwrap(),
        vec![Notice::Celebrate { task_id: id }]
    );
}

#[tokio::test]
async fn validation_errors_pass_through() {
    let handle = dispatcher::spawn(board_on(MemoryBackend::new(), "alex", 0), None);
    assert!(matches!(
        handle.quick_add("  ", Status::Todo).await,
        Err(Error::EmptyTitle)
    ));
}

#[tokio::test]
async fn handle_reports_closed_dispatcher() {
    let handle = dispatcher::spawn(board_on(MemoryBackend::new(), "alex", 0), None);
    let other = handle.clone();
    handle.shutdown().await.unwrap();

    assert!(matches!(other.tasks().await, Err(Error::DispatcherClosed)));
    assert!(matches!(
        other.quick_add("late", Status::Todo).await,
        Err(Error::DispatcherClosed)
    ));
}
