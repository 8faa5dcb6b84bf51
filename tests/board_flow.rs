mod support;

use serde_json::json;
use tokio::sync::mpsc::UnboundedReceiver;

use tandem::activity::ActivityAction;
use tandem::backend::{Backend, BackendOp, ChangeFeed, MemoryBackend};
use tandem::board::{Board, Notice};
use tandem::error::Error;
use tandem::model::{parse_due_date, Assignee, Recurrence, Status, Tag, TaskDraft, TaskId};
use tandem::realtime::{ChangeNotification, MergeOutcome};
use tandem::reorder::DropTarget;
use tandem::storage::{FileBackend, Storage};

use support::{board_on, ids, task};

fn pump<B: Backend>(
    board: &mut Board<B>,
    feed: &mut UnboundedReceiver<ChangeNotification>,
) -> Vec<MergeOutcome> {
    let mut outcomes = Vec::new();
    while let Ok(notification) = feed.try_recv() {
        outcomes.push(board.apply_notification(notification).outcome);
    }
    outcomes
}

#[test]
fn two_clients_converge_on_create_and_move() {
    let backend = MemoryBackend::new();
    let mut feed_a = backend.subscribe();
    let mut feed_b = backend.subscribe();
    let mut alex = board_on(backend.clone(), "alex", 0);
    let mut sam = board_on(backend.clone(), "sam", 1000);

    let id = alex.quick_add("Buy milk", Status::Todo).unwrap();
    assert_eq!(pump(&mut sam, &mut feed_b), vec![MergeOutcome::Inserted]);
    assert_eq!(pump(&mut alex, &mut feed_a), vec![MergeOutcome::DuplicateInsert]);

    alex.move_task(&id, DropTarget::Column(Status::InProgress))
        .unwrap()
        .expect("moved");
    assert_eq!(pump(&mut alex, &mut feed_a), vec![MergeOutcome::EchoSuppressed]);
    assert_eq!(pump(&mut sam, &mut feed_b), vec![MergeOutcome::Replaced]);

    assert_eq!(sam.task(&id).unwrap().status, Status::InProgress);
    assert_eq!(alex.tasks(), sam.tasks());
}

#[test]
fn remote_completion_celebrates_once_per_client() {
    let backend = MemoryBackend::new();
    let mut feed_a = backend.subscribe();
    let mut feed_b = backend.subscribe();
    let mut alex = board_on(backend.clone(), "alex", 0);
    let mut sam = board_on(backend.clone(), "sam", 1000);

    let id = alex.quick_add("Pay rent", Status::InProgress).unwrap();
    pump(&mut alex, &mut feed_a);
    pump(&mut sam, &mut feed_b);

    sam.complete(&id).unwrap().expect("moved");
    assert_eq!(sam.drain_notices(), vec![Notice::Celebrate { task_id: id.clone() }]);
    assert_eq!(pump(&mut sam, &mut feed_b), vec![MergeOutcome::EchoSuppressed]);
    assert!(sam.drain_notices().is_empty());

    assert_eq!(pump(&mut alex, &mut feed_a), vec![MergeOutcome::Replaced]);
    assert_eq!(alex.drain_notices(), vec![Notice::Celebrate { task_id: id }]);
}

#[test]
fn recurring_completion_spawns_one_successor() {
    let backend = MemoryBackend::new();
    let mut feed_b = backend.subscribe();
    let mut alex = board_on(backend.clone(), "alex", 0);
    let mut sam = board_on(backend.clone(), "sam", 1000);

    alex.quick_add("Take out bins", Status::Todo).unwrap();
    alex.quick_add("Call plumber", Status::Todo).unwrap();

    let mut draft = TaskDraft::quick("Water plants", Status::InProgress, alex.config());
    draft.assignee = Assignee::new("sam");
    draft.tags.insert(Tag::new("home"));
    draft.recurrence = Recurrence::Weekly;
    draft.due_date = Some(parse_due_date("2024-01-05").unwrap());
    let id = alex.create(draft).unwrap();

    let outcome = alex.complete(&id).unwrap().expect("moved");
    let next_id = outcome.successor.expect("successor created");
    let next = alex.task(&next_id).unwrap().clone();

    assert_eq!(next.title, "Water plants");
    assert_eq!(next.status, Status::Todo);
    assert_eq!(next.position, 2);
    assert_eq!(next.due_date, Some(parse_due_date("2024-01-12").unwrap()));
    assert_eq!(next.assignee, Assignee::new("sam"));
    assert!(next.has_tag(&Tag::new("home")));
    assert_eq!(next.recurrence, Recurrence::Weekly);
    assert!(next.completed_at.is_none());

    let activity = backend.activity();
    let completed: Vec<_> = activity
        .iter()
        .filter(|entry| entry.task_id == id && entry.action == ActivityAction::Completed)
        .collect();
    assert_eq!(completed.len(), 1);
    let spawned = activity
        .iter()
        .find(|entry| entry.task_id == next_id)
        .expect("successor activity");
    assert_eq!(spawned.action, ActivityAction::Created);
    assert_eq!(spawned.details, Some(json!({ "recurring_from": id.as_str() })));

    let outcomes = pump(&mut sam, &mut feed_b);
    assert_eq!(outcomes.iter().filter(|o| **o == MergeOutcome::Inserted).count(), 4);
    assert_eq!(sam.tasks().len(), 4);
}

#[test]
fn reorder_within_column_writes_only_changed_positions() {
    let backend = MemoryBackend::with_tasks(vec![
        task("a", Status::Todo, 0),
        task("b", Status::Todo, 1),
        task("c", Status::Todo, 2),
        task("d", Status::Todo, 3),
    ]);
    let mut feed = backend.subscribe();
    let mut board = board_on(backend.clone(), "alex", 0);

    let outcome = board
        .move_task(&TaskId::from("c"), DropTarget::Task(TaskId::from("b")))
        .unwrap()
        .expect("moved");
    assert_eq!(outcome.touched, 2);

    let mut updated = Vec::new();
    while let Ok(ChangeNotification::Update(task)) = feed.try_recv() {
        updated.push(task.id.to_string());
    }
    updated.sort();
    assert_eq!(updated, vec!["b", "c"]);

    let mut rows = backend.rows();
    rows.sort_by_key(|task| task.position);
    assert_eq!(ids(&rows), vec!["a", "c", "b", "d"]);
    let positions: Vec<i64> = rows.iter().map(|task| task.position).collect();
    assert_eq!(positions, vec![0, 1, 2, 3]);
}

#[test]
fn cross_column_drop_takes_target_slot() {
    let backend = MemoryBackend::with_tasks(vec![
        task("t0", Status::Todo, 0),
        task("t1", Status::Todo, 1),
        task("p0", Status::InProgress, 0),
        task("p1", Status::InProgress, 1),
        task("p2", Status::InProgress, 2),
    ]);
    let mut feed = backend.subscribe();
    let mut board = board_on(backend.clone(), "alex", 0);

    let outcome = board
        .move_task(&TaskId::from("t1"), DropTarget::Task(TaskId::from("p1")))
        .unwrap()
        .expect("moved");
    assert_eq!(outcome.from, Status::Todo);
    assert_eq!(outcome.to, Status::InProgress);
    assert_eq!(outcome.touched, 1);

    let moved = board.task(&TaskId::from("t1")).unwrap();
    assert_eq!(moved.status, Status::InProgress);
    assert_eq!(moved.position, 1);
    assert!(matches!(feed.try_recv(), Ok(ChangeNotification::Update(_))));
    assert!(feed.try_recv().is_err());
}

#[test]
fn self_drop_and_unknown_targets() {
    let backend = MemoryBackend::with_tasks(vec![task("a", Status::Todo, 0)]);
    let mut feed = backend.subscribe();
    let mut board = board_on(backend, "alex", 0);

    let id = TaskId::from("a");
    assert!(board
        .move_task(&id, DropTarget::Task(id.clone()))
        .unwrap()
        .is_none());
    assert!(board
        .move_task(&id, DropTarget::Column(Status::Todo))
        .unwrap()
        .is_none());
    assert!(matches!(
        board.move_task(&id, DropTarget::Task(TaskId::from("ghost"))),
        Err(Error::TaskNotFound(_))
    ));
    assert!(feed.try_recv().is_err());
}

#[test]
fn validation_failures_never_reach_backend() {
    let backend = MemoryBackend::new();
    let mut feed = backend.subscribe();
    let mut board = board_on(backend.clone(), "alex", 0);

    assert!(matches!(
        board.quick_add("   ", Status::Todo),
        Err(Error::EmptyTitle)
    ));

    let mut draft = TaskDraft::quick("Fix bike", Status::Todo, board.config());
    draft.assignee = Assignee::new("zoe");
    assert!(matches!(board.create(draft), Err(Error::UnknownAssignee(_))));

    let mut draft = TaskDraft::quick("Fix bike", Status::Todo, board.config());
    draft.tags.insert(Tag::new("garden"));
    assert!(matches!(board.create(draft), Err(Error::UnknownTag(_))));

    assert!(board.tasks().is_empty());
    assert!(backend.rows().is_empty());
    assert!(backend.activity().is_empty());
    assert!(feed.try_recv().is_err());
}

#[test]
fn failed_delete_is_restored_and_other_client_unaffected() {
    let backend = MemoryBackend::new();
    let mut feed_a = backend.subscribe();
    let mut alex = board_on(backend.clone(), "alex", 0);
    let mut sam = board_on(backend.clone(), "sam", 1000);

    let id = sam.quick_add("Renew passport", Status::Todo).unwrap();
    pump(&mut alex, &mut feed_a);

    backend.fail_next(BackendOp::Delete);
    sam.delete(&id).unwrap();
    assert!(sam.task(&id).is_some());
    assert!(matches!(
        sam.drain_notices().as_slice(),
        [Notice::Toast { .. }]
    ));

    assert!(pump(&mut alex, &mut feed_a).is_empty());
    assert!(alex.task(&id).is_some());

    sam.delete(&id).unwrap();
    assert_eq!(pump(&mut alex, &mut feed_a), vec![MergeOutcome::Removed]);
    assert!(alex.tasks().is_empty());
}

#[test]
fn file_backend_is_shared_between_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Storage::new(dir.path().to_path_buf());
    storage.init().unwrap();

    let mut alex = board_on(FileBackend::new(storage.clone()), "alex", 0);
    let first = alex.quick_add("Buy milk", Status::Todo).unwrap();
    let second = alex.quick_add("Buy bread", Status::Todo).unwrap();
    alex.move_task(&second, DropTarget::Task(first.clone()))
        .unwrap()
        .expect("moved");

    let mut sam = board_on(FileBackend::new(storage), "sam", 1000);
    assert_eq!(sam.tasks().len(), 2);
    let column: Vec<TaskId> = sam
        .columns(&Default::default())
        .todo
        .iter()
        .map(|task| task.id.clone())
        .collect();
    assert_eq!(column, vec![second.clone(), first]);

    sam.delete(&second).unwrap();
    let history = sam.history(&second).unwrap();
    assert_eq!(history[0].action, ActivityAction::Deleted);
    assert_eq!(history[0].actor, "sam");
}
