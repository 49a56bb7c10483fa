//! Change monitor behavior against a recording in-memory store

use std::sync::Arc;

use drivemirror_core::domain::Timestamp;
use drivemirror_sync::monitor::{ChangeMonitor, EventOutcome, MonitorExit};
use drivemirror_sync::watcher::{ChangeEvent, WatchSignal};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::common::{fast_readiness, set_mtime, write_file, Call, MemoryStore};

fn monitor(store: &Arc<MemoryStore>) -> ChangeMonitor {
    ChangeMonitor::new(store.clone(), store.folder(), fast_readiness())
}

#[tokio::test]
async fn test_identical_modify_events_upload_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "a.txt", 500);
    let store = Arc::new(MemoryStore::new());
    let mut monitor = monitor(&store);

    for _ in 0..3 {
        monitor
            .handle_event(ChangeEvent::Modified(path.clone()))
            .await
            .unwrap();
    }

    assert_eq!(store.calls(), vec![Call::Upload("a.txt".into())]);
}

#[tokio::test]
async fn test_increasing_modify_events_upload_each_time() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "a.txt", 500);
    let store = Arc::new(MemoryStore::new());
    let mut monitor = monitor(&store);

    monitor.handle_event(ChangeEvent::Modified(path.clone())).await.unwrap();
    set_mtime(&path, 600);
    monitor.handle_event(ChangeEvent::Modified(path.clone())).await.unwrap();

    assert_eq!(store.calls().len(), 2);
    assert_eq!(
        monitor.ledger().last_uploaded(&path),
        Some(Timestamp::from_millis(600))
    );
}

#[tokio::test]
async fn test_create_is_never_suppressed() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "a.txt", 500);
    let store = Arc::new(MemoryStore::new());
    let mut monitor = monitor(&store);

    monitor.handle_event(ChangeEvent::Modified(path.clone())).await.unwrap();
    let outcome = monitor
        .handle_event(ChangeEvent::Created(path.clone()))
        .await
        .unwrap();

    assert_eq!(outcome, EventOutcome::Uploaded);
    assert_eq!(store.calls().len(), 2);
}

#[tokio::test]
async fn test_recreated_file_with_older_time_is_uploaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "a.txt", 900);
    let store = Arc::new(MemoryStore::new());
    let mut monitor = monitor(&store);

    monitor.handle_event(ChangeEvent::Modified(path.clone())).await.unwrap();
    std::fs::remove_file(&path).unwrap();
    monitor.handle_event(ChangeEvent::Deleted(path.clone())).await.unwrap();

    // Restored from an archive with its original, older time
    write_file(dir.path(), "a.txt", 800);
    let outcome = monitor
        .handle_event(ChangeEvent::Modified(path.clone()))
        .await
        .unwrap();

    assert_eq!(outcome, EventOutcome::Uploaded);
}

#[tokio::test]
async fn test_delete_removes_all_remote_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    store.seed("a.txt", Some(1));
    store.seed("a.txt", Some(2));
    let mut monitor = monitor(&store);

    let outcome = monitor
        .handle_event(ChangeEvent::Deleted(dir.path().join("a.txt")))
        .await
        .unwrap();

    assert_eq!(outcome, EventOutcome::Deleted { count: 2 });
    assert!(store.snapshot().is_empty());
}

#[tokio::test]
async fn test_run_isolates_failures_and_processes_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_file(dir.path(), "a.txt", 10);
    let b = write_file(dir.path(), "b.txt", 20);
    let c = write_file(dir.path(), "c.txt", 30);

    let store = Arc::new(MemoryStore::new());
    store.fail_uploads_of("a.txt");
    let mut monitor = monitor(&store);

    let (tx, mut rx) = mpsc::channel(16);
    for path in [&a, &b, &c] {
        tx.send(WatchSignal::Event(ChangeEvent::Created(path.clone())))
            .await
            .unwrap();
    }
    tx.send(WatchSignal::Failed("stop".into())).await.unwrap();

    let exit = monitor.run(&mut rx, CancellationToken::new()).await;

    assert_eq!(exit, MonitorExit::WatchFailed("stop".into()));
    assert_eq!(
        store.calls(),
        vec![
            Call::Upload("a.txt".into()),
            Call::Upload("b.txt".into()),
            Call::Upload("c.txt".into()),
        ]
    );
    assert_eq!(
        store.snapshot(),
        vec![("b.txt".into(), Some(20)), ("c.txt".into(), Some(30))]
    );
}

#[tokio::test]
async fn test_run_stops_when_shutdown_is_requested() {
    let store = Arc::new(MemoryStore::new());
    let mut monitor = monitor(&store);
    let (_tx, mut rx) = mpsc::channel::<WatchSignal>(4);
    let shutdown = CancellationToken::new();

    let trigger = shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let exit = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        monitor.run(&mut rx, shutdown),
    )
    .await
    .expect("monitor did not stop");
    assert_eq!(exit, MonitorExit::Shutdown);
}
