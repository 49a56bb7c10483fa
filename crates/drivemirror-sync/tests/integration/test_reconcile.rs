//! Reconciler behavior against a recording in-memory store

use std::sync::Arc;

use drivemirror_sync::reconciler::Reconciler;
use drivemirror_sync::SyncError;

use crate::common::{fast_readiness, set_mtime, write_file, Call, MemoryStore};

fn reconciler(store: &Arc<MemoryStore>) -> Reconciler {
    Reconciler::new(store.clone(), fast_readiness())
}

#[tokio::test]
async fn test_mixed_scenario_issues_exactly_three_operations() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "a.txt", 100);
    write_file(dir.path(), "b.txt", 200);

    let store = Arc::new(MemoryStore::new());
    store.seed("a.txt", Some(50));
    store.seed("c.txt", Some(10));

    let report = reconciler(&store)
        .reconcile(dir.path(), &store.folder())
        .await
        .unwrap();

    assert_eq!(
        store.calls(),
        vec![
            Call::Upload("a.txt".into()),
            Call::Upload("b.txt".into()),
            Call::Delete("c.txt".into()),
        ]
    );
    assert_eq!(report.uploaded, 2);
    assert_eq!(report.deleted, 1);
    assert!(report.errors.is_empty());
    assert_eq!(
        store.snapshot(),
        vec![("a.txt".into(), Some(100)), ("b.txt".into(), Some(200))]
    );
}

#[tokio::test]
async fn test_second_pass_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "a.txt", 1_700_000_000_123);
    write_file(dir.path(), "b.txt", 1_700_000_000_456);

    let store = Arc::new(MemoryStore::new());
    store.seed("stale.txt", None);
    let reconciler = reconciler(&store);

    reconciler.reconcile(dir.path(), &store.folder()).await.unwrap();
    assert_eq!(store.calls().len(), 3);
    store.clear_calls();

    let report = reconciler.reconcile(dir.path(), &store.folder()).await.unwrap();
    assert!(store.calls().is_empty());
    assert_eq!(report.uploaded, 0);
    assert_eq!(report.deleted, 0);
}

#[tokio::test]
async fn test_uploads_only_when_strictly_newer() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "newer.txt", 101);
    write_file(dir.path(), "equal.txt", 100);
    write_file(dir.path(), "older.txt", 99);

    let store = Arc::new(MemoryStore::new());
    store.seed("newer.txt", Some(100));
    store.seed("equal.txt", Some(100));
    store.seed("older.txt", Some(100));

    reconciler(&store)
        .reconcile(dir.path(), &store.folder())
        .await
        .unwrap();

    assert_eq!(store.calls(), vec![Call::Upload("newer.txt".into())]);
}

#[tokio::test]
async fn test_missing_or_timeless_remote_always_uploads() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "fresh.txt", 0);
    write_file(dir.path(), "unknown.txt", 0);

    let store = Arc::new(MemoryStore::new());
    store.seed("unknown.txt", None);

    reconciler(&store)
        .reconcile(dir.path(), &store.folder())
        .await
        .unwrap();

    assert_eq!(
        store.calls(),
        vec![
            Call::Upload("fresh.txt".into()),
            Call::Upload("unknown.txt".into()),
        ]
    );
}

#[tokio::test]
async fn test_orphan_duplicates_deleted_with_one_call() {
    let dir = tempfile::tempdir().unwrap();

    let store = Arc::new(MemoryStore::new());
    store.seed("dup.txt", Some(1));
    store.seed("dup.txt", Some(2));
    store.seed("dup.txt", None);

    let report = reconciler(&store)
        .reconcile(dir.path(), &store.folder())
        .await
        .unwrap();

    assert_eq!(store.calls(), vec![Call::Delete("dup.txt".into())]);
    assert_eq!(report.deleted, 3);
    assert!(store.snapshot().is_empty());
}

#[tokio::test]
async fn test_upload_failure_does_not_stop_the_pass() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "a.txt", 10);
    write_file(dir.path(), "b.txt", 20);
    write_file(dir.path(), "c.txt", 30);

    let store = Arc::new(MemoryStore::new());
    store.fail_uploads_of("a.txt");

    let report = reconciler(&store)
        .reconcile(dir.path(), &store.folder())
        .await
        .unwrap();

    assert_eq!(store.calls().len(), 3);
    assert_eq!(report.uploaded, 2);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("a.txt"));
    assert_eq!(
        store.snapshot(),
        vec![("b.txt".into(), Some(20)), ("c.txt".into(), Some(30))]
    );
}

#[tokio::test]
async fn test_touching_a_file_uploads_it_again() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "a.txt", 1_000);

    let store = Arc::new(MemoryStore::new());
    let reconciler = reconciler(&store);
    reconciler.reconcile(dir.path(), &store.folder()).await.unwrap();
    store.clear_calls();

    set_mtime(&path, 2_000);
    reconciler.reconcile(dir.path(), &store.folder()).await.unwrap();

    assert_eq!(store.calls(), vec![Call::Upload("a.txt".into())]);
    assert_eq!(store.snapshot(), vec![("a.txt".into(), Some(2_000))]);
}

#[tokio::test]
async fn test_subdirectories_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("nested")).unwrap();
    write_file(&dir.path().join("nested"), "deep.txt", 5);

    let store = Arc::new(MemoryStore::new());
    reconciler(&store)
        .reconcile(dir.path(), &store.folder())
        .await
        .unwrap();

    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn test_unreachable_folder_aborts_without_mutation() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "a.txt", 10);

    let store = Arc::new(MemoryStore::new());
    store.seed("orphan.txt", Some(1));
    store.set_reachable(false);

    let err = reconciler(&store)
        .reconcile(dir.path(), &store.folder())
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::FolderUnreachable(_)));
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn test_missing_local_dir_aborts_without_mutation() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing");

    let store = Arc::new(MemoryStore::new());
    store.seed("orphan.txt", Some(1));

    let err = reconciler(&store)
        .reconcile(&missing, &store.folder())
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::LocalDirMissing(_)));
    assert!(store.calls().is_empty());
    assert_eq!(store.snapshot().len(), 1);
}

#[tokio::test]
async fn test_backslash_local_name_is_mirrored() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "a\\b.txt", 100);
    write_file(dir.path(), "plain.txt", 100);

    let store = Arc::new(MemoryStore::new());
    let report = reconciler(&store)
        .reconcile(dir.path(), &store.folder())
        .await
        .unwrap();

    assert_eq!(
        store.calls(),
        vec![
            Call::Upload("a\\b.txt".into()),
            Call::Upload("plain.txt".into()),
        ]
    );
    assert_eq!(report.uploaded, 2);
}

#[tokio::test]
async fn test_orphan_with_unrepresentable_name_is_deleted() {
    let dir = tempfile::tempdir().unwrap();

    let store = Arc::new(MemoryStore::new());
    store.seed("x/y.txt", Some(10));

    let report = reconciler(&store)
        .reconcile(dir.path(), &store.folder())
        .await
        .unwrap();

    assert_eq!(store.calls(), vec![Call::Delete("x/y.txt".into())]);
    assert_eq!(report.deleted, 1);
    assert!(store.snapshot().is_empty());
}
