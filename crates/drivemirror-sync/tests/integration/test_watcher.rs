//! Real filesystem watcher smoke tests

use std::time::Duration;

use drivemirror_sync::watcher::{ChangeEvent, FileWatcher, WatchSignal};
use tokio::sync::mpsc;

async fn next_event(rx: &mut mpsc::Receiver<WatchSignal>) -> Option<WatchSignal> {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .ok()
        .flatten()
}

#[tokio::test]
async fn test_watcher_reports_new_file() {
    let dir = tempfile::tempdir().unwrap();
    let (watcher, mut rx) = FileWatcher::new(dir.path(), 64).unwrap();
    assert_eq!(watcher.dir(), dir.path());

    let path = dir.path().join("hello.txt");
    std::fs::write(&path, b"hi").unwrap();

    let mut seen_create = false;
    while let Some(signal) = next_event(&mut rx).await {
        if let WatchSignal::Event(ChangeEvent::Created(p)) = &signal {
            if p.file_name() == path.file_name() {
                seen_create = true;
                break;
            }
        }
    }
    assert!(seen_create, "expected a Created event for hello.txt");

    watcher.stop().unwrap();
}

#[tokio::test]
async fn test_watcher_ignores_nested_files() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("nested");
    std::fs::create_dir(&nested).unwrap();

    let (_watcher, mut rx) = FileWatcher::new(dir.path(), 64).unwrap();
    std::fs::write(nested.join("deep.txt"), b"x").unwrap();
    std::fs::write(dir.path().join("marker.txt"), b"x").unwrap();

    while let Some(signal) = next_event(&mut rx).await {
        if let WatchSignal::Event(event) = &signal {
            assert_ne!(event.path().file_name().unwrap(), "deep.txt");
            if event.path().file_name().unwrap() == "marker.txt" {
                return;
            }
        }
    }
    panic!("expected an event for marker.txt");
}

#[tokio::test]
async fn test_watching_missing_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    assert!(FileWatcher::new(&dir.path().join("missing"), 8).is_err());
}
