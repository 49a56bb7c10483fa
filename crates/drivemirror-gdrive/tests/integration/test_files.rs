//! Listing, upsert uploads, and delete-by-name

use drivemirror_core::domain::Timestamp;
use drivemirror_core::ports::IRemoteStore;
use drivemirror_gdrive::client::{children_query, named_child_query};
use drivemirror_gdrive::DriveError;
use wiremock::matchers::{body_string_contains, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{file_json, file_name, folder_id, mount_list, setup_drive_mock, FOLDER_ID};

const MODIFIED: &str = "2026-01-15T10:00:00.123Z";
const MODIFIED_MS: i64 = 1_768_471_200_123;

#[tokio::test]
async fn test_list_entries_follows_pages() {
    let (server, store) = setup_drive_mock().await;
    let q = children_query(FOLDER_ID);

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param("q", q.as_str()))
        .and(query_param("pageSize", "1000"))
        .and(query_param_is_missing("pageToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": [file_json("id-a", "a.txt", Some(MODIFIED))],
            "nextPageToken": "p2"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param("pageToken", "p2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": [file_json("id-b", "b.txt", None)]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let entries = store.list_entries(&folder_id()).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].name.as_str(), "a.txt");
    assert_eq!(entries[0].modified_at, Some(Timestamp::from_millis(MODIFIED_MS)));
    assert_eq!(entries[0].parent_folder_id, folder_id());
    assert_eq!(entries[1].remote_id.as_str(), "id-b");
    assert!(entries[1].modified_at.is_none());
}

#[tokio::test]
async fn test_list_entries_keeps_unmirrorable_names() {
    let (server, store) = setup_drive_mock().await;
    mount_list(
        &server,
        &children_query(FOLDER_ID),
        serde_json::json!([
            file_json("id-a", "a.txt", None),
            file_json("id-x", "x/y.txt", None)
        ]),
    )
    .await;

    let entries = store.list_entries(&folder_id()).await.unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["a.txt", "x/y.txt"]);
}

#[tokio::test]
async fn test_list_entries_invalid_json_is_invalid_response() {
    let (server, store) = setup_drive_mock().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .mount(&server)
        .await;

    let err = store.list_entries(&folder_id()).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DriveError>(),
        Some(DriveError::InvalidResponse(_))
    ));
}

#[tokio::test]
async fn test_upload_creates_when_name_is_new() {
    let (server, store) = setup_drive_mock().await;
    mount_list(&server, &named_child_query(FOLDER_ID, "a.txt"), serde_json::json!([])).await;

    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .and(query_param("uploadType", "multipart"))
        .and(body_string_contains(r#""parents":["folder-1"]"#))
        .and(body_string_contains(&format!(r#""modifiedTime":"{MODIFIED}""#)))
        .and(body_string_contains("hello world"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(file_json("new-id", "a.txt", Some(MODIFIED))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("a.txt");
    std::fs::write(&local, b"hello world").unwrap();

    let entry = store
        .upload(
            &folder_id(),
            &file_name("a.txt"),
            &local,
            Timestamp::from_millis(MODIFIED_MS),
        )
        .await
        .unwrap();

    assert_eq!(entry.remote_id.as_str(), "new-id");
    assert_eq!(entry.modified_at, Some(Timestamp::from_millis(MODIFIED_MS)));
}

#[tokio::test]
async fn test_upload_updates_first_existing_entry() {
    let (server, store) = setup_drive_mock().await;
    mount_list(
        &server,
        &named_child_query(FOLDER_ID, "a.txt"),
        serde_json::json!([
            file_json("id-first", "a.txt", Some("2020-01-01T00:00:00Z")),
            file_json("id-second", "a.txt", None)
        ]),
    )
    .await;

    Mock::given(method("PATCH"))
        .and(path("/upload/drive/v3/files/id-first"))
        .and(query_param("uploadType", "multipart"))
        .and(body_string_contains(&format!(r#""modifiedTime":"{MODIFIED}""#)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(file_json("id-first", "a.txt", Some(MODIFIED))),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("a.txt");
    std::fs::write(&local, b"v2").unwrap();

    let entry = store
        .upload(
            &folder_id(),
            &file_name("a.txt"),
            &local,
            Timestamp::from_millis(MODIFIED_MS),
        )
        .await
        .unwrap();
    assert_eq!(entry.remote_id.as_str(), "id-first");
}

#[tokio::test]
async fn test_upload_of_missing_local_file_fails_before_any_request() {
    let (server, store) = setup_drive_mock().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let result = store
        .upload(
            &folder_id(),
            &file_name("gone.txt"),
            &dir.path().join("gone.txt"),
            Timestamp::from_millis(0),
        )
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_delete_by_name_removes_every_duplicate() {
    let (server, store) = setup_drive_mock().await;
    mount_list(
        &server,
        &named_child_query(FOLDER_ID, "dup.txt"),
        serde_json::json!([
            file_json("id-1", "dup.txt", None),
            file_json("id-2", "dup.txt", None),
            file_json("id-3", "dup.txt", None)
        ]),
    )
    .await;

    for id in ["id-1", "id-2"] {
        Mock::given(method("DELETE"))
            .and(path(format!("/drive/v3/files/{id}")))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("DELETE"))
        .and(path("/drive/v3/files/id-3"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let count = store
        .delete_by_name(&folder_id(), "dup.txt")
        .await
        .unwrap();
    assert_eq!(count, 2);
}

#[tokio::test]
async fn test_delete_by_name_without_matches_is_zero() {
    let (server, store) = setup_drive_mock().await;
    mount_list(&server, &named_child_query(FOLDER_ID, "none.txt"), serde_json::json!([])).await;

    let count = store
        .delete_by_name(&folder_id(), "none.txt")
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_delete_failure_is_reported() {
    let (server, store) = setup_drive_mock().await;
    mount_list(
        &server,
        &named_child_query(FOLDER_ID, "a.txt"),
        serde_json::json!([file_json("id-1", "a.txt", None)]),
    )
    .await;
    Mock::given(method("DELETE"))
        .and(path("/drive/v3/files/id-1"))
        .respond_with(ResponseTemplate::new(403).set_body_string("no"))
        .mount(&server)
        .await;

    let err = store
        .delete_by_name(&folder_id(), "a.txt")
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DriveError>(),
        Some(DriveError::Forbidden(_))
    ));
}

#[tokio::test]
async fn test_delete_by_name_accepts_unmirrorable_name() {
    let (server, store) = setup_drive_mock().await;
    mount_list(
        &server,
        &named_child_query(FOLDER_ID, "x/y.txt"),
        serde_json::json!([file_json("id-x", "x/y.txt", None)]),
    )
    .await;
    Mock::given(method("DELETE"))
        .and(path("/drive/v3/files/id-x"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let count = store.delete_by_name(&folder_id(), "x/y.txt").await.unwrap();
    assert_eq!(count, 1);
}
