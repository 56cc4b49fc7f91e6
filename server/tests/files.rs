mod common;

use axum::http::StatusCode;
use serde_json::{Value, json};

use common::{TestApp, multipart_body};

const BOUNDARY: &str = "test-boundary-7MA4YWxkTrZu0gW";

async fn upload(
    app: &TestApp,
    cookie: &str,
    file_name: &str,
    bytes: &[u8],
    fields: &[(&str, &str)],
) -> (StatusCode, Value) {
    let body = multipart_body(BOUNDARY, Some((file_name, "text/plain", bytes)), fields);
    let (status, raw) = app
        .send_bytes(
            "POST",
            "/files/upload",
            Some(cookie),
            Some(&format!("multipart/form-data; boundary={BOUNDARY}")),
            body,
        )
        .await;
    let value = serde_json::from_slice(&raw).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn upload_download_delete_round_trip() {
    let app = TestApp::new().await;
    let mira = app.login("mira").await;
    let noah = app.login("noah").await;

    let (_, project) = app
        .send(
            "POST",
            "/projects",
            Some(&mira),
            Some(json!({"name": "Docs"})),
        )
        .await;
    let project_id = project["id"].as_str().unwrap().to_string();

    let (status, uploaded) = upload(
        &app,
        &noah,
        "notes.txt",
        b"meeting notes",
        &[("project_id", &project_id), ("description", "kickoff")],
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(uploaded["name"], "notes.txt");
    assert_eq!(uploaded["size"], 13);
    assert_eq!(uploaded["mimeType"], "text/plain");
    assert_eq!(uploaded["uploader"]["name"], "Noah Reyes");
    let url = uploaded["url"].as_str().unwrap().to_string();
    let file_id = uploaded["id"].as_str().unwrap().to_string();

    let (status, listed) = app
        .send(
            "GET",
            &format!("/files?projectId={project_id}"),
            Some(&mira),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, content) = app
        .send_bytes("GET", &url, Some(&mira), None, Vec::new())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content, b"meeting notes");

    // Lena is neither the uploader nor the project owner.
    let lena = app.login("lena").await;
    let (status, _) = app
        .send("DELETE", &format!("/files/{file_id}"), Some(&lena), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The linked project's owner may delete another user's upload.
    let (status, _) = app
        .send("DELETE", &format!("/files/{file_id}"), Some(&mira), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app
        .send("GET", &format!("/files/{file_id}"), Some(&mira), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn metadata_deletion_survives_missing_physical_content() {
    let app = TestApp::new().await;
    let mira = app.login("mira").await;

    let (_, uploaded) = upload(&app, &mira, "orphan.txt", b"gone soon", &[]).await;
    let file_id = uploaded["id"].as_str().unwrap().to_string();
    let storage_name = uploaded["url"]
        .as_str()
        .unwrap()
        .trim_start_matches("/uploads/")
        .to_string();

    // Simulate externally-lost content before the delete request.
    std::fs::remove_file(app.content_root.join(&storage_name)).unwrap();

    let (status, _) = app
        .send("DELETE", &format!("/files/{file_id}"), Some(&mira), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app
        .send("GET", &format!("/files/{file_id}"), Some(&mira), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn upload_requires_a_file_field() {
    let app = TestApp::new().await;
    let mira = app.login("mira").await;
    let body = multipart_body(BOUNDARY, None, &[("description", "no file")]);
    let (status, raw) = app
        .send_bytes(
            "POST",
            "/files/upload",
            Some(&mira),
            Some(&format!("multipart/form-data; boundary={BOUNDARY}")),
            body,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let value: Value = serde_json::from_slice(&raw).unwrap();
    assert_eq!(value["error"]["code"], "VALIDATION");
}

#[tokio::test]
async fn upload_against_missing_task_is_a_404() {
    let app = TestApp::new().await;
    let mira = app.login("mira").await;
    let (status, _) = upload(
        &app,
        &mira,
        "stray.txt",
        b"data",
        &[("task_id", "00000000-0000-0000-0000-000000000042")],
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn download_rejects_path_traversal_names() {
    let app = TestApp::new().await;
    let mira = app.login("mira").await;
    let (status, _) = app
        .send("GET", "/uploads/..%2Fsecrets.txt", Some(&mira), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
