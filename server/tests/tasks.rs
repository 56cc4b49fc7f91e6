mod common;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use common::TestApp;

async fn project_with_task(app: &TestApp, cookie: &str) -> (String, String) {
    let (_, project) = app
        .send(
            "POST",
            "/projects",
            Some(cookie),
            Some(json!({"name": "Apollo"})),
        )
        .await;
    let project_id = project["id"].as_str().unwrap().to_string();
    let (status, task) = app
        .send(
            "POST",
            "/tasks",
            Some(cookie),
            Some(json!({"title": "Design the probe", "projectId": project_id})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    (project_id, task["id"].as_str().unwrap().to_string())
}

fn completed_at(task: &Value) -> Option<DateTime<Utc>> {
    task["completedAt"]
        .as_str()
        .map(|raw| raw.parse().expect("completedAt parses as a timestamp"))
}

#[tokio::test]
async fn completing_a_task_stamps_completed_at_once() {
    let app = TestApp::new().await;
    let cookie = app.login("mira").await;
    let (_, task_id) = project_with_task(&app, &cookie).await;

    let before = Utc::now();
    let (status, done) = app
        .send(
            "PATCH",
            &format!("/tasks/{task_id}"),
            Some(&cookie),
            Some(json!({"status": "completed"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let first_stamp = completed_at(&done).expect("completing sets the stamp");
    assert!(first_stamp >= before - chrono::Duration::seconds(1));

    // Re-asserting completed does not move the stamp.
    let (_, again) = app
        .send(
            "PATCH",
            &format!("/tasks/{task_id}"),
            Some(&cookie),
            Some(json!({"status": "completed"})),
        )
        .await;
    assert_eq!(completed_at(&again), Some(first_stamp));

    // Leaving completed keeps the stamp as a record of the last completion.
    let (_, reopened) = app
        .send(
            "PATCH",
            &format!("/tasks/{task_id}"),
            Some(&cookie),
            Some(json!({"status": "in_progress"})),
        )
        .await;
    assert_eq!(reopened["status"], "in_progress");
    assert_eq!(completed_at(&reopened), Some(first_stamp));

    // A fresh transition into completed re-stamps.
    let (_, redone) = app
        .send(
            "PATCH",
            &format!("/tasks/{task_id}"),
            Some(&cookie),
            Some(json!({"status": "completed"})),
        )
        .await;
    assert!(completed_at(&redone).unwrap() >= first_stamp);
}

#[tokio::test]
async fn task_delete_is_limited_to_creator_and_project_owner() {
    let app = TestApp::new().await;
    let mira = app.login("mira").await;
    let noah = app.login("noah").await;
    let lena = app.login("lena").await;

    let (project_id, _) = project_with_task(&app, &mira).await;
    let (_, task) = app
        .send(
            "POST",
            "/tasks",
            Some(&noah),
            Some(json!({"title": "Noah's task", "projectId": project_id})),
        )
        .await;
    let task_id = task["id"].as_str().unwrap().to_string();

    // Neither creator nor project owner.
    let (status, body) = app
        .send("DELETE", &format!("/tasks/{task_id}"), Some(&lena), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    // The creator may delete their own task.
    let (status, _) = app
        .send("DELETE", &format!("/tasks/{task_id}"), Some(&noah), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // The project owner may delete tasks created by others.
    let (_, other) = app
        .send(
            "POST",
            "/tasks",
            Some(&noah),
            Some(json!({"title": "Another", "projectId": project_id})),
        )
        .await;
    let other_id = other["id"].as_str().unwrap();
    let (status, _) = app
        .send("DELETE", &format!("/tasks/{other_id}"), Some(&mira), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn completing_a_task_records_an_update_activity() {
    let app = TestApp::new().await;
    let cookie = app.login("mira").await;
    let (project_id, task_id) = project_with_task(&app, &cookie).await;

    app.send(
        "PATCH",
        &format!("/tasks/{task_id}"),
        Some(&cookie),
        Some(json!({"status": "completed"})),
    )
    .await;

    let (_, activities) = app
        .send(
            "GET",
            &format!("/activities?projectId={project_id}"),
            Some(&cookie),
            None,
        )
        .await;
    let update = activities
        .as_array()
        .unwrap()
        .iter()
        .find(|a| a["action"] == "update_task")
        .expect("one update_task entry");
    assert_eq!(update["projectId"].as_str().unwrap(), project_id);
    assert_eq!(update["taskId"].as_str().unwrap(), task_id);
    assert_eq!(update["userId"], json!(app.mira.id));
}

#[tokio::test]
async fn task_creation_validates_references() {
    let app = TestApp::new().await;
    let cookie = app.login("mira").await;

    let (status, _) = app
        .send(
            "POST",
            "/tasks",
            Some(&cookie),
            Some(json!({
                "title": "Orphan",
                "projectId": "00000000-0000-0000-0000-000000000001"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (project_id, _) = project_with_task(&app, &cookie).await;
    let (status, _) = app
        .send(
            "POST",
            "/tasks",
            Some(&cookie),
            Some(json!({"title": "   ", "projectId": project_id})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, task) = app
        .send(
            "POST",
            "/tasks",
            Some(&cookie),
            Some(json!({
                "title": "Assigned",
                "projectId": project_id,
                "assigneeId": app.noah.id,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(task["assignee"]["name"], "Noah Reyes");
}

#[tokio::test]
async fn task_list_filters_by_project_assignee_and_status() {
    let app = TestApp::new().await;
    let cookie = app.login("mira").await;
    let (project_id, first_task) = project_with_task(&app, &cookie).await;
    app.send(
        "POST",
        "/tasks",
        Some(&cookie),
        Some(json!({
            "title": "Assigned elsewhere",
            "projectId": project_id,
            "assigneeId": app.noah.id,
            "status": "in_progress",
        })),
    )
    .await;

    let (_, by_project) = app
        .send(
            "GET",
            &format!("/tasks?projectId={project_id}"),
            Some(&cookie),
            None,
        )
        .await;
    assert_eq!(by_project.as_array().unwrap().len(), 2);

    let (_, by_assignee) = app
        .send(
            "GET",
            &format!("/tasks?assigneeId={}", app.noah.id),
            Some(&cookie),
            None,
        )
        .await;
    assert_eq!(by_assignee.as_array().unwrap().len(), 1);

    let (_, by_status) = app
        .send("GET", "/tasks?status=todo", Some(&cookie), None)
        .await;
    let ids: Vec<&str> = by_status
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&first_task.as_str()));
}
