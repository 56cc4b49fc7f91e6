mod common;

use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use common::TestApp;

#[tokio::test]
async fn feedback_is_recorded_anonymously_with_a_truncated_preview() {
    let app = TestApp::new().await;
    let cookie = app.login("mira").await;

    let content = "n".repeat(150);
    let (status, body) = app
        .send(
            "POST",
            "/feedback",
            Some(&cookie),
            Some(json!({"category": "ui", "type": "bug", "content": content})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let preview = body["preview"].as_str().unwrap();
    assert_eq!(preview.chars().count(), 103);
    assert!(preview.ends_with("..."));
    assert!(preview.starts_with(&"n".repeat(100)));

    let (_, activities) = app.send("GET", "/activities", Some(&cookie), None).await;
    let entry = activities
        .as_array()
        .unwrap()
        .iter()
        .find(|a| a["action"] == "feedback")
        .expect("feedback activity recorded");
    // The stored description carries the truncated preview, and the actor is
    // the anonymous sentinel, not the submitter.
    assert!(entry["description"].as_str().unwrap().ends_with(preview));
    assert_eq!(entry["userId"], json!(Uuid::nil()));
    assert!(entry["user"].is_null());
}

#[tokio::test]
async fn short_feedback_preview_matches_the_content_exactly() {
    let app = TestApp::new().await;
    let cookie = app.login("mira").await;
    let (status, body) = app
        .send(
            "POST",
            "/feedback",
            Some(&cookie),
            Some(json!({"category": "ux", "type": "idea", "content": "love it"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["preview"], "love it");
}

#[tokio::test]
async fn feedback_requires_all_fields() {
    let app = TestApp::new().await;
    let cookie = app.login("mira").await;
    let (status, _) = app
        .send(
            "POST",
            "/feedback",
            Some(&cookie),
            Some(json!({"category": "ui", "type": "bug", "content": "  "})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app
        .send(
            "POST",
            "/feedback",
            Some(&cookie),
            Some(json!({"category": "ui", "content": "missing type"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn activity_listing_filters_and_limits() {
    let app = TestApp::new().await;
    let mira = app.login("mira").await;
    let noah = app.login("noah").await;

    let (_, project) = app
        .send(
            "POST",
            "/projects",
            Some(&mira),
            Some(json!({"name": "Feed"})),
        )
        .await;
    let project_id = project["id"].as_str().unwrap().to_string();
    for index in 0..3 {
        app.send(
            "POST",
            "/tasks",
            Some(&noah),
            Some(json!({"title": format!("Task {index}"), "projectId": project_id})),
        )
        .await;
    }

    let (_, by_user) = app
        .send(
            "GET",
            &format!("/activities?userId={}", app.noah.id),
            Some(&mira),
            None,
        )
        .await;
    assert_eq!(by_user.as_array().unwrap().len(), 3);

    let (_, limited) = app
        .send("GET", "/activities?limit=2", Some(&mira), None)
        .await;
    assert_eq!(limited.as_array().unwrap().len(), 2);

    // Newest first.
    let (_, all) = app
        .send(
            "GET",
            &format!("/activities?projectId={project_id}"),
            Some(&mira),
            None,
        )
        .await;
    let descriptions: Vec<&str> = all
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["description"].as_str().unwrap())
        .collect();
    assert_eq!(descriptions.first().unwrap(), &"created task \"Task 2\"");
}

#[tokio::test]
async fn dashboard_aggregates_on_demand() {
    let app = TestApp::new().await;
    let mira = app.login("mira").await;
    let admin = app.login("admin").await;

    let (_, first) = app
        .send(
            "POST",
            "/projects",
            Some(&mira),
            Some(json!({"name": "One"})),
        )
        .await;
    let first_id = first["id"].as_str().unwrap().to_string();
    app.send(
        "POST",
        "/projects",
        Some(&mira),
        Some(json!({"name": "Two"})),
    )
    .await;
    app.send(
        "POST",
        &format!("/projects/{first_id}/members"),
        Some(&admin),
        Some(json!({"userId": app.noah.id})),
    )
    .await;

    let due_soon = (chrono::Utc::now().date_naive() + chrono::Duration::days(3)).to_string();
    app.send(
        "POST",
        "/tasks",
        Some(&mira),
        Some(json!({
            "title": "Due soon",
            "projectId": first_id,
            "deadline": due_soon,
            "status": "in_progress",
        })),
    )
    .await;
    app.send(
        "POST",
        "/tasks",
        Some(&mira),
        Some(json!({"title": "Done", "projectId": first_id, "status": "completed"})),
    )
    .await;

    let (status, dashboard) = app.send("GET", "/dashboard", Some(&mira), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["totalProjects"], 2);
    assert_eq!(dashboard["inProgressTasks"], 1);
    assert_eq!(dashboard["completedTasks"], 1);
    // Owner mira plus member noah, counted once each.
    assert_eq!(dashboard["teamMembers"], 2);
    assert_eq!(dashboard["tasksDueSoon"], 1);
    assert_eq!(dashboard["tasksCompletedLastWeek"], 1);
    assert_eq!(dashboard["projectsCreatedLastMonth"], 2);
}
