use std::{path::PathBuf, sync::Arc};

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use axum_extra::extract::cookie::Key;
use chrono::Utc;
use entity::user;
use http_body_util::BodyExt;
use platform_db::DbPool;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ConnectionTrait, Database, DatabaseBackend, Statement,
};
use serde_json::{Value, json};
use server::{
    chatbot::ChatbotClient,
    config::AppConfig,
    content::ContentStore,
    http::{AppState, build_router},
    session::hash_password,
};
use tower::ServiceExt;
use uuid::Uuid;

pub const PASSWORD: &str = "correct-horse-battery";

pub struct TestApp {
    pub router: Router,
    pub db: DbPool,
    pub content_root: PathBuf,
    pub admin: user::Model,
    pub leader: user::Model,
    pub mira: user::Model,
    pub noah: user::Model,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        bootstrap_schema(&db).await;

        let password_hash = hash_password(PASSWORD).unwrap();
        let admin = seed_user(&db, "admin", "Administrator", user::Role::Admin, &password_hash).await;
        let leader = seed_user(&db, "lena", "Lena Fields", user::Role::TeamLeader, &password_hash).await;
        let mira = seed_user(&db, "mira", "Mira Holt", user::Role::Member, &password_hash).await;
        let noah = seed_user(&db, "noah", "Noah Reyes", user::Role::Member, &password_hash).await;

        let content_root =
            std::env::temp_dir().join(format!("taskdesk-it-{}", Uuid::new_v4().simple()));
        let content = ContentStore::new(&content_root);
        content.ensure_root().await.unwrap();

        let config = AppConfig {
            cookie_key: Key::from(&[7u8; 64]),
            cors_allowed_origins: vec![],
            uploads_dir: content_root.clone(),
            chatbot_url: None,
            session_ttl_days: 30,
        };
        let state = AppState {
            pool: db.clone(),
            config: Arc::new(config),
            content: Arc::new(content),
            chatbot: Arc::new(ChatbotClient::new(None)),
        };
        TestApp {
            router: build_router(state),
            db,
            content_root,
            admin,
            leader,
            mira,
            noah,
        }
    }

    /// Log a seeded user in and return the session cookie pair to replay.
    pub async fn login(&self, username: &str) -> String {
        let (status, _, headers) = self
            .send_raw(
                "POST",
                "/auth/login",
                None,
                Some(json!({"username": username, "password": PASSWORD})),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed for {username}");
        let set_cookie = headers
            .get(header::SET_COOKIE)
            .expect("login sets a session cookie")
            .to_str()
            .unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, value, _) = self.send_raw(method, uri, cookie, body).await;
        (status, value)
    }

    pub async fn send_raw(
        &self,
        method: &str,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value, axum::http::HeaderMap) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(value) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(value.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value, headers)
    }

    /// Raw body variant for multipart uploads and binary downloads.
    pub async fn send_bytes(
        &self,
        method: &str,
        uri: &str,
        cookie: Option<&str>,
        content_type: Option<&str>,
        body: Vec<u8>,
    ) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        let response = self
            .router
            .clone()
            .oneshot(builder.body(Body::from(body)).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }
}

async fn seed_user(
    db: &DbPool,
    username: &str,
    display_name: &str,
    role: user::Role,
    password_hash: &str,
) -> user::Model {
    let now = Utc::now();
    let record = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(username.into()),
        display_name: Set(display_name.into()),
        role: Set(role),
        avatar_url: Set(None),
        is_active: Set(true),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(db)
    .await
    .unwrap();
    entity::user_secret::ActiveModel {
        user_id: Set(record.id),
        password_hash: Set(password_hash.to_string()),
        updated_at: Set(now.into()),
    }
    .insert(db)
    .await
    .unwrap();
    record
}

async fn bootstrap_schema(db: &DbPool) {
    let statements = [
        "PRAGMA foreign_keys = ON;",
        r#"
        CREATE TABLE user (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            display_name TEXT NOT NULL,
            role TEXT NOT NULL,
            avatar_url TEXT,
            is_active INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
        r#"
        CREATE TABLE user_secret (
            user_id TEXT PRIMARY KEY,
            password_hash TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON DELETE CASCADE
        );
        "#,
        r#"
        CREATE TABLE session (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON DELETE CASCADE
        );
        "#,
        r#"
        CREATE TABLE project (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            status TEXT NOT NULL,
            deadline TEXT,
            owner_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(owner_id) REFERENCES user(id) ON DELETE RESTRICT
        );
        "#,
        r#"
        CREATE TABLE project_member (
            project_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY(project_id, user_id),
            FOREIGN KEY(project_id) REFERENCES project(id) ON DELETE CASCADE,
            FOREIGN KEY(user_id) REFERENCES user(id) ON DELETE CASCADE
        );
        "#,
        r#"
        CREATE TABLE task (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            status TEXT NOT NULL,
            project_id TEXT NOT NULL,
            creator_id TEXT NOT NULL,
            assignee_id TEXT,
            deadline TEXT,
            completed_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(project_id) REFERENCES project(id) ON DELETE CASCADE,
            FOREIGN KEY(creator_id) REFERENCES user(id) ON DELETE RESTRICT,
            FOREIGN KEY(assignee_id) REFERENCES user(id) ON DELETE SET NULL
        );
        "#,
        r#"
        CREATE TABLE comment (
            id TEXT PRIMARY KEY,
            task_id TEXT,
            project_id TEXT,
            user_id TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(task_id) REFERENCES task(id) ON DELETE CASCADE,
            FOREIGN KEY(project_id) REFERENCES project(id) ON DELETE CASCADE,
            FOREIGN KEY(user_id) REFERENCES user(id) ON DELETE RESTRICT
        );
        "#,
        r#"
        CREATE TABLE file (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            storage_name TEXT NOT NULL UNIQUE,
            size INTEGER NOT NULL,
            mime_type TEXT NOT NULL,
            uploaded_by TEXT NOT NULL,
            task_id TEXT,
            project_id TEXT,
            description TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY(task_id) REFERENCES task(id) ON DELETE SET NULL,
            FOREIGN KEY(project_id) REFERENCES project(id) ON DELETE CASCADE,
            FOREIGN KEY(uploaded_by) REFERENCES user(id) ON DELETE RESTRICT
        );
        "#,
        r#"
        CREATE TABLE activity (
            id TEXT PRIMARY KEY,
            action TEXT NOT NULL,
            description TEXT NOT NULL,
            user_id TEXT NOT NULL,
            project_id TEXT,
            task_id TEXT,
            created_at TEXT NOT NULL
        );
        "#,
    ];
    for sql in statements {
        db.execute(Statement::from_string(DatabaseBackend::Sqlite, sql))
            .await
            .unwrap();
    }
}

/// Minimal multipart encoder for upload tests.
pub fn multipart_body(
    boundary: &str,
    file: Option<(&str, &str, &[u8])>,
    fields: &[(&str, &str)],
) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    if let Some((file_name, mime, bytes)) = file {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {mime}\r\n\r\n").as_bytes());
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}
