use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use entity::{activity, comment, project, task};
use platform_api::{ApiError, ApiResult};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    activity::record,
    http::AppState,
    routes::{ApiJson, UserSummary, require_non_empty, user_summaries},
    session::CurrentUser,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentPayload {
    pub id: Uuid,
    pub task_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub user_id: Uuid,
    pub user: Option<UserSummary>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl CommentPayload {
    fn new(model: comment::Model, user: Option<UserSummary>) -> Self {
        Self {
            id: model.id,
            task_id: model.task_id,
            project_id: model.project_id,
            user_id: model.user_id,
            user,
            content: model.content,
            created_at: model.created_at.into(),
        }
    }
}

/// A comment attaches to exactly one of a task or a project.
enum CommentTarget {
    Task(task::Model),
    Project(project::Model),
}

async fn resolve_target(
    state: &AppState,
    task_id: Option<Uuid>,
    project_id: Option<Uuid>,
) -> ApiResult<CommentTarget> {
    match (task_id, project_id) {
        (Some(_), Some(_)) => Err(ApiError::validation(
            "a comment may target a task or a project, not both",
        )),
        (None, None) => Err(ApiError::validation(
            "a comment requires a task or project target",
        )),
        (Some(task_id), None) => {
            let model = task::Entity::find_by_id(task_id)
                .one(&state.pool)
                .await?
                .ok_or(ApiError::NotFound("task"))?;
            Ok(CommentTarget::Task(model))
        }
        (None, Some(project_id)) => {
            let model = project::Entity::find_by_id(project_id)
                .one(&state.pool)
                .await?
                .ok_or(ApiError::NotFound("project"))?;
            Ok(CommentTarget::Project(model))
        }
    }
}

async fn insert_comment(
    state: &AppState,
    current: &CurrentUser,
    target: CommentTarget,
    content: String,
) -> ApiResult<CommentPayload> {
    let (task_id, project_id, activity_project, activity_task) = match &target {
        CommentTarget::Task(task) => {
            (Some(task.id), None, Some(task.project_id), Some(task.id))
        }
        CommentTarget::Project(project) => (None, Some(project.id), Some(project.id), None),
    };
    let inserted = comment::ActiveModel {
        id: Set(Uuid::new_v4()),
        task_id: Set(task_id),
        project_id: Set(project_id),
        user_id: Set(current.id),
        content: Set(content),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.pool)
    .await?;
    record(
        &state.pool,
        activity::Action::CreateComment,
        match &target {
            CommentTarget::Task(task) => format!("commented on task \"{}\"", task.title),
            CommentTarget::Project(project) => {
                format!("commented on project \"{}\"", project.name)
            }
        },
        current.id,
        activity_project,
        activity_task,
    )
    .await?;
    let summaries = user_summaries(&state.pool, &[current.id]).await?;
    let user = summaries.get(&current.id).cloned();
    Ok(CommentPayload::new(inserted, user))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateComment {
    #[serde(alias = "task_id")]
    pub task_id: Option<Uuid>,
    #[serde(alias = "project_id")]
    pub project_id: Option<Uuid>,
    pub content: String,
}

pub async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(body): ApiJson<CreateComment>,
) -> ApiResult<(StatusCode, Json<CommentPayload>)> {
    let content = require_non_empty("content", &body.content)?;
    let target = resolve_target(&state, body.task_id, body.project_id).await?;
    let payload = insert_comment(&state, &current, target, content).await?;
    Ok((StatusCode::CREATED, Json(payload)))
}

#[derive(Deserialize)]
pub struct CreateTaskComment {
    pub content: String,
}

pub async fn create_for_task(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    ApiJson(body): ApiJson<CreateTaskComment>,
) -> ApiResult<(StatusCode, Json<CommentPayload>)> {
    let content = require_non_empty("content", &body.content)?;
    let target = resolve_target(&state, Some(id), None).await?;
    let payload = insert_comment(&state, &current, target, content).await?;
    Ok((StatusCode::CREATED, Json(payload)))
}

pub async fn list_for_task(
    State(state): State<AppState>,
    _current: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<CommentPayload>>> {
    task::Entity::find_by_id(id)
        .one(&state.pool)
        .await?
        .ok_or(ApiError::NotFound("task"))?;
    let records = comment::Entity::find()
        .filter(comment::Column::TaskId.eq(id))
        .order_by_asc(comment::Column::CreatedAt)
        .all(&state.pool)
        .await?;
    let author_ids: Vec<Uuid> = records.iter().map(|c| c.user_id).collect();
    let summaries = user_summaries(&state.pool, &author_ids).await?;
    Ok(Json(
        records
            .into_iter()
            .map(|model| {
                let user = summaries.get(&model.user_id).cloned();
                CommentPayload::new(model, user)
            })
            .collect(),
    ))
}
