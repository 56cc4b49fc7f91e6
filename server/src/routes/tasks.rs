use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, NaiveDate, Utc};
use entity::{activity, project, task, user};
use platform_api::{ApiError, ApiResult};
use platform_authz::{Action, Resource, can_perform};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
    prelude::DateTimeWithTimeZone,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    activity::record,
    http::AppState,
    routes::{ApiJson, UserSummary, parse_deadline, require_non_empty, user_summaries},
    session::CurrentUser,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Completed,
}

impl From<task::Status> for TaskStatus {
    fn from(value: task::Status) -> Self {
        match value {
            task::Status::Todo => TaskStatus::Todo,
            task::Status::InProgress => TaskStatus::InProgress,
            task::Status::Completed => TaskStatus::Completed,
        }
    }
}

impl From<TaskStatus> for task::Status {
    fn from(value: TaskStatus) -> Self {
        match value {
            TaskStatus::Todo => task::Status::Todo,
            TaskStatus::InProgress => task::Status::InProgress,
            TaskStatus::Completed => task::Status::Completed,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPayload {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub project_id: Uuid,
    pub creator_id: Uuid,
    pub creator: Option<UserSummary>,
    pub assignee_id: Option<Uuid>,
    pub assignee: Option<UserSummary>,
    pub deadline: Option<NaiveDate>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskPayload {
    fn new(
        model: task::Model,
        creator: Option<UserSummary>,
        assignee: Option<UserSummary>,
    ) -> Self {
        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            status: model.status.into(),
            project_id: model.project_id,
            creator_id: model.creator_id,
            creator,
            assignee_id: model.assignee_id,
            assignee,
            deadline: model.deadline,
            completed_at: model.completed_at.map(|t| t.into()),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

async fn shape_many(state: &AppState, records: Vec<task::Model>) -> ApiResult<Vec<TaskPayload>> {
    let mut ids: Vec<Uuid> = records.iter().map(|t| t.creator_id).collect();
    ids.extend(records.iter().filter_map(|t| t.assignee_id));
    let summaries = user_summaries(&state.pool, &ids).await?;
    Ok(records
        .into_iter()
        .map(|model| {
            let creator = summaries.get(&model.creator_id).cloned();
            let assignee = model
                .assignee_id
                .and_then(|id| summaries.get(&id).cloned());
            TaskPayload::new(model, creator, assignee)
        })
        .collect())
}

async fn shape_one(state: &AppState, model: task::Model) -> ApiResult<TaskPayload> {
    let mut ids = vec![model.creator_id];
    ids.extend(model.assignee_id);
    let summaries = user_summaries(&state.pool, &ids).await?;
    let creator = summaries.get(&model.creator_id).cloned();
    let assignee = model.assignee_id.and_then(|id| summaries.get(&id).cloned());
    Ok(TaskPayload::new(model, creator, assignee))
}

/// The one side-effecting transition: entering `completed` from any other
/// state stamps `completed_at`. Re-asserting `completed` leaves the stamp
/// alone, and leaving `completed` keeps it as a record of the most recent
/// completion.
fn apply_status_transition(
    active: &mut task::ActiveModel,
    previous: &task::Model,
    next: task::Status,
    now: DateTimeWithTimeZone,
) {
    if next == task::Status::Completed && previous.status != task::Status::Completed {
        active.completed_at = Set(Some(now));
    }
    active.status = Set(next);
}

async fn ensure_active_user(state: &AppState, user_id: Uuid) -> ApiResult<Uuid> {
    let record = user::Entity::find_by_id(user_id)
        .one(&state.pool)
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    if !record.is_active {
        return Err(ApiError::validation("user is inactive"));
    }
    Ok(record.id)
}

async fn load_task(state: &AppState, id: Uuid) -> ApiResult<task::Model> {
    task::Entity::find_by_id(id)
        .one(&state.pool)
        .await?
        .ok_or(ApiError::NotFound("task"))
}

#[derive(Deserialize)]
pub struct TaskQuery {
    #[serde(rename = "projectId")]
    pub project_id: Option<Uuid>,
    #[serde(rename = "assigneeId")]
    pub assignee_id: Option<Uuid>,
    pub status: Option<TaskStatus>,
}

pub async fn list(
    State(state): State<AppState>,
    _current: CurrentUser,
    Query(query): Query<TaskQuery>,
) -> ApiResult<Json<Vec<TaskPayload>>> {
    let mut select = task::Entity::find();
    if let Some(project_id) = query.project_id {
        select = select.filter(task::Column::ProjectId.eq(project_id));
    }
    if let Some(assignee_id) = query.assignee_id {
        select = select.filter(task::Column::AssigneeId.eq(assignee_id));
    }
    if let Some(status) = query.status {
        select = select.filter(task::Column::Status.eq(task::Status::from(status)));
    }
    let records = select
        .order_by_desc(task::Column::CreatedAt)
        .all(&state.pool)
        .await?;
    Ok(Json(shape_many(&state, records).await?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    #[serde(alias = "project_id")]
    pub project_id: Uuid,
    #[serde(alias = "assignee_id")]
    pub assignee_id: Option<Uuid>,
    pub deadline: Option<String>,
    pub status: Option<TaskStatus>,
}

pub async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(body): ApiJson<CreateTask>,
) -> ApiResult<(StatusCode, Json<TaskPayload>)> {
    let title = require_non_empty("title", &body.title)?;
    let deadline = body.deadline.as_deref().map(parse_deadline).transpose()?;
    let status: task::Status = body.status.unwrap_or(TaskStatus::Todo).into();
    project::Entity::find_by_id(body.project_id)
        .one(&state.pool)
        .await?
        .ok_or(ApiError::NotFound("project"))?;
    let assignee_id = match body.assignee_id {
        Some(id) => Some(ensure_active_user(&state, id).await?),
        None => None,
    };

    let now = Utc::now();
    let completed_at = (status == task::Status::Completed).then(|| now.into());
    let inserted = task::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(title),
        description: Set(body.description),
        status: Set(status),
        project_id: Set(body.project_id),
        creator_id: Set(current.id),
        assignee_id: Set(assignee_id),
        deadline: Set(deadline),
        completed_at: Set(completed_at),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.pool)
    .await?;
    record(
        &state.pool,
        activity::Action::CreateTask,
        format!("created task \"{}\"", inserted.title),
        current.id,
        Some(inserted.project_id),
        Some(inserted.id),
    )
    .await?;
    let payload = shape_one(&state, inserted).await?;
    Ok((StatusCode::CREATED, Json(payload)))
}

pub async fn get(
    State(state): State<AppState>,
    _current: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TaskPayload>> {
    let model = load_task(&state, id).await?;
    Ok(Json(shape_one(&state, model).await?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceTask {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    #[serde(alias = "assignee_id")]
    pub assignee_id: Option<Uuid>,
    pub deadline: Option<String>,
}

pub async fn replace(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    ApiJson(body): ApiJson<ReplaceTask>,
) -> ApiResult<Json<TaskPayload>> {
    let existing = load_task(&state, id).await?;
    let title = require_non_empty("title", &body.title)?;
    let deadline = body.deadline.as_deref().map(parse_deadline).transpose()?;
    let assignee_id = match body.assignee_id {
        Some(target) => Some(ensure_active_user(&state, target).await?),
        None => None,
    };

    let now = Utc::now();
    let mut active: task::ActiveModel = existing.clone().into();
    active.title = Set(title);
    active.description = Set(body.description);
    active.assignee_id = Set(assignee_id);
    active.deadline = Set(deadline);
    apply_status_transition(&mut active, &existing, body.status.into(), now.into());
    active.updated_at = Set(now.into());
    let updated = active.update(&state.pool).await?;
    record(
        &state.pool,
        activity::Action::UpdateTask,
        format!("updated task \"{}\"", updated.title),
        current.id,
        Some(updated.project_id),
        Some(updated.id),
    )
    .await?;
    Ok(Json(shape_one(&state, updated).await?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    #[serde(alias = "assignee_id")]
    pub assignee_id: Option<Uuid>,
    pub deadline: Option<String>,
}

pub async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    ApiJson(body): ApiJson<UpdateTask>,
) -> ApiResult<Json<TaskPayload>> {
    let existing = load_task(&state, id).await?;
    let deadline = body.deadline.as_deref().map(parse_deadline).transpose()?;
    let assignee_id = match body.assignee_id {
        Some(target) => Some(ensure_active_user(&state, target).await?),
        None => None,
    };

    let now = Utc::now();
    let mut active: task::ActiveModel = existing.clone().into();
    if let Some(title) = &body.title {
        active.title = Set(require_non_empty("title", title)?);
    }
    if body.description.is_some() {
        active.description = Set(body.description);
    }
    if let Some(target) = assignee_id {
        active.assignee_id = Set(Some(target));
    }
    if let Some(deadline) = deadline {
        active.deadline = Set(Some(deadline));
    }
    if let Some(status) = body.status {
        apply_status_transition(&mut active, &existing, status.into(), now.into());
    }
    active.updated_at = Set(now.into());
    let updated = active.update(&state.pool).await?;
    record(
        &state.pool,
        activity::Action::UpdateTask,
        format!("updated task \"{}\"", updated.title),
        current.id,
        Some(updated.project_id),
        Some(updated.id),
    )
    .await?;
    Ok(Json(shape_one(&state, updated).await?))
}

pub async fn remove(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let existing = load_task(&state, id).await?;
    let parent = project::Entity::find_by_id(existing.project_id)
        .one(&state.pool)
        .await?
        .ok_or(ApiError::NotFound("project"))?;
    can_perform(
        &current.actor(),
        Action::DeleteTask,
        &Resource::Task {
            creator_id: existing.creator_id,
            project_owner_id: parent.owner_id,
        },
    )
    .map_err(|denial| ApiError::forbidden(denial.to_string()))?;

    task::Entity::delete_by_id(existing.id)
        .exec(&state.pool)
        .await?;
    record(
        &state.pool,
        activity::Action::DeleteTask,
        format!("deleted task \"{}\"", existing.title),
        current.id,
        Some(existing.project_id),
        Some(existing.id),
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
