use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, NaiveDate, Utc};
use entity::{activity, project};
use platform_api::{ApiError, ApiResult};
use platform_authz::{Action, Resource, can_perform};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait, QueryOrder};
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
pub enum ProjectStatus {
    Active,
    OnHold,
    Completed,
    Archived,
}

impl From<project::Status> for ProjectStatus {
    fn from(value: project::Status) -> Self {
        match value {
            project::Status::Active => ProjectStatus::Active,
            project::Status::OnHold => ProjectStatus::OnHold,
            project::Status::Completed => ProjectStatus::Completed,
            project::Status::Archived => ProjectStatus::Archived,
        }
    }
}

impl From<ProjectStatus> for project::Status {
    fn from(value: ProjectStatus) -> Self {
        match value {
            ProjectStatus::Active => project::Status::Active,
            ProjectStatus::OnHold => project::Status::OnHold,
            ProjectStatus::Completed => project::Status::Completed,
            ProjectStatus::Archived => project::Status::Archived,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPayload {
    pub id: Uuid,
    pub name: String,
    pub status: ProjectStatus,
    pub deadline: Option<NaiveDate>,
    pub owner_id: Uuid,
    pub owner: Option<UserSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectPayload {
    fn new(model: project::Model, owner: Option<UserSummary>) -> Self {
        Self {
            id: model.id,
            name: model.name,
            status: model.status.into(),
            deadline: model.deadline,
            owner_id: model.owner_id,
            owner,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

async fn shape_one(state: &AppState, model: project::Model) -> ApiResult<ProjectPayload> {
    let summaries = user_summaries(&state.pool, &[model.owner_id]).await?;
    let owner = summaries.get(&model.owner_id).cloned();
    Ok(ProjectPayload::new(model, owner))
}

pub async fn list(
    State(state): State<AppState>,
    _current: CurrentUser,
) -> ApiResult<Json<Vec<ProjectPayload>>> {
    let records = project::Entity::find()
        .order_by_desc(project::Column::CreatedAt)
        .all(&state.pool)
        .await?;
    let owner_ids: Vec<Uuid> = records.iter().map(|p| p.owner_id).collect();
    let summaries = user_summaries(&state.pool, &owner_ids).await?;
    Ok(Json(
        records
            .into_iter()
            .map(|model| {
                let owner = summaries.get(&model.owner_id).cloned();
                ProjectPayload::new(model, owner)
            })
            .collect(),
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProject {
    pub name: String,
    pub status: Option<ProjectStatus>,
    pub deadline: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(body): ApiJson<CreateProject>,
) -> ApiResult<(StatusCode, Json<ProjectPayload>)> {
    let name = require_non_empty("name", &body.name)?;
    let deadline = body.deadline.as_deref().map(parse_deadline).transpose()?;
    let status = body.status.unwrap_or(ProjectStatus::Active);

    let project_id = Uuid::new_v4();
    let now = Utc::now();
    let inserted = project::ActiveModel {
        id: Set(project_id),
        name: Set(name),
        status: Set(status.into()),
        deadline: Set(deadline),
        owner_id: Set(current.id),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.pool)
    .await?;
    record(
        &state.pool,
        activity::Action::CreateProject,
        format!("created project \"{}\"", inserted.name),
        current.id,
        Some(inserted.id),
        None,
    )
    .await?;
    let payload = shape_one(&state, inserted).await?;
    Ok((StatusCode::CREATED, Json(payload)))
}

pub async fn get(
    State(state): State<AppState>,
    _current: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ProjectPayload>> {
    let model = project::Entity::find_by_id(id)
        .one(&state.pool)
        .await?
        .ok_or(ApiError::NotFound("project"))?;
    Ok(Json(shape_one(&state, model).await?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProject {
    pub name: Option<String>,
    pub status: Option<ProjectStatus>,
    pub deadline: Option<String>,
}

pub async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    ApiJson(body): ApiJson<UpdateProject>,
) -> ApiResult<Json<ProjectPayload>> {
    let model = project::Entity::find_by_id(id)
        .one(&state.pool)
        .await?
        .ok_or(ApiError::NotFound("project"))?;
    can_perform(
        &current.actor(),
        Action::UpdateProject,
        &Resource::Project {
            owner_id: model.owner_id,
        },
    )
    .map_err(|denial| ApiError::forbidden(denial.to_string()))?;

    let deadline = body.deadline.as_deref().map(parse_deadline).transpose()?;
    let mut active: project::ActiveModel = model.into();
    if let Some(name) = &body.name {
        active.name = Set(require_non_empty("name", name)?);
    }
    if let Some(status) = body.status {
        active.status = Set(status.into());
    }
    if let Some(deadline) = deadline {
        active.deadline = Set(Some(deadline));
    }
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&state.pool).await?;
    record(
        &state.pool,
        activity::Action::UpdateProject,
        format!("updated project \"{}\"", updated.name),
        current.id,
        Some(updated.id),
        None,
    )
    .await?;
    Ok(Json(shape_one(&state, updated).await?))
}

pub async fn remove(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let model = project::Entity::find_by_id(id)
        .one(&state.pool)
        .await?
        .ok_or(ApiError::NotFound("project"))?;
    can_perform(
        &current.actor(),
        Action::DeleteProject,
        &Resource::Project {
            owner_id: model.owner_id,
        },
    )
    .map_err(|denial| ApiError::forbidden(denial.to_string()))?;

    // Tasks, comments, membership and file metadata go with the project at
    // the FK level; orphaned physical upload content is tolerated.
    project::Entity::delete_by_id(model.id)
        .exec(&state.pool)
        .await?;
    record(
        &state.pool,
        activity::Action::DeleteProject,
        format!("deleted project \"{}\"", model.name),
        current.id,
        Some(model.id),
        None,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
