use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use entity::{activity, project, project_member, user};
use platform_api::{ApiError, ApiResult};
use platform_authz::{Action, Resource, can_perform};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait, ModelTrait};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    activity::record,
    http::AppState,
    routes::{ApiJson, user_summaries},
    session::CurrentUser,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberPayload {
    pub id: Uuid,
    pub name: String,
    pub is_owner: bool,
}

async fn load_project(state: &AppState, id: Uuid) -> ApiResult<project::Model> {
    project::Entity::find_by_id(id)
        .one(&state.pool)
        .await?
        .ok_or(ApiError::NotFound("project"))
}

/// The owner shows up in every member listing even without a membership row.
pub async fn list(
    State(state): State<AppState>,
    _current: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<MemberPayload>>> {
    let project = load_project(&state, id).await?;
    let member_ids = platform_db::project_member_ids(&state.pool, &project).await?;
    let summaries = user_summaries(&state.pool, &member_ids).await?;
    let members = member_ids
        .iter()
        .filter_map(|member_id| summaries.get(member_id))
        .map(|summary| MemberPayload {
            id: summary.id,
            name: summary.name.clone(),
            is_owner: summary.id == project.owner_id,
        })
        .collect();
    Ok(Json(members))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMember {
    #[serde(alias = "user_id")]
    pub user_id: Uuid,
}

pub async fn add(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    ApiJson(body): ApiJson<AddMember>,
) -> ApiResult<(StatusCode, Json<MemberPayload>)> {
    let project = load_project(&state, id).await?;
    can_perform(
        &current.actor(),
        Action::AddMember,
        &Resource::Project {
            owner_id: project.owner_id,
        },
    )
    .map_err(|denial| ApiError::forbidden(denial.to_string()))?;

    let target = user::Entity::find_by_id(body.user_id)
        .one(&state.pool)
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    if target.id == project.owner_id {
        return Err(ApiError::validation("the project owner is already a member"));
    }
    let existing = project_member::Entity::find_by_id((project.id, target.id))
        .one(&state.pool)
        .await?;
    if existing.is_some() {
        return Err(ApiError::validation("user is already a member"));
    }

    project_member::ActiveModel {
        project_id: Set(project.id),
        user_id: Set(target.id),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.pool)
    .await?;
    record(
        &state.pool,
        activity::Action::AddMember,
        format!(
            "added {} to project \"{}\"",
            target.display_name, project.name
        ),
        current.id,
        Some(project.id),
        None,
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(MemberPayload {
            id: target.id,
            name: target.display_name,
            is_owner: false,
        }),
    ))
}

pub async fn remove(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    let project = load_project(&state, id).await?;
    can_perform(
        &current.actor(),
        Action::RemoveMember,
        &Resource::Project {
            owner_id: project.owner_id,
        },
    )
    .map_err(|denial| ApiError::forbidden(denial.to_string()))?;

    let membership = project_member::Entity::find_by_id((project.id, user_id))
        .one(&state.pool)
        .await?
        .ok_or(ApiError::NotFound("membership"))?;
    let removed_name = user::Entity::find_by_id(user_id)
        .one(&state.pool)
        .await?
        .map(|u| u.display_name)
        .unwrap_or_else(|| user_id.to_string());
    membership.delete(&state.pool).await?;
    record(
        &state.pool,
        activity::Action::RemoveMember,
        format!("removed {} from project \"{}\"", removed_name, project.name),
        current.id,
        Some(project.id),
        None,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
