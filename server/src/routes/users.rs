use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use entity::{user, user_secret};
use platform_api::{ApiError, ApiResult};
use platform_authz::{Denial, Role};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    http::AppState,
    routes::{ApiJson, require_non_empty},
    session::{CurrentUser, entity_role, hash_password, policy_role},
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPayload {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub role: &'static str,
    pub avatar_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<user::Model> for UserPayload {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            name: model.display_name,
            role: policy_role(model.role).as_str(),
            avatar_url: model.avatar_url,
            is_active: model.is_active,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

fn require_admin(current: &CurrentUser) -> Result<(), ApiError> {
    if current.role == Role::Admin {
        Ok(())
    } else {
        Err(ApiError::forbidden(Denial::InsufficientRole.to_string()))
    }
}

pub async fn me(
    State(state): State<AppState>,
    current: CurrentUser,
) -> ApiResult<Json<UserPayload>> {
    let record = user::Entity::find_by_id(current.id)
        .one(&state.pool)
        .await?
        .ok_or(ApiError::Unauthorized)?;
    Ok(Json(UserPayload::from(record)))
}

#[derive(Deserialize)]
pub struct UserQuery {
    pub role: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    _current: CurrentUser,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<Vec<UserPayload>>> {
    let mut select = user::Entity::find();
    if let Some(raw) = query.role.as_deref() {
        let role = Role::from_str(raw)
            .ok_or_else(|| ApiError::validation(format!("unknown role: {raw}")))?;
        select = select.filter(user::Column::Role.eq(entity_role(role)));
    }
    let records = select
        .order_by_asc(user::Column::Username)
        .all(&state.pool)
        .await?;
    Ok(Json(records.into_iter().map(UserPayload::from).collect()))
}

pub async fn get(
    State(state): State<AppState>,
    _current: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserPayload>> {
    let record = user::Entity::find_by_id(id)
        .one(&state.pool)
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    Ok(Json(UserPayload::from(record)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUser {
    pub username: String,
    pub name: String,
    pub password: String,
    pub role: Option<String>,
    pub avatar_url: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(body): ApiJson<CreateUser>,
) -> ApiResult<(StatusCode, Json<UserPayload>)> {
    require_admin(&current)?;
    let username = require_non_empty("username", &body.username)?;
    let display_name = require_non_empty("name", &body.name)?;
    if body.password.is_empty() {
        return Err(ApiError::validation("password is required"));
    }
    let role = match body.role.as_deref() {
        Some(raw) => Role::from_str(raw)
            .ok_or_else(|| ApiError::validation(format!("unknown role: {raw}")))?,
        None => Role::Member,
    };
    let taken = user::Entity::find()
        .filter(user::Column::Username.eq(username.clone()))
        .one(&state.pool)
        .await?;
    if taken.is_some() {
        return Err(ApiError::validation("username is already taken"));
    }
    let password_hash = hash_password(&body.password)?;

    let user_id = Uuid::new_v4();
    let now = Utc::now();
    let txn = state.pool.begin().await?;
    user::ActiveModel {
        id: Set(user_id),
        username: Set(username),
        display_name: Set(display_name),
        role: Set(entity_role(role)),
        avatar_url: Set(body.avatar_url),
        is_active: Set(true),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;
    user_secret::ActiveModel {
        user_id: Set(user_id),
        password_hash: Set(password_hash),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    let record = user::Entity::find_by_id(user_id)
        .one(&state.pool)
        .await?
        .ok_or_else(|| ApiError::internal(anyhow::anyhow!("failed to load new user")))?;
    Ok((StatusCode::CREATED, Json(UserPayload::from(record))))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUser {
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

pub async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    ApiJson(body): ApiJson<UpdateUser>,
) -> ApiResult<Json<UserPayload>> {
    let record = user::Entity::find_by_id(id)
        .one(&state.pool)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    // Role and activation changes are admin-only; profile fields may also be
    // edited by the user themselves.
    if body.role.is_some() || body.is_active.is_some() {
        require_admin(&current)?;
    } else if current.id != id {
        require_admin(&current)?;
    }

    let mut active: user::ActiveModel = record.into();
    if let Some(name) = &body.name {
        active.display_name = Set(require_non_empty("name", name)?);
    }
    if body.avatar_url.is_some() {
        active.avatar_url = Set(body.avatar_url.clone());
    }
    if let Some(raw) = body.role.as_deref() {
        let role = Role::from_str(raw)
            .ok_or_else(|| ApiError::validation(format!("unknown role: {raw}")))?;
        active.role = Set(entity_role(role));
    }
    if let Some(is_active) = body.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&state.pool).await?;
    Ok(Json(UserPayload::from(updated)))
}
