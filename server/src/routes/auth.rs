use axum::{Json, extract::State, http::StatusCode};
use axum_extra::extract::cookie::PrivateCookieJar;
use entity::{session, user, user_secret};
use platform_api::{ApiError, ApiResult};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    http::AppState,
    routes::ApiJson,
    routes::users::UserPayload,
    session::{SESSION_COOKIE, create_session, removal_cookie, session_cookie, verify_password},
};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    ApiJson(body): ApiJson<LoginRequest>,
) -> ApiResult<(PrivateCookieJar, Json<UserPayload>)> {
    let record = user::Entity::find()
        .filter(user::Column::Username.eq(body.username.trim()))
        .one(&state.pool)
        .await?
        .ok_or(ApiError::Unauthorized)?;
    if !record.is_active {
        return Err(ApiError::Unauthorized);
    }
    let secret = user_secret::Entity::find_by_id(record.id)
        .one(&state.pool)
        .await?
        .ok_or(ApiError::Unauthorized)?;
    if !verify_password(&body.password, &secret.password_hash) {
        return Err(ApiError::Unauthorized);
    }
    let session_id = create_session(&state.pool, record.id, state.config.session_ttl_days).await?;
    let jar = jar.add(session_cookie(session_id, state.config.session_ttl_days));
    Ok((jar, Json(UserPayload::from(record))))
}

pub async fn logout(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> ApiResult<(PrivateCookieJar, StatusCode)> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if let Ok(session_id) = Uuid::parse_str(cookie.value()) {
            let _ = session::Entity::delete_by_id(session_id)
                .exec(&state.pool)
                .await;
        }
    }
    let jar = jar.remove(removal_cookie());
    Ok((jar, StatusCode::NO_CONTENT))
}
