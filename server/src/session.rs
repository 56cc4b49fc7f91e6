use argon2::Argon2;
use argon2::password_hash::{
    PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
};
use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};
use chrono::{Duration, Utc};
use entity::{session, user};
use platform_api::ApiError;
use platform_authz::{Actor, Role};
use platform_db::DbPool;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait};
use time::Duration as TimeDuration;
use uuid::Uuid;

use crate::http::AppState;

pub const SESSION_COOKIE: &str = "__Host-td_session";

/// The authenticated actor behind a request, resolved from the session
/// cookie. Extraction failing means `401`; authorization never runs.
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.id,
            role: self.role,
        }
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = PrivateCookieJar::from_headers(&parts.headers, state.config.cookie_key.clone());
        let cookie = jar.get(SESSION_COOKIE).ok_or(ApiError::Unauthorized)?;
        let session_id =
            Uuid::parse_str(cookie.value()).map_err(|_| ApiError::Unauthorized)?;
        let session = session::Entity::find_by_id(session_id)
            .one(&state.pool)
            .await?
            .ok_or(ApiError::Unauthorized)?;
        if session.expires_at.with_timezone(&Utc) < Utc::now() {
            let _ = session::Entity::delete_by_id(session_id)
                .exec(&state.pool)
                .await;
            return Err(ApiError::Unauthorized);
        }
        let user = user::Entity::find_by_id(session.user_id)
            .one(&state.pool)
            .await?
            .ok_or(ApiError::Unauthorized)?;
        if !user.is_active {
            return Err(ApiError::Unauthorized);
        }
        Ok(CurrentUser {
            id: user.id,
            username: user.username,
            display_name: user.display_name,
            role: policy_role(user.role),
        })
    }
}

pub fn policy_role(role: user::Role) -> Role {
    match role {
        user::Role::Admin => Role::Admin,
        user::Role::TeamLeader => Role::TeamLeader,
        user::Role::Member => Role::Member,
    }
}

pub fn entity_role(role: Role) -> user::Role {
    match role {
        Role::Admin => user::Role::Admin,
        Role::TeamLeader => user::Role::TeamLeader,
        Role::Member => user::Role::Member,
    }
}

pub async fn create_session(db: &DbPool, user_id: Uuid, ttl_days: i64) -> Result<Uuid, ApiError> {
    let session_id = Uuid::new_v4();
    let now = Utc::now();
    let expires_at = now + Duration::days(ttl_days);
    session::ActiveModel {
        id: Set(session_id),
        user_id: Set(user_id),
        created_at: Set(now.into()),
        expires_at: Set(expires_at.into()),
    }
    .insert(db)
    .await?;
    Ok(session_id)
}

pub fn session_cookie(session_id: Uuid, ttl_days: i64) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_id.to_string()))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(TimeDuration::days(ttl_days))
        .build()
}

pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/").build()
}

pub fn hash_password(raw: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(raw.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| ApiError::internal(anyhow::anyhow!("failed to hash password: {err}")))
}

pub fn verify_password(raw: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(raw.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}
