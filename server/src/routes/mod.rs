pub mod activities;
pub mod auth;
pub mod chatbot;
pub mod comments;
pub mod dashboard;
pub mod feedback;
pub mod files;
pub mod members;
pub mod projects;
pub mod tasks;
pub mod users;

use std::collections::HashMap;

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};
use chrono::{DateTime, NaiveDate};
use entity::user;
use platform_api::ApiError;
use platform_db::DbPool;
use sea_orm::DbErr;
use serde::Serialize;
use uuid::Uuid;

/// JSON body extractor that reports every malformed or schema-violating
/// payload as a `400`, keeping the error taxonomy in one place.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|err| ApiError::validation(err.body_text()))?;
        Ok(Self(value))
    }
}

/// `{id, name}`-shaped expansion of a foreign user id.
#[derive(Clone, Debug, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
}

impl From<&user::Model> for UserSummary {
    fn from(model: &user::Model) -> Self {
        Self {
            id: model.id,
            name: model.display_name.clone(),
        }
    }
}

/// Resolve a batch of user ids into summaries with a single query.
pub async fn user_summaries(
    db: &DbPool,
    ids: &[Uuid],
) -> Result<HashMap<Uuid, UserSummary>, DbErr> {
    let records = platform_db::users_by_ids(db, ids).await?;
    Ok(records
        .iter()
        .map(|model| (model.id, UserSummary::from(model)))
        .collect())
}

/// Deadlines arrive as date-like strings; anything unparseable is a `400`.
pub fn parse_deadline(value: &str) -> Result<NaiveDate, ApiError> {
    let trimmed = value.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(trimmed).map(|dt| dt.date_naive()))
        .map_err(|_| ApiError::validation(format!("invalid date: {trimmed}")))
}

pub fn clamp_limit(requested: Option<u64>, default: u64, max: u64) -> u64 {
    requested.unwrap_or(default).clamp(1, max)
}

pub fn require_non_empty(field: &'static str, value: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}
