use axum::{
    Json,
    extract::{Query, State},
};
use chrono::{DateTime, Utc};
use entity::activity;
use platform_api::ApiResult;
use sea_orm::{ActiveEnum, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    http::AppState,
    routes::{UserSummary, clamp_limit, user_summaries},
    session::CurrentUser,
};

const DEFAULT_LIMIT: u64 = 50;
const MAX_LIMIT: u64 = 200;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityPayload {
    pub id: Uuid,
    pub action: String,
    pub description: String,
    pub user_id: Uuid,
    /// `None` for the anonymous sentinel and for since-departed users.
    pub user: Option<UserSummary>,
    pub project_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<u64>,
    #[serde(rename = "projectId")]
    pub project_id: Option<Uuid>,
    #[serde(rename = "userId")]
    pub user_id: Option<Uuid>,
}

pub async fn list(
    State(state): State<AppState>,
    _current: CurrentUser,
    Query(query): Query<ActivityQuery>,
) -> ApiResult<Json<Vec<ActivityPayload>>> {
    let limit = clamp_limit(query.limit, DEFAULT_LIMIT, MAX_LIMIT);
    let mut select = activity::Entity::find();
    if let Some(project_id) = query.project_id {
        select = select.filter(activity::Column::ProjectId.eq(project_id));
    }
    if let Some(user_id) = query.user_id {
        select = select.filter(activity::Column::UserId.eq(user_id));
    }
    let records = select
        .order_by_desc(activity::Column::CreatedAt)
        .limit(limit)
        .all(&state.pool)
        .await?;

    // Sentinel and deleted actors simply miss here; that is expected.
    let actor_ids: Vec<Uuid> = records.iter().map(|a| a.user_id).collect();
    let summaries = user_summaries(&state.pool, &actor_ids).await?;
    Ok(Json(
        records
            .into_iter()
            .map(|model| ActivityPayload {
                id: model.id,
                action: model.action.to_value(),
                description: model.description,
                user_id: model.user_id,
                user: summaries.get(&model.user_id).cloned(),
                project_id: model.project_id,
                task_id: model.task_id,
                created_at: model.created_at.into(),
            })
            .collect(),
    ))
}
