use std::collections::HashSet;

use axum::{Json, extract::State};
use chrono::{Duration, Months, Utc};
use entity::{project, project_member, task};
use platform_api::ApiResult;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect};
use serde::Serialize;
use uuid::Uuid;

use crate::{http::AppState, session::CurrentUser};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardPayload {
    pub total_projects: u64,
    pub in_progress_tasks: u64,
    pub completed_tasks: u64,
    pub team_members: u64,
    pub tasks_due_soon: u64,
    pub tasks_completed_last_week: u64,
    pub projects_created_last_month: u64,
}

/// Derived on demand against wall-clock time; nothing here is persisted or
/// cached. All window boundaries include "now".
pub async fn summary(
    State(state): State<AppState>,
    _current: CurrentUser,
) -> ApiResult<Json<DashboardPayload>> {
    let now = Utc::now();
    let today = now.date_naive();
    let week_ahead = today + Duration::days(7);
    let week_ago = now - Duration::days(7);
    let month_ago = now
        .checked_sub_months(Months::new(1))
        .unwrap_or(now - Duration::days(30));

    let total_projects = project::Entity::find().count(&state.pool).await?;
    let in_progress_tasks = task::Entity::find()
        .filter(task::Column::Status.eq(task::Status::InProgress))
        .count(&state.pool)
        .await?;
    let completed_tasks = task::Entity::find()
        .filter(task::Column::Status.eq(task::Status::Completed))
        .count(&state.pool)
        .await?;

    // Union of every project owner and membership row, counted once each.
    let owners: Vec<Uuid> = project::Entity::find()
        .select_only()
        .column(project::Column::OwnerId)
        .into_tuple()
        .all(&state.pool)
        .await?;
    let members: Vec<Uuid> = project_member::Entity::find()
        .select_only()
        .column(project_member::Column::UserId)
        .into_tuple()
        .all(&state.pool)
        .await?;
    let team_members = owners
        .into_iter()
        .chain(members)
        .collect::<HashSet<Uuid>>()
        .len() as u64;

    let tasks_due_soon = task::Entity::find()
        .filter(task::Column::Status.ne(task::Status::Completed))
        .filter(task::Column::Deadline.gte(today))
        .filter(task::Column::Deadline.lte(week_ahead))
        .count(&state.pool)
        .await?;
    let tasks_completed_last_week = task::Entity::find()
        .filter(task::Column::CompletedAt.gte(week_ago))
        .count(&state.pool)
        .await?;
    let projects_created_last_month = project::Entity::find()
        .filter(project::Column::CreatedAt.gte(month_ago))
        .count(&state.pool)
        .await?;

    Ok(Json(DashboardPayload {
        total_projects,
        in_progress_tasks,
        completed_tasks,
        team_members,
        tasks_due_soon,
        tasks_completed_last_week,
        projects_created_last_month,
    }))
}
