use chrono::Utc;
use entity::activity;
use platform_db::DbPool;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, DbErr};
use uuid::Uuid;

/// Reserved actor id for anonymized submissions. Resolving it against the
/// user table is an expected miss, not an integrity error.
pub const ANONYMOUS_ACTOR: Uuid = Uuid::nil();

/// Append one audit entry. Handlers call this exactly once per successful
/// mutation, sequenced after the store write so it is unreachable when the
/// mutation failed. Reads never record.
pub async fn record(
    db: &DbPool,
    action: activity::Action,
    description: impl Into<String>,
    actor_id: Uuid,
    project_id: Option<Uuid>,
    task_id: Option<Uuid>,
) -> Result<activity::Model, DbErr> {
    activity::ActiveModel {
        id: Set(Uuid::new_v4()),
        action: Set(action),
        description: Set(description.into()),
        user_id: Set(actor_id),
        project_id: Set(project_id),
        task_id: Set(task_id),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
}
