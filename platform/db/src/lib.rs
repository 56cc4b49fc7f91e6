//! Database primitives and the handful of queries shared across handlers.

use std::collections::HashSet;

use entity::{project, project_member, user};
use sea_orm::{ColumnTrait, Database, DatabaseConnection, DbErr, EntityTrait, QueryFilter};
use thiserror::Error;
use uuid::Uuid;

/// Shared connection alias.
pub type DbPool = DatabaseConnection;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database url missing")]
    MissingUrl,
    #[error(transparent)]
    Connect(#[from] DbErr),
}

/// Environment-driven settings; the key is overridable so tests can point
/// elsewhere.
#[derive(Clone, Debug)]
pub struct DatabaseSettings {
    env_key: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self::new("DATABASE_URL")
    }
}

impl DatabaseSettings {
    pub fn new(env_key: impl Into<String>) -> Self {
        Self {
            env_key: env_key.into(),
        }
    }

    pub fn from_env() -> Self {
        Self::default()
    }

    pub fn database_url(&self) -> Result<String, DbError> {
        std::env::var(&self.env_key).map_err(|_| DbError::MissingUrl)
    }
}

pub async fn connect(settings: &DatabaseSettings) -> Result<DbPool, DbError> {
    let url = settings.database_url()?;
    Ok(Database::connect(&url).await?)
}

/// Batched identity lookup. One `IN` query regardless of input size;
/// duplicate ids collapse, unknown ids are simply absent from the result.
pub async fn users_by_ids(db: &DbPool, ids: &[Uuid]) -> Result<Vec<user::Model>, DbErr> {
    let unique: HashSet<Uuid> = ids.iter().copied().collect();
    if unique.is_empty() {
        return Ok(Vec::new());
    }
    user::Entity::find()
        .filter(user::Column::Id.is_in(unique))
        .all(db)
        .await
}

/// Member ids of a project, owner included. The owner counts as a member
/// even without a membership row, everywhere membership is consulted.
pub async fn project_member_ids(
    db: &DbPool,
    project: &project::Model,
) -> Result<Vec<Uuid>, DbErr> {
    let rows = project_member::Entity::find()
        .filter(project_member::Column::ProjectId.eq(project.id))
        .all(db)
        .await?;
    let mut ids = vec![project.owner_id];
    for row in rows {
        if row.user_id != project.owner_id {
            ids.push(row.user_id);
        }
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{ActiveModelTrait, ActiveValue::Set, ConnectionTrait, DatabaseBackend, Statement};

    async fn user_fixture(db: &DbPool, username: &str) -> user::Model {
        let now = Utc::now().into();
        user::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(username.to_string()),
            display_name: Set(username.to_string()),
            role: Set(user::Role::Member),
            avatar_url: Set(None),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .unwrap()
    }

    async fn memory_db() -> DbPool {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            r#"
            CREATE TABLE user (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                display_name TEXT NOT NULL,
                role TEXT NOT NULL,
                avatar_url TEXT,
                is_active INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        ))
        .await
        .unwrap();
        db
    }

    #[tokio::test]
    async fn users_by_ids_dedups_and_skips_missing() {
        let db = memory_db().await;
        let ada = user_fixture(&db, "ada").await;
        let grace = user_fixture(&db, "grace").await;
        let missing = Uuid::new_v4();

        let found = users_by_ids(&db, &[ada.id, grace.id, ada.id, missing])
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
        let ids: HashSet<Uuid> = found.iter().map(|u| u.id).collect();
        assert!(ids.contains(&ada.id));
        assert!(ids.contains(&grace.id));
        assert!(!ids.contains(&missing));
    }

    #[tokio::test]
    async fn users_by_ids_empty_input_is_a_noop() {
        let db = memory_db().await;
        assert!(users_by_ids(&db, &[]).await.unwrap().is_empty());
    }
}
