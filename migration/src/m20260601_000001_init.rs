use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
#[sea_orm(iden = "user")]
enum User { Table, Id, Username, DisplayName, Role, AvatarUrl, IsActive, CreatedAt, UpdatedAt }

#[derive(DeriveIden)]
#[sea_orm(iden = "user_secret")]
enum UserSecret { Table, UserId, PasswordHash, UpdatedAt }

#[derive(DeriveIden)]
#[sea_orm(iden = "session")]
enum Session { Table, Id, UserId, CreatedAt, ExpiresAt }

#[derive(DeriveIden)]
enum Project { Table, Id, Name, Status, Deadline, OwnerId, CreatedAt, UpdatedAt }

#[derive(DeriveIden)]
enum ProjectMember { Table, ProjectId, UserId, CreatedAt }

#[derive(DeriveIden)]
enum Task { Table, Id, Title, Description, Status, ProjectId, CreatorId, AssigneeId, Deadline, CompletedAt, CreatedAt, UpdatedAt }

#[derive(DeriveIden)]
enum Comment { Table, Id, TaskId, ProjectId, UserId, Content, CreatedAt }

#[derive(DeriveIden)]
#[sea_orm(iden = "file")]
enum File { Table, Id, Name, StorageName, Size, MimeType, UploadedBy, TaskId, ProjectId, Description, CreatedAt }

#[derive(DeriveIden)]
enum Activity { Table, Id, Action, Description, UserId, ProjectId, TaskId, CreatedAt }

#[derive(DeriveMigrationName)]
pub struct Migration;
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Extensions (safe if already present)
        manager.get_connection().execute_unprepared(r#"CREATE EXTENSION IF NOT EXISTS "pgcrypto";"#).await?;

        manager.create_table(
            Table::create()
                .table(User::Table)
                .if_not_exists()
                .col(ColumnDef::new(User::Id).uuid().not_null().primary_key().default(Expr::cust("gen_random_uuid()")))
                .col(ColumnDef::new(User::Username).string_len(64).not_null())
                .col(ColumnDef::new(User::DisplayName).string_len(128).not_null())
                .col(ColumnDef::new(User::Role).string_len(16).not_null())
                .col(ColumnDef::new(User::AvatarUrl).string_len(512))
                .col(ColumnDef::new(User::IsActive).boolean().not_null().default(true))
                .col(ColumnDef::new(User::CreatedAt).timestamp_with_time_zone().not_null().default(Expr::cust("now()")))
                .col(ColumnDef::new(User::UpdatedAt).timestamp_with_time_zone().not_null().default(Expr::cust("now()")))
                .to_owned()
        ).await?;

        manager.create_index(
            Index::create().name("idx_user_username").table(User::Table).col(User::Username).unique().to_owned()
        ).await?;

        manager.create_table(
            Table::create()
                .table(UserSecret::Table)
                .if_not_exists()
                .col(ColumnDef::new(UserSecret::UserId).uuid().not_null().primary_key())
                .col(ColumnDef::new(UserSecret::PasswordHash).string_len(256).not_null())
                .col(ColumnDef::new(UserSecret::UpdatedAt).timestamp_with_time_zone().not_null().default(Expr::cust("now()")))
                .foreign_key(ForeignKey::create()
                    .name("fk_user_secret_user")
                    .from(UserSecret::Table, UserSecret::UserId)
                    .to(User::Table, User::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                )
                .to_owned()
        ).await?;

        manager.create_table(
            Table::create()
                .table(Session::Table)
                .if_not_exists()
                .col(ColumnDef::new(Session::Id).uuid().not_null().primary_key())
                .col(ColumnDef::new(Session::UserId).uuid().not_null())
                .col(ColumnDef::new(Session::CreatedAt).timestamp_with_time_zone().not_null().default(Expr::cust("now()")))
                .col(ColumnDef::new(Session::ExpiresAt).timestamp_with_time_zone().not_null())
                .foreign_key(ForeignKey::create()
                    .name("fk_session_user")
                    .from(Session::Table, Session::UserId)
                    .to(User::Table, User::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                )
                .to_owned()
        ).await?;

        manager.create_table(
            Table::create()
                .table(Project::Table)
                .if_not_exists()
                .col(ColumnDef::new(Project::Id).uuid().not_null().primary_key().default(Expr::cust("gen_random_uuid()")))
                .col(ColumnDef::new(Project::Name).string_len(256).not_null())
                .col(ColumnDef::new(Project::Status).string_len(32).not_null())
                .col(ColumnDef::new(Project::Deadline).date())
                .col(ColumnDef::new(Project::OwnerId).uuid().not_null())
                .col(ColumnDef::new(Project::CreatedAt).timestamp_with_time_zone().not_null().default(Expr::cust("now()")))
                .col(ColumnDef::new(Project::UpdatedAt).timestamp_with_time_zone().not_null().default(Expr::cust("now()")))
                .foreign_key(ForeignKey::create()
                    .name("fk_project_owner")
                    .from(Project::Table, Project::OwnerId)
                    .to(User::Table, User::Id)
                    .on_delete(ForeignKeyAction::Restrict)
                )
                .to_owned()
        ).await?;

        manager.create_index(
            Index::create().name("idx_project_owner").table(Project::Table).col(Project::OwnerId).to_owned()
        ).await?;

        manager.create_table(
            Table::create()
                .table(ProjectMember::Table)
                .if_not_exists()
                .col(ColumnDef::new(ProjectMember::ProjectId).uuid().not_null())
                .col(ColumnDef::new(ProjectMember::UserId).uuid().not_null())
                .col(ColumnDef::new(ProjectMember::CreatedAt).timestamp_with_time_zone().not_null().default(Expr::cust("now()")))
                .primary_key(Index::create().col(ProjectMember::ProjectId).col(ProjectMember::UserId))
                .foreign_key(ForeignKey::create()
                    .name("fk_project_member_project")
                    .from(ProjectMember::Table, ProjectMember::ProjectId)
                    .to(Project::Table, Project::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                )
                .foreign_key(ForeignKey::create()
                    .name("fk_project_member_user")
                    .from(ProjectMember::Table, ProjectMember::UserId)
                    .to(User::Table, User::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                )
                .to_owned()
        ).await?;

        manager.create_table(
            Table::create()
                .table(Task::Table)
                .if_not_exists()
                .col(ColumnDef::new(Task::Id).uuid().not_null().primary_key().default(Expr::cust("gen_random_uuid()")))
                .col(ColumnDef::new(Task::Title).string_len(256).not_null())
                .col(ColumnDef::new(Task::Description).text())
                .col(ColumnDef::new(Task::Status).string_len(32).not_null())
                .col(ColumnDef::new(Task::ProjectId).uuid().not_null())
                .col(ColumnDef::new(Task::CreatorId).uuid().not_null())
                .col(ColumnDef::new(Task::AssigneeId).uuid())
                .col(ColumnDef::new(Task::Deadline).date())
                .col(ColumnDef::new(Task::CompletedAt).timestamp_with_time_zone())
                .col(ColumnDef::new(Task::CreatedAt).timestamp_with_time_zone().not_null().default(Expr::cust("now()")))
                .col(ColumnDef::new(Task::UpdatedAt).timestamp_with_time_zone().not_null().default(Expr::cust("now()")))
                .foreign_key(ForeignKey::create()
                    .name("fk_task_project")
                    .from(Task::Table, Task::ProjectId)
                    .to(Project::Table, Project::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                )
                .foreign_key(ForeignKey::create()
                    .name("fk_task_creator")
                    .from(Task::Table, Task::CreatorId)
                    .to(User::Table, User::Id)
                    .on_delete(ForeignKeyAction::Restrict)
                )
                .foreign_key(ForeignKey::create()
                    .name("fk_task_assignee")
                    .from(Task::Table, Task::AssigneeId)
                    .to(User::Table, User::Id)
                    .on_delete(ForeignKeyAction::SetNull)
                )
                .to_owned()
        ).await?;

        manager.create_index(
            Index::create().name("idx_task_project").table(Task::Table).col(Task::ProjectId).to_owned()
        ).await?;

        manager.create_index(
            Index::create().name("idx_task_assignee").table(Task::Table).col(Task::AssigneeId).to_owned()
        ).await?;

        manager.create_table(
            Table::create()
                .table(Comment::Table)
                .if_not_exists()
                .col(ColumnDef::new(Comment::Id).uuid().not_null().primary_key().default(Expr::cust("gen_random_uuid()")))
                .col(ColumnDef::new(Comment::TaskId).uuid())
                .col(ColumnDef::new(Comment::ProjectId).uuid())
                .col(ColumnDef::new(Comment::UserId).uuid().not_null())
                .col(ColumnDef::new(Comment::Content).text().not_null())
                .col(ColumnDef::new(Comment::CreatedAt).timestamp_with_time_zone().not_null().default(Expr::cust("now()")))
                .foreign_key(ForeignKey::create()
                    .name("fk_comment_task")
                    .from(Comment::Table, Comment::TaskId)
                    .to(Task::Table, Task::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                )
                .foreign_key(ForeignKey::create()
                    .name("fk_comment_project")
                    .from(Comment::Table, Comment::ProjectId)
                    .to(Project::Table, Project::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                )
                .foreign_key(ForeignKey::create()
                    .name("fk_comment_author")
                    .from(Comment::Table, Comment::UserId)
                    .to(User::Table, User::Id)
                    .on_delete(ForeignKeyAction::Restrict)
                )
                .to_owned()
        ).await?;

        manager.create_index(
            Index::create().name("idx_comment_task").table(Comment::Table).col(Comment::TaskId).to_owned()
        ).await?;

        manager.create_table(
            Table::create()
                .table(File::Table)
                .if_not_exists()
                .col(ColumnDef::new(File::Id).uuid().not_null().primary_key().default(Expr::cust("gen_random_uuid()")))
                .col(ColumnDef::new(File::Name).string_len(256).not_null())
                .col(ColumnDef::new(File::StorageName).string_len(256).not_null())
                .col(ColumnDef::new(File::Size).big_integer().not_null())
                .col(ColumnDef::new(File::MimeType).string_len(128).not_null())
                .col(ColumnDef::new(File::UploadedBy).uuid().not_null())
                .col(ColumnDef::new(File::TaskId).uuid())
                .col(ColumnDef::new(File::ProjectId).uuid())
                .col(ColumnDef::new(File::Description).text())
                .col(ColumnDef::new(File::CreatedAt).timestamp_with_time_zone().not_null().default(Expr::cust("now()")))
                .foreign_key(ForeignKey::create()
                    .name("fk_file_task")
                    .from(File::Table, File::TaskId)
                    .to(Task::Table, Task::Id)
                    .on_delete(ForeignKeyAction::SetNull)
                )
                .foreign_key(ForeignKey::create()
                    .name("fk_file_project")
                    .from(File::Table, File::ProjectId)
                    .to(Project::Table, Project::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                )
                .foreign_key(ForeignKey::create()
                    .name("fk_file_uploader")
                    .from(File::Table, File::UploadedBy)
                    .to(User::Table, User::Id)
                    .on_delete(ForeignKeyAction::Restrict)
                )
                .to_owned()
        ).await?;

        manager.create_index(
            Index::create().name("idx_file_storage_name").table(File::Table).col(File::StorageName).unique().to_owned()
        ).await?;

        // Weak references only: activity rows outlive everything they mention.
        manager.create_table(
            Table::create()
                .table(Activity::Table)
                .if_not_exists()
                .col(ColumnDef::new(Activity::Id).uuid().not_null().primary_key().default(Expr::cust("gen_random_uuid()")))
                .col(ColumnDef::new(Activity::Action).string_len(32).not_null())
                .col(ColumnDef::new(Activity::Description).text().not_null())
                .col(ColumnDef::new(Activity::UserId).uuid().not_null())
                .col(ColumnDef::new(Activity::ProjectId).uuid())
                .col(ColumnDef::new(Activity::TaskId).uuid())
                .col(ColumnDef::new(Activity::CreatedAt).timestamp_with_time_zone().not_null().default(Expr::cust("now()")))
                .to_owned()
        ).await?;

        manager.create_index(
            Index::create().name("idx_activity_project").table(Activity::Table).col(Activity::ProjectId).to_owned()
        ).await?;

        manager.create_index(
            Index::create().name("idx_activity_created").table(Activity::Table).col(Activity::CreatedAt).to_owned()
        ).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Activity::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(File::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Comment::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Task::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(ProjectMember::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Session::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(UserSecret::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Project::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(User::Table).to_owned()).await?;
        Ok(())
    }
}
