use sea_orm::entity::prelude::*;

/// Append-only audit trail. Rows reference users, projects and tasks weakly:
/// no foreign keys, so entries survive their subjects and the anonymous
/// sentinel actor id never violates a constraint.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "activity")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub action: Action,
    pub description: String,
    #[sea_orm(indexed)]
    pub user_id: Uuid,
    #[sea_orm(indexed)]
    pub project_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        panic!("no relations")
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq)]
#[sea_orm(rs_type = "String", db_type = "String(Some(32))")]
pub enum Action {
    #[sea_orm(string_value = "create_project")]
    CreateProject,
    #[sea_orm(string_value = "update_project")]
    UpdateProject,
    #[sea_orm(string_value = "delete_project")]
    DeleteProject,
    #[sea_orm(string_value = "add_member")]
    AddMember,
    #[sea_orm(string_value = "remove_member")]
    RemoveMember,
    #[sea_orm(string_value = "create_task")]
    CreateTask,
    #[sea_orm(string_value = "update_task")]
    UpdateTask,
    #[sea_orm(string_value = "delete_task")]
    DeleteTask,
    #[sea_orm(string_value = "create_comment")]
    CreateComment,
    #[sea_orm(string_value = "upload_file")]
    UploadFile,
    #[sea_orm(string_value = "delete_file")]
    DeleteFile,
    #[sea_orm(string_value = "feedback")]
    Feedback,
}

impl ActiveModelBehavior for ActiveModel {}
