use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub username: String,
    pub display_name: String,
    pub role: Role,
    pub avatar_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    OwnedProject,
    Membership,
    Session,
    Secret,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::OwnedProject => Entity::has_many(super::project::Entity).into(),
            Relation::Membership => Entity::has_many(super::project_member::Entity).into(),
            Relation::Session => Entity::has_many(super::session::Entity).into(),
            Relation::Secret => Entity::has_one(super::user_secret::Entity).into(),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum Role {
    #[sea_orm(string_value = "ADMIN")]
    Admin,
    #[sea_orm(string_value = "TEAM_LEADER")]
    TeamLeader,
    #[sea_orm(string_value = "MEMBER")]
    Member,
}

impl ActiveModelBehavior for ActiveModel {}
