use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "projects")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    /// Short uppercase key used as the issue code prefix, e.g. `ABC`
    #[sea_orm(unique)]
    pub key: String,
    pub description: Option<String>,
    /// Next number handed out to an issue code in this project
    pub next_issue_number: i32,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::product_backlogs::Entity")]
    ProductBacklogs,
    #[sea_orm(has_many = "super::sprints::Entity")]
    Sprints,
    #[sea_orm(has_many = "super::issues::Entity")]
    Issues,
}

impl Related<super::product_backlogs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductBacklogs.def()
    }
}

impl Related<super::sprints::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sprints.def()
    }
}

impl Related<super::issues::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Issues.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
