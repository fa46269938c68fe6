use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Working set container of a sprint. One row per sprint, enforced by the
/// unique index on `sprint_id`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sprint_backlogs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub sprint_id: i32,
    pub project_id: i32,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sprints::Entity",
        from = "Column::SprintId",
        to = "super::sprints::Column::Id"
    )]
    Sprints,
    #[sea_orm(has_many = "super::issues::Entity")]
    Issues,
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
