use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::common_types::IssueStatus;

/// A named group of issues inside a product backlog. Names are unique per
/// backlog.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "epics")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub product_backlog_id: i32,
    pub name: String,
    pub description: String,
    pub status: String,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product_backlogs::Entity",
        from = "Column::ProductBacklogId",
        to = "super::product_backlogs::Column::Id"
    )]
    ProductBacklogs,
    #[sea_orm(has_many = "super::issues::Entity")]
    Issues,
}

impl Related<super::product_backlogs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductBacklogs.def()
    }
}

impl Related<super::issues::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Issues.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn status(&self) -> IssueStatus {
        IssueStatus::from_str(&self.status).unwrap_or(IssueStatus::ToDo)
    }
}
