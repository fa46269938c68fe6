use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::common_types::SprintState;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sprints")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub project_id: i32,
    pub name: String,
    pub goal: String,
    pub is_started: bool,
    pub is_finished: bool,
    pub started_at: Option<ChronoDateTimeUtc>,
    /// Planned end while the sprint runs, actual end once it is finished
    pub finished_at: Option<ChronoDateTimeUtc>,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::projects::Entity",
        from = "Column::ProjectId",
        to = "super::projects::Column::Id"
    )]
    Projects,
    #[sea_orm(has_one = "super::sprint_backlogs::Entity")]
    SprintBacklogs,
    #[sea_orm(has_many = "super::issues::Entity")]
    Issues,
    #[sea_orm(has_many = "super::sprint_metrics::Entity")]
    SprintMetrics,
}

impl Related<super::projects::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Projects.def()
    }
}

impl Related<super::sprint_backlogs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SprintBacklogs.def()
    }
}

impl Related<super::issues::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Issues.def()
    }
}

impl Related<super::sprint_metrics::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SprintMetrics.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn state(&self) -> SprintState {
        match (self.is_started, self.is_finished) {
            (_, true) => SprintState::Finished,
            (true, false) => SprintState::Started,
            (false, false) => SprintState::NotStarted,
        }
    }
}
