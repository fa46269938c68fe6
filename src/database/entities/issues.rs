use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::common_types::{IssueLifecycle, IssueLocation, IssueStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "issues")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub project_id: i32,
    /// `{project key}-{n}`, unique per project and never reused
    pub code: String,
    pub title: String,
    pub description: String,
    pub status: String,
    pub issue_type: String,
    pub priority: String,
    pub story_points: Option<i32>,
    pub acceptance_criteria: Option<String>,
    pub created_by: String,
    pub assigned_to: Option<String>,
    pub in_backlog: bool,
    pub in_sprint: bool,
    pub product_backlog_id: Option<i32>,
    pub sprint_id: Option<i32>,
    pub sprint_backlog_id: Option<i32>,
    pub epic_id: Option<i32>,
    pub deleted_at: Option<ChronoDateTimeUtc>,
    /// Optimistic concurrency token, bumped on every location or field write
    pub version: i32,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
    pub resolved_at: Option<ChronoDateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::projects::Entity",
        from = "Column::ProjectId",
        to = "super::projects::Column::Id"
    )]
    Projects,
    #[sea_orm(
        belongs_to = "super::product_backlogs::Entity",
        from = "Column::ProductBacklogId",
        to = "super::product_backlogs::Column::Id"
    )]
    ProductBacklogs,
    #[sea_orm(
        belongs_to = "super::sprints::Entity",
        from = "Column::SprintId",
        to = "super::sprints::Column::Id"
    )]
    Sprints,
    #[sea_orm(
        belongs_to = "super::sprint_backlogs::Entity",
        from = "Column::SprintBacklogId",
        to = "super::sprint_backlogs::Column::Id"
    )]
    SprintBacklogs,
    #[sea_orm(
        belongs_to = "super::epics::Entity",
        from = "Column::EpicId",
        to = "super::epics::Column::Id"
    )]
    Epics,
    #[sea_orm(has_many = "super::issue_transitions::Entity")]
    IssueTransitions,
}

impl Related<super::projects::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Projects.def()
    }
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

impl Related<super::sprint_backlogs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SprintBacklogs.def()
    }
}

impl Related<super::epics::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Epics.def()
    }
}

impl Related<super::issue_transitions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::IssueTransitions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Entity {
    /// Issues that have not been soft-deleted.
    pub fn find_active() -> Select<Entity> {
        Self::find().filter(Column::DeletedAt.is_null())
    }
}

impl Model {
    /// Reads the location out of the flag/reference columns. A row whose
    /// sprint flag is set without both references is reported as unassigned.
    pub fn location(&self) -> IssueLocation {
        match (
            self.in_sprint,
            self.sprint_id,
            self.sprint_backlog_id,
            self.in_backlog,
            self.product_backlog_id,
        ) {
            (true, Some(sprint_id), Some(sprint_backlog_id), _, _) => IssueLocation::Sprint {
                sprint_id,
                sprint_backlog_id,
            },
            (false, _, _, true, Some(backlog_id)) => IssueLocation::ProductBacklog { backlog_id },
            _ => IssueLocation::Unassigned,
        }
    }

    pub fn lifecycle(&self) -> IssueLifecycle {
        match self.deleted_at {
            Some(at) => IssueLifecycle::Deleted { at },
            None => IssueLifecycle::Active,
        }
    }

    /// Parsed status. Unknown stored values are treated as not started.
    pub fn status(&self) -> IssueStatus {
        IssueStatus::from_str(&self.status).unwrap_or(IssueStatus::ToDo)
    }

    pub fn points(&self) -> i64 {
        self.story_points.map(i64::from).unwrap_or(0)
    }
}
