use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};
use serde::Serialize;

use crate::database::entities::{issues, product_backlogs, projects, IssueStatus, IssueType};
use crate::errors::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStats {
    pub total: usize,
    pub completed: usize,
    /// Rounded percentage of completed issues
    pub progress: u32,
}

impl ProjectStats {
    pub fn from_issues(issues: &[issues::Model]) -> Self {
        let total = issues.len();
        let completed = issues.iter().filter(|i| i.status().is_completed()).count();
        let progress = if total == 0 {
            0
        } else {
            (completed as f64 / total as f64 * 100.0).round() as u32
        };
        Self {
            total,
            completed,
            progress,
        }
    }
}

pub struct ProductBacklogService {
    db: DatabaseConnection,
}

impl ProductBacklogService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn get_product_backlog(&self, id: i32) -> CoreResult<product_backlogs::Model> {
        product_backlogs::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| CoreError::not_found("ProductBacklog", id))
    }

    pub async fn get_product_backlog_by_project(
        &self,
        project_id: i32,
    ) -> CoreResult<product_backlogs::Model> {
        projects::Entity::find_by_id(project_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| CoreError::not_found("Project", project_id))?;

        product_backlogs::Entity::find()
            .filter(product_backlogs::Column::ProjectId.eq(project_id))
            .one(&self.db)
            .await?
            .ok_or_else(|| CoreError::not_found("ProductBacklog", project_id))
    }

    fn backlog_query(backlog_id: i32) -> sea_orm::Select<issues::Entity> {
        issues::Entity::find_active()
            .filter(issues::Column::ProductBacklogId.eq(backlog_id))
            .filter(issues::Column::InBacklog.eq(true))
    }

    /// Backlog issues, largest story points first.
    pub async fn get_backlog_issues(
        &self,
        backlog_id: i32,
        status: Option<IssueStatus>,
    ) -> CoreResult<Vec<issues::Model>> {
        self.get_product_backlog(backlog_id).await?;

        let mut query = Self::backlog_query(backlog_id);
        if let Some(status) = status {
            query = query.filter(issues::Column::Status.eq(status.to_string()));
        }
        Ok(query
            .order_by_desc(issues::Column::StoryPoints)
            .order_by_asc(issues::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn search_backlog_issues(
        &self,
        backlog_id: i32,
        issue_type: Option<IssueType>,
    ) -> CoreResult<Vec<issues::Model>> {
        self.get_product_backlog(backlog_id).await?;

        let mut query = Self::backlog_query(backlog_id);
        if let Some(issue_type) = issue_type {
            query = query.filter(issues::Column::IssueType.eq(issue_type.to_string()));
        }
        Ok(query
            .order_by_asc(issues::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Progress over active issues in the project's backlog and sprints.
    pub async fn get_project_stats(&self, project_id: i32) -> CoreResult<ProjectStats> {
        projects::Entity::find_by_id(project_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| CoreError::not_found("Project", project_id))?;

        let placed = issues::Entity::find_active()
            .filter(issues::Column::ProjectId.eq(project_id))
            .filter(
                Condition::any()
                    .add(issues::Column::InBacklog.eq(true))
                    .add(issues::Column::InSprint.eq(true)),
            )
            .all(&self.db)
            .await?;

        Ok(ProjectStats::from_issues(&placed))
    }
}
