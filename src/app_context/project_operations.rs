use super::{AppContext, BacklogSummary, IssueSummary, ProjectCreated, ProjectSummary};
use crate::database::entities::{IssueStatus, IssueType};
use crate::errors::CoreResult;
use crate::services::product_backlog_service::ProjectStats;
use crate::services::project_service::CreateProject;

impl AppContext {
    // ----- Project helpers -------------------------------------------------
    pub async fn create_project(&self, input: CreateProject) -> CoreResult<ProjectCreated> {
        let (project, backlog) = self.project_service.create_project(input).await?;
        Ok(ProjectCreated {
            project: ProjectSummary::from(project),
            backlog: BacklogSummary::from(backlog),
        })
    }

    pub async fn list_projects(&self) -> CoreResult<Vec<ProjectSummary>> {
        let projects = self.project_service.list_projects().await?;
        Ok(projects.into_iter().map(ProjectSummary::from).collect())
    }

    pub async fn get_project(&self, id: i32) -> CoreResult<ProjectSummary> {
        self.project_service
            .get_project(id)
            .await
            .map(ProjectSummary::from)
    }

    pub async fn get_project_stats(&self, project_id: i32) -> CoreResult<ProjectStats> {
        self.product_backlog_service
            .get_project_stats(project_id)
            .await
    }

    // ----- Product backlog helpers -----------------------------------------
    pub async fn get_product_backlog(&self, id: i32) -> CoreResult<BacklogSummary> {
        self.product_backlog_service
            .get_product_backlog(id)
            .await
            .map(BacklogSummary::from)
    }

    pub async fn get_product_backlog_by_project(
        &self,
        project_id: i32,
    ) -> CoreResult<BacklogSummary> {
        self.product_backlog_service
            .get_product_backlog_by_project(project_id)
            .await
            .map(BacklogSummary::from)
    }

    pub async fn get_backlog_issues(
        &self,
        backlog_id: i32,
        status: Option<IssueStatus>,
    ) -> CoreResult<Vec<IssueSummary>> {
        let issues = self
            .product_backlog_service
            .get_backlog_issues(backlog_id, status)
            .await?;
        Ok(issues.into_iter().map(IssueSummary::from).collect())
    }

    pub async fn search_backlog_issues(
        &self,
        backlog_id: i32,
        issue_type: Option<IssueType>,
    ) -> CoreResult<Vec<IssueSummary>> {
        let issues = self
            .product_backlog_service
            .search_backlog_issues(backlog_id, issue_type)
            .await?;
        Ok(issues.into_iter().map(IssueSummary::from).collect())
    }
}
