use super::{AppContext, IssueSummary, TransitionSummary};
use crate::errors::CoreResult;
use crate::services::issue_service::{CreateIssue, IssuePatch};

impl AppContext {
    // ----- Issue helpers ---------------------------------------------------
    pub async fn create_issue(&self, input: CreateIssue) -> CoreResult<IssueSummary> {
        self.issue_service
            .create_issue(input)
            .await
            .map(IssueSummary::from)
    }

    pub async fn get_issue(&self, id: i32) -> CoreResult<IssueSummary> {
        self.issue_service.get_issue(id).await.map(IssueSummary::from)
    }

    pub async fn update_issue(&self, id: i32, patch: IssuePatch) -> CoreResult<IssueSummary> {
        self.issue_service
            .update_issue(id, patch)
            .await
            .map(IssueSummary::from)
    }

    pub async fn delete_issue(&self, id: i32) -> CoreResult<()> {
        self.issue_service.delete_issue(id).await
    }

    pub async fn get_issues_by_user(&self, user_id: &str) -> CoreResult<Vec<IssueSummary>> {
        let issues = self.issue_service.get_issues_by_user(user_id).await?;
        Ok(issues.into_iter().map(IssueSummary::from).collect())
    }

    // ----- Placement helpers -----------------------------------------------
    pub async fn move_issue_to_sprint(
        &self,
        issue_id: i32,
        sprint_id: i32,
    ) -> CoreResult<IssueSummary> {
        self.lifecycle_service
            .move_issue_to_sprint(issue_id, sprint_id)
            .await
            .map(IssueSummary::from)
    }

    pub async fn move_issue_to_backlog(
        &self,
        issue_id: i32,
        backlog_id: i32,
    ) -> CoreResult<IssueSummary> {
        self.lifecycle_service
            .move_issue_to_backlog(issue_id, backlog_id)
            .await
            .map(IssueSummary::from)
    }

    pub async fn remove_issue_from_backlog(&self, issue_id: i32) -> CoreResult<IssueSummary> {
        self.lifecycle_service
            .remove_issue_from_backlog(issue_id)
            .await
            .map(IssueSummary::from)
    }

    pub async fn get_issue_transition_history(
        &self,
        issue_id: i32,
    ) -> CoreResult<Vec<TransitionSummary>> {
        let transitions = self
            .sprint_service
            .get_issue_transition_history(issue_id)
            .await?;
        Ok(transitions.into_iter().map(TransitionSummary::from).collect())
    }
}
