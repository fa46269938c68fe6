use super::{
    AppContext, IssuePage, IssueSummary, MovedWork, SprintCompletionSummary, SprintReportSummary,
    SprintSummary, SprintWithIssues, TransitionSummary,
};
use crate::errors::CoreResult;
use crate::services::burndown::BurndownReport;
use crate::services::lifecycle_service::CompleteSprint;
use crate::services::sprint_service::{CreateSprint, IssueFilters, Pagination, SprintPatch};

impl AppContext {
    // ----- Sprint helpers --------------------------------------------------
    pub async fn create_sprint(&self, input: CreateSprint) -> CoreResult<SprintSummary> {
        self.sprint_service
            .create_sprint(input)
            .await
            .map(SprintSummary::from)
    }

    pub async fn get_sprint(&self, id: i32) -> CoreResult<SprintSummary> {
        self.sprint_service.get_sprint(id).await.map(SprintSummary::from)
    }

    pub async fn update_sprint(&self, id: i32, patch: SprintPatch) -> CoreResult<SprintSummary> {
        self.sprint_service
            .update_sprint(id, patch)
            .await
            .map(SprintSummary::from)
    }

    pub async fn get_project_sprints(
        &self,
        project_id: i32,
        include_completed: bool,
    ) -> CoreResult<Vec<SprintWithIssues>> {
        let overviews = self
            .sprint_service
            .get_project_sprints(project_id, include_completed)
            .await?;

        Ok(overviews
            .into_iter()
            .map(|overview| SprintWithIssues {
                sprint: SprintSummary::from(overview.sprint),
                issues: overview.issues.into_iter().map(IssueSummary::from).collect(),
            })
            .collect())
    }

    pub async fn get_sprint_backlog_issues(
        &self,
        sprint_id: i32,
        pagination: Pagination,
        filters: IssueFilters,
    ) -> CoreResult<IssuePage> {
        let (page, limit) = pagination.normalized();
        let (issues, total) = self
            .sprint_service
            .get_sprint_backlog_issues(sprint_id, pagination, filters)
            .await?;

        Ok(IssuePage {
            issues: issues.into_iter().map(IssueSummary::from).collect(),
            total,
            page,
            limit,
        })
    }

    // ----- Lifecycle helpers -----------------------------------------------
    pub async fn start_sprint(&self, sprint_id: i32) -> CoreResult<SprintSummary> {
        self.lifecycle_service
            .start_sprint(sprint_id)
            .await
            .map(SprintSummary::from)
    }

    pub async fn complete_sprint(
        &self,
        sprint_id: i32,
        input: CompleteSprint,
    ) -> CoreResult<SprintCompletionSummary> {
        let completion = self
            .lifecycle_service
            .complete_sprint(sprint_id, input)
            .await?;

        Ok(SprintCompletionSummary {
            completed_sprint: SprintSummary::from(completion.completed),
            new_sprint: SprintSummary::from(completion.successor),
            carried_over: completion
                .carried_over
                .into_iter()
                .map(IssueSummary::from)
                .collect(),
        })
    }

    pub async fn add_issues_to_sprint(
        &self,
        sprint_id: i32,
        issue_ids: &[i32],
    ) -> CoreResult<SprintWithIssues> {
        let (sprint, issues) = self
            .lifecycle_service
            .add_issues_to_sprint(sprint_id, issue_ids)
            .await?;

        Ok(SprintWithIssues {
            sprint: SprintSummary::from(sprint),
            issues: issues.into_iter().map(IssueSummary::from).collect(),
        })
    }

    // ----- Reporting helpers -----------------------------------------------
    pub async fn get_sprint_transition_issues(
        &self,
        from_sprint_id: i32,
        to_sprint_id: i32,
    ) -> CoreResult<Vec<TransitionSummary>> {
        let rows = self
            .sprint_service
            .get_sprint_transition_issues(from_sprint_id, to_sprint_id)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(transition, issue)| {
                let mut summary = TransitionSummary::from(transition);
                summary.issue = issue.map(IssueSummary::from);
                summary
            })
            .collect())
    }

    pub async fn calculate_moved_work(
        &self,
        from_sprint_id: i32,
        to_sprint_id: i32,
    ) -> CoreResult<MovedWork> {
        let story_points = self
            .sprint_service
            .calculate_moved_work_story_points(from_sprint_id, to_sprint_id)
            .await?;

        Ok(MovedWork {
            from_sprint_id,
            to_sprint_id,
            story_points,
        })
    }

    pub async fn generate_sprint_report(&self, sprint_id: i32) -> CoreResult<SprintReportSummary> {
        let report = self.sprint_service.generate_sprint_report(sprint_id).await?;
        Ok(SprintReportSummary {
            sprint: SprintSummary::from(report.sprint),
            metrics: report.metrics,
            issue_stats: report.issue_stats,
            recorded_at: report.recorded_at,
        })
    }

    pub async fn get_sprint_burndown_data(&self, sprint_id: i32) -> CoreResult<BurndownReport> {
        self.sprint_service.get_sprint_burndown_data(sprint_id).await
    }
}
