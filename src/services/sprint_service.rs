use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use tracing::{debug, info};

use crate::database::entities::{
    issue_transitions, issues, projects, sprints, IssueStatus, IssueType,
    SprintState,
};
use crate::errors::{CoreError, CoreResult};
use crate::services::burndown::{build_burndown, BurndownReport};
use crate::services::lifecycle_service::{
    claim_project, claim_sprint, find_sprint, get_or_create_sprint_backlog,
};
use crate::services::metrics_service::{
    calculate_sprint_completion_rate, calculate_sprint_velocity, duration_days,
    record_sprint_duration, sprint_issues,
};

const DEFAULT_PAGE_SIZE: u64 = 10;
const MAX_PAGE_SIZE: u64 = 100;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSprint {
    pub project_id: i32,
    pub name: String,
    #[serde(default)]
    pub goal: String,
    /// Planned start; the sprint still has to be started explicitly
    pub start_date: Option<DateTime<Utc>>,
    /// Planned end
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintPatch {
    pub name: Option<String>,
    pub goal: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default = "Pagination::first_page")]
    pub page: u64,
    #[serde(default = "Pagination::default_limit")]
    pub limit: u64,
}

impl Pagination {
    fn first_page() -> u64 {
        1
    }

    fn default_limit() -> u64 {
        DEFAULT_PAGE_SIZE
    }

    /// Page number (at least 1) and page size clamped to the allowed range.
    pub fn normalized(&self) -> (u64, u64) {
        (self.page.max(1), self.limit.clamp(1, MAX_PAGE_SIZE))
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueFilters {
    pub status: Option<IssueStatus>,
    #[serde(rename = "type")]
    pub issue_type: Option<IssueType>,
}

#[derive(Debug, Clone)]
pub struct SprintOverview {
    pub sprint: sprints::Model,
    pub state: SprintState,
    pub issues: Vec<issues::Model>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintReportMetrics {
    pub velocity: f64,
    pub completion_rate: f64,
    pub duration: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueStats {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
}

#[derive(Debug, Clone)]
pub struct SprintReport {
    pub sprint: sprints::Model,
    pub metrics: SprintReportMetrics,
    pub issue_stats: IssueStats,
    pub recorded_at: DateTime<Utc>,
}

pub fn issue_stats(issues: &[issues::Model]) -> IssueStats {
    let mut by_status: BTreeMap<String, usize> =
        IssueStatus::iter().map(|s| (s.to_string(), 0)).collect();
    for issue in issues {
        *by_status.entry(issue.status().to_string()).or_insert(0) += 1;
    }
    IssueStats {
        total: issues.len(),
        by_status,
    }
}

fn check_dates(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> CoreResult<()> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => Err(CoreError::validation(
            "Sprint end date must not be before its start date",
        )),
        _ => Ok(()),
    }
}

pub struct SprintService {
    db: DatabaseConnection,
}

impl SprintService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a not-started sprint together with its sprint backlog.
    pub async fn create_sprint(&self, input: CreateSprint) -> CoreResult<sprints::Model> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(CoreError::validation("Sprint name must not be empty"));
        }
        check_dates(input.start_date, input.end_date)?;

        let txn = self.db.begin().await?;
        claim_project(&txn, input.project_id).await?;

        let now = Utc::now();
        let sprint = sprints::ActiveModel {
            project_id: Set(input.project_id),
            name: Set(name),
            goal: Set(input.goal),
            is_started: Set(false),
            is_finished: Set(false),
            started_at: Set(input.start_date),
            finished_at: Set(input.end_date),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        get_or_create_sprint_backlog(&txn, &sprint).await?;

        txn.commit().await?;
        info!("Created sprint {} ({}) in project {}", sprint.id, sprint.name, sprint.project_id);
        Ok(sprint)
    }

    pub async fn get_sprint(&self, id: i32) -> CoreResult<sprints::Model> {
        find_sprint(&self.db, id).await
    }

    /// Renames or re-plans a sprint. Finished sprints are immutable and the
    /// planned start can only move before the sprint starts.
    pub async fn update_sprint(&self, id: i32, patch: SprintPatch) -> CoreResult<sprints::Model> {
        let txn = self.db.begin().await?;
        let sprint = claim_sprint(&txn, id).await?;

        if sprint.is_finished {
            return Err(CoreError::conflict(format!(
                "Sprint {} is finished and cannot be changed",
                sprint.name
            ))
            .with_field("sprintId", id));
        }
        if patch.start_date.is_some() && sprint.is_started {
            return Err(CoreError::precondition_failed(format!(
                "Sprint {} has started; its start date is fixed",
                sprint.name
            )));
        }
        check_dates(
            patch.start_date.or(sprint.started_at),
            patch.end_date.or(sprint.finished_at),
        )?;

        let mut changes: sprints::ActiveModel = sprint.into();
        if let Some(name) = patch.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(CoreError::validation("Sprint name must not be empty"));
            }
            changes.name = Set(name);
        }
        if let Some(goal) = patch.goal {
            changes.goal = Set(goal);
        }
        if let Some(start) = patch.start_date {
            changes.started_at = Set(Some(start));
        }
        if let Some(end) = patch.end_date {
            changes.finished_at = Set(Some(end));
        }
        changes.updated_at = Set(Utc::now());

        let updated = changes.update(&txn).await?;
        txn.commit().await?;
        debug!("Updated sprint {}", updated.id);
        Ok(updated)
    }

    /// Sprints of a project with their state label and committed issues,
    /// most recently started first.
    pub async fn get_project_sprints(
        &self,
        project_id: i32,
        include_completed: bool,
    ) -> CoreResult<Vec<SprintOverview>> {
        projects::Entity::find_by_id(project_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| CoreError::not_found("Project", project_id))?;

        let mut query = sprints::Entity::find().filter(sprints::Column::ProjectId.eq(project_id));
        if !include_completed {
            query = query.filter(sprints::Column::IsFinished.eq(false));
        }
        let sprints = query
            .order_by_desc(sprints::Column::StartedAt)
            .order_by_desc(sprints::Column::Id)
            .all(&self.db)
            .await?;

        let mut overviews = Vec::with_capacity(sprints.len());
        for sprint in sprints {
            let issues = sprint_issues(&self.db, sprint.id).await?;
            overviews.push(SprintOverview {
                state: sprint.state(),
                sprint,
                issues,
            });
        }
        Ok(overviews)
    }

    /// One page of a sprint's committed issues plus the unpaged total. An
    /// unknown sprint yields an empty page.
    pub async fn get_sprint_backlog_issues(
        &self,
        sprint_id: i32,
        pagination: Pagination,
        filters: IssueFilters,
    ) -> CoreResult<(Vec<issues::Model>, u64)> {
        let mut query = issues::Entity::find_active()
            .filter(issues::Column::SprintId.eq(sprint_id))
            .filter(issues::Column::InSprint.eq(true));
        if let Some(status) = filters.status {
            query = query.filter(issues::Column::Status.eq(status.to_string()));
        }
        if let Some(issue_type) = filters.issue_type {
            query = query.filter(issues::Column::IssueType.eq(issue_type.to_string()));
        }

        let (page, limit) = pagination.normalized();
        let paginator = query
            .order_by_asc(issues::Column::Id)
            .paginate(&self.db, limit);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page - 1).await?;
        Ok((items, total))
    }

    /// Transitions of an issue, newest first.
    pub async fn get_issue_transition_history(
        &self,
        issue_id: i32,
    ) -> CoreResult<Vec<issue_transitions::Model>> {
        Ok(issue_transitions::Entity::find()
            .filter(issue_transitions::Column::IssueId.eq(issue_id))
            .order_by_desc(issue_transitions::Column::TransitionDate)
            .order_by_desc(issue_transitions::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Issues carried from one sprint into another, with the issue rows.
    pub async fn get_sprint_transition_issues(
        &self,
        from_sprint_id: i32,
        to_sprint_id: i32,
    ) -> CoreResult<Vec<(issue_transitions::Model, Option<issues::Model>)>> {
        Ok(issue_transitions::Entity::find()
            .filter(issue_transitions::Column::FromSprintId.eq(from_sprint_id))
            .filter(issue_transitions::Column::ToSprintId.eq(to_sprint_id))
            .find_also_related(issues::Entity)
            .order_by_desc(issue_transitions::Column::TransitionDate)
            .order_by_desc(issue_transitions::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Story points of the work carried between two sprints, as recorded at
    /// carry time.
    pub async fn calculate_moved_work_story_points(
        &self,
        from_sprint_id: i32,
        to_sprint_id: i32,
    ) -> CoreResult<i64> {
        let transitions = issue_transitions::Entity::find()
            .filter(issue_transitions::Column::FromSprintId.eq(from_sprint_id))
            .filter(issue_transitions::Column::ToSprintId.eq(to_sprint_id))
            .all(&self.db)
            .await?;
        Ok(transitions
            .iter()
            .map(|t| t.story_points.map(i64::from).unwrap_or(0))
            .sum())
    }

    /// Records velocity and completion rate (and duration once finished) and
    /// returns them with per-status issue counts. The figures are read before
    /// the transaction opens so that it starts with a metric insert.
    pub async fn generate_sprint_report(&self, sprint_id: i32) -> CoreResult<SprintReport> {
        let sprint = find_sprint(&self.db, sprint_id).await?;
        let issues = sprint_issues(&self.db, sprint_id).await?;

        let txn = self.db.begin().await?;

        let velocity = calculate_sprint_velocity(&txn, sprint_id, &issues).await?;
        let completion = calculate_sprint_completion_rate(&txn, sprint_id, &issues).await?;
        let has_duration = duration_days(sprint.started_at, sprint.finished_at) > 0;
        let duration = if sprint.is_finished && has_duration {
            record_sprint_duration(&txn, &sprint).await?.value
        } else {
            0.0
        };

        txn.commit().await?;

        Ok(SprintReport {
            metrics: SprintReportMetrics {
                velocity: velocity.value,
                completion_rate: completion.value,
                duration,
            },
            issue_stats: issue_stats(&issues),
            sprint,
            recorded_at: Utc::now(),
        })
    }

    pub async fn get_sprint_burndown_data(&self, sprint_id: i32) -> CoreResult<BurndownReport> {
        let sprint = find_sprint(&self.db, sprint_id).await?;
        let issues = sprint_issues(&self.db, sprint_id).await?;
        Ok(build_burndown(&sprint, &issues, Utc::now()))
    }
}
