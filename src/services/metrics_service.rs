//! Sprint, project and issue metrics.
//!
//! Derivations are pure functions over issue rows; recording appends a new
//! row every time and never touches issues or sprints.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::database::entities::{
    issue_metrics, issues, project_metrics, projects, sprint_metrics, sprints, MetricType,
};
use crate::errors::{CoreError, CoreResult};

const MAX_METRIC_TYPE_LEN: usize = 50;

/// Active issues currently committed to a sprint.
pub async fn sprint_issues<C: ConnectionTrait>(
    conn: &C,
    sprint_id: i32,
) -> CoreResult<Vec<issues::Model>> {
    Ok(issues::Entity::find_active()
        .filter(issues::Column::SprintId.eq(sprint_id))
        .filter(issues::Column::InSprint.eq(true))
        .order_by_asc(issues::Column::Id)
        .all(conn)
        .await?)
}

/// Counts and point sums over a set of sprint issues.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintFigures {
    pub total_issues: usize,
    pub completed_issues: usize,
    pub pending_issues: usize,
    pub committed_points: i64,
    pub completed_points: i64,
    pub pending_points: i64,
}

pub fn sprint_figures(issues: &[issues::Model]) -> SprintFigures {
    issues.iter().fold(SprintFigures::default(), |mut acc, issue| {
        let points = issue.points();
        acc.total_issues += 1;
        acc.committed_points += points;
        if issue.status().is_completed() {
            acc.completed_issues += 1;
            acc.completed_points += points;
        } else {
            acc.pending_issues += 1;
            acc.pending_points += points;
        }
        acc
    })
}

/// Story points of completed issues.
pub fn velocity(issues: &[issues::Model]) -> f64 {
    sprint_figures(issues).completed_points as f64
}

/// Percentage of completed issues, rounded to two decimals. Zero for an
/// empty sprint.
pub fn completion_rate(issues: &[issues::Model]) -> f64 {
    let figures = sprint_figures(issues);
    if figures.total_issues == 0 {
        return 0.0;
    }
    let rate = figures.completed_issues as f64 / figures.total_issues as f64 * 100.0;
    (rate * 100.0).round() / 100.0
}

/// Whole days between start and finish, rounded up. Zero when either end is
/// missing or the range is negative.
pub fn duration_days(
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
) -> i64 {
    match (started_at, finished_at) {
        (Some(start), Some(end)) if end > start => {
            let millis = (end - start).num_milliseconds();
            (millis + 86_399_999) / 86_400_000
        }
        _ => 0,
    }
}

pub async fn record_sprint_metric<C: ConnectionTrait>(
    conn: &C,
    sprint_id: i32,
    metric_type: &str,
    value: f64,
    additional_data: Option<Value>,
) -> CoreResult<sprint_metrics::Model> {
    debug!(
        "Recording sprint metric {} = {} for sprint {}",
        metric_type, value, sprint_id
    );
    let metric = sprint_metrics::ActiveModel {
        sprint_id: Set(sprint_id),
        metric_type: Set(metric_type.to_string()),
        value: Set(value),
        recorded_at: Set(Utc::now()),
        additional_data: Set(additional_data.map(|v| v.to_string())),
        ..Default::default()
    };
    Ok(metric.insert(conn).await?)
}

pub async fn record_project_metric<C: ConnectionTrait>(
    conn: &C,
    project_id: i32,
    metric_type: &str,
    value: f64,
    additional_data: Option<Value>,
) -> CoreResult<project_metrics::Model> {
    debug!(
        "Recording project metric {} = {} for project {}",
        metric_type, value, project_id
    );
    let metric = project_metrics::ActiveModel {
        project_id: Set(project_id),
        metric_type: Set(metric_type.to_string()),
        value: Set(value),
        recorded_at: Set(Utc::now()),
        additional_data: Set(additional_data.map(|v| v.to_string())),
        ..Default::default()
    };
    Ok(metric.insert(conn).await?)
}

pub async fn record_issue_metric<C: ConnectionTrait>(
    conn: &C,
    issue_id: i32,
    metric_type: &str,
    value: f64,
    additional_data: Option<Value>,
) -> CoreResult<issue_metrics::Model> {
    debug!(
        "Recording issue metric {} = {} for issue {}",
        metric_type, value, issue_id
    );
    let metric = issue_metrics::ActiveModel {
        issue_id: Set(issue_id),
        metric_type: Set(metric_type.to_string()),
        value: Set(value),
        recorded_at: Set(Utc::now()),
        additional_data: Set(additional_data.map(|v| v.to_string())),
        ..Default::default()
    };
    Ok(metric.insert(conn).await?)
}

pub async fn calculate_sprint_velocity<C: ConnectionTrait>(
    conn: &C,
    sprint_id: i32,
    issues: &[issues::Model],
) -> CoreResult<sprint_metrics::Model> {
    let figures = sprint_figures(issues);
    record_sprint_metric(
        conn,
        sprint_id,
        &MetricType::Velocity.to_string(),
        velocity(issues),
        Some(json!({ "completedIssuesCount": figures.completed_issues })),
    )
    .await
}

pub async fn calculate_sprint_completion_rate<C: ConnectionTrait>(
    conn: &C,
    sprint_id: i32,
    issues: &[issues::Model],
) -> CoreResult<sprint_metrics::Model> {
    let figures = sprint_figures(issues);
    let context = (figures.total_issues > 0).then(|| {
        json!({
            "totalIssues": figures.total_issues,
            "completedIssues": figures.completed_issues,
        })
    });
    record_sprint_metric(
        conn,
        sprint_id,
        &MetricType::CompletionRate.to_string(),
        completion_rate(issues),
        context,
    )
    .await
}

pub async fn record_sprint_duration<C: ConnectionTrait>(
    conn: &C,
    sprint: &sprints::Model,
) -> CoreResult<sprint_metrics::Model> {
    record_sprint_metric(
        conn,
        sprint.id,
        &MetricType::Duration.to_string(),
        duration_days(sprint.started_at, sprint.finished_at) as f64,
        Some(json!({
            "startDate": sprint.started_at,
            "endDate": sprint.finished_at,
        })),
    )
    .await
}

/// Pending work snapshot taken by the daily batch.
pub async fn record_burndown_snapshot<C: ConnectionTrait>(
    conn: &C,
    sprint_id: i32,
    issues: &[issues::Model],
    at: DateTime<Utc>,
) -> CoreResult<sprint_metrics::Model> {
    let figures = sprint_figures(issues);
    record_sprint_metric(
        conn,
        sprint_id,
        &MetricType::Burndown.to_string(),
        figures.pending_points as f64,
        Some(json!({
            "date": at,
            "pendingIssues": figures.pending_issues,
            "totalIssues": figures.total_issues,
        })),
    )
    .await
}

fn validate_metric(metric_type: &str, value: f64) -> CoreResult<()> {
    let trimmed = metric_type.trim();
    if trimmed.is_empty() || trimmed.len() > MAX_METRIC_TYPE_LEN {
        return Err(CoreError::validation(format!(
            "Metric type must be 1-{} characters",
            MAX_METRIC_TYPE_LEN
        ))
        .with_field("metricType", metric_type));
    }
    if !value.is_finite() {
        return Err(CoreError::validation("Metric value must be a finite number"));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyMetricsSummary {
    pub sprints_processed: usize,
    pub sprints_failed: usize,
    pub timestamp: DateTime<Utc>,
}

pub struct MetricsService {
    db: DatabaseConnection,
}

impl MetricsService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn ensure_sprint(&self, sprint_id: i32) -> CoreResult<sprints::Model> {
        sprints::Entity::find_by_id(sprint_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| CoreError::not_found("Sprint", sprint_id))
    }

    async fn ensure_project(&self, project_id: i32) -> CoreResult<projects::Model> {
        projects::Entity::find_by_id(project_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| CoreError::not_found("Project", project_id))
    }

    async fn ensure_issue(&self, issue_id: i32) -> CoreResult<issues::Model> {
        issues::Entity::find_by_id(issue_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| CoreError::not_found("Issue", issue_id))
    }

    /// Appends a caller-supplied metric to a sprint's series.
    pub async fn record_sprint_manual_metric(
        &self,
        sprint_id: i32,
        metric_type: &str,
        value: f64,
        context: Option<Value>,
    ) -> CoreResult<sprint_metrics::Model> {
        validate_metric(metric_type, value)?;
        self.ensure_sprint(sprint_id).await?;
        let metric =
            record_sprint_metric(&self.db, sprint_id, metric_type.trim(), value, context).await?;
        info!(
            "Recorded manual metric {} = {} for sprint {}",
            metric.metric_type, metric.value, sprint_id
        );
        Ok(metric)
    }

    pub async fn record_project_metric(
        &self,
        project_id: i32,
        metric_type: &str,
        value: f64,
        context: Option<Value>,
    ) -> CoreResult<project_metrics::Model> {
        validate_metric(metric_type, value)?;
        self.ensure_project(project_id).await?;
        record_project_metric(&self.db, project_id, metric_type.trim(), value, context).await
    }

    pub async fn record_issue_metric(
        &self,
        issue_id: i32,
        metric_type: &str,
        value: f64,
        context: Option<Value>,
    ) -> CoreResult<issue_metrics::Model> {
        validate_metric(metric_type, value)?;
        self.ensure_issue(issue_id).await?;
        record_issue_metric(&self.db, issue_id, metric_type.trim(), value, context).await
    }

    /// Sprint metric history, newest first.
    pub async fn get_sprint_metrics(
        &self,
        sprint_id: i32,
        metric_type: Option<&str>,
    ) -> CoreResult<Vec<sprint_metrics::Model>> {
        self.ensure_sprint(sprint_id).await?;
        let mut query =
            sprint_metrics::Entity::find().filter(sprint_metrics::Column::SprintId.eq(sprint_id));
        if let Some(metric_type) = metric_type {
            query = query.filter(sprint_metrics::Column::MetricType.eq(metric_type));
        }
        Ok(query
            .order_by_desc(sprint_metrics::Column::RecordedAt)
            .order_by_desc(sprint_metrics::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn get_project_metrics(
        &self,
        project_id: i32,
        metric_type: Option<&str>,
    ) -> CoreResult<Vec<project_metrics::Model>> {
        self.ensure_project(project_id).await?;
        let mut query = project_metrics::Entity::find()
            .filter(project_metrics::Column::ProjectId.eq(project_id));
        if let Some(metric_type) = metric_type {
            query = query.filter(project_metrics::Column::MetricType.eq(metric_type));
        }
        Ok(query
            .order_by_desc(project_metrics::Column::RecordedAt)
            .order_by_desc(project_metrics::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn get_issue_metrics(
        &self,
        issue_id: i32,
        metric_type: Option<&str>,
    ) -> CoreResult<Vec<issue_metrics::Model>> {
        self.ensure_issue(issue_id).await?;
        let mut query =
            issue_metrics::Entity::find().filter(issue_metrics::Column::IssueId.eq(issue_id));
        if let Some(metric_type) = metric_type {
            query = query.filter(issue_metrics::Column::MetricType.eq(metric_type));
        }
        Ok(query
            .order_by_desc(issue_metrics::Column::RecordedAt)
            .order_by_desc(issue_metrics::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Snapshot velocity, completion rate and pending work for every running
    /// sprint. Each sprint is written in its own transaction; a failing
    /// sprint is logged and skipped.
    pub async fn calculate_daily_metrics_for_all_sprints(&self) -> CoreResult<DailyMetricsSummary> {
        let timestamp = Utc::now();
        let running = sprints::Entity::find()
            .filter(sprints::Column::IsStarted.eq(true))
            .filter(sprints::Column::IsFinished.eq(false))
            .order_by_asc(sprints::Column::Id)
            .all(&self.db)
            .await?;

        info!("Calculating daily metrics for {} running sprints", running.len());

        let mut processed = 0;
        let mut failed = 0;
        for sprint in &running {
            match self.snapshot_sprint(sprint.id, timestamp).await {
                Ok(()) => {
                    processed += 1;
                    debug!("Daily metrics recorded for sprint {} ({})", sprint.id, sprint.name);
                }
                Err(e) => {
                    failed += 1;
                    error!("Daily metrics failed for sprint {}: {}", sprint.id, e);
                }
            }
        }

        if failed > 0 {
            warn!("Daily metrics skipped {} of {} sprints", failed, running.len());
        }
        info!("Daily metrics complete: {} sprints processed", processed);

        Ok(DailyMetricsSummary {
            sprints_processed: processed,
            sprints_failed: failed,
            timestamp,
        })
    }

    async fn snapshot_sprint(&self, sprint_id: i32, at: DateTime<Utc>) -> CoreResult<()> {
        let issues = sprint_issues(&self.db, sprint_id).await?;
        let txn = self.db.begin().await?;
        calculate_sprint_velocity(&txn, sprint_id, &issues).await?;
        calculate_sprint_completion_rate(&txn, sprint_id, &issues).await?;
        record_burndown_snapshot(&txn, sprint_id, &issues, at).await?;
        txn.commit().await?;
        Ok(())
    }
}

/// Hours between creation and resolution, used for the time-to-resolution
/// issue metric.
pub fn resolution_hours(created_at: DateTime<Utc>, resolved_at: DateTime<Utc>) -> f64 {
    let minutes = (resolved_at - created_at).num_minutes().max(0) as f64;
    (minutes / 60.0 * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn issue(points: Option<i32>, status: &str) -> issues::Model {
        let now = Utc::now();
        issues::Model {
            id: 1,
            project_id: 1,
            code: "ABC-1".into(),
            title: "t".into(),
            description: String::new(),
            status: status.into(),
            issue_type: "task".into(),
            priority: "medium".into(),
            story_points: points,
            acceptance_criteria: None,
            created_by: "alice".into(),
            assigned_to: None,
            in_backlog: false,
            in_sprint: true,
            product_backlog_id: None,
            sprint_id: Some(1),
            sprint_backlog_id: Some(1),
            epic_id: None,
            deleted_at: None,
            version: 1,
            created_at: now,
            updated_at: now,
            resolved_at: None,
        }
    }

    #[test]
    fn velocity_counts_done_and_closed() {
        let issues = vec![
            issue(Some(3), "done"),
            issue(Some(5), "closed"),
            issue(Some(2), "in-progress"),
        ];
        assert_eq!(velocity(&issues), 8.0);
        assert_eq!(completion_rate(&issues), 66.67);

        let figures = sprint_figures(&issues);
        assert_eq!(figures.pending_points, 2);
        assert_eq!(figures.committed_points, 10);
    }

    #[test]
    fn resolved_alias_counts_as_completed() {
        let issues = vec![issue(Some(4), "resolved"), issue(None, "review")];
        assert_eq!(velocity(&issues), 4.0);
        assert_eq!(completion_rate(&issues), 50.0);
    }

    #[test]
    fn empty_sprint_has_zero_rate() {
        assert_eq!(completion_rate(&[]), 0.0);
        assert_eq!(velocity(&[]), 0.0);
    }

    #[test]
    fn duration_rounds_up_to_whole_days() {
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        assert_eq!(duration_days(Some(start), Some(start + Duration::days(14))), 14);
        assert_eq!(duration_days(Some(start), Some(start + Duration::hours(25))), 2);
        assert_eq!(duration_days(Some(start), None), 0);
        assert_eq!(duration_days(None, Some(start)), 0);
    }

    #[test]
    fn metric_names_are_validated() {
        assert!(validate_metric("focus-factor", 0.8).is_ok());
        assert!(validate_metric("  ", 1.0).is_err());
        assert!(validate_metric(&"x".repeat(51), 1.0).is_err());
        assert!(validate_metric("ok", f64::NAN).is_err());
    }

    #[test]
    fn resolution_hours_from_timestamps() {
        let created = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        assert_eq!(resolution_hours(created, created + Duration::minutes(90)), 1.5);
    }
}
