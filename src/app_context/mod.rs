use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::Value;

use crate::database::entities::{
    epics, issue_metrics, issue_transitions, issues, product_backlogs, project_metrics, projects,
    sprint_metrics, sprints, IssueLocation, IssuePriority, IssueStatus,
};
use crate::services::sprint_service::{IssueStats, SprintReportMetrics};
use crate::services::{
    EpicService, IssueService, LifecycleService, MetricsService, ProductBacklogService, ProjectService,
    SprintService, UserDirectory,
};

mod epic_operations;
mod issue_operations;
mod metrics_operations;
mod project_operations;
mod sprint_operations;

/// Shared application context exposing the services to the HTTP and CLI
/// layers.
#[derive(Clone)]
pub struct AppContext {
    db: DatabaseConnection,
    project_service: Arc<ProjectService>,
    product_backlog_service: Arc<ProductBacklogService>,
    issue_service: Arc<IssueService>,
    epic_service: Arc<EpicService>,
    sprint_service: Arc<SprintService>,
    lifecycle_service: Arc<LifecycleService>,
    metrics_service: Arc<MetricsService>,
}

impl AppContext {
    pub fn new(db: DatabaseConnection, users: Arc<dyn UserDirectory>) -> Self {
        Self {
            project_service: Arc::new(ProjectService::new(db.clone())),
            product_backlog_service: Arc::new(ProductBacklogService::new(db.clone())),
            issue_service: Arc::new(IssueService::new(db.clone(), users)),
            epic_service: Arc::new(EpicService::new(db.clone())),
            sprint_service: Arc::new(SprintService::new(db.clone())),
            lifecycle_service: Arc::new(LifecycleService::new(db.clone())),
            metrics_service: Arc::new(MetricsService::new(db.clone())),
            db,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn project_service(&self) -> &Arc<ProjectService> {
        &self.project_service
    }

    pub fn product_backlog_service(&self) -> &Arc<ProductBacklogService> {
        &self.product_backlog_service
    }

    pub fn issue_service(&self) -> &Arc<IssueService> {
        &self.issue_service
    }

    pub fn epic_service(&self) -> &Arc<EpicService> {
        &self.epic_service
    }

    pub fn sprint_service(&self) -> &Arc<SprintService> {
        &self.sprint_service
    }

    pub fn lifecycle_service(&self) -> &Arc<LifecycleService> {
        &self.lifecycle_service
    }

    pub fn metrics_service(&self) -> &Arc<MetricsService> {
        &self.metrics_service
    }
}

// ----- Public types -----

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: i32,
    pub name: String,
    pub key: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<projects::Model> for ProjectSummary {
    fn from(model: projects::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            key: model.key,
            description: model.description,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BacklogSummary {
    pub id: i32,
    pub project_id: i32,
    pub created_at: DateTime<Utc>,
}

impl From<product_backlogs::Model> for BacklogSummary {
    fn from(model: product_backlogs::Model) -> Self {
        Self {
            id: model.id,
            project_id: model.project_id,
            created_at: model.created_at,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectCreated {
    pub project: ProjectSummary,
    pub backlog: BacklogSummary,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueSummary {
    pub id: i32,
    pub project_id: i32,
    pub code: String,
    pub title: String,
    pub description: String,
    pub status: IssueStatus,
    #[serde(rename = "type")]
    pub issue_type: String,
    pub priority: String,
    pub story_points: Option<i32>,
    pub acceptance_criteria: Option<String>,
    pub created_by: String,
    pub assigned_to: Option<String>,
    pub location: IssueLocation,
    pub in_backlog: bool,
    pub in_sprint: bool,
    pub product_backlog_id: Option<i32>,
    pub sprint_id: Option<i32>,
    pub sprint_backlog_id: Option<i32>,
    pub epic_id: Option<i32>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl From<issues::Model> for IssueSummary {
    fn from(model: issues::Model) -> Self {
        let location = model.location();
        let status = model.status();
        let priority = model
            .priority
            .parse::<IssuePriority>()
            .map(|p| p.to_string())
            .unwrap_or(model.priority);
        Self {
            id: model.id,
            project_id: model.project_id,
            code: model.code,
            title: model.title,
            description: model.description,
            status,
            issue_type: model.issue_type,
            priority,
            story_points: model.story_points,
            acceptance_criteria: model.acceptance_criteria,
            created_by: model.created_by,
            assigned_to: model.assigned_to,
            location,
            in_backlog: model.in_backlog,
            in_sprint: model.in_sprint,
            product_backlog_id: model.product_backlog_id,
            sprint_id: model.sprint_id,
            sprint_backlog_id: model.sprint_backlog_id,
            epic_id: model.epic_id,
            version: model.version,
            created_at: model.created_at,
            updated_at: model.updated_at,
            resolved_at: model.resolved_at,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EpicSummary {
    pub id: i32,
    pub product_backlog_id: i32,
    pub name: String,
    pub description: String,
    pub status: IssueStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<epics::Model> for EpicSummary {
    fn from(model: epics::Model) -> Self {
        Self {
            status: model.status(),
            id: model.id,
            product_backlog_id: model.product_backlog_id,
            name: model.name,
            description: model.description,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintSummary {
    pub id: i32,
    pub project_id: i32,
    pub name: String,
    pub goal: String,
    pub is_started: bool,
    pub is_finished: bool,
    /// inactive, active or completed
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<sprints::Model> for SprintSummary {
    fn from(model: sprints::Model) -> Self {
        Self {
            status: model.state().label().to_string(),
            id: model.id,
            project_id: model.project_id,
            name: model.name,
            goal: model.goal,
            is_started: model.is_started,
            is_finished: model.is_finished,
            started_at: model.started_at,
            finished_at: model.finished_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintWithIssues {
    #[serde(flatten)]
    pub sprint: SprintSummary,
    pub issues: Vec<IssueSummary>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuePage {
    pub issues: Vec<IssueSummary>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintCompletionSummary {
    pub completed_sprint: SprintSummary,
    pub new_sprint: SprintSummary,
    pub carried_over: Vec<IssueSummary>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionSummary {
    pub id: i32,
    pub issue_id: i32,
    pub from_sprint_id: Option<i32>,
    pub to_sprint_id: Option<i32>,
    pub status: String,
    pub story_points: Option<i32>,
    pub transition_date: DateTime<Utc>,
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<IssueSummary>,
}

impl From<issue_transitions::Model> for TransitionSummary {
    fn from(model: issue_transitions::Model) -> Self {
        Self {
            id: model.id,
            issue_id: model.issue_id,
            from_sprint_id: model.from_sprint_id,
            to_sprint_id: model.to_sprint_id,
            status: model.status,
            story_points: model.story_points,
            transition_date: model.transition_date,
            notes: model.notes,
            issue: None,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovedWork {
    pub from_sprint_id: i32,
    pub to_sprint_id: i32,
    pub story_points: i64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintReportSummary {
    pub sprint: SprintSummary,
    pub metrics: SprintReportMetrics,
    pub issue_stats: IssueStats,
    pub recorded_at: DateTime<Utc>,
}

/// A metric record of any scope.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSummary {
    pub id: i32,
    pub scope: &'static str,
    pub scope_id: i32,
    pub metric_type: String,
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
    pub additional_data: Option<Value>,
}

impl From<sprint_metrics::Model> for MetricSummary {
    fn from(model: sprint_metrics::Model) -> Self {
        Self {
            additional_data: model.additional_data_json(),
            id: model.id,
            scope: "sprint",
            scope_id: model.sprint_id,
            metric_type: model.metric_type,
            value: model.value,
            recorded_at: model.recorded_at,
        }
    }
}

impl From<project_metrics::Model> for MetricSummary {
    fn from(model: project_metrics::Model) -> Self {
        Self {
            additional_data: model.additional_data_json(),
            id: model.id,
            scope: "project",
            scope_id: model.project_id,
            metric_type: model.metric_type,
            value: model.value,
            recorded_at: model.recorded_at,
        }
    }
}

impl From<issue_metrics::Model> for MetricSummary {
    fn from(model: issue_metrics::Model) -> Self {
        Self {
            additional_data: model.additional_data_json(),
            id: model.id,
            scope: "issue",
            scope_id: model.issue_id,
            metric_type: model.metric_type,
            value: model.value,
            recorded_at: model.recorded_at,
        }
    }
}
