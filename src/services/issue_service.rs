use std::sync::Arc;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::database::entities::{
    epics, issues, product_backlogs, IssuePriority, IssueStatus, IssueType, MetricType,
};
use crate::errors::{CoreError, CoreErrorKind, CoreResult};
use crate::services::issue_code::next_issue_code;
use crate::services::lifecycle_service::{claim_issue, claim_project, find_active_issue};
use crate::services::metrics_service::{record_issue_metric, resolution_hours};
use crate::services::user_directory::{verify_user, UserDirectory};

/// Attempts made when a concurrent creation claims the same code.
const CODE_RETRIES: usize = 3;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIssue {
    pub project_id: i32,
    pub backlog_id: Option<i32>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub issue_type: Option<IssueType>,
    pub priority: Option<IssuePriority>,
    pub status: Option<IssueStatus>,
    pub story_points: Option<i32>,
    pub acceptance_criteria: Option<String>,
    pub created_by: String,
    pub assigned_to: Option<String>,
    /// Epic of the project's product backlog this issue belongs to
    pub epic_id: Option<i32>,
}

/// Field changes accepted by [`IssueService::update_issue`]. Location is not
/// patchable here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub issue_type: Option<IssueType>,
    pub priority: Option<IssuePriority>,
    pub status: Option<IssueStatus>,
    pub story_points: Option<i32>,
    pub acceptance_criteria: Option<String>,
    pub assigned_to: Option<String>,
}

fn validate_points(points: Option<i32>) -> CoreResult<()> {
    match points {
        Some(p) if p < 0 => Err(CoreError::validation("Story points must not be negative")
            .with_field("storyPoints", p)),
        _ => Ok(()),
    }
}

pub struct IssueService {
    db: DatabaseConnection,
    users: Arc<dyn UserDirectory>,
}

impl IssueService {
    pub fn new(db: DatabaseConnection, users: Arc<dyn UserDirectory>) -> Self {
        Self { db, users }
    }

    /// Creates an issue in the given backlog, or unassigned when no backlog
    /// is given. Creator and assignee are verified first.
    pub async fn create_issue(&self, input: CreateIssue) -> CoreResult<issues::Model> {
        if input.title.trim().is_empty() {
            return Err(CoreError::validation("Issue title must not be empty"));
        }
        validate_points(input.story_points)?;

        verify_user(self.users.as_ref(), &input.created_by).await?;
        if let Some(assignee) = &input.assigned_to {
            verify_user(self.users.as_ref(), assignee).await?;
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.insert_issue(&input).await {
                Err(e) if e.kind() == CoreErrorKind::Conflict && attempt < CODE_RETRIES => {
                    debug!("Issue code collision on attempt {}, retrying: {}", attempt, e);
                }
                result => return result,
            }
        }
    }

    async fn insert_issue(&self, input: &CreateIssue) -> CoreResult<issues::Model> {
        let txn = self.db.begin().await?;

        claim_project(&txn, input.project_id).await?;

        if let Some(backlog_id) = input.backlog_id {
            let backlog = product_backlogs::Entity::find_by_id(backlog_id)
                .one(&txn)
                .await?
                .ok_or_else(|| CoreError::not_found("ProductBacklog", backlog_id))?;
            if backlog.project_id != input.project_id {
                return Err(CoreError::validation(format!(
                    "Backlog {} does not belong to project {}",
                    backlog_id, input.project_id
                )));
            }
        }

        if let Some(epic_id) = input.epic_id {
            let epic = epics::Entity::find_by_id(epic_id)
                .one(&txn)
                .await?
                .ok_or_else(|| CoreError::not_found("Epic", epic_id))?;
            let epic_backlog = product_backlogs::Entity::find_by_id(epic.product_backlog_id)
                .one(&txn)
                .await?
                .ok_or_else(|| CoreError::not_found("ProductBacklog", epic.product_backlog_id))?;
            if epic_backlog.project_id != input.project_id {
                return Err(CoreError::validation(format!(
                    "Epic {} does not belong to project {}",
                    epic.name, input.project_id
                ))
                .with_field("epicId", epic_id));
            }
        }

        let code = next_issue_code(&txn, input.project_id).await?;
        let status = input.status.unwrap_or(IssueStatus::ToDo);
        let now = Utc::now();

        let issue = issues::ActiveModel {
            project_id: Set(input.project_id),
            code: Set(code),
            title: Set(input.title.trim().to_string()),
            description: Set(input.description.clone()),
            status: Set(status.to_string()),
            issue_type: Set(input.issue_type.unwrap_or(IssueType::Task).to_string()),
            priority: Set(input.priority.unwrap_or(IssuePriority::Medium).to_string()),
            story_points: Set(input.story_points),
            acceptance_criteria: Set(input.acceptance_criteria.clone()),
            created_by: Set(input.created_by.clone()),
            assigned_to: Set(input.assigned_to.clone()),
            in_backlog: Set(input.backlog_id.is_some()),
            in_sprint: Set(false),
            product_backlog_id: Set(input.backlog_id),
            sprint_id: Set(None),
            sprint_backlog_id: Set(None),
            epic_id: Set(input.epic_id),
            deleted_at: Set(None),
            version: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
            resolved_at: Set(status.is_completed().then_some(now)),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        info!("Created issue {} in project {}", issue.code, issue.project_id);
        Ok(issue)
    }

    pub async fn get_issue(&self, id: i32) -> CoreResult<issues::Model> {
        find_active_issue(&self.db, id).await
    }

    /// Applies `patch`. Entering done/closed stamps `resolved_at` and records
    /// a time-to-resolution metric; leaving it clears the stamp.
    pub async fn update_issue(&self, id: i32, patch: IssuePatch) -> CoreResult<issues::Model> {
        if let Some(title) = &patch.title {
            if title.trim().is_empty() {
                return Err(CoreError::validation("Issue title must not be empty"));
            }
        }
        validate_points(patch.story_points)?;
        if let Some(assignee) = &patch.assigned_to {
            verify_user(self.users.as_ref(), assignee).await?;
        }

        let txn = self.db.begin().await?;
        let issue = claim_issue(&txn, id).await?;
        let now = Utc::now();

        let mut changes = issues::ActiveModel {
            version: Set(issue.version + 1),
            updated_at: Set(now),
            ..Default::default()
        };
        if let Some(title) = patch.title {
            changes.title = Set(title.trim().to_string());
        }
        if let Some(description) = patch.description {
            changes.description = Set(description);
        }
        if let Some(issue_type) = patch.issue_type {
            changes.issue_type = Set(issue_type.to_string());
        }
        if let Some(priority) = patch.priority {
            changes.priority = Set(priority.to_string());
        }
        if let Some(points) = patch.story_points {
            changes.story_points = Set(Some(points));
        }
        if let Some(criteria) = patch.acceptance_criteria {
            changes.acceptance_criteria = Set(Some(criteria));
        }
        if let Some(assignee) = patch.assigned_to {
            changes.assigned_to = Set(Some(assignee));
        }

        let was_completed = issue.status().is_completed();
        let mut newly_resolved = false;
        if let Some(status) = patch.status {
            changes.status = Set(status.to_string());
            match (was_completed, status.is_completed()) {
                (false, true) => {
                    changes.resolved_at = Set(Some(now));
                    newly_resolved = true;
                }
                (true, false) => changes.resolved_at = Set(None),
                _ => {}
            }
        }

        let result = issues::Entity::update_many()
            .set(changes)
            .filter(issues::Column::Id.eq(id))
            .filter(issues::Column::Version.eq(issue.version))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(CoreError::conflict(format!(
                "Issue {} was modified concurrently",
                issue.code
            ))
            .with_field("issueId", id));
        }

        if newly_resolved {
            record_issue_metric(
                &txn,
                id,
                &MetricType::TimeToResolution.to_string(),
                resolution_hours(issue.created_at, now),
                Some(json!({ "createdAt": issue.created_at, "resolvedAt": now })),
            )
            .await?;
        }

        let updated = find_active_issue(&txn, id).await?;
        txn.commit().await?;
        debug!("Updated issue {}", updated.code);
        Ok(updated)
    }

    /// Soft delete. The code stays reserved and the row keeps its location,
    /// but no listing or sprint figure sees it again.
    pub async fn delete_issue(&self, id: i32) -> CoreResult<()> {
        let txn = self.db.begin().await?;
        let issue = claim_issue(&txn, id).await?;
        let now = Utc::now();

        let result = issues::Entity::update_many()
            .col_expr(issues::Column::DeletedAt, Expr::value(Some(now)))
            .col_expr(issues::Column::Version, Expr::value(issue.version + 1))
            .col_expr(issues::Column::UpdatedAt, Expr::value(now))
            .filter(issues::Column::Id.eq(id))
            .filter(issues::Column::Version.eq(issue.version))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(CoreError::conflict(format!(
                "Issue {} was modified concurrently",
                issue.code
            )));
        }

        txn.commit().await?;
        info!("Deleted issue {}", issue.code);
        Ok(())
    }

    /// Issues created by or assigned to `user_id`.
    pub async fn get_issues_by_user(&self, user_id: &str) -> CoreResult<Vec<issues::Model>> {
        Ok(issues::Entity::find_active()
            .filter(
                issues::Column::CreatedBy
                    .eq(user_id)
                    .or(issues::Column::AssignedTo.eq(user_id)),
            )
            .all(&self.db)
            .await?)
    }
}
