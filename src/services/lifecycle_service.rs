//! Transactional operations that move issues between containers and drive
//! sprints through their lifecycle.
//!
//! This is the only place that writes issue location columns, sprint
//! lifecycle flags and sprint backlog membership. Every operation runs in a
//! single transaction; any error drops the transaction and rolls back all
//! intermediate writes.
//!
//! Write transactions open with a `claim_*` call. SQLite only waits out a
//! held write lock when the first statement of a transaction is a write; a
//! transaction that reads first fails with "database is locked" as soon as
//! it tries to write next to a concurrent writer.

use chrono::{Duration, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, Set, TransactionTrait,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::database::entities::{
    issue_transitions, issues, product_backlogs, projects, sprint_backlogs, sprints,
    IssueLifecycle, IssueLocation, IssueStatus, MetricType,
};
use crate::errors::{CoreError, CoreResult};
use crate::services::metrics_service::{
    self, calculate_sprint_completion_rate, calculate_sprint_velocity, record_sprint_duration,
    sprint_figures, sprint_issues,
};

/// Optional overrides for the successor sprint created at completion.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteSprint {
    pub name: Option<String>,
    pub goal: Option<String>,
}

/// Outcome of a sprint completion.
#[derive(Debug, Clone)]
pub struct SprintCompletion {
    pub completed: sprints::Model,
    pub successor: sprints::Model,
    pub carried_over: Vec<issues::Model>,
}

pub(crate) async fn find_active_issue<C: ConnectionTrait>(
    conn: &C,
    issue_id: i32,
) -> CoreResult<issues::Model> {
    issues::Entity::find_active()
        .filter(issues::Column::Id.eq(issue_id))
        .one(conn)
        .await?
        .ok_or_else(|| CoreError::not_found("Issue", issue_id))
}

pub(crate) async fn find_sprint<C: ConnectionTrait>(
    conn: &C,
    sprint_id: i32,
) -> CoreResult<sprints::Model> {
    sprints::Entity::find_by_id(sprint_id)
        .one(conn)
        .await?
        .ok_or_else(|| CoreError::not_found("Sprint", sprint_id))
}

/// Touches the issue row to take the write lock, then returns it. Deleted
/// issues are not found.
pub(crate) async fn claim_issue<C: ConnectionTrait>(
    conn: &C,
    issue_id: i32,
) -> CoreResult<issues::Model> {
    let touched = issues::Entity::update_many()
        .col_expr(issues::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(issues::Column::Id.eq(issue_id))
        .exec(conn)
        .await?;
    if touched.rows_affected == 0 {
        return Err(CoreError::not_found("Issue", issue_id));
    }

    let issue = issues::Entity::find_by_id(issue_id)
        .one(conn)
        .await?
        .ok_or_else(|| CoreError::not_found("Issue", issue_id))?;
    match issue.lifecycle() {
        IssueLifecycle::Active => Ok(issue),
        IssueLifecycle::Deleted { at } => Err(CoreError::not_found("Issue", issue_id)
            .with_field("deletedAt", at.to_rfc3339())),
    }
}

/// Touches the sprint row to take the write lock, then returns it.
pub(crate) async fn claim_sprint<C: ConnectionTrait>(
    conn: &C,
    sprint_id: i32,
) -> CoreResult<sprints::Model> {
    let touched = sprints::Entity::update_many()
        .col_expr(sprints::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(sprints::Column::Id.eq(sprint_id))
        .exec(conn)
        .await?;
    if touched.rows_affected == 0 {
        return Err(CoreError::not_found("Sprint", sprint_id));
    }
    find_sprint(conn, sprint_id).await
}

/// Touches the project row to take the write lock, then returns it.
pub(crate) async fn claim_project<C: ConnectionTrait>(
    conn: &C,
    project_id: i32,
) -> CoreResult<projects::Model> {
    let touched = projects::Entity::update_many()
        .col_expr(projects::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(projects::Column::Id.eq(project_id))
        .exec(conn)
        .await?;
    if touched.rows_affected == 0 {
        return Err(CoreError::not_found("Project", project_id));
    }
    projects::Entity::find_by_id(project_id)
        .one(conn)
        .await?
        .ok_or_else(|| CoreError::not_found("Project", project_id))
}

/// Returns the sprint backlog of `sprint`, creating it on first use.
///
/// The unique index on `sprint_id` makes concurrent creation safe: a losing
/// insert is ignored and the winner's row is read back.
pub async fn get_or_create_sprint_backlog<C: ConnectionTrait>(
    conn: &C,
    sprint: &sprints::Model,
) -> CoreResult<sprint_backlogs::Model> {
    let existing = sprint_backlogs::Entity::find()
        .filter(sprint_backlogs::Column::SprintId.eq(sprint.id))
        .one(conn)
        .await?;
    if let Some(backlog) = existing {
        return Ok(backlog);
    }

    let backlog = sprint_backlogs::ActiveModel {
        sprint_id: Set(sprint.id),
        project_id: Set(sprint.project_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    let inserted = sprint_backlogs::Entity::insert(backlog)
        .on_conflict(
            OnConflict::column(sprint_backlogs::Column::SprintId)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    if inserted > 0 {
        debug!("Created sprint backlog for sprint {}", sprint.id);
    }

    sprint_backlogs::Entity::find()
        .filter(sprint_backlogs::Column::SprintId.eq(sprint.id))
        .one(conn)
        .await?
        .ok_or_else(|| {
            CoreError::internal(format!("Sprint backlog for sprint {} vanished", sprint.id))
        })
}

/// Writes `location` onto `issue` if nobody changed the row since it was
/// read. Returns the updated row.
pub(crate) async fn write_location<C: ConnectionTrait>(
    conn: &C,
    issue: &issues::Model,
    location: IssueLocation,
) -> CoreResult<issues::Model> {
    let (in_backlog, in_sprint, backlog_id, sprint_id, sprint_backlog_id) = match location {
        IssueLocation::Unassigned => (false, false, None, None, None),
        IssueLocation::ProductBacklog { backlog_id } => {
            (true, false, Some(backlog_id), None, None)
        }
        IssueLocation::Sprint {
            sprint_id,
            sprint_backlog_id,
        } => (false, true, None, Some(sprint_id), Some(sprint_backlog_id)),
    };

    let result = issues::Entity::update_many()
        .col_expr(issues::Column::InBacklog, Expr::value(in_backlog))
        .col_expr(issues::Column::InSprint, Expr::value(in_sprint))
        .col_expr(issues::Column::ProductBacklogId, Expr::value(backlog_id))
        .col_expr(issues::Column::SprintId, Expr::value(sprint_id))
        .col_expr(issues::Column::SprintBacklogId, Expr::value(sprint_backlog_id))
        .col_expr(issues::Column::Version, Expr::value(issue.version + 1))
        .col_expr(issues::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(issues::Column::Id.eq(issue.id))
        .filter(issues::Column::Version.eq(issue.version))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(CoreError::conflict(format!(
            "Issue {} was modified concurrently",
            issue.code
        ))
        .with_field("issueId", issue.id));
    }

    issues::Entity::find_by_id(issue.id)
        .one(conn)
        .await?
        .ok_or_else(|| CoreError::not_found("Issue", issue.id))
}

/// Rejects taking an issue out of a finished sprint.
async fn ensure_not_frozen<C: ConnectionTrait>(conn: &C, issue: &issues::Model) -> CoreResult<()> {
    if let IssueLocation::Sprint { sprint_id, .. } = issue.location() {
        let current = find_sprint(conn, sprint_id).await?;
        if current.is_finished {
            return Err(CoreError::conflict(format!(
                "Issue {} belongs to finished sprint {}",
                issue.code, current.name
            ))
            .with_field("sprintId", sprint_id));
        }
    }
    Ok(())
}

pub struct LifecycleService {
    db: DatabaseConnection,
}

impl LifecycleService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Commits an issue to a sprint, creating the sprint backlog on first use.
    pub async fn move_issue_to_sprint(
        &self,
        issue_id: i32,
        sprint_id: i32,
    ) -> CoreResult<issues::Model> {
        let txn = self.db.begin().await?;

        let issue = claim_issue(&txn, issue_id).await?;
        let sprint = find_sprint(&txn, sprint_id).await?;

        if sprint.is_finished {
            return Err(CoreError::conflict(format!(
                "Sprint {} is finished and cannot take new issues",
                sprint.name
            ))
            .with_field("sprintId", sprint_id));
        }
        if sprint.project_id != issue.project_id {
            return Err(CoreError::validation(format!(
                "Issue {} and sprint {} belong to different projects",
                issue.code, sprint.name
            )));
        }

        let backlog = get_or_create_sprint_backlog(&txn, &sprint).await?;
        if issue.sprint_backlog_id == Some(backlog.id) {
            return Err(CoreError::conflict(format!(
                "Issue {} is already in the backlog of sprint {}",
                issue.code, sprint.name
            ))
            .with_field("issueId", issue_id)
            .with_field("sprintId", sprint_id));
        }
        ensure_not_frozen(&txn, &issue).await?;

        let updated = write_location(
            &txn,
            &issue,
            IssueLocation::Sprint {
                sprint_id: sprint.id,
                sprint_backlog_id: backlog.id,
            },
        )
        .await?;

        txn.commit().await?;
        info!("Moved issue {} into sprint {}", updated.code, sprint.id);
        Ok(updated)
    }

    /// Returns an issue from a sprint that has not started yet to a product
    /// backlog.
    pub async fn move_issue_to_backlog(
        &self,
        issue_id: i32,
        backlog_id: i32,
    ) -> CoreResult<issues::Model> {
        let txn = self.db.begin().await?;

        let issue = claim_issue(&txn, issue_id).await?;
        if issue.location() == (IssueLocation::ProductBacklog { backlog_id }) {
            return Err(CoreError::conflict(format!(
                "Issue {} is already in product backlog {}",
                issue.code, backlog_id
            ))
            .with_field("issueId", issue_id));
        }

        let sprint_id = match issue.location() {
            IssueLocation::Sprint { sprint_id, .. } => sprint_id,
            _ => {
                return Err(CoreError::precondition_failed(format!(
                    "Issue {} is not in any sprint backlog",
                    issue.code
                ))
                .with_field("issueId", issue_id))
            }
        };

        let sprint = find_sprint(&txn, sprint_id).await?;
        if sprint.is_started {
            return Err(CoreError::precondition_failed(format!(
                "Sprint {} has started; its issues cannot return to the backlog",
                sprint.name
            ))
            .with_field("sprintId", sprint_id));
        }

        let backlog = product_backlogs::Entity::find_by_id(backlog_id)
            .one(&txn)
            .await?
            .ok_or_else(|| CoreError::not_found("ProductBacklog", backlog_id))?;
        if backlog.project_id != issue.project_id {
            return Err(CoreError::validation(format!(
                "Issue {} and backlog {} belong to different projects",
                issue.code, backlog_id
            )));
        }

        let updated =
            write_location(&txn, &issue, IssueLocation::ProductBacklog { backlog_id }).await?;

        txn.commit().await?;
        info!("Moved issue {} back to backlog {}", updated.code, backlog_id);
        Ok(updated)
    }

    /// Takes an issue out of its product backlog, leaving it unassigned.
    pub async fn remove_issue_from_backlog(&self, issue_id: i32) -> CoreResult<issues::Model> {
        let txn = self.db.begin().await?;

        let issue = claim_issue(&txn, issue_id).await?;
        if !matches!(issue.location(), IssueLocation::ProductBacklog { .. }) {
            return Err(CoreError::precondition_failed(format!(
                "Issue {} is not in a product backlog",
                issue.code
            ))
            .with_field("issueId", issue_id));
        }

        let updated = write_location(&txn, &issue, IssueLocation::Unassigned).await?;
        txn.commit().await?;
        info!("Removed issue {} from its backlog", updated.code);
        Ok(updated)
    }

    /// not-started → started. Records a `start` metric with the planned work.
    pub async fn start_sprint(&self, sprint_id: i32) -> CoreResult<sprints::Model> {
        let txn = self.db.begin().await?;

        let sprint = claim_sprint(&txn, sprint_id).await?;
        if sprint.is_started {
            return Err(CoreError::conflict(format!(
                "Sprint {} is already started",
                sprint.name
            ))
            .with_field("sprintId", sprint_id));
        }

        let now = Utc::now();
        let result = sprints::Entity::update_many()
            .col_expr(sprints::Column::IsStarted, Expr::value(true))
            .col_expr(sprints::Column::StartedAt, Expr::value(Some(now)))
            .col_expr(sprints::Column::UpdatedAt, Expr::value(now))
            .filter(sprints::Column::Id.eq(sprint_id))
            .filter(sprints::Column::IsStarted.eq(false))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(CoreError::conflict(format!(
                "Sprint {} is already started",
                sprint.name
            )));
        }

        let planned = sprint_figures(&sprint_issues(&txn, sprint_id).await?);
        metrics_service::record_sprint_metric(
            &txn,
            sprint_id,
            &MetricType::Start.to_string(),
            1.0,
            Some(json!({
                "plannedStoryPoints": planned.committed_points,
                "issueCount": planned.total_issues,
            })),
        )
        .await?;

        let started = find_sprint(&txn, sprint_id).await?;
        txn.commit().await?;

        info!(
            "Started sprint {} with {} issues ({} points)",
            started.id, planned.total_issues, planned.committed_points
        );
        Ok(started)
    }

    /// started → finished. Creates the successor sprint and carries every
    /// unfinished issue into it, logging one transition per carried issue.
    ///
    /// Velocity, completion rate and duration for the finished sprint are
    /// recorded after commit from the issue set as it stood at completion.
    pub async fn complete_sprint(
        &self,
        sprint_id: i32,
        input: CompleteSprint,
    ) -> CoreResult<SprintCompletion> {
        let txn = self.db.begin().await?;

        let sprint = claim_sprint(&txn, sprint_id).await?;
        if sprint.is_finished {
            return Err(CoreError::conflict(format!(
                "Sprint {} is already finished",
                sprint.name
            ))
            .with_field("sprintId", sprint_id));
        }
        if !sprint.is_started {
            return Err(CoreError::precondition_failed(format!(
                "Sprint {} has not been started",
                sprint.name
            ))
            .with_field("sprintId", sprint_id));
        }

        let now = Utc::now();
        let result = sprints::Entity::update_many()
            .col_expr(sprints::Column::IsFinished, Expr::value(true))
            .col_expr(sprints::Column::FinishedAt, Expr::value(Some(now)))
            .col_expr(sprints::Column::UpdatedAt, Expr::value(now))
            .filter(sprints::Column::Id.eq(sprint_id))
            .filter(sprints::Column::IsFinished.eq(false))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(CoreError::conflict(format!(
                "Sprint {} is already finished",
                sprint.name
            )));
        }
        let completed = find_sprint(&txn, sprint_id).await?;

        let sprint_count = sprints::Entity::find()
            .filter(sprints::Column::ProjectId.eq(completed.project_id))
            .count(&txn)
            .await?;
        let name = input
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("Sprint {}", sprint_count + 1));
        let goal = input.goal.unwrap_or_default();

        let duration = metrics_service::duration_days(completed.started_at, completed.finished_at);
        let successor = sprints::ActiveModel {
            project_id: Set(completed.project_id),
            name: Set(name),
            goal: Set(goal),
            is_started: Set(false),
            is_finished: Set(false),
            started_at: Set(Some(now)),
            finished_at: Set(Some(now + Duration::days(duration))),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        let successor_backlog = get_or_create_sprint_backlog(&txn, &successor).await?;

        let snapshot = sprint_issues(&txn, sprint_id).await?;
        let mut carried_over = Vec::new();
        for issue in snapshot
            .iter()
            .filter(|issue| IssueStatus::CARRY_OVER.contains(&issue.status()))
        {
            let moved = write_location(
                &txn,
                issue,
                IssueLocation::Sprint {
                    sprint_id: successor.id,
                    sprint_backlog_id: successor_backlog.id,
                },
            )
            .await?;

            issue_transitions::ActiveModel {
                issue_id: Set(issue.id),
                from_sprint_id: Set(Some(completed.id)),
                to_sprint_id: Set(Some(successor.id)),
                status: Set(issue.status().to_string()),
                story_points: Set(issue.story_points),
                transition_date: Set(now),
                notes: Set(Some(format!(
                    "Carried over from {} to {}",
                    completed.name, successor.name
                ))),
                ..Default::default()
            }
            .insert(&txn)
            .await?;

            carried_over.push(moved);
        }

        txn.commit().await?;

        info!(
            "Completed sprint {}; {} issues carried into sprint {} ({})",
            completed.id,
            carried_over.len(),
            successor.id,
            successor.name
        );

        self.record_completion_metrics(&completed, &snapshot).await;

        Ok(SprintCompletion {
            completed,
            successor,
            carried_over,
        })
    }

    async fn record_completion_metrics(
        &self,
        sprint: &sprints::Model,
        snapshot: &[issues::Model],
    ) {
        if let Err(e) = calculate_sprint_velocity(&self.db, sprint.id, snapshot).await {
            warn!("Failed to record velocity for sprint {}: {}", sprint.id, e);
        }
        if let Err(e) = calculate_sprint_completion_rate(&self.db, sprint.id, snapshot).await {
            warn!(
                "Failed to record completion rate for sprint {}: {}",
                sprint.id, e
            );
        }
        if let Err(e) = record_sprint_duration(&self.db, sprint).await {
            warn!("Failed to record duration for sprint {}: {}", sprint.id, e);
        }
    }

    /// Commits several issues to an unfinished sprint, all or none.
    ///
    /// Issues already in this sprint are left as they are. An issue held by
    /// another open sprint is a conflict.
    pub async fn add_issues_to_sprint(
        &self,
        sprint_id: i32,
        issue_ids: &[i32],
    ) -> CoreResult<(sprints::Model, Vec<issues::Model>)> {
        let mut ids: Vec<i32> = Vec::with_capacity(issue_ids.len());
        for id in issue_ids {
            if !ids.contains(id) {
                ids.push(*id);
            }
        }
        if ids.is_empty() {
            return Err(CoreError::validation("At least one issue id is required"));
        }

        let txn = self.db.begin().await?;

        let sprint = claim_sprint(&txn, sprint_id).await?;
        if sprint.is_finished {
            return Err(CoreError::conflict(format!(
                "Sprint {} is finished and cannot take new issues",
                sprint.name
            ))
            .with_field("sprintId", sprint_id));
        }

        let found = issues::Entity::find_active()
            .filter(issues::Column::Id.is_in(ids.clone()))
            .all(&txn)
            .await?;
        if let Some(missing) = ids.iter().find(|id| !found.iter().any(|i| i.id == **id)) {
            return Err(CoreError::not_found("Issue", missing));
        }

        for issue in &found {
            if issue.project_id != sprint.project_id {
                return Err(CoreError::validation(format!(
                    "Issue {} belongs to a different project than sprint {}",
                    issue.code, sprint.name
                )));
            }
            if let IssueLocation::Sprint {
                sprint_id: current, ..
            } = issue.location()
            {
                if current == sprint_id {
                    continue;
                }
                let other = find_sprint(&txn, current).await?;
                let reason = if other.is_finished {
                    "belongs to finished sprint"
                } else {
                    "is already committed to open sprint"
                };
                return Err(CoreError::conflict(format!(
                    "Issue {} {} {}",
                    issue.code, reason, other.name
                ))
                .with_field("issueId", issue.id)
                .with_field("sprintId", current));
            }
        }

        let backlog = get_or_create_sprint_backlog(&txn, &sprint).await?;
        let mut added = 0;
        for issue in &found {
            if issue.sprint_backlog_id == Some(backlog.id) && issue.in_sprint {
                continue;
            }
            write_location(
                &txn,
                issue,
                IssueLocation::Sprint {
                    sprint_id: sprint.id,
                    sprint_backlog_id: backlog.id,
                },
            )
            .await?;
            added += 1;
        }

        let committed = sprint_issues(&txn, sprint_id).await?;
        txn.commit().await?;

        info!("Added {} issues to sprint {}", added, sprint_id);
        Ok((sprint, committed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::entities::{IssuePriority, IssueType};
    use crate::database::test_utils::setup_test_db;
    use crate::errors::CoreErrorKind;

    async fn stored_issue(db: &DatabaseConnection) -> anyhow::Result<issues::Model> {
        let now = Utc::now();
        let project = projects::ActiveModel {
            name: Set("Version board".to_string()),
            key: Set("VER".to_string()),
            description: Set(None),
            next_issue_number: Set(2),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;

        Ok(issues::ActiveModel {
            project_id: Set(project.id),
            code: Set("VER-1".to_string()),
            title: Set("Stale read".to_string()),
            description: Set(String::new()),
            status: Set(IssueStatus::ToDo.to_string()),
            issue_type: Set(IssueType::Task.to_string()),
            priority: Set(IssuePriority::Medium.to_string()),
            created_by: Set("alice".to_string()),
            in_backlog: Set(false),
            in_sprint: Set(false),
            version: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?)
    }

    #[tokio::test]
    async fn stale_location_write_is_a_conflict() -> anyhow::Result<()> {
        let db = setup_test_db().await?;
        let stale = stored_issue(&db).await?;

        let moved = write_location(&db, &stale, IssueLocation::Unassigned).await?;
        assert_eq!(moved.version, stale.version + 1);

        let err = write_location(&db, &stale, IssueLocation::Unassigned)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::Conflict);

        let current = find_active_issue(&db, stale.id).await?;
        assert_eq!(current.version, stale.version + 1);
        Ok(())
    }

    #[tokio::test]
    async fn claiming_a_deleted_issue_is_not_found() -> anyhow::Result<()> {
        let db = setup_test_db().await?;
        let issue = stored_issue(&db).await?;
        let mut deleted: issues::ActiveModel = issue.clone().into();
        deleted.deleted_at = Set(Some(Utc::now()));
        deleted.update(&db).await?;

        let err = claim_issue(&db, issue.id).await.unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::NotFound);
        Ok(())
    }
}
