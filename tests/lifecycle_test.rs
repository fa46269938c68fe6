//! Issue placement and sprint lifecycle tests
//!
//! Exercises the transactional moves, the sprint state machine and carry-over
//! against an in-memory database.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, Set,
};
use sprintline::app_context::{AppContext, IssueSummary};
use sprintline::database::entities::*;
use sprintline::database::test_utils::setup_test_db;
use sprintline::errors::CoreErrorKind;
use sprintline::services::issue_service::{CreateIssue, IssuePatch};
use sprintline::services::lifecycle_service::CompleteSprint;
use sprintline::services::metrics_service::duration_days;
use sprintline::services::project_service::CreateProject;
use sprintline::services::sprint_service::CreateSprint;
use sprintline::services::AllowAllUsers;

struct Board {
    ctx: AppContext,
    project_id: i32,
    backlog_id: i32,
}

async fn setup_board(key: &str) -> Result<Board> {
    let db = setup_test_db().await?;
    let ctx = AppContext::new(db, Arc::new(AllowAllUsers));
    let created = ctx
        .create_project(CreateProject {
            name: format!("{} board", key),
            key: key.to_string(),
            description: None,
        })
        .await?;
    Ok(Board {
        ctx,
        project_id: created.project.id,
        backlog_id: created.backlog.id,
    })
}

impl Board {
    async fn issue(&self, title: &str, points: i32) -> Result<IssueSummary> {
        Ok(self
            .ctx
            .create_issue(CreateIssue {
                project_id: self.project_id,
                backlog_id: Some(self.backlog_id),
                title: title.to_string(),
                description: String::new(),
                issue_type: None,
                priority: None,
                status: None,
                story_points: Some(points),
                acceptance_criteria: None,
                created_by: "alice".to_string(),
                assigned_to: None,
                epic_id: None,
            })
            .await?)
    }

    async fn sprint(&self, name: &str) -> Result<i32> {
        let sprint = self
            .ctx
            .create_sprint(CreateSprint {
                project_id: self.project_id,
                name: name.to_string(),
                goal: String::new(),
                start_date: None,
                end_date: None,
            })
            .await?;
        Ok(sprint.id)
    }

    async fn set_status(&self, issue_id: i32, status: IssueStatus) -> Result<()> {
        self.ctx
            .update_issue(
                issue_id,
                IssuePatch {
                    status: Some(status),
                    ..Default::default()
                },
            )
            .await?;
        Ok(())
    }
}

fn assert_single_location(issue: &issues::Model) {
    assert!(!(issue.in_backlog && issue.in_sprint), "issue {} in two places", issue.code);
    if issue.in_sprint {
        assert!(issue.sprint_id.is_some());
        assert!(issue.sprint_backlog_id.is_some());
        assert!(issue.product_backlog_id.is_none());
    }
    if issue.in_backlog {
        assert!(issue.product_backlog_id.is_some());
        assert!(issue.sprint_id.is_none());
    }
}

#[tokio::test]
async fn test_moves_keep_issue_in_exactly_one_place() -> Result<()> {
    let board = setup_board("LOC").await?;
    let sprint_id = board.sprint("Sprint 1").await?;
    let issue = board.issue("Login form", 3).await?;

    let moved = board.ctx.move_issue_to_sprint(issue.id, sprint_id).await?;
    assert_eq!(moved.sprint_id, Some(sprint_id));
    assert!(moved.in_sprint && !moved.in_backlog);
    assert_eq!(moved.product_backlog_id, None);

    let back = board
        .ctx
        .move_issue_to_backlog(issue.id, board.backlog_id)
        .await?;
    assert!(back.in_backlog && !back.in_sprint);
    assert_eq!(back.sprint_id, None);
    assert_eq!(
        back.location,
        IssueLocation::ProductBacklog {
            backlog_id: board.backlog_id
        }
    );

    let removed = board.ctx.remove_issue_from_backlog(issue.id).await?;
    assert_eq!(removed.location, IssueLocation::Unassigned);

    for row in issues::Entity::find().all(board.ctx.db()).await? {
        assert_single_location(&row);
    }
    Ok(())
}

#[tokio::test]
async fn test_move_into_same_sprint_is_conflict_and_backlog_created_once() -> Result<()> {
    let board = setup_board("DUP").await?;
    let sprint_id = board.sprint("Sprint 1").await?;
    let first = board.issue("First", 1).await?;
    let second = board.issue("Second", 2).await?;

    board.ctx.move_issue_to_sprint(first.id, sprint_id).await?;
    board.ctx.move_issue_to_sprint(second.id, sprint_id).await?;

    let err = board
        .ctx
        .move_issue_to_sprint(first.id, sprint_id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), CoreErrorKind::Conflict);

    let backlogs = sprint_backlogs::Entity::find()
        .filter(sprint_backlogs::Column::SprintId.eq(sprint_id))
        .count(board.ctx.db())
        .await?;
    assert_eq!(backlogs, 1);
    Ok(())
}

#[tokio::test]
async fn test_moving_out_of_started_sprint_fails_precondition() -> Result<()> {
    let board = setup_board("PRE").await?;
    let sprint_id = board.sprint("Sprint 1").await?;
    let issue = board.issue("Payments", 5).await?;

    board.ctx.move_issue_to_sprint(issue.id, sprint_id).await?;
    board.ctx.start_sprint(sprint_id).await?;

    let err = board
        .ctx
        .move_issue_to_backlog(issue.id, board.backlog_id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), CoreErrorKind::PreconditionFailed);

    // Nothing moved
    let current = board.ctx.get_issue(issue.id).await?;
    assert_eq!(current.sprint_id, Some(sprint_id));
    Ok(())
}

#[tokio::test]
async fn test_move_unknown_entities_is_not_found() -> Result<()> {
    let board = setup_board("NF").await?;
    let issue = board.issue("Orphan", 1).await?;

    let err = board.ctx.move_issue_to_sprint(issue.id, 999).await.unwrap_err();
    assert_eq!(err.kind(), CoreErrorKind::NotFound);

    let sprint_id = board.sprint("Sprint 1").await?;
    let err = board.ctx.move_issue_to_sprint(999, sprint_id).await.unwrap_err();
    assert_eq!(err.kind(), CoreErrorKind::NotFound);
    Ok(())
}

#[tokio::test]
async fn test_deleted_issue_cannot_be_moved() -> Result<()> {
    let board = setup_board("DEL").await?;
    let sprint_id = board.sprint("Sprint 1").await?;
    let issue = board.issue("Obsolete", 2).await?;

    board.ctx.delete_issue(issue.id).await?;

    let err = board
        .ctx
        .move_issue_to_sprint(issue.id, sprint_id)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(board.ctx.get_backlog_issues(board.backlog_id, None).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_start_twice_is_conflict() -> Result<()> {
    let board = setup_board("START").await?;
    let sprint_id = board.sprint("Sprint 1").await?;

    let started = board.ctx.start_sprint(sprint_id).await?;
    assert!(started.is_started);
    assert_eq!(started.status, "active");
    assert!(started.started_at.is_some());

    let err = board.ctx.start_sprint(sprint_id).await.unwrap_err();
    assert_eq!(err.kind(), CoreErrorKind::Conflict);

    let start_metrics = board.ctx.get_sprint_metrics(sprint_id, Some("start")).await?;
    assert_eq!(start_metrics.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_complete_requires_started_sprint() -> Result<()> {
    let board = setup_board("CMP").await?;
    let sprint_id = board.sprint("Sprint 1").await?;

    let err = board
        .ctx
        .complete_sprint(sprint_id, CompleteSprint::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), CoreErrorKind::PreconditionFailed);

    board.ctx.start_sprint(sprint_id).await?;
    board
        .ctx
        .complete_sprint(sprint_id, CompleteSprint::default())
        .await?;

    let err = board
        .ctx
        .complete_sprint(sprint_id, CompleteSprint::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), CoreErrorKind::Conflict);
    Ok(())
}

#[tokio::test]
async fn test_complete_carries_unfinished_work_into_successor() -> Result<()> {
    let board = setup_board("CARRY").await?;
    let sprint_id = board.sprint("Sprint 1").await?;

    let done = board.issue("Done work", 3).await?;
    let closed = board.issue("Closed work", 5).await?;
    let in_progress = board.issue("Half done", 2).await?;
    let review = board.issue("In review", 1).await?;

    board
        .ctx
        .add_issues_to_sprint(sprint_id, &[done.id, closed.id, in_progress.id, review.id])
        .await?;
    board.ctx.start_sprint(sprint_id).await?;
    board.set_status(done.id, IssueStatus::Done).await?;
    board.set_status(closed.id, IssueStatus::Closed).await?;
    board.set_status(in_progress.id, IssueStatus::InProgress).await?;
    board.set_status(review.id, IssueStatus::Review).await?;

    let completion = board
        .ctx
        .complete_sprint(sprint_id, CompleteSprint::default())
        .await?;

    assert!(completion.completed_sprint.is_finished);
    assert_eq!(completion.completed_sprint.status, "completed");
    assert_eq!(completion.new_sprint.name, "Sprint 2");
    assert!(!completion.new_sprint.is_started);
    assert_eq!(
        duration_days(
            completion.new_sprint.started_at,
            completion.new_sprint.finished_at
        ),
        duration_days(
            completion.completed_sprint.started_at,
            completion.completed_sprint.finished_at
        )
    );

    let mut carried: Vec<i32> = completion.carried_over.iter().map(|i| i.id).collect();
    carried.sort();
    assert_eq!(carried, vec![in_progress.id, review.id]);

    let successor_id = completion.new_sprint.id;
    for id in [in_progress.id, review.id] {
        let issue = board.ctx.get_issue(id).await?;
        assert_eq!(issue.sprint_id, Some(successor_id));

        let history = board.ctx.get_issue_transition_history(id).await?;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].from_sprint_id, Some(sprint_id));
        assert_eq!(history[0].to_sprint_id, Some(successor_id));
    }

    // Completed work stays with the finished sprint
    assert_eq!(board.ctx.get_issue(done.id).await?.sprint_id, Some(sprint_id));
    assert!(board
        .ctx
        .get_issue_transition_history(done.id)
        .await?
        .is_empty());

    let moved = board.ctx.calculate_moved_work(sprint_id, successor_id).await?;
    assert_eq!(moved.story_points, 3);

    let velocity = board.ctx.get_sprint_metrics(sprint_id, Some("velocity")).await?;
    assert_eq!(velocity.len(), 1);
    assert_eq!(velocity[0].value, 8.0);

    let rate = board
        .ctx
        .get_sprint_metrics(sprint_id, Some("completion-rate"))
        .await?;
    assert_eq!(rate[0].value, 50.0);
    Ok(())
}

#[tokio::test]
async fn test_complete_uses_requested_successor_name() -> Result<()> {
    let board = setup_board("NAME").await?;
    let sprint_id = board.sprint("Alpha").await?;
    board.ctx.start_sprint(sprint_id).await?;

    let completion = board
        .ctx
        .complete_sprint(
            sprint_id,
            CompleteSprint {
                name: Some("Beta".to_string()),
                goal: Some("Ship it".to_string()),
            },
        )
        .await?;
    assert_eq!(completion.new_sprint.name, "Beta");
    assert_eq!(completion.new_sprint.goal, "Ship it");
    assert!(completion.carried_over.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_finished_sprint_rejects_new_work() -> Result<()> {
    let board = setup_board("FIN").await?;
    let sprint_id = board.sprint("Sprint 1").await?;
    let issue = board.issue("Late arrival", 1).await?;

    board.ctx.start_sprint(sprint_id).await?;
    board
        .ctx
        .complete_sprint(sprint_id, CompleteSprint::default())
        .await?;

    let err = board
        .ctx
        .move_issue_to_sprint(issue.id, sprint_id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), CoreErrorKind::Conflict);

    let err = board
        .ctx
        .add_issues_to_sprint(sprint_id, &[issue.id])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), CoreErrorKind::Conflict);
    Ok(())
}

#[tokio::test]
async fn test_add_issues_is_all_or_nothing() -> Result<()> {
    let board = setup_board("ADD").await?;
    let first_sprint = board.sprint("Sprint 1").await?;
    let second_sprint = board.sprint("Sprint 2").await?;

    let free = board.issue("Free", 2).await?;
    let taken = board.issue("Taken", 3).await?;
    board.ctx.move_issue_to_sprint(taken.id, first_sprint).await?;

    let err = board
        .ctx
        .add_issues_to_sprint(second_sprint, &[free.id, taken.id])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), CoreErrorKind::Conflict);

    // The free issue was not moved either
    let unchanged = board.ctx.get_issue(free.id).await?;
    assert!(unchanged.in_backlog);
    assert_eq!(unchanged.sprint_id, None);

    let result = board
        .ctx
        .add_issues_to_sprint(second_sprint, &[free.id, free.id])
        .await?;
    assert_eq!(result.issues.len(), 1);
    assert_eq!(result.issues[0].product_backlog_id, None);

    let err = board
        .ctx
        .add_issues_to_sprint(second_sprint, &[free.id, 4242])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), CoreErrorKind::NotFound);

    let err = board.ctx.add_issues_to_sprint(second_sprint, &[]).await.unwrap_err();
    assert_eq!(err.kind(), CoreErrorKind::Validation);
    Ok(())
}

#[tokio::test]
async fn test_cross_project_moves_are_rejected() -> Result<()> {
    let board = setup_board("ONE").await?;
    let other = board
        .ctx
        .create_project(CreateProject {
            name: "Other".to_string(),
            key: "TWO".to_string(),
            description: None,
        })
        .await?;
    let foreign_sprint = board
        .ctx
        .create_sprint(CreateSprint {
            project_id: other.project.id,
            name: "Foreign".to_string(),
            goal: String::new(),
            start_date: None,
            end_date: None,
        })
        .await?;
    let issue = board.issue("Local", 1).await?;

    let err = board
        .ctx
        .move_issue_to_sprint(issue.id, foreign_sprint.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), CoreErrorKind::Validation);
    Ok(())
}

#[tokio::test]
async fn test_first_moves_into_sprint_without_backlog_create_one() -> Result<()> {
    let board = setup_board("LAZY").await?;
    let now = Utc::now();
    let sprint = sprints::ActiveModel {
        project_id: Set(board.project_id),
        name: Set("Imported sprint".to_string()),
        goal: Set(String::new()),
        is_started: Set(false),
        is_finished: Set(false),
        started_at: Set(None),
        finished_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(board.ctx.db())
    .await?;
    assert_eq!(
        sprint_backlogs::Entity::find()
            .filter(sprint_backlogs::Column::SprintId.eq(sprint.id))
            .count(board.ctx.db())
            .await?,
        0
    );

    let first = board.issue("First", 1).await?;
    let second = board.issue("Second", 2).await?;
    let moved_first = board.ctx.move_issue_to_sprint(first.id, sprint.id).await?;
    let moved_second = board.ctx.move_issue_to_sprint(second.id, sprint.id).await?;

    let backlogs = sprint_backlogs::Entity::find()
        .filter(sprint_backlogs::Column::SprintId.eq(sprint.id))
        .all(board.ctx.db())
        .await?;
    assert_eq!(backlogs.len(), 1);
    assert_eq!(moved_first.sprint_backlog_id, Some(backlogs[0].id));
    assert_eq!(moved_second.sprint_backlog_id, Some(backlogs[0].id));
    Ok(())
}

#[tokio::test]
async fn test_failed_completion_rolls_back_every_write() -> Result<()> {
    let board = setup_board("ROLL").await?;
    let sprint_id = board.sprint("Sprint 1").await?;
    let first = board.issue("First", 3).await?;
    let second = board.issue("Second", 5).await?;
    board
        .ctx
        .add_issues_to_sprint(sprint_id, &[first.id, second.id])
        .await?;
    board.ctx.start_sprint(sprint_id).await?;

    // The first carry-over succeeds, the second transition insert aborts.
    board
        .ctx
        .db()
        .execute_unprepared(&format!(
            "CREATE TRIGGER reject_transition BEFORE INSERT ON issue_transitions \
             WHEN NEW.issue_id = {} \
             BEGIN SELECT RAISE(ABORT, 'transition log offline'); END;",
            second.id
        ))
        .await?;

    let result = board
        .ctx
        .complete_sprint(sprint_id, CompleteSprint::default())
        .await;
    assert!(result.is_err());

    let sprint = board.ctx.get_sprint(sprint_id).await?;
    assert!(sprint.is_started);
    assert!(!sprint.is_finished);

    let sprint_count = sprints::Entity::find()
        .filter(sprints::Column::ProjectId.eq(board.project_id))
        .count(board.ctx.db())
        .await?;
    assert_eq!(sprint_count, 1);

    for id in [first.id, second.id] {
        let issue = board.ctx.get_issue(id).await?;
        assert_eq!(issue.sprint_id, Some(sprint_id));
        assert_eq!(issue.version, first.version + 1);
        assert!(board.ctx.get_issue_transition_history(id).await?.is_empty());
    }
    assert!(board
        .ctx
        .get_sprint_metrics(sprint_id, Some("velocity"))
        .await?
        .is_empty());
    Ok(())
}
