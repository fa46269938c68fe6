//! Concurrent writers against a file-backed database
//!
//! The in-memory test database is pinned to one connection, so these tests
//! use a temporary file and a real connection pool.

use std::sync::Arc;

use anyhow::Result;
use sea_orm::{ColumnTrait, ConnectOptions, Database, EntityTrait, PaginatorTrait, QueryFilter};
use sprintline::app_context::AppContext;
use sprintline::database::entities::*;
use sprintline::database::setup_database;
use sprintline::errors::CoreErrorKind;
use sprintline::services::issue_service::CreateIssue;
use sprintline::services::project_service::CreateProject;
use sprintline::services::sprint_service::CreateSprint;
use sprintline::services::AllowAllUsers;
use tempfile::NamedTempFile;

const WRITERS: usize = 8;

async fn setup_pooled_context() -> Result<(AppContext, i32, i32, NamedTempFile)> {
    let temp_file = NamedTempFile::new()?;
    let mut opt = ConnectOptions::new(format!(
        "sqlite://{}?mode=rwc",
        temp_file.path().display()
    ));
    opt.max_connections(WRITERS as u32).sqlx_logging(false);

    let db = Database::connect(opt).await?;
    setup_database(&db).await?;

    let ctx = AppContext::new(db, Arc::new(AllowAllUsers));
    let created = ctx
        .create_project(CreateProject {
            name: "Race board".to_string(),
            key: "ABC".to_string(),
            description: None,
        })
        .await?;
    Ok((ctx, created.project.id, created.backlog.id, temp_file))
}

fn new_issue(project_id: i32, backlog_id: i32, title: String) -> CreateIssue {
    CreateIssue {
        project_id,
        backlog_id: Some(backlog_id),
        title,
        description: String::new(),
        issue_type: None,
        priority: None,
        status: None,
        story_points: Some(1),
        acceptance_criteria: None,
        created_by: "alice".to_string(),
        assigned_to: None,
        epic_id: None,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_get_distinct_sequential_codes() -> Result<()> {
    let (ctx, project_id, backlog_id, _temp_file) = setup_pooled_context().await?;

    let handles: Vec<_> = (0..WRITERS)
        .map(|n| {
            let ctx = ctx.clone();
            tokio::spawn(async move {
                ctx.create_issue(new_issue(project_id, backlog_id, format!("Issue {}", n)))
                    .await
            })
        })
        .collect();

    let mut codes = Vec::new();
    for handle in handles {
        let issue = handle.await??;
        codes.push(issue.code);
    }
    codes.sort_by_key(|code| {
        code.trim_start_matches("ABC-")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });

    let expected: Vec<String> = (1..=WRITERS).map(|n| format!("ABC-{}", n)).collect();
    assert_eq!(codes, expected);

    let project = projects::Entity::find_by_id(project_id)
        .one(ctx.db())
        .await?
        .unwrap();
    assert_eq!(project.next_issue_number, WRITERS as i32 + 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_moves_of_one_issue_have_one_winner() -> Result<()> {
    let (ctx, project_id, backlog_id, _temp_file) = setup_pooled_context().await?;
    let sprint = ctx
        .create_sprint(CreateSprint {
            project_id,
            name: "Sprint 1".to_string(),
            goal: String::new(),
            start_date: None,
            end_date: None,
        })
        .await?;
    let issue = ctx
        .create_issue(new_issue(project_id, backlog_id, "Contested".to_string()))
        .await?;

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let ctx = ctx.clone();
            let (issue_id, sprint_id) = (issue.id, sprint.id);
            tokio::spawn(async move { ctx.move_issue_to_sprint(issue_id, sprint_id).await })
        })
        .collect();

    let mut moved = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => moved += 1,
            Err(err) => {
                assert_eq!(err.kind(), CoreErrorKind::Conflict, "{}", err);
                conflicts += 1;
            }
        }
    }
    assert_eq!(moved, 1);
    assert_eq!(conflicts, 3);

    let stored = ctx.get_issue(issue.id).await?;
    assert_eq!(stored.sprint_id, Some(sprint.id));
    assert_eq!(stored.version, issue.version + 1);

    let backlogs = sprint_backlogs::Entity::find()
        .filter(sprint_backlogs::Column::SprintId.eq(sprint.id))
        .count(ctx.db())
        .await?;
    assert_eq!(backlogs, 1);
    Ok(())
}
