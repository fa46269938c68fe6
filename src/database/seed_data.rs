use anyhow::Result;
use chrono::{Duration, Utc};
use tracing::info;

use crate::app_context::AppContext;
use crate::database::entities::{IssuePriority, IssueStatus, IssueType};
use crate::services::issue_service::{CreateIssue, IssuePatch};
use crate::services::project_service::CreateProject;
use crate::services::sprint_service::CreateSprint;

const EXAMPLE_KEY: &str = "DEMO";

/// Creates a demo project with a backlog and a running sprint. Does nothing
/// when the project already exists.
pub async fn create_example_project(ctx: &AppContext) -> Result<()> {
    let existing = ctx.list_projects().await?;
    if existing.iter().any(|p| p.key == EXAMPLE_KEY) {
        info!("Example project already exists, skipping seed data creation");
        return Ok(());
    }

    info!("Creating example project {}", EXAMPLE_KEY);
    let created = ctx
        .create_project(CreateProject {
            name: "Example Board".to_string(),
            key: EXAMPLE_KEY.to_string(),
            description: Some("Demo project with a running sprint".to_string()),
        })
        .await?;
    let project_id = created.project.id;
    let backlog_id = created.backlog.id;

    let seed_issues = [
        ("Set up CI pipeline", IssueType::Task, IssuePriority::High, 3),
        ("Login page crashes on empty password", IssueType::Bug, IssuePriority::Critical, 2),
        ("User profile page", IssueType::UserStory, IssuePriority::Medium, 5),
        ("Export board as CSV", IssueType::Feature, IssuePriority::Low, 8),
        ("Notification settings", IssueType::UserStory, IssuePriority::Medium, 3),
    ];

    let mut issue_ids = Vec::with_capacity(seed_issues.len());
    for (title, issue_type, priority, points) in seed_issues {
        let issue = ctx
            .create_issue(CreateIssue {
                project_id,
                backlog_id: Some(backlog_id),
                title: title.to_string(),
                description: String::new(),
                issue_type: Some(issue_type),
                priority: Some(priority),
                status: None,
                story_points: Some(points),
                acceptance_criteria: None,
                created_by: "seed".to_string(),
                assigned_to: None,
                epic_id: None,
            })
            .await?;
        issue_ids.push(issue.id);
    }

    let now = Utc::now();
    let sprint = ctx
        .create_sprint(CreateSprint {
            project_id,
            name: "Sprint 1".to_string(),
            goal: "First usable release".to_string(),
            start_date: Some(now),
            end_date: Some(now + Duration::days(14)),
        })
        .await?;

    ctx.add_issues_to_sprint(sprint.id, &issue_ids[..3]).await?;
    ctx.start_sprint(sprint.id).await?;
    ctx.update_issue(
        issue_ids[0],
        IssuePatch {
            status: Some(IssueStatus::Done),
            ..Default::default()
        },
    )
    .await?;

    info!(
        "Created example project {} with {} issues and sprint {}",
        project_id,
        issue_ids.len(),
        sprint.id
    );
    Ok(())
}
