//! Epic tests
//!
//! Naming rules per backlog, listing order, updates, removal and issue links.

use std::sync::Arc;

use anyhow::Result;
use sprintline::app_context::AppContext;
use sprintline::database::entities::*;
use sprintline::database::test_utils::setup_test_db;
use sprintline::errors::CoreErrorKind;
use sprintline::services::epic_service::{CreateEpic, EpicPatch};
use sprintline::services::issue_service::CreateIssue;
use sprintline::services::project_service::CreateProject;
use sprintline::services::AllowAllUsers;

async fn setup_context() -> Result<(AppContext, i32, i32)> {
    let db = setup_test_db().await?;
    let ctx = AppContext::new(db, Arc::new(AllowAllUsers));
    let created = ctx
        .create_project(CreateProject {
            name: "Epic board".to_string(),
            key: "EPC".to_string(),
            description: None,
        })
        .await?;
    Ok((ctx, created.project.id, created.backlog.id))
}

fn new_epic(backlog_id: i32, name: &str) -> CreateEpic {
    CreateEpic {
        product_backlog_id: backlog_id,
        name: name.to_string(),
        description: String::new(),
        status: None,
    }
}

fn issue_in_epic(project_id: i32, backlog_id: i32, epic_id: Option<i32>) -> CreateIssue {
    CreateIssue {
        project_id,
        backlog_id: Some(backlog_id),
        title: "Epic work".to_string(),
        description: String::new(),
        issue_type: None,
        priority: None,
        status: None,
        story_points: Some(2),
        acceptance_criteria: None,
        created_by: "alice".to_string(),
        assigned_to: None,
        epic_id,
    }
}

#[tokio::test]
async fn test_create_and_list_epics() -> Result<()> {
    let (ctx, _project_id, backlog_id) = setup_context().await?;

    let checkout = ctx.create_epic(new_epic(backlog_id, "Checkout")).await?;
    assert_eq!(checkout.status, IssueStatus::ToDo);
    assert_eq!(checkout.product_backlog_id, backlog_id);

    let billing = ctx
        .create_epic(CreateEpic {
            status: Some(IssueStatus::InProgress),
            description: "Invoices and refunds".to_string(),
            ..new_epic(backlog_id, "  Billing ")
        })
        .await?;
    assert_eq!(billing.name, "Billing");
    assert_eq!(billing.status, IssueStatus::InProgress);

    let listed = ctx.get_backlog_epics(backlog_id).await?;
    let names: Vec<&str> = listed.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["Billing", "Checkout"]);

    assert_eq!(ctx.get_epic(checkout.id).await?.name, "Checkout");
    Ok(())
}

#[tokio::test]
async fn test_epic_names_are_unique_per_backlog() -> Result<()> {
    let (ctx, _project_id, backlog_id) = setup_context().await?;
    ctx.create_epic(new_epic(backlog_id, "Search")).await?;

    let err = ctx
        .create_epic(new_epic(backlog_id, "Search"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), CoreErrorKind::Conflict);

    // Another project's backlog may reuse the name
    let other = ctx
        .create_project(CreateProject {
            name: "Other board".to_string(),
            key: "OTH".to_string(),
            description: None,
        })
        .await?;
    ctx.create_epic(new_epic(other.backlog.id, "Search")).await?;

    let err = ctx.create_epic(new_epic(backlog_id, "   ")).await.unwrap_err();
    assert_eq!(err.kind(), CoreErrorKind::Validation);
    Ok(())
}

#[tokio::test]
async fn test_unknown_backlog_or_epic_is_not_found() -> Result<()> {
    let (ctx, _project_id, _backlog_id) = setup_context().await?;

    let err = ctx.create_epic(new_epic(999, "Ghost")).await.unwrap_err();
    assert_eq!(err.kind(), CoreErrorKind::NotFound);

    assert_eq!(
        ctx.get_backlog_epics(999).await.unwrap_err().kind(),
        CoreErrorKind::NotFound
    );
    assert_eq!(ctx.get_epic(999).await.unwrap_err().kind(), CoreErrorKind::NotFound);
    assert_eq!(
        ctx.update_epic(999, EpicPatch::default())
            .await
            .unwrap_err()
            .kind(),
        CoreErrorKind::NotFound
    );
    assert_eq!(ctx.delete_epic(999).await.unwrap_err().kind(), CoreErrorKind::NotFound);
    Ok(())
}

#[tokio::test]
async fn test_update_epic_checks_name_against_others() -> Result<()> {
    let (ctx, _project_id, backlog_id) = setup_context().await?;
    let onboarding = ctx.create_epic(new_epic(backlog_id, "Onboarding")).await?;
    ctx.create_epic(new_epic(backlog_id, "Reporting")).await?;

    // Keeping its own name is not a clash
    let renamed = ctx
        .update_epic(
            onboarding.id,
            EpicPatch {
                name: Some("Onboarding".to_string()),
                status: Some(IssueStatus::Review),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(renamed.status, IssueStatus::Review);

    let err = ctx
        .update_epic(
            onboarding.id,
            EpicPatch {
                name: Some("Reporting".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), CoreErrorKind::Conflict);
    assert_eq!(ctx.get_epic(onboarding.id).await?.name, "Onboarding");

    let described = ctx
        .update_epic(
            onboarding.id,
            EpicPatch {
                description: Some("First-run experience".to_string()),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(described.description, "First-run experience");
    assert!(described.updated_at >= onboarding.updated_at);
    Ok(())
}

#[tokio::test]
async fn test_issues_link_to_epics_of_their_project() -> Result<()> {
    let (ctx, project_id, backlog_id) = setup_context().await?;
    let epic = ctx.create_epic(new_epic(backlog_id, "Payments")).await?;

    let linked = ctx
        .create_issue(issue_in_epic(project_id, backlog_id, Some(epic.id)))
        .await?;
    assert_eq!(linked.epic_id, Some(epic.id));

    let err = ctx
        .create_issue(issue_in_epic(project_id, backlog_id, Some(999)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), CoreErrorKind::NotFound);

    let other = ctx
        .create_project(CreateProject {
            name: "Other board".to_string(),
            key: "OTH".to_string(),
            description: None,
        })
        .await?;
    let foreign = ctx.create_epic(new_epic(other.backlog.id, "Payments")).await?;
    let err = ctx
        .create_issue(issue_in_epic(project_id, backlog_id, Some(foreign.id)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), CoreErrorKind::Validation);

    // A rejected create does not consume a code
    let next = ctx
        .create_issue(issue_in_epic(project_id, backlog_id, None))
        .await?;
    assert_eq!(next.code, "EPC-2");
    Ok(())
}

#[tokio::test]
async fn test_deleting_epic_detaches_its_issues() -> Result<()> {
    let (ctx, project_id, backlog_id) = setup_context().await?;
    let epic = ctx.create_epic(new_epic(backlog_id, "Legacy")).await?;
    let issue = ctx
        .create_issue(issue_in_epic(project_id, backlog_id, Some(epic.id)))
        .await?;

    ctx.delete_epic(epic.id).await?;

    assert_eq!(ctx.get_epic(epic.id).await.unwrap_err().kind(), CoreErrorKind::NotFound);
    let kept = ctx.get_issue(issue.id).await?;
    assert_eq!(kept.epic_id, None);
    assert_eq!(kept.version, issue.version + 1);
    assert_eq!(
        kept.location,
        IssueLocation::ProductBacklog { backlog_id }
    );
    assert!(ctx.get_backlog_epics(backlog_id).await?.is_empty());
    Ok(())
}
