use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;

use crate::app_context::{
    IssuePage, MovedWork, SprintCompletionSummary, SprintReportSummary, SprintSummary,
    SprintWithIssues, TransitionSummary,
};
use crate::database::entities::{IssueStatus, IssueType};
use crate::server::app::AppState;
use crate::server::error::ApiResult;
use crate::services::burndown::BurndownReport;
use crate::services::lifecycle_service::CompleteSprint;
use crate::services::sprint_service::{CreateSprint, IssueFilters, Pagination, SprintPatch};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSprintsQuery {
    #[serde(default)]
    pub include_completed: bool,
}

/// Query string of the paged sprint issue listing.
#[derive(Debug, Default, Deserialize)]
pub struct SprintIssuesQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<IssueStatus>,
    #[serde(rename = "type")]
    pub issue_type: Option<IssueType>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddIssuesRequest {
    pub issue_ids: Vec<i32>,
}

pub async fn create_sprint(
    State(state): State<AppState>,
    Json(payload): Json<CreateSprint>,
) -> ApiResult<(StatusCode, Json<SprintSummary>)> {
    let sprint = state.ctx.create_sprint(payload).await?;
    Ok((StatusCode::CREATED, Json(sprint)))
}

pub async fn get_sprint(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<SprintSummary>> {
    Ok(Json(state.ctx.get_sprint(id).await?))
}

pub async fn update_sprint(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(patch): Json<SprintPatch>,
) -> ApiResult<Json<SprintSummary>> {
    Ok(Json(state.ctx.update_sprint(id, patch).await?))
}

pub async fn list_project_sprints(
    State(state): State<AppState>,
    Path(project_id): Path<i32>,
    Query(query): Query<ProjectSprintsQuery>,
) -> ApiResult<Json<Vec<SprintWithIssues>>> {
    Ok(Json(
        state
            .ctx
            .get_project_sprints(project_id, query.include_completed)
            .await?,
    ))
}

pub async fn start_sprint(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<SprintSummary>> {
    Ok(Json(state.ctx.start_sprint(id).await?))
}

pub async fn complete_sprint(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    payload: Option<Json<CompleteSprint>>,
) -> ApiResult<Json<SprintCompletionSummary>> {
    let input = payload.map(|Json(input)| input).unwrap_or_default();
    Ok(Json(state.ctx.complete_sprint(id, input).await?))
}

pub async fn list_sprint_issues(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<SprintIssuesQuery>,
) -> ApiResult<Json<IssuePage>> {
    let defaults = Pagination::default();
    let pagination = Pagination {
        page: query.page.unwrap_or(defaults.page),
        limit: query.limit.unwrap_or(defaults.limit),
    };
    let filters = IssueFilters {
        status: query.status,
        issue_type: query.issue_type,
    };
    Ok(Json(
        state
            .ctx
            .get_sprint_backlog_issues(id, pagination, filters)
            .await?,
    ))
}

pub async fn add_issues(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<AddIssuesRequest>,
) -> ApiResult<Json<SprintWithIssues>> {
    Ok(Json(
        state.ctx.add_issues_to_sprint(id, &payload.issue_ids).await?,
    ))
}

pub async fn get_burndown(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<BurndownReport>> {
    Ok(Json(state.ctx.get_sprint_burndown_data(id).await?))
}

pub async fn generate_report(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<SprintReportSummary>> {
    Ok(Json(state.ctx.generate_sprint_report(id).await?))
}

pub async fn list_transition_issues(
    State(state): State<AppState>,
    Path((id, to_id)): Path<(i32, i32)>,
) -> ApiResult<Json<Vec<TransitionSummary>>> {
    Ok(Json(state.ctx.get_sprint_transition_issues(id, to_id).await?))
}

pub async fn get_moved_work(
    State(state): State<AppState>,
    Path((id, to_id)): Path<(i32, i32)>,
) -> ApiResult<Json<MovedWork>> {
    Ok(Json(state.ctx.calculate_moved_work(id, to_id).await?))
}
