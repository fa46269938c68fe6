use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;

use crate::app_context::{IssueSummary, TransitionSummary};
use crate::server::app::AppState;
use crate::server::error::ApiResult;
use crate::services::issue_service::{CreateIssue, IssuePatch};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveToSprintRequest {
    pub sprint_id: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveToBacklogRequest {
    pub backlog_id: i32,
}

pub async fn create_issue(
    State(state): State<AppState>,
    Json(payload): Json<CreateIssue>,
) -> ApiResult<(StatusCode, Json<IssueSummary>)> {
    let issue = state.ctx.create_issue(payload).await?;
    Ok((StatusCode::CREATED, Json(issue)))
}

pub async fn get_issue(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<IssueSummary>> {
    Ok(Json(state.ctx.get_issue(id).await?))
}

pub async fn update_issue(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(patch): Json<IssuePatch>,
) -> ApiResult<Json<IssueSummary>> {
    Ok(Json(state.ctx.update_issue(id, patch).await?))
}

pub async fn delete_issue(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    state.ctx.delete_issue(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn move_to_sprint(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<MoveToSprintRequest>,
) -> ApiResult<Json<IssueSummary>> {
    Ok(Json(
        state.ctx.move_issue_to_sprint(id, payload.sprint_id).await?,
    ))
}

pub async fn move_to_backlog(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<MoveToBacklogRequest>,
) -> ApiResult<Json<IssueSummary>> {
    Ok(Json(
        state.ctx.move_issue_to_backlog(id, payload.backlog_id).await?,
    ))
}

pub async fn remove_from_backlog(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<IssueSummary>> {
    Ok(Json(state.ctx.remove_issue_from_backlog(id).await?))
}

pub async fn list_transitions(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<Vec<TransitionSummary>>> {
    Ok(Json(state.ctx.get_issue_transition_history(id).await?))
}

pub async fn list_user_issues(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<IssueSummary>>> {
    Ok(Json(state.ctx.get_issues_by_user(&user_id).await?))
}
