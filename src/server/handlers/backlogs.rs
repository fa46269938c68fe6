use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;

use crate::app_context::{BacklogSummary, IssueSummary};
use crate::database::entities::{IssueStatus, IssueType};
use crate::server::app::AppState;
use crate::server::error::ApiResult;

#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    pub status: Option<IssueStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TypeQuery {
    #[serde(rename = "type")]
    pub issue_type: Option<IssueType>,
}

pub async fn get_backlog(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<BacklogSummary>> {
    Ok(Json(state.ctx.get_product_backlog(id).await?))
}

pub async fn get_backlog_by_project(
    State(state): State<AppState>,
    Path(project_id): Path<i32>,
) -> ApiResult<Json<BacklogSummary>> {
    Ok(Json(
        state.ctx.get_product_backlog_by_project(project_id).await?,
    ))
}

pub async fn list_backlog_issues(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<StatusQuery>,
) -> ApiResult<Json<Vec<IssueSummary>>> {
    Ok(Json(state.ctx.get_backlog_issues(id, query.status).await?))
}

pub async fn search_backlog_issues(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<TypeQuery>,
) -> ApiResult<Json<Vec<IssueSummary>>> {
    Ok(Json(
        state.ctx.search_backlog_issues(id, query.issue_type).await?,
    ))
}
