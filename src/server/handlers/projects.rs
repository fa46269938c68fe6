use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

use crate::app_context::{ProjectCreated, ProjectSummary};
use crate::server::app::AppState;
use crate::server::error::ApiResult;
use crate::services::product_backlog_service::ProjectStats;
use crate::services::project_service::CreateProject;

pub async fn list_projects(State(state): State<AppState>) -> ApiResult<Json<Vec<ProjectSummary>>> {
    Ok(Json(state.ctx.list_projects().await?))
}

pub async fn create_project(
    State(state): State<AppState>,
    Json(payload): Json<CreateProject>,
) -> ApiResult<(StatusCode, Json<ProjectCreated>)> {
    let created = state.ctx.create_project(payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<ProjectSummary>> {
    Ok(Json(state.ctx.get_project(id).await?))
}

pub async fn get_project_stats(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<ProjectStats>> {
    Ok(Json(state.ctx.get_project_stats(id).await?))
}
