use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

use crate::app_context::EpicSummary;
use crate::server::app::AppState;
use crate::server::error::ApiResult;
use crate::services::epic_service::{CreateEpic, EpicPatch};

pub async fn create_epic(
    State(state): State<AppState>,
    Json(payload): Json<CreateEpic>,
) -> ApiResult<(StatusCode, Json<EpicSummary>)> {
    let epic = state.ctx.create_epic(payload).await?;
    Ok((StatusCode::CREATED, Json(epic)))
}

pub async fn get_epic(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<EpicSummary>> {
    Ok(Json(state.ctx.get_epic(id).await?))
}

pub async fn list_backlog_epics(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<Vec<EpicSummary>>> {
    Ok(Json(state.ctx.get_backlog_epics(id).await?))
}

pub async fn update_epic(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<EpicPatch>,
) -> ApiResult<Json<EpicSummary>> {
    Ok(Json(state.ctx.update_epic(id, payload).await?))
}

pub async fn delete_epic(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    state.ctx.delete_epic(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
