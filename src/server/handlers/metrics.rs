use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::Value;

use crate::app_context::MetricSummary;
use crate::server::app::AppState;
use crate::server::error::ApiResult;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetricRequest {
    pub metric_type: String,
    pub value: f64,
    pub context: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricQuery {
    pub metric_type: Option<String>,
}

pub async fn record_sprint_metric(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<RecordMetricRequest>,
) -> ApiResult<(StatusCode, Json<MetricSummary>)> {
    let metric = state
        .ctx
        .record_sprint_metric(id, &payload.metric_type, payload.value, payload.context)
        .await?;
    Ok((StatusCode::CREATED, Json(metric)))
}

pub async fn list_sprint_metrics(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<MetricQuery>,
) -> ApiResult<Json<Vec<MetricSummary>>> {
    Ok(Json(
        state
            .ctx
            .get_sprint_metrics(id, query.metric_type.as_deref())
            .await?,
    ))
}

pub async fn record_project_metric(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<RecordMetricRequest>,
) -> ApiResult<(StatusCode, Json<MetricSummary>)> {
    let metric = state
        .ctx
        .record_project_metric(id, &payload.metric_type, payload.value, payload.context)
        .await?;
    Ok((StatusCode::CREATED, Json(metric)))
}

pub async fn list_project_metrics(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<MetricQuery>,
) -> ApiResult<Json<Vec<MetricSummary>>> {
    Ok(Json(
        state
            .ctx
            .get_project_metrics(id, query.metric_type.as_deref())
            .await?,
    ))
}

pub async fn record_issue_metric(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<RecordMetricRequest>,
) -> ApiResult<(StatusCode, Json<MetricSummary>)> {
    let metric = state
        .ctx
        .record_issue_metric(id, &payload.metric_type, payload.value, payload.context)
        .await?;
    Ok((StatusCode::CREATED, Json(metric)))
}

pub async fn list_issue_metrics(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<MetricQuery>,
) -> ApiResult<Json<Vec<MetricSummary>>> {
    Ok(Json(
        state
            .ctx
            .get_issue_metrics(id, query.metric_type.as_deref())
            .await?,
    ))
}
