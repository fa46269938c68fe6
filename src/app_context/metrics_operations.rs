use serde_json::Value;

use super::{AppContext, MetricSummary};
use crate::errors::CoreResult;
use crate::services::metrics_service::DailyMetricsSummary;

impl AppContext {
    // ----- Metric helpers --------------------------------------------------
    pub async fn record_sprint_metric(
        &self,
        sprint_id: i32,
        metric_type: &str,
        value: f64,
        context: Option<Value>,
    ) -> CoreResult<MetricSummary> {
        self.metrics_service
            .record_sprint_manual_metric(sprint_id, metric_type, value, context)
            .await
            .map(MetricSummary::from)
    }

    pub async fn record_project_metric(
        &self,
        project_id: i32,
        metric_type: &str,
        value: f64,
        context: Option<Value>,
    ) -> CoreResult<MetricSummary> {
        self.metrics_service
            .record_project_metric(project_id, metric_type, value, context)
            .await
            .map(MetricSummary::from)
    }

    pub async fn record_issue_metric(
        &self,
        issue_id: i32,
        metric_type: &str,
        value: f64,
        context: Option<Value>,
    ) -> CoreResult<MetricSummary> {
        self.metrics_service
            .record_issue_metric(issue_id, metric_type, value, context)
            .await
            .map(MetricSummary::from)
    }

    pub async fn get_sprint_metrics(
        &self,
        sprint_id: i32,
        metric_type: Option<&str>,
    ) -> CoreResult<Vec<MetricSummary>> {
        let metrics = self
            .metrics_service
            .get_sprint_metrics(sprint_id, metric_type)
            .await?;
        Ok(metrics.into_iter().map(MetricSummary::from).collect())
    }

    pub async fn get_project_metrics(
        &self,
        project_id: i32,
        metric_type: Option<&str>,
    ) -> CoreResult<Vec<MetricSummary>> {
        let metrics = self
            .metrics_service
            .get_project_metrics(project_id, metric_type)
            .await?;
        Ok(metrics.into_iter().map(MetricSummary::from).collect())
    }

    pub async fn get_issue_metrics(
        &self,
        issue_id: i32,
        metric_type: Option<&str>,
    ) -> CoreResult<Vec<MetricSummary>> {
        let metrics = self
            .metrics_service
            .get_issue_metrics(issue_id, metric_type)
            .await?;
        Ok(metrics.into_iter().map(MetricSummary::from).collect())
    }

    pub async fn run_daily_metrics(&self) -> CoreResult<DailyMetricsSummary> {
        self.metrics_service
            .calculate_daily_metrics_for_all_sprints()
            .await
    }
}
