use anyhow::Result;
use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

use super::handlers::{backlogs, epics, health, issues, metrics, projects, sprints};
use crate::app_context::AppContext;

#[derive(Clone)]
pub struct AppState {
    pub ctx: AppContext,
}

pub fn create_app(ctx: AppContext, cors_origin: Option<&str>) -> Result<Router> {
    let state = AppState { ctx };

    let cors = match cors_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin.parse::<HeaderValue>()?)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    let app = Router::new()
        // Health check endpoint
        .route("/health", get(health::health_check))
        // API v1 routes
        .nest("/api/v1", api_v1_routes())
        // Add middleware
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(state);

    Ok(app)
}

fn api_v1_routes() -> Router<AppState> {
    Router::new()
        // Project routes
        .route(
            "/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route("/projects/:id", get(projects::get_project))
        .route("/projects/:id/stats", get(projects::get_project_stats))
        .route("/projects/:id/backlog", get(backlogs::get_backlog_by_project))
        .route("/projects/:id/sprints", get(sprints::list_project_sprints))
        .route(
            "/projects/:id/metrics",
            get(metrics::list_project_metrics).post(metrics::record_project_metric),
        )
        // Product backlog routes
        .route("/backlogs/:id", get(backlogs::get_backlog))
        .route("/backlogs/:id/issues", get(backlogs::list_backlog_issues))
        .route("/backlogs/:id/search", get(backlogs::search_backlog_issues))
        .route("/backlogs/:id/epics", get(epics::list_backlog_epics))
        // Epic routes
        .route("/epics", post(epics::create_epic))
        .route(
            "/epics/:id",
            get(epics::get_epic)
                .patch(epics::update_epic)
                .delete(epics::delete_epic),
        )
        // Issue routes
        .route("/issues", post(issues::create_issue))
        .route(
            "/issues/:id",
            get(issues::get_issue)
                .patch(issues::update_issue)
                .delete(issues::delete_issue),
        )
        .route("/issues/:id/move-to-sprint", post(issues::move_to_sprint))
        .route("/issues/:id/move-to-backlog", post(issues::move_to_backlog))
        .route(
            "/issues/:id/remove-from-backlog",
            post(issues::remove_from_backlog),
        )
        .route("/issues/:id/transitions", get(issues::list_transitions))
        .route(
            "/issues/:id/metrics",
            get(metrics::list_issue_metrics).post(metrics::record_issue_metric),
        )
        .route("/users/:user_id/issues", get(issues::list_user_issues))
        // Sprint routes
        .route("/sprints", post(sprints::create_sprint))
        .route(
            "/sprints/:id",
            get(sprints::get_sprint).patch(sprints::update_sprint),
        )
        .route("/sprints/:id/start", post(sprints::start_sprint))
        .route("/sprints/:id/complete", post(sprints::complete_sprint))
        .route(
            "/sprints/:id/issues",
            get(sprints::list_sprint_issues).post(sprints::add_issues),
        )
        .route("/sprints/:id/burndown", get(sprints::get_burndown))
        .route("/sprints/:id/report", post(sprints::generate_report))
        .route(
            "/sprints/:id/transitions/:to_id",
            get(sprints::list_transition_issues),
        )
        .route("/sprints/:id/moved-work/:to_id", get(sprints::get_moved_work))
        .route(
            "/sprints/:id/metrics",
            get(metrics::list_sprint_metrics).post(metrics::record_sprint_metric),
        )
}
