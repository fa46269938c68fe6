pub mod app;
pub mod error;
pub mod handlers;

use std::sync::Arc;

use anyhow::Result;
use clap::Subcommand;
use sea_orm::DatabaseConnection;
use sea_orm_migration::prelude::*;
use tracing::{error, info};

use crate::app_context::AppContext;
use crate::config::AppConfig;
use crate::database::{connection::*, migrations::Migrator};
use crate::services::{AllowAllUsers, HttpUserDirectory, UserDirectory};

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum MigrateDirection {
    Up,
    Down,
    Fresh,
}

/// User directory selected by configuration.
pub fn user_directory(config: &AppConfig) -> Arc<dyn UserDirectory> {
    match &config.user_service_url {
        Some(url) => {
            info!("Verifying users against {}", url);
            Arc::new(HttpUserDirectory::new(
                url.clone(),
                config.user_lookup_timeout(),
            ))
        }
        None => Arc::new(AllowAllUsers),
    }
}

pub async fn connect(config: &AppConfig) -> Result<DatabaseConnection> {
    let database_url = get_database_url(Some(&config.database));
    Ok(establish_connection(&database_url).await?)
}

pub async fn start_server(config: &AppConfig) -> Result<()> {
    let db = connect(config).await?;

    // Run migrations
    Migrator::up(&db, None).await?;
    info!("Database migrations completed");

    let ctx = AppContext::new(db, user_directory(config));
    spawn_daily_metrics(ctx.clone(), config.daily_metrics_interval());

    let app = app::create_app(ctx, config.cors_origin.as_deref())?;

    log_routes();

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    info!("Server running on http://0.0.0.0:{}", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Runs the daily metrics batch on a fixed interval for the life of the
/// process.
fn spawn_daily_metrics(ctx: AppContext, period: std::time::Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // Skip the first immediate tick so startup is not delayed
        interval.tick().await;

        loop {
            interval.tick().await;
            match ctx.run_daily_metrics().await {
                Ok(summary) => info!(
                    "Daily metrics: {} sprints processed, {} failed",
                    summary.sprints_processed, summary.sprints_failed
                ),
                Err(e) => error!("Daily metrics batch failed: {}", e),
            }
        }
    });
}

fn log_routes() {
    info!("API Endpoints:");
    info!("  /health                     - Health check");
    info!("  /api/v1/projects            - Projects, product backlogs, stats");
    info!("  /api/v1/issues              - Issue store and placement");
    info!("  /api/v1/sprints             - Sprint lifecycle, reports, burndown");
    info!("  /api/v1/metrics             - Metric series");
}

pub async fn migrate_database(config: &AppConfig, direction: MigrateDirection) -> Result<()> {
    let db = connect(config).await?;

    match direction {
        MigrateDirection::Up => {
            info!("Running migrations up");
            Migrator::up(&db, None).await?;
        }
        MigrateDirection::Down => {
            info!("Running migrations down");
            Migrator::down(&db, None).await?;
        }
        MigrateDirection::Fresh => {
            info!("Running fresh migrations (down then up)");
            Migrator::down(&db, None).await?;
            Migrator::up(&db, None).await?;
        }
    }

    info!("Database migration completed");
    Ok(())
}
