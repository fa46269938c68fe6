use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use sprintline::app_context::AppContext;
use sprintline::config::AppConfig;
use sprintline::database::{seed_data, setup_database};
use sprintline::server;

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    #[clap(short, long, global = true)]
    log_level: Option<String>,
    /// TOML configuration file
    #[clap(short, long, global = true)]
    config: Option<PathBuf>,
    /// Database file, overriding configuration
    #[clap(short, long, global = true)]
    database: Option<String>,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Serve {
        #[clap(short, long)]
        port: Option<u16>,
        #[clap(long)]
        cors_origin: Option<String>,
    },
    Db {
        #[clap(subcommand)]
        command: DbCommands,
    },
    Metrics {
        #[clap(subcommand)]
        command: MetricsCommands,
    },
}

#[derive(Subcommand, Debug)]
enum DbCommands {
    Init {
        /// Create an example project with a running sprint
        #[clap(long)]
        seed: bool,
    },
    Migrate {
        #[clap(subcommand)]
        direction: server::MigrateDirection,
    },
}

#[derive(Subcommand, Debug)]
enum MetricsCommands {
    /// Record daily snapshots for every running sprint once
    Daily,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    setup_logging(&args.log_level);

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(database) = args.database {
        config.database = database;
    }

    match args.command {
        Commands::Serve { port, cors_origin } => {
            if let Some(port) = port {
                config.port = port;
            }
            if cors_origin.is_some() {
                config.cors_origin = cors_origin;
            }
            info!("Starting server on port {}", config.port);
            server::start_server(&config).await?;
        }
        Commands::Db { command } => match command {
            DbCommands::Init { seed } => {
                info!("Initializing database: {}", config.database);
                let db = server::connect(&config).await?;
                setup_database(&db).await?;
                if seed {
                    let ctx = AppContext::new(db, server::user_directory(&config));
                    seed_data::create_example_project(&ctx).await?;
                }
            }
            DbCommands::Migrate { direction } => {
                info!("Running database migration: {:?}", direction);
                server::migrate_database(&config, direction).await?;
            }
        },
        Commands::Metrics { command } => match command {
            MetricsCommands::Daily => {
                let db = server::connect(&config).await?;
                setup_database(&db).await?;
                let ctx = AppContext::new(db, server::user_directory(&config));
                let summary = ctx.run_daily_metrics().await?;
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
        },
    }

    Ok(())
}

fn setup_logging(log_level: &Option<String>) {
    let log_level = match log_level
        .as_ref()
        .unwrap_or(&"info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!("sqlx=warn,{}", log_level)))
        .without_time()
        .init();
}
