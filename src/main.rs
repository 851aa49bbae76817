use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cs_night_stats::api::state::AppState;
use cs_night_stats::config::AppConfig;
use cs_night_stats::generate::GenerationCoordinator;
use cs_night_stats::pipeline::{load_season_settings, regenerate, standings_report};
use cs_night_stats::source::postgres::PgQuerySource;
use cs_night_stats::storage::StorageConfig;

#[derive(Parser)]
#[command(name = "cs-night-stats")]
#[command(about = "Counter-Strike night stats and All-Stars league standings")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: PathBuf,

    /// Data directory path (overrides the config file)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); defaults to the config file's
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Regenerate the stats snapshot from the database
    Generate {
        /// Only rebuild season and last-10 averages
        #[arg(long)]
        aggregates_only: bool,
    },

    /// Print All-Stars standings from the current snapshot
    Standings {
        /// Only count the first N All-Stars nights
        #[arg(long)]
        up_to_night: Option<usize>,

        /// Only print this league
        #[arg(long)]
        league: Option<String>,
    },

    /// Print season starts and windows
    Seasons,

    /// Start the API server
    Serve {
        /// Bind address (overrides the config file)
        #[arg(long)]
        host: Option<String>,

        /// Port number (overrides the config file)
        #[arg(long)]
        port: Option<u16>,
    },
}

fn init_tracing(level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn coordinator(config: &AppConfig) -> Result<GenerationCoordinator> {
    let source = PgQuerySource::connect(&config.database)
        .await
        .context("Failed to connect to the stats database")?;
    Ok(GenerationCoordinator::new(Arc::new(source)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    init_tracing(cli.log_level.as_deref().unwrap_or(&config.log_level), cli.json_logs);
    tracing::info!("Starting cs-night-stats v{}", env!("CARGO_PKG_VERSION"));

    let storage = StorageConfig::new(config.data_dir.clone());
    let default_starts = config.seasons.parsed_starts()?;

    match cli.command {
        Commands::Generate { aggregates_only } => {
            let coordinator = coordinator(&config).await?;
            let bundle = regenerate(&storage, &coordinator, &default_starts, aggregates_only).await?;

            for error in &bundle.errors {
                tracing::warn!("{} failed: {}", error.dataset, error.error);
            }
            tracing::info!(
                "Snapshot written to {:?} ({} datasets, {} failed)",
                storage.snapshot_dir(),
                bundle.produced().len(),
                bundle.errors.len()
            );
        }
        Commands::Standings {
            up_to_night,
            league,
        } => {
            let mut report = standings_report(&storage, &default_starts, up_to_night)?;
            if let Some(league) = league {
                report.leagues.retain(|id, _| *id == league);
                if report.leagues.is_empty() {
                    anyhow::bail!("Unknown league: {}", league);
                }
            }
            for warning in &report.warnings {
                tracing::warn!("{}", warning);
            }
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Seasons => {
            let settings = load_season_settings(&storage, &default_starts)?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);

            let state = AppState::new(
                storage,
                coordinator(&config).await?,
                default_starts,
                config.server.cors_origin.clone(),
            );
            let app = cs_night_stats::api::build_router(state);
            let addr = format!("{}:{}", host, port);
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!("Listening on http://{}", addr);
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
