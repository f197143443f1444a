//! # Alertsync Main Entry Point
//!
//! Command-line entry point for the alert binding synchronization engine:
//! run the periodic scheduler, execute one sync pass, or apply migrations.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use alertsync::config::ConfigLoader;
use alertsync::ingest::NullContentStore;
use alertsync::migration::{Migrator, MigratorTrait};
use alertsync::provider::HttpAlertProvider;
use alertsync::sync_runner::SyncRunner;
use alertsync::{db, telemetry};

#[derive(Parser)]
#[command(name = "alertsync", about = "Alert binding synchronization engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the periodic sync scheduler until interrupted
    Serve,
    /// Execute a single sync pass and exit
    SyncOnce {
        /// Restrict the pass to one connector grouping
        #[arg(long)]
        connector_id: Option<Uuid>,
    },
    /// Apply pending database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = Arc::new(ConfigLoader::new().load()?);
    telemetry::init_tracing(&config)?;

    tracing::info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted) = config.redacted_json() {
        tracing::debug!(config = %redacted, "Effective configuration");
    }

    let db = db::init_pool(&config).await?;

    match cli.command {
        Command::Migrate => {
            Migrator::up(&db, None).await?;
            tracing::info!("Migrations applied");
        }
        Command::SyncOnce { connector_id } => {
            Migrator::up(&db, None).await?;
            let runner = build_runner(&config, db)?;
            let summary = runner.run_connector_sync(connector_id).await?;
            tracing::info!(
                run_id = %summary.run_id,
                bindings_processed = summary.bindings_processed,
                pages_fetched = summary.pages_fetched,
                errors = summary.error_count,
                "Sync pass finished"
            );
        }
        Command::Serve => {
            Migrator::up(&db, None).await?;
            let runner = build_runner(&config, db)?;

            let shutdown = CancellationToken::new();
            let signal_token = shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Shutdown signal received");
                    signal_token.cancel();
                }
            });

            runner.run_scheduler(shutdown).await;
        }
    }

    Ok(())
}

fn build_runner(
    config: &Arc<alertsync::config::AppConfig>,
    db: sea_orm::DatabaseConnection,
) -> Result<SyncRunner, Box<dyn std::error::Error>> {
    let provider = Arc::new(HttpAlertProvider::from_config(config)?);
    Ok(SyncRunner::new(
        config.clone(),
        db,
        provider,
        Arc::new(NullContentStore),
    ))
}
