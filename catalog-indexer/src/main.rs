//! Catalog Indexer Main Entry Point
//!
//! Usage:
//!
//! - `catalog-indexer`: stream changes from Kafka into the search index
//! - `catalog-indexer resync`: rewrite every model document from the catalog
//! - `catalog-indexer reset-index`: drop and recreate the search index

use catalog_indexer::{Dependencies, IndexerSettings, IndexingError};
use catalog_indexer_repository::SearchIndexProvider;
use dotenv::dotenv;
use std::env;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Sub-command selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Sync,
    Resync,
    ResetIndex,
}

impl Command {
    fn from_args() -> Result<Self, IndexingError> {
        match env::args().nth(1).as_deref() {
            None | Some("sync") => Ok(Self::Sync),
            Some("resync") => Ok(Self::Resync),
            Some("reset-index") => Ok(Self::ResetIndex),
            Some(other) => Err(IndexingError::config(format!(
                "Unknown command '{}', expected one of: sync, resync, reset-index",
                other
            ))),
        }
    }
}

/// Initialize tracing/logging.
fn init_tracing() -> Result<(), IndexingError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("catalog_indexer=info,catalog_indexer_repository=info")
    });

    let json_output = env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_output {
        // Structured logging for log shippers
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .try_init()
            .map_err(|e| IndexingError::config(format!("Failed to init tracing: {}", e)))?;

        info!(
            service_name = "catalog-indexer",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with JSON format"
        );
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
            .try_init()
            .map_err(|e| IndexingError::config(format!("Failed to init tracing: {}", e)))?;

        info!(
            service_name = "catalog-indexer",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with console output"
        );
    }

    Ok(())
}

async fn run_sync(settings: &IndexerSettings) -> Result<(), IndexingError> {
    let deps = Dependencies::new(settings).await?;
    info!("Dependencies initialized successfully");

    deps.orchestrator.run().await?;
    info!("Catalog indexer completed successfully");
    Ok(())
}

async fn run_resync(settings: &IndexerSettings) -> Result<(), IndexingError> {
    let resync = Dependencies::full_resync(settings).await?;
    let report = resync.run().await?;

    if report.failed > 0 {
        error!(failed = report.failed, "Resync finished with failures");
    }
    Ok(())
}

async fn run_reset_index(settings: &IndexerSettings) -> Result<(), IndexingError> {
    let search_index = Dependencies::connect_search_index(settings).await?;
    search_index
        .reset_index()
        .await
        .map_err(|e| IndexingError::config(format!("Failed to reset index: {}", e)))?;

    info!(
        index = %settings.index_config.versioned_index_name(),
        alias = %settings.index_config.alias,
        "Index reset, run `resync` to repopulate it"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), IndexingError> {
    // Load environment variables from .env file
    dotenv().ok();

    init_tracing()?;

    let command = Command::from_args()?;
    info!(command = ?command, "Starting catalog indexer");

    let settings = IndexerSettings::from_env()?;

    let result = match command {
        Command::Sync => run_sync(&settings).await,
        Command::Resync => run_resync(&settings).await,
        Command::ResetIndex => run_reset_index(&settings).await,
    };

    if let Err(e) = &result {
        error!(error = %e, command = ?command, "Catalog indexer failed");
    }
    result
}
