//! genetics-loader - Load genetic test results from a lab CSV export
//!
//! Processes one file row by row and exits non-zero on the first error that
//! is not a deliberate skip.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use genetics_common::config::{LoaderConfig, Overrides};
use genetics_common::db::{connect_database, init_database};
use genetics_loader::{Ingestor, SqliteStore};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for genetics-loader
#[derive(Parser, Debug)]
#[command(name = "genetics-loader")]
#[command(about = "Load genetic test results from a lab CSV export into the record store")]
#[command(version)]
struct Args {
    /// CSV file to load (default: genetics_data.csv)
    input: Option<PathBuf>,

    /// SQLite database holding orders and records
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Create the database file and tables if they are missing
    #[arg(long)]
    init_schema: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let overrides = Overrides {
        config_file: args.config,
        input: args.input,
        database: args.database,
    };
    let config = LoaderConfig::resolve(&overrides).context("Failed to load configuration")?;

    // RUST_LOG wins over the configured level
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.logging.level)
            .with_context(|| format!("Invalid log level '{}'", config.logging.level))?,
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting genetics-loader v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    info!("Load Genetics Data from CSV: {}", config.input.display());
    info!("Database: {}", config.database_path.display());

    let pool = if args.init_schema {
        init_database(&config.database_path, &config.database).await
    } else {
        connect_database(&config.database_path, &config.database).await
    }
    .context("Failed to open database")?;

    let ingestor = Ingestor::new(SqliteStore::new(pool.clone()), &config.ingest);
    let result = ingestor
        .ingest_file(&config.input, &config.columns, config.ingest.has_headers)
        .await;

    pool.close().await;

    let summary =
        result.with_context(|| format!("Failed to load {}", config.input.display()))?;

    info!(
        ingested = summary.ingested,
        skipped = summary.rows_read - summary.ingested,
        "End CSV Load"
    );

    Ok(())
}
