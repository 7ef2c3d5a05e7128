//! Database connection bootstrap and schema creation
//!
//! The record store normally already exists and is owned by other services;
//! `connect_database` opens it as-is. `init_database` additionally creates the
//! file and the tables the loader reads and writes, which is what local runs
//! and the test suites use.

use crate::config::DatabaseConfig;
use crate::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{ConnectOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Open an existing database
///
/// Fails with `NotFound` when the file does not exist; the schema is left
/// untouched.
pub async fn connect_database(db_path: &Path, config: &DatabaseConfig) -> Result<SqlitePool> {
    if !db_path.exists() {
        return Err(Error::NotFound(format!(
            "Database not found: {} (use --init-schema to create it)",
            db_path.display()
        )));
    }

    let pool = open_pool(db_path, config, false).await?;
    info!("Opened existing database: {}", db_path.display());

    Ok(pool)
}

/// Open or create a database and ensure the loader schema exists
pub async fn init_database(db_path: &Path, config: &DatabaseConfig) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let pool = open_pool(db_path, config, true).await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

async fn open_pool(db_path: &Path, config: &DatabaseConfig, create: bool) -> Result<SqlitePool> {
    let mut options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(create)
        .foreign_keys(true);

    if !config.log_statements {
        options = options.disable_statement_logging();
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Create all loader tables (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_sku_items_table(pool).await?;
    create_orders_table(pool).await?;
    create_order_items_table(pool).await?;
    create_entities_table(pool).await?;
    create_records_table(pool).await?;

    info!("Database schema ready (sku_items, orders, order_items, entities, records)");
    Ok(())
}

async fn create_sku_items_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sku_items (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_orders_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS orders (
            id TEXT PRIMARY KEY,
            participant_id TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_order_items_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS order_items (
            id TEXT PRIMARY KEY,
            order_id TEXT NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
            sku_item_id TEXT NOT NULL REFERENCES sku_items(id),
            tracking_value TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_order_items_tracking_value ON order_items(tracking_value)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_entities_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS entities (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            default_meta TEXT NOT NULL DEFAULT '{}',
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_records_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS records (
            id TEXT PRIMARY KEY,
            entity_id TEXT NOT NULL REFERENCES entities(id),
            user_id TEXT NOT NULL,
            record_at TIMESTAMP NOT NULL,
            meta TEXT NOT NULL DEFAULT '{}',
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_records_user_entity ON records(user_id, entity_id)")
        .execute(pool)
        .await?;

    Ok(())
}
