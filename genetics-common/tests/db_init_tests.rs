//! Tests for database bootstrap
//!
//! - Schema creation on a fresh file
//! - Re-opening an existing database
//! - Refusing to open a missing database without --init-schema

use genetics_common::config::DatabaseConfig;
use genetics_common::db::{connect_database, create_schema, init_database};
use genetics_common::Error;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tempfile::TempDir;

async fn table_names(pool: &SqlitePool) -> Vec<String> {
    sqlx::query_scalar::<_, String>(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(pool)
    .await
    .unwrap()
}

#[tokio::test]
async fn test_database_creation_when_missing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested").join("records.db");

    let pool = init_database(&db_path, &DatabaseConfig::default()).await;

    assert!(pool.is_ok(), "Database initialization failed: {:?}", pool.err());
    assert!(db_path.exists(), "Database file was not created");

    let tables = table_names(&pool.unwrap()).await;
    assert_eq!(
        tables,
        vec!["entities", "order_items", "orders", "records", "sku_items"]
    );
}

#[tokio::test]
async fn test_database_opens_existing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("records.db");
    let config = DatabaseConfig::default();

    let pool1 = init_database(&db_path, &config).await.unwrap();
    sqlx::query("INSERT INTO sku_items (id, name) VALUES ('sku-1', 'Test Tube')")
        .execute(&pool1)
        .await
        .unwrap();
    pool1.close().await;

    // Second init must not drop or recreate existing data
    let pool2 = init_database(&db_path, &config).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sku_items")
        .fetch_one(&pool2)
        .await
        .unwrap();
    assert_eq!(count, 1);
    pool2.close().await;

    let pool3 = connect_database(&db_path, &config).await;
    assert!(pool3.is_ok(), "Failed to open existing database: {:?}", pool3.err());
}

#[tokio::test]
async fn test_connect_refuses_missing_database() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("absent.db");

    let result = connect_database(&db_path, &DatabaseConfig::default()).await;

    assert!(matches!(result, Err(Error::NotFound(_))));
    assert!(!db_path.exists(), "connect must not create the file");
}

#[tokio::test]
async fn test_create_schema_is_idempotent() {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    create_schema(&pool).await.unwrap();
    create_schema(&pool).await.unwrap();

    assert_eq!(table_names(&pool).await.len(), 5);
}
