//! Database and input fixtures

use genetics_common::config::DatabaseConfig;
use genetics_common::db::init_database;
use sqlx::SqlitePool;
use std::io::Write;
use std::path::PathBuf;
use tempfile::TempDir;
use uuid::Uuid;

/// SKU name the loader resolves containers through
pub const TEST_TUBE_SKU_ID: &str = "sku-test-tube";

/// Create temporary test database with the loader schema
///
/// Returns (TempDir, SqlitePool) - TempDir must be kept alive for duration of test
pub async fn create_test_db() -> (TempDir, SqlitePool) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("records.db");

    let pool = init_database(&db_path, &DatabaseConfig::default())
        .await
        .unwrap();

    sqlx::query("INSERT INTO sku_items (id, name) VALUES (?, 'Test Tube'), ('sku-kit-box', 'Kit Box')")
        .bind(TEST_TUBE_SKU_ID)
        .execute(&pool)
        .await
        .unwrap();

    (temp_dir, pool)
}

/// Insert an entity definition and return its id
pub async fn seed_entity(pool: &SqlitePool, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO entities (id, name, default_meta) VALUES (?, ?, '{}')")
        .bind(id.to_string())
        .bind(name)
        .execute(pool)
        .await
        .unwrap();
    id
}

/// Create an order for `participant` with a test tube tracked as `container`
pub async fn seed_container(pool: &SqlitePool, container: &str, participant: &str) {
    let order_id = Uuid::new_v4().to_string();
    sqlx::query("INSERT INTO orders (id, participant_id) VALUES (?, ?)")
        .bind(&order_id)
        .bind(participant)
        .execute(pool)
        .await
        .unwrap();

    sqlx::query(
        "INSERT INTO order_items (id, order_id, sku_item_id, tracking_value) VALUES (?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&order_id)
    .bind(TEST_TUBE_SKU_ID)
    .bind(container)
    .execute(pool)
    .await
    .unwrap();
}

/// Insert an existing record for `participant`
pub async fn seed_record(pool: &SqlitePool, entity_id: Uuid, participant: &str) {
    sqlx::query(
        "INSERT INTO records (id, entity_id, user_id, record_at, meta) VALUES (?, ?, ?, '2022-01-01 00:00:00+00:00', '{}')",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(entity_id.to_string())
    .bind(participant)
    .execute(pool)
    .await
    .unwrap();
}

pub async fn record_count(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM records")
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Build a 25-column lab export line with the mapped columns filled in
pub fn lab_line(container: &str, fto: &str, mc4r: &str, drd2: &str, date: &str) -> String {
    let mut fields = vec![String::from("n/a"); 25];
    fields[0] = "LAB-42".to_string();
    fields[1] = container.to_string();
    fields[8] = fto.to_string();
    fields[15] = mc4r.to_string();
    fields[22] = drd2.to_string();
    fields[24] = date.to_string();
    fields.join(",")
}

pub fn write_csv(dir: &TempDir, name: &str, lines: &[String]) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    path
}
