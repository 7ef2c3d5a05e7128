//! SQLite implementation of the record store
//!
//! Each transaction logs how long it held its connection, warning on
//! transactions held longer than two seconds.

use super::{InsertOutcome, ParticipantLookup, RecordStore, StoreTransaction};
use crate::error::{IngestError, IngestResult};
use async_trait::async_trait;
use genetics_common::db::{EntityDefinition, ParticipantId, ResultRecord};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use std::time::Instant;
use uuid::Uuid;

/// Record store backed by a SQLite pool
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    type Transaction = SqliteTransaction;

    async fn begin(&self) -> IngestResult<SqliteTransaction> {
        let start = Instant::now();
        let tx = self.pool.begin().await?;

        tracing::debug!(
            wait_ms = start.elapsed().as_millis() as u64,
            "Transaction started"
        );

        Ok(SqliteTransaction {
            tx,
            acquired_at: Instant::now(),
        })
    }
}

/// One open SQLite transaction
///
/// Dropping it without commit rolls back.
pub struct SqliteTransaction {
    tx: Transaction<'static, Sqlite>,
    acquired_at: Instant,
}

impl SqliteTransaction {
    fn log_release(&self, how: &'static str) {
        let held_ms = self.acquired_at.elapsed().as_millis() as u64;
        if held_ms > 2000 {
            tracing::warn!(
                held_ms = held_ms,
                "LONG TRANSACTION - Connection held for extended period before {}",
                how
            );
        } else {
            tracing::debug!(held_ms = held_ms, "Connection released ({})", how);
        }
    }
}

#[async_trait]
impl StoreTransaction for SqliteTransaction {
    async fn resolve_participant(
        &mut self,
        container_id: &str,
        container_sku: &str,
    ) -> IngestResult<ParticipantLookup> {
        let rows: Vec<Option<String>> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT o.participant_id
            FROM orders o
            JOIN order_items oi ON oi.order_id = o.id
            JOIN sku_items si ON oi.sku_item_id = si.id
            WHERE si.name = ?
              AND oi.tracking_value = ?
            "#,
        )
        .bind(container_sku)
        .bind(container_id)
        .fetch_all(&mut *self.tx)
        .await?;

        let mut participants: Vec<ParticipantId> =
            rows.into_iter().flatten().map(ParticipantId::new).collect();

        Ok(match participants.len() {
            0 => ParticipantLookup::NotFound,
            1 => ParticipantLookup::Found(participants.remove(0)),
            _ => ParticipantLookup::Ambiguous(participants),
        })
    }

    async fn record_exists(
        &mut self,
        participant: &ParticipantId,
        entity_name: &str,
    ) -> IngestResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1
                FROM records r
                JOIN entities e ON r.entity_id = e.id
                WHERE e.name = ? AND r.user_id = ?
            )
            "#,
        )
        .bind(entity_name)
        .bind(participant.as_str())
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(exists)
    }

    async fn find_entity_by_name(&mut self, name: &str) -> IngestResult<Option<EntityDefinition>> {
        let row = sqlx::query("SELECT id, name, default_meta FROM entities WHERE name = ?")
            .bind(name)
            .fetch_optional(&mut *self.tx)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id_str: String = row.try_get("id")?;
        let id = Uuid::parse_str(&id_str)
            .map_err(|e| IngestError::InvalidData(format!("entity id '{}': {}", id_str, e)))?;
        let default_meta: String = row.try_get("default_meta")?;

        Ok(Some(EntityDefinition {
            id,
            name: row.try_get("name")?,
            default_meta: serde_json::from_str(&default_meta)?,
        }))
    }

    async fn insert_record(&mut self, record: &ResultRecord) -> IngestResult<InsertOutcome> {
        let meta = serde_json::to_string(&record.meta)?;

        let result = sqlx::query(
            r#"
            INSERT INTO records (id, entity_id, user_id, record_at, meta, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.entity_id.to_string())
        .bind(record.user_id.as_str())
        .bind(record.record_at)
        .bind(meta)
        .execute(&mut *self.tx)
        .await;

        match result {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Ok(InsertOutcome::Conflict)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn commit(self) -> IngestResult<()> {
        self.log_release("commit");
        // A failed COMMIT leaves the transaction open; sqlx queues a rollback
        // when the dropped transaction is still open
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> IngestResult<()> {
        self.log_release("rollback");
        self.tx.rollback().await?;
        Ok(())
    }
}
