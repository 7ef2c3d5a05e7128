//! Row-to-record reconciliation
//!
//! **Per row, inside one transaction:**
//! 1. Resolve the participant owning the container (skip if none)
//! 2. Check for an existing record of the entity (skip if present)
//! 3. Look up the entity template (fatal if missing)
//! 4. Build the record: row date as timestamp, `{"results": {...}}` as metadata
//! 5. Insert, then commit
//!
//! Every skip and every failure rolls the transaction back before returning.
//! The first failure aborts the run; rows after it are left untouched.

use crate::error::{IngestError, IngestResult};
use crate::reader::{GeneticRow, GeneticsCsvReader};
use crate::store::{InsertOutcome, ParticipantLookup, RecordStore, StoreTransaction};
use chrono::NaiveTime;
use genetics_common::config::{ColumnSchema, IngestConfig};
use genetics_common::db::{ParticipantId, ResultRecord};
use serde_json::{json, Map, Value};
use std::path::Path;
use tracing::{info, warn};

/// What happened to one row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    /// A new record was committed
    Ingested(ParticipantId),
    /// No participant owns the container
    NoParticipant,
    /// Several participants matched the container
    AmbiguousParticipant(Vec<ParticipantId>),
    /// The participant already has a record of this entity
    AlreadyExists(ParticipantId),
}

/// Per-run counters, logged when the run ends
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub rows_read: u64,
    pub ingested: u64,
    pub skipped_no_participant: u64,
    pub skipped_ambiguous: u64,
    pub skipped_existing: u64,
}

impl IngestSummary {
    fn record(&mut self, outcome: &RowOutcome) {
        self.rows_read += 1;
        match outcome {
            RowOutcome::Ingested(_) => self.ingested += 1,
            RowOutcome::NoParticipant => self.skipped_no_participant += 1,
            RowOutcome::AmbiguousParticipant(_) => self.skipped_ambiguous += 1,
            RowOutcome::AlreadyExists(_) => self.skipped_existing += 1,
        }
    }
}

/// Runs the reconciliation procedure against a record store
pub struct Ingestor<S> {
    store: S,
    entity_name: String,
    container_sku: String,
}

impl<S: RecordStore> Ingestor<S> {
    pub fn new(store: S, config: &IngestConfig) -> Self {
        Self {
            store,
            entity_name: config.entity_name.clone(),
            container_sku: config.container_sku.clone(),
        }
    }

    /// Ingest every row of the CSV file at `path`
    pub async fn ingest_file(
        &self,
        path: &Path,
        schema: &ColumnSchema,
        has_headers: bool,
    ) -> IngestResult<IngestSummary> {
        let reader = GeneticsCsvReader::open(path, schema.clone(), has_headers)?;
        info!(file = %path.display(), "Reading genetic results");
        self.ingest_rows(reader).await
    }

    /// Process rows in order until the input ends or a row fails
    pub async fn ingest_rows<I>(&self, rows: I) -> IngestResult<IngestSummary>
    where
        I: IntoIterator<Item = IngestResult<GeneticRow>>,
    {
        let mut summary = IngestSummary::default();

        for row in rows {
            let row = row?;
            let outcome = self.process_row(&row).await?;
            summary.record(&outcome);
        }

        info!(
            rows_read = summary.rows_read,
            ingested = summary.ingested,
            skipped_no_participant = summary.skipped_no_participant,
            skipped_ambiguous = summary.skipped_ambiguous,
            skipped_existing = summary.skipped_existing,
            "Ingestion run complete"
        );

        Ok(summary)
    }

    /// Reconcile one row inside its own transaction
    pub async fn process_row(&self, row: &GeneticRow) -> IngestResult<RowOutcome> {
        let mut tx = self.store.begin().await?;

        let participant = match self.reconcile(&mut tx, row).await {
            Ok(Step::Write(participant)) => participant,
            Ok(Step::Skip(outcome)) => {
                tx.rollback().await?;
                return Ok(outcome);
            }
            Err(e) => {
                rollback_after_failure(tx, row).await;
                return Err(e);
            }
        };

        tx.commit().await?;

        info!(
            container_id = %row.container_id,
            user_id = %participant,
            "Successful ingestion of {} record for container {}",
            self.entity_name,
            row.container_id
        );

        Ok(RowOutcome::Ingested(participant))
    }

    async fn reconcile(
        &self,
        tx: &mut S::Transaction,
        row: &GeneticRow,
    ) -> IngestResult<Step> {
        let participant = match tx
            .resolve_participant(&row.container_id, &self.container_sku)
            .await?
        {
            ParticipantLookup::Found(participant) => participant,
            ParticipantLookup::NotFound => {
                info!(
                    container_id = %row.container_id,
                    line = row.line,
                    "Skipping row: no participant found in orders for container {}",
                    row.container_id
                );
                return Ok(Step::Skip(RowOutcome::NoParticipant));
            }
            ParticipantLookup::Ambiguous(participants) => {
                warn!(
                    container_id = %row.container_id,
                    line = row.line,
                    matches = participants.len(),
                    "Skipping row: container {} matches more than one participant",
                    row.container_id
                );
                return Ok(Step::Skip(RowOutcome::AmbiguousParticipant(participants)));
            }
        };

        if tx.record_exists(&participant, &self.entity_name).await? {
            info!(
                container_id = %row.container_id,
                user_id = %participant,
                "Skipping row: {} record already exists for container {}",
                self.entity_name,
                row.container_id
            );
            return Ok(Step::Skip(RowOutcome::AlreadyExists(participant)));
        }

        let entity = tx
            .find_entity_by_name(&self.entity_name)
            .await?
            .ok_or_else(|| IngestError::EntityNotFound(self.entity_name.clone()))?;

        let mut record = ResultRecord::from_entity(&entity, participant.clone());
        record.record_at = row.date.and_time(NaiveTime::MIN).and_utc();
        record.meta = results_meta(row);

        match tx.insert_record(&record).await? {
            InsertOutcome::Inserted => Ok(Step::Write(participant)),
            InsertOutcome::Conflict => {
                info!(
                    container_id = %row.container_id,
                    user_id = %participant,
                    "Skipping row: {} record already exists for container {} (insert conflict)",
                    self.entity_name,
                    row.container_id
                );
                Ok(Step::Skip(RowOutcome::AlreadyExists(participant)))
            }
        }
    }
}

enum Step {
    Write(ParticipantId),
    Skip(RowOutcome),
}

/// Metadata payload: `{"results": {<marker key>: <value>, ...}}`
pub fn results_meta(row: &GeneticRow) -> Value {
    let results: Map<String, Value> = row
        .markers
        .iter()
        .map(|m| (m.key.clone(), Value::String(m.value.clone())))
        .collect();

    json!({ "results": results })
}

/// Roll back on a failure path, keeping the original error as the one reported
async fn rollback_after_failure<T: StoreTransaction>(tx: T, row: &GeneticRow) {
    if let Err(e) = tx.rollback().await {
        warn!(
            container_id = %row.container_id,
            line = row.line,
            "Rollback after failure also failed: {}",
            e
        );
    }
}
