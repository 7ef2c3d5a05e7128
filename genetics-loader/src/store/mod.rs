//! Record store collaborator
//!
//! The reconciliation procedure only talks to the store through these two
//! traits: a store hands out transactions, and every read and write for one
//! CSV row goes through a single transaction.

pub mod sqlite;

use crate::error::IngestResult;
use async_trait::async_trait;
use genetics_common::db::{EntityDefinition, ParticipantId, ResultRecord};

pub use sqlite::{SqliteStore, SqliteTransaction};

/// Outcome of resolving a container identifier to a participant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticipantLookup {
    /// Exactly one participant owns the container
    Found(ParticipantId),
    /// No order item carries the container identifier
    NotFound,
    /// More than one distinct participant matched
    Ambiguous(Vec<ParticipantId>),
}

/// Outcome of inserting a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// Rejected by a storage-level uniqueness constraint
    Conflict,
}

/// Source of per-row transactions
#[async_trait]
pub trait RecordStore: Send + Sync {
    type Transaction: StoreTransaction;

    /// Open a new transaction
    async fn begin(&self) -> IngestResult<Self::Transaction>;
}

/// Reads and writes scoped to one transaction
#[async_trait]
pub trait StoreTransaction: Send {
    /// Find the participant owning the order item with `container_sku` whose
    /// tracking value is `container_id`
    async fn resolve_participant(
        &mut self,
        container_id: &str,
        container_sku: &str,
    ) -> IngestResult<ParticipantLookup>;

    /// Whether `participant` already has a record of the named entity
    async fn record_exists(
        &mut self,
        participant: &ParticipantId,
        entity_name: &str,
    ) -> IngestResult<bool>;

    /// Fetch an entity definition by name
    async fn find_entity_by_name(&mut self, name: &str) -> IngestResult<Option<EntityDefinition>>;

    /// Insert a new record
    async fn insert_record(&mut self, record: &ResultRecord) -> IngestResult<InsertOutcome>;

    /// Commit all work
    ///
    /// If the commit fails the transaction is rolled back before the error
    /// is returned, so nothing is persisted and the connection is left clean.
    async fn commit(self) -> IngestResult<()>;

    /// Discard all work
    async fn rollback(self) -> IngestResult<()>;
}
