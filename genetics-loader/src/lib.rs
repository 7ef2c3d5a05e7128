//! genetics-loader library interface
//!
//! Reads a lab CSV export of genetic test results and creates one
//! `GeneticResults` record per participant in the record store.

pub mod error;
pub mod ingest;
pub mod reader;
pub mod store;

pub use crate::error::{IngestError, IngestResult};
pub use crate::ingest::{IngestSummary, Ingestor, RowOutcome};
pub use crate::reader::{GeneticRow, GeneticsCsvReader, MarkerResult};
pub use crate::store::{RecordStore, SqliteStore, StoreTransaction};
