//! Error types for genetics-loader
//!
//! Input errors (extension, I/O, CSV structure, row width, date) and store
//! errors (query, transaction, insert, missing entity) are all fatal to the
//! run. Business skips are not errors and never appear here.

use std::path::PathBuf;
use thiserror::Error;

/// Loader error type
#[derive(Debug, Error)]
pub enum IngestError {
    /// Input file does not carry the expected extension
    #[error("Input file is not .csv: {}", path.display())]
    InvalidFormat { path: PathBuf },

    /// File could not be opened or read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Structurally malformed CSV (quoting, encoding)
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Row has fewer fields than the column schema needs
    #[error("Malformed row at line {line}: {fields} fields, at least {required} required")]
    MalformedRow {
        line: u64,
        fields: usize,
        required: usize,
    },

    /// Date column does not match the configured format exactly
    #[error("Invalid date '{value}' at line {line}, expected format {format}")]
    InvalidDate {
        line: u64,
        value: String,
        format: String,
    },

    /// Entity template is not provisioned in the store
    #[error("Entity definition not found: {0}")]
    EntityNotFound(String),

    /// Stored value could not be interpreted
    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    /// Query, transaction or insert failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Metadata payload (de)serialization failure
    #[error("Metadata error: {0}")]
    Metadata(#[from] serde_json::Error),

    /// genetics-common error
    #[error("Common error: {0}")]
    Common(#[from] genetics_common::Error),
}

/// Convenience Result type using IngestError
pub type IngestResult<T> = std::result::Result<T, IngestError>;
