//! # Genetics Common Library
//!
//! Shared code for the genetics loader:
//! - Bootstrap configuration loading and validation
//! - Database connection bootstrap and schema
//! - Persisted models (entities, result records)

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
