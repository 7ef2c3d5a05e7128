//! Test Helper Utilities
//!
//! Shared utilities for testing genetics-loader

#![allow(dead_code)]

pub mod db_utils;
pub mod log_capture;

pub use db_utils::{
    create_test_db, lab_line, record_count, seed_container, seed_entity, seed_record, write_csv,
};
pub use log_capture::LogCapture;
