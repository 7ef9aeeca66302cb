//! Core domain logic
//!
//! # Architecture
//!
//! - **config**: Configuration loading (TOML + environment)
//! - **error**: Error types and Result alias
//! - **types**: Documents, build states and reports
//! - **record**: Element trees, path expressions, schema families
//! - **normalize**: Raw values to index strings
//! - **fields**: Queryable field sets per family
//! - **catalog**: SQLite identifier to location store
//! - **source**: Where builds take their records from
//! - **storage**: Tantivy index and per-instance layout
//! - **indexer**: Document building and build orchestration
//! - **telemetry**: Logging bootstrap
//! - **services**: Unified service container

pub mod catalog;
pub mod config;
pub mod error;
pub mod fields;
pub mod indexer;
pub mod normalize;
pub mod record;
pub mod services;
pub mod source;
pub mod storage;
pub mod telemetry;
pub mod types;

// Re-export key types for convenience
pub use config::Config;
pub use error::{MetacatError, Result};
pub use services::Services;
