//! Metacat - metadata indexing engine for catalogue services
//!
//! Turns structured metadata records (ISO 19139, Dublin Core,
//! ebRIM 2.5/3.0, feature catalogues, and anything else as generic
//! XML) into flat search documents, and keeps a per-instance SQLite
//! catalog mapping record identifiers to their storage locations.
//!
//! # Architecture
//!
//! - **core::record**: element trees, path expressions, family
//!   classification and adapters
//! - **core::normalize**: dates, numbers, codelist codes and lists
//!   to index strings
//! - **core::indexer**: per-record documents on a bounded field pool,
//!   staged full rebuilds with cancellation
//! - **core::catalog**: identifier to location store with streaming
//!   cursors
//! - **core::services**: unified service container
//!
//! # Key Features
//!
//! - Concurrent field computation with results in configuration order
//! - Failed fields degrade to `"null"` instead of failing the record
//! - Stopped or failed builds never touch the published index

// Core domain logic
pub mod core;

// Re-export commonly used types for convenience
pub use core::config::Config;
pub use core::error::{MetacatError, Result};
pub use core::services::Services;
pub use core::types::*;
