//! Index building.
//!
//! - **pool**: process-wide bounded pool for field computation
//! - **document**: one record in, one index document out
//! - **pipeline**: full rebuilds into a staging index, with
//!   cancellation and publication
//!
//! A record whose fields all fail still produces a document; only
//! storage failures abort a build.

pub mod document;
pub mod pipeline;
pub mod pool;

pub use document::{compute_field, DocumentBuilder, FieldMode};
pub use pipeline::{Indexer, IndexerOptions};
pub use pool::{FieldPool, DEFAULT_FIELD_WORKERS};
