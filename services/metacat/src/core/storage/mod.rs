//! Storage layer for per-instance Tantivy indexes.
//!
//! # Architecture
//!
//! - **IndexStore**: document sink used by the indexer
//! - **TantivyIndex**: Tantivy-backed `IndexStore`
//! - **IndexStorage**: per-instance directory layout, staging and publish
//! - **IndexMetadata**: sidecar of a published index
//!
//! # Instance Storage Structure
//!
//! ```text
//! {index_dir}/
//! ├── {instance-id}/
//! │   ├── meta.json           # Published index metadata
//! │   ├── index/              # Published Tantivy index
//! │   └── staging/            # Build in progress (transient)
//! ```

mod instance;
mod tantivy;

pub use self::instance::{IndexMetadata, IndexStorage};
pub use self::tantivy::{create_schema, IndexStore, TantivyIndex, SCHEMA_VERSION};
