//! Record catalog: durable identifier to location mapping.
//!
//! - **store**: [`RecordCatalog`], one SQLite database per instance
//! - **cursor**: streaming read-only iteration
//! - **registry**: one shared handle per instance
//! - **import**: filling a catalog from a directory of record files
//!
//! # Catalog Storage Structure
//!
//! ```text
//! {catalog_dir}/
//! ├── {instance-id}/
//! │   └── catalog.db          # records(identifier UNIQUE, location)
//! ```

mod cursor;
mod import;
mod registry;
mod store;

pub use cursor::{CatalogCursor, CursorColumn, CURSOR_BUFFER};
pub use import::{import_directory, RecordFileWalker};
pub use registry::{CatalogRegistry, CATALOG_FILE};
pub use store::RecordCatalog;
