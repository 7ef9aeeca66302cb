//! Structured records and the path language over them.
//!
//! - **element**: owned element tree and XML parsing
//! - **path**: path expressions (plain, ordinal, conditional)
//! - **family**: ordered schema family classification
//! - **adapter**: per-family [`StructuredRecord`] implementations

pub mod adapter;
pub mod element;
pub mod family;
pub mod path;

pub use adapter::{adapt, adapt_as, StructuredRecord};
pub use element::{parse_document, Element, XmlRecord};
pub use family::SchemaFamily;
pub use path::{Origin, PathExpression};
