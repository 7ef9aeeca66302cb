//! Dialect adapters exposing records through one capability.
//!
//! The indexer never inspects record trees directly. It asks a
//! [`StructuredRecord`] for the raw values at a path, and each
//! schema family decides how its elements read as values: ISO
//! dialects carry typed `gco:` wrappers and codelists, Dublin Core
//! is flat text with a few date elements, ebRIM keeps labels in
//! `LocalizedString/@value`.

use crate::core::record::element::{Element, XmlRecord};
use crate::core::record::family::SchemaFamily;
use crate::core::record::path::{Origin, PathExpression};
use crate::core::types::RawValue;
use std::sync::Arc;

/// Read access to a classified record
pub trait StructuredRecord: Send + Sync {
    /// Catalog identifier of the record
    fn identifier(&self) -> &str;

    /// Family the record was classified into
    fn family(&self) -> SchemaFamily;

    /// Raw values at `path`; empty when nothing matches
    fn values_at(&self, path: &PathExpression) -> Vec<RawValue>;
}

/// Classify `record` and wrap it in its family's adapter
pub fn adapt(record: Arc<XmlRecord>) -> Arc<dyn StructuredRecord> {
    let family = SchemaFamily::classify(&record.root);
    adapt_as(record, family)
}

/// Wrap `record` in the adapter for an already known family
pub fn adapt_as(record: Arc<XmlRecord>, family: SchemaFamily) -> Arc<dyn StructuredRecord> {
    match family {
        SchemaFamily::Iso19139 | SchemaFamily::FeatureCatalogue => {
            Arc::new(IsoRecord { record, family })
        }
        SchemaFamily::DublinCore => Arc::new(DublinCoreRecord { record }),
        SchemaFamily::Ebrim30 | SchemaFamily::Ebrim25 => Arc::new(EbrimRecord { record, family }),
        SchemaFamily::Generic => Arc::new(GenericRecord { record }),
    }
}

/// ISO 19139 and ISO 19110 records (shared `gco:` encoding)
struct IsoRecord {
    record: Arc<XmlRecord>,
    family: SchemaFamily,
}

impl StructuredRecord for IsoRecord {
    fn identifier(&self) -> &str {
        &self.record.identifier
    }

    fn family(&self) -> SchemaFamily {
        self.family
    }

    fn values_at(&self, path: &PathExpression) -> Vec<RawValue> {
        path.resolve(&self.record.root, Origin::Document)
            .into_iter()
            .map(iso_value)
            .collect()
    }
}

fn iso_value(element: &Element) -> RawValue {
    if let Some(code) = element.attribute("codeListValue") {
        return RawValue::Code {
            list: element.name.clone(),
            code: code.to_string(),
        };
    }

    if element.children.is_empty() {
        let text = element.text.trim();
        if text.is_empty() {
            return RawValue::Null;
        }
        let text = text.to_string();
        return match element.name.as_str() {
            "Date" | "DateTime" => RawValue::Date(text),
            "Integer" => RawValue::Integer(text),
            "Real" => RawValue::Real(text),
            "Decimal" => RawValue::Decimal(text),
            _ => RawValue::Text(text),
        };
    }

    // Property elements wrap exactly one typed value
    match element.children.as_slice() {
        [only] => iso_value(only),
        _ => RawValue::Node(element.name.clone()),
    }
}

/// Dublin Core elements carrying dates
const DC_DATE_ELEMENTS: [&str; 8] = [
    "date",
    "modified",
    "created",
    "issued",
    "available",
    "valid",
    "dateAccepted",
    "dateSubmitted",
];

struct DublinCoreRecord {
    record: Arc<XmlRecord>,
}

impl StructuredRecord for DublinCoreRecord {
    fn identifier(&self) -> &str {
        &self.record.identifier
    }

    fn family(&self) -> SchemaFamily {
        SchemaFamily::DublinCore
    }

    // DC elements sit directly below a wrapper whose name varies
    // (csw:Record, oai_dc:dc, ...), so paths start at its children
    fn values_at(&self, path: &PathExpression) -> Vec<RawValue> {
        path.resolve(&self.record.root, Origin::Root)
            .into_iter()
            .map(dublin_core_value)
            .collect()
    }
}

fn dublin_core_value(element: &Element) -> RawValue {
    if !element.children.is_empty() {
        return RawValue::Node(element.name.clone());
    }
    let text = element.text.trim();
    if text.is_empty() {
        return RawValue::Null;
    }
    if DC_DATE_ELEMENTS.contains(&element.name.as_str()) {
        RawValue::Date(text.to_string())
    } else {
        RawValue::Text(text.to_string())
    }
}

struct EbrimRecord {
    record: Arc<XmlRecord>,
    family: SchemaFamily,
}

impl StructuredRecord for EbrimRecord {
    fn identifier(&self) -> &str {
        &self.record.identifier
    }

    fn family(&self) -> SchemaFamily {
        self.family
    }

    fn values_at(&self, path: &PathExpression) -> Vec<RawValue> {
        path.resolve(&self.record.root, Origin::Document)
            .into_iter()
            .map(ebrim_value)
            .collect()
    }
}

fn ebrim_value(element: &Element) -> RawValue {
    if element.name == "LocalizedString" {
        return match element.attribute("value").map(str::trim) {
            Some(value) if !value.is_empty() => RawValue::Text(value.to_string()),
            _ => RawValue::Null,
        };
    }

    if element.children.is_empty() {
        let text = element.text.trim();
        return if text.is_empty() {
            RawValue::Null
        } else {
            RawValue::Text(text.to_string())
        };
    }

    // InternationalString: Name and Description hold LocalizedStrings
    if matches!(element.name.as_str(), "Name" | "Description") {
        let strings: Vec<RawValue> = element
            .children
            .iter()
            .filter(|c| c.name == "LocalizedString")
            .map(ebrim_value)
            .collect();
        return match strings.len() {
            0 => RawValue::Null,
            1 => strings.into_iter().next().unwrap_or(RawValue::Null),
            _ => RawValue::List(strings),
        };
    }

    match element.children.as_slice() {
        [only] => ebrim_value(only),
        _ => RawValue::Node(element.name.clone()),
    }
}

/// Fallback for unknown dialects: paths start below the root
struct GenericRecord {
    record: Arc<XmlRecord>,
}

impl StructuredRecord for GenericRecord {
    fn identifier(&self) -> &str {
        &self.record.identifier
    }

    fn family(&self) -> SchemaFamily {
        SchemaFamily::Generic
    }

    fn values_at(&self, path: &PathExpression) -> Vec<RawValue> {
        path.resolve(&self.record.root, Origin::Root)
            .into_iter()
            .map(|element| match element.scalar_text() {
                Some(text) => RawValue::Text(text),
                None if element.children.is_empty() => RawValue::Null,
                None => RawValue::Node(element.name.clone()),
            })
            .collect()
    }
}
