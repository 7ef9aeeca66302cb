//! Schema family classification.
//!
//! Every record belongs to exactly one family. Families are tested
//! in a fixed order and the first predicate that accepts the root
//! element wins; records no predicate accepts fall back to
//! [`SchemaFamily::Generic`].

use crate::core::error::{MetacatError, Result};
use crate::core::record::element::Element;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// CSW 2.0.2 namespace (Dublin Core record wrappers)
pub const NS_CSW: &str = "http://www.opengis.net/cat/csw/2.0.2";

/// Dublin Core element set namespace
pub const NS_DC: &str = "http://purl.org/dc/elements/1.1/";

/// Dublin Core terms namespace
pub const NS_DCT: &str = "http://purl.org/dc/terms/";

/// ebXML registry information model 3.0 namespace
pub const NS_RIM_30: &str = "urn:oasis:names:tc:ebxml-regrep:xsd:rim:3.0";

/// ebXML registry information model 2.5 namespace
pub const NS_RIM_25: &str = "urn:oasis:names:tc:ebxml-regrep:rim:xsd:2.5";

/// Structural dialect of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaFamily {
    /// ISO 19139 geographic metadata
    Iso19139,
    /// Dublin Core / CSW records
    DublinCore,
    /// ebRIM 3.0 registry objects
    Ebrim30,
    /// ebRIM 2.5 registry objects
    Ebrim25,
    /// ISO 19110 feature catalogues
    FeatureCatalogue,
    /// Anything else
    Generic,
}

type Predicate = fn(&Element) -> bool;

/// Classification chain, tested in order
const CHAIN: [(SchemaFamily, Predicate); 5] = [
    (SchemaFamily::Iso19139, is_iso19139),
    (SchemaFamily::DublinCore, is_dublin_core),
    (SchemaFamily::Ebrim30, is_ebrim_30),
    (SchemaFamily::Ebrim25, is_ebrim_25),
    (SchemaFamily::FeatureCatalogue, is_feature_catalogue),
];

impl SchemaFamily {
    /// All families, in classification order, fallback last
    pub const ALL: [SchemaFamily; 6] = [
        SchemaFamily::Iso19139,
        SchemaFamily::DublinCore,
        SchemaFamily::Ebrim30,
        SchemaFamily::Ebrim25,
        SchemaFamily::FeatureCatalogue,
        SchemaFamily::Generic,
    ];

    /// Classify a record by its root element
    pub fn classify(root: &Element) -> SchemaFamily {
        CHAIN
            .iter()
            .find(|(_, accepts)| accepts(root))
            .map(|(family, _)| *family)
            .unwrap_or(SchemaFamily::Generic)
    }

    /// Configuration key of the family
    pub fn name(self) -> &'static str {
        match self {
            SchemaFamily::Iso19139 => "iso19139",
            SchemaFamily::DublinCore => "dublincore",
            SchemaFamily::Ebrim30 => "ebrim30",
            SchemaFamily::Ebrim25 => "ebrim25",
            SchemaFamily::FeatureCatalogue => "featurecatalogue",
            SchemaFamily::Generic => "generic",
        }
    }

    /// Find the record's own identifier inside its tree
    pub fn extract_identifier(self, root: &Element) -> Option<String> {
        let found = match self {
            SchemaFamily::Iso19139 => root.child("fileIdentifier").and_then(Element::scalar_text),
            SchemaFamily::DublinCore => root.child("identifier").and_then(Element::scalar_text),
            SchemaFamily::Ebrim30 | SchemaFamily::Ebrim25 => root.attribute("id").map(str::to_string),
            SchemaFamily::FeatureCatalogue => root
                .attribute("uuid")
                .or_else(|| root.attribute("id"))
                .map(str::to_string),
            SchemaFamily::Generic => root.attribute("id").map(str::to_string).or_else(|| {
                ["identifier", "fileIdentifier"]
                    .iter()
                    .find_map(|name| root.child(name).and_then(Element::scalar_text))
            }),
        };
        found.filter(|id| !id.trim().is_empty())
    }
}

impl fmt::Display for SchemaFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SchemaFamily {
    type Err = MetacatError;

    fn from_str(s: &str) -> Result<Self> {
        SchemaFamily::ALL
            .iter()
            .copied()
            .find(|family| family.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| MetacatError::ConfigError(format!("Unknown schema family: {s}")))
    }
}

fn is_iso19139(root: &Element) -> bool {
    matches!(root.name.as_str(), "MD_Metadata" | "MI_Metadata")
}

fn is_dublin_core(root: &Element) -> bool {
    let csw_record = root.in_namespace(NS_CSW)
        && matches!(
            root.name.as_str(),
            "Record" | "SummaryRecord" | "BriefRecord"
        );
    csw_record
        || root.in_namespace(NS_DC)
        || root
            .children
            .iter()
            .any(|c| c.in_namespace(NS_DC) || c.in_namespace(NS_DCT))
}

fn is_ebrim_30(root: &Element) -> bool {
    root.in_namespace(NS_RIM_30)
}

fn is_ebrim_25(root: &Element) -> bool {
    root.in_namespace(NS_RIM_25)
}

fn is_feature_catalogue(root: &Element) -> bool {
    root.name == "FC_FeatureCatalogue"
}
