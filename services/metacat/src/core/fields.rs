//! Queryable fields and per-family field sets.
//!
//! A queryable field is a named index field bound to one or more
//! path expressions. Every schema family has its own ordered field
//! set; configuration can replace the built-in set of any family.

use crate::core::config::FieldConfig;
use crate::core::error::{MetacatError, Result};
use crate::core::record::{PathExpression, SchemaFamily, StructuredRecord};
use crate::core::normalize::ValueNormalizer;
use crate::core::types::{
    RawValue, ANY_FIELD, FAMILY_FIELD, IDENTIFIER_FIELD, SORT_SUFFIX,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// A named index field fed by one or more paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryableField {
    pub name: String,
    pub paths: Vec<PathExpression>,
}

impl QueryableField {
    /// Parse a field definition, failing fast on bad paths
    pub fn new<S: AsRef<str>>(name: &str, paths: &[S]) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(MetacatError::ConfigError(
                "Field name must not be empty".to_string(),
            ));
        }
        if is_reserved(name) {
            return Err(MetacatError::ConfigError(format!(
                "Field name '{name}' is reserved"
            )));
        }
        if paths.is_empty() {
            return Err(MetacatError::ConfigError(format!(
                "Field '{name}' has no paths"
            )));
        }

        let paths = paths
            .iter()
            .map(|p| PathExpression::parse(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name: name.to_string(),
            paths,
        })
    }

    /// Resolve and normalize this field against `record`.
    ///
    /// Values of all paths are concatenated in path order and
    /// normalized as one collection, so a field that resolves to
    /// nothing yields the sentinel.
    pub fn compute(
        &self,
        record: &dyn StructuredRecord,
        normalizer: &ValueNormalizer,
    ) -> Result<String> {
        let values: Vec<RawValue> = self
            .paths
            .iter()
            .flat_map(|path| record.values_at(path))
            .collect();

        normalizer
            .normalize(&RawValue::List(values))
            .map_err(|e| MetacatError::FieldComputation {
                field: self.name.clone(),
                message: e.to_string(),
            })
    }
}

fn is_reserved(name: &str) -> bool {
    name == IDENTIFIER_FIELD || name == FAMILY_FIELD || name == ANY_FIELD || name.ends_with(SORT_SUFFIX)
}

/// Field sets for every schema family
#[derive(Debug, Clone)]
pub struct FieldRegistry {
    sets: BTreeMap<SchemaFamily, Arc<Vec<QueryableField>>>,
}

impl FieldRegistry {
    /// Registry holding only the built-in field sets
    pub fn builtin() -> Result<Self> {
        let mut sets = BTreeMap::new();
        for family in SchemaFamily::ALL {
            let fields = builtin_fields(family)
                .iter()
                .map(|(name, paths)| QueryableField::new(name, paths))
                .collect::<Result<Vec<_>>>()?;
            sets.insert(family, Arc::new(fields));
        }
        Ok(Self { sets })
    }

    /// Built-in sets with configured families replaced
    pub fn from_config(overrides: &BTreeMap<String, Vec<FieldConfig>>) -> Result<Self> {
        let mut registry = Self::builtin()?;
        for (family, fields) in overrides {
            let family: SchemaFamily = family.parse()?;
            let fields = fields
                .iter()
                .map(|f| QueryableField::new(&f.name, &f.paths))
                .collect::<Result<Vec<_>>>()?;
            registry.set(family, fields)?;
        }
        Ok(registry)
    }

    /// Replace the field set of `family`
    pub fn set(&mut self, family: SchemaFamily, fields: Vec<QueryableField>) -> Result<()> {
        let mut seen = BTreeSet::new();
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(MetacatError::ConfigError(format!(
                    "Field '{}' defined twice for {family}",
                    field.name
                )));
            }
        }
        self.sets.insert(family, Arc::new(fields));
        Ok(())
    }

    /// Ordered field set of `family`
    pub fn fields_for(&self, family: SchemaFamily) -> Arc<Vec<QueryableField>> {
        self.sets.get(&family).cloned().unwrap_or_default()
    }

    /// Every field name across all families, sorted
    pub fn all_field_names(&self) -> Vec<String> {
        let names: BTreeSet<&str> = self
            .sets
            .values()
            .flat_map(|fields| fields.iter().map(|f| f.name.as_str()))
            .collect();
        names.into_iter().map(str::to_string).collect()
    }
}

const ISO_IDENT: &str = "MD_Metadata/identificationInfo/MD_DataIdentification";
const ISO_CITATION: &str =
    "MD_Metadata/identificationInfo/MD_DataIdentification/citation/CI_Citation";

fn builtin_fields(family: SchemaFamily) -> Vec<(&'static str, Vec<String>)> {
    match family {
        SchemaFamily::Iso19139 => vec![
            ("Identifier", vec!["MD_Metadata/fileIdentifier".to_string()]),
            ("Title", vec![format!("{ISO_CITATION}/title")]),
            ("AlternateTitle", vec![format!("{ISO_CITATION}/alternateTitle")]),
            ("Abstract", vec![format!("{ISO_IDENT}/abstract")]),
            (
                "Subject",
                vec![
                    format!("{ISO_IDENT}/descriptiveKeywords/MD_Keywords/keyword"),
                    format!("{ISO_IDENT}/topicCategory"),
                ],
            ),
            ("TopicCategory", vec![format!("{ISO_IDENT}/topicCategory")]),
            ("Type", vec!["MD_Metadata/hierarchyLevel".to_string()]),
            ("Modified", vec!["MD_Metadata/dateStamp".to_string()]),
            (
                "CreationDate",
                vec![format!("{ISO_CITATION}/date/CI_Date#dateType=creation:date")],
            ),
            (
                "PublicationDate",
                vec![format!("{ISO_CITATION}/date/CI_Date#dateType=publication:date")],
            ),
            (
                "RevisionDate",
                vec![format!("{ISO_CITATION}/date/CI_Date#dateType=revision:date")],
            ),
            (
                "OrganisationName",
                vec![format!("{ISO_IDENT}/pointOfContact/CI_ResponsibleParty/organisationName")],
            ),
            ("Language", vec!["MD_Metadata/language".to_string()]),
            (
                "ResourceLanguage",
                vec![format!("{ISO_IDENT}/language")],
            ),
            (
                "Denominator",
                vec![format!(
                    "{ISO_IDENT}/spatialResolution/MD_Resolution/equivalentScale/MD_RepresentativeFraction/denominator"
                )],
            ),
            (
                "WestBoundLongitude",
                vec![format!(
                    "{ISO_IDENT}/extent/EX_Extent/geographicElement/EX_GeographicBoundingBox/westBoundLongitude"
                )],
            ),
            (
                "EastBoundLongitude",
                vec![format!(
                    "{ISO_IDENT}/extent/EX_Extent/geographicElement/EX_GeographicBoundingBox/eastBoundLongitude"
                )],
            ),
            (
                "SouthBoundLatitude",
                vec![format!(
                    "{ISO_IDENT}/extent/EX_Extent/geographicElement/EX_GeographicBoundingBox/southBoundLatitude"
                )],
            ),
            (
                "NorthBoundLatitude",
                vec![format!(
                    "{ISO_IDENT}/extent/EX_Extent/geographicElement/EX_GeographicBoundingBox/northBoundLatitude"
                )],
            ),
            (
                "Format",
                vec!["MD_Metadata/distributionInfo/MD_Distribution/distributionFormat/MD_Format/name".to_string()],
            ),
            (
                "CRS",
                vec!["MD_Metadata/referenceSystemInfo/MD_ReferenceSystem/referenceSystemIdentifier/RS_Identifier/code".to_string()],
            ),
        ],
        SchemaFamily::DublinCore => {
            let dc = |element: &str| vec![element.to_string()];
            vec![
                ("Identifier", dc("identifier")),
                ("Title", dc("title")),
                ("Abstract", [dc("abstract"), dc("description")].concat()),
                ("Subject", dc("subject")),
                ("Type", dc("type")),
                ("Format", dc("format")),
                ("Modified", dc("modified")),
                ("Creator", dc("creator")),
                ("Publisher", dc("publisher")),
                ("Language", dc("language")),
            ]
        }
        SchemaFamily::Ebrim30 | SchemaFamily::Ebrim25 => {
            let rim = |tail: &str| -> Vec<String> {
                ["ExtrinsicObject", "RegistryPackage", "Service", "Organization"]
                    .iter()
                    .map(|root| format!("{root}/{tail}"))
                    .collect()
            };
            let mut fields = vec![
                ("Title", rim("Name")),
                ("Abstract", rim("Description")),
                ("Subject", rim("Slot#name=subject:ValueList/Value")),
                ("Format", rim("Slot#name=format:ValueList/Value")),
                ("Modified", rim("Slot#name=modified:ValueList/Value")),
            ];
            if family == SchemaFamily::Ebrim30 {
                fields.push(("Version", rim("VersionInfo")));
            }
            fields
        }
        SchemaFamily::FeatureCatalogue => vec![
            ("Title", vec!["FC_FeatureCatalogue/name".to_string()]),
            ("Scope", vec!["FC_FeatureCatalogue/scope".to_string()]),
            ("Version", vec!["FC_FeatureCatalogue/versionNumber".to_string()]),
            ("Modified", vec!["FC_FeatureCatalogue/versionDate".to_string()]),
            (
                "FeatureType",
                vec!["FC_FeatureCatalogue/featureType/FC_FeatureType/typeName".to_string()],
            ),
            (
                "OrganisationName",
                vec!["FC_FeatureCatalogue/producer/CI_ResponsibleParty/organisationName".to_string()],
            ),
        ],
        SchemaFamily::Generic => vec![
            ("Title", vec!["title".to_string(), "name".to_string()]),
            ("Abstract", vec!["abstract".to_string(), "description".to_string()]),
        ],
    }
}
