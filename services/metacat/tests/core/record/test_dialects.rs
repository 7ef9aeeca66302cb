// Integration tests for dialect classification and field values

use crate::common::{
    DC_RECORD, EBRIM_RECORD, FEATURE_CATALOGUE, GENERIC_RECORD, ISO_RECORD, OAI_DC_RECORD,
};
use metacat::core::fields::FieldRegistry;
use metacat::core::indexer::{DocumentBuilder, FieldMode, FieldPool};
use metacat::core::normalize::ValueNormalizer;
use metacat::core::record::{SchemaFamily, XmlRecord};
use metacat::core::types::IndexDocument;
use std::sync::Arc;

async fn build(xml: &str) -> IndexDocument {
    let record = XmlRecord::parse_detect(xml).expect("Fixture parses");
    DocumentBuilder::new(
        Arc::new(FieldRegistry::builtin().unwrap()),
        Arc::new(ValueNormalizer::with_builtin_codelists()),
        FieldPool::new(2),
        FieldMode::Concurrent,
    )
    .build(record)
    .await
}

#[tokio::test]
async fn test_iso_record_fields() {
    let doc = build(ISO_RECORD).await;

    assert_eq!(doc.identifier, "iso-rivers");
    assert_eq!(doc.family, SchemaFamily::Iso19139);
    assert_eq!(doc.value("Title"), Some("Rivers of Europe"));
    assert_eq!(doc.value("Abstract"), Some("Main rivers and their basins"));
    assert_eq!(doc.value("Subject"), Some("rivers,water,inlandWaters"));
    assert_eq!(doc.value("TopicCategory"), Some("inlandWaters"));
    assert_eq!(doc.value("Type"), Some("dataset"));
    assert_eq!(doc.value("Modified"), Some("20210615"));
    assert_eq!(doc.value("CreationDate"), Some("20190102"));
    assert_eq!(doc.value("RevisionDate"), Some("20200203"));
    assert_eq!(doc.value("PublicationDate"), Some("null"));
    assert_eq!(doc.value("OrganisationName"), Some("Hydro Agency"));
    assert_eq!(doc.value("Denominator"), Some("50000"));
    assert_eq!(doc.value("Language"), Some("eng"));
    assert_eq!(doc.value("CRS"), Some("null"));
}

#[tokio::test]
async fn test_dublin_core_record_fields() {
    let doc = build(DC_RECORD).await;

    assert_eq!(doc.identifier, "dc-soil");
    assert_eq!(doc.family, SchemaFamily::DublinCore);
    assert_eq!(doc.value("Title"), Some("Soil map"));
    assert_eq!(doc.value("Abstract"), Some("Soil types"));
    assert_eq!(doc.value("Subject"), Some("soil,geology"));
    assert_eq!(doc.value("Modified"), Some("20180504"));
    assert_eq!(doc.value("Creator"), Some("null"));
}

#[tokio::test]
async fn test_oai_dublin_core_record_fields() {
    let doc = build(OAI_DC_RECORD).await;

    assert_eq!(doc.identifier, "oai-x1");
    assert_eq!(doc.family, SchemaFamily::DublinCore);
    assert_eq!(doc.value("Identifier"), Some("oai-x1"));
    assert_eq!(doc.value("Title"), Some("Bare title"));
    assert_eq!(doc.value("Abstract"), Some("Harvested over OAI-PMH"));
    assert!(doc.any_text.contains("Bare title"));
}

#[tokio::test]
async fn test_ebrim_record_fields() {
    let doc = build(EBRIM_RECORD).await;

    assert_eq!(doc.identifier, "urn:example:roads");
    assert_eq!(doc.family, SchemaFamily::Ebrim30);
    assert_eq!(doc.value("Title"), Some("Road network"));
    assert_eq!(doc.value("Subject"), Some("roads"));
    assert_eq!(doc.value("Format"), Some("GML"));
    assert_eq!(doc.value("Abstract"), Some("null"));
}

#[tokio::test]
async fn test_feature_catalogue_fields() {
    let doc = build(FEATURE_CATALOGUE).await;

    assert_eq!(doc.identifier, "fc-hydro");
    assert_eq!(doc.family, SchemaFamily::FeatureCatalogue);
    assert_eq!(doc.value("Title"), Some("Hydrography catalogue"));
    assert_eq!(doc.value("Version"), Some("2.0"));
    assert_eq!(doc.value("FeatureType"), Some("River,Lake"));
}

#[tokio::test]
async fn test_unknown_dialect_falls_back_to_generic() {
    let doc = build(GENERIC_RECORD).await;

    assert_eq!(doc.identifier, "gen-plain");
    assert_eq!(doc.family, SchemaFamily::Generic);
    assert_eq!(doc.value("Title"), Some("Plain"));
    assert_eq!(doc.value("Abstract"), Some("Just XML"));
    assert_eq!(doc.any_text, "Plain Just XML");
}

#[tokio::test]
async fn test_documents_carry_only_their_family_fields() {
    let iso = build(ISO_RECORD).await;
    let dc = build(DC_RECORD).await;

    assert!(iso.value("Denominator").is_some());
    assert!(dc.value("Denominator").is_none());
    assert!(dc.value("Creator").is_some());
    assert!(iso.value("Creator").is_none());
}
