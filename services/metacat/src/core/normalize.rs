//! Value normalization.
//!
//! Turns [`RawValue`]s into the canonical strings stored in the
//! index. Rules, in order:
//!
//! 1. null becomes the `"null"` sentinel
//! 2. codelist codes resolve to their label (unknown: sentinel)
//! 3. dates drop a trailing `Z` and render as `yyyyMMdd`
//!    (unparsable: sentinel)
//! 4. numbers are parsed and re-emitted (unparsable: omitted)
//! 5. collections join their normalized members with `,`
//!
//! Complex nodes have no scalar reading and are rejected with
//! [`MetacatError::UnsupportedValue`].

use crate::core::error::{MetacatError, Result};
use crate::core::types::{RawValue, SENTINEL};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Canonical index date format
pub const DATE_FORMAT: &str = "%Y%m%d";

static DECIMAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([+-])?(\d*)(?:\.(\d*))?$").expect("valid decimal pattern"));

/// Built-in ISO 19115 codelists, elements in domain-code order
const BUILTIN_CODELISTS: &[(&str, &[&str])] = &[
    (
        "MD_ScopeCode",
        &[
            "attribute",
            "attributeType",
            "collectionHardware",
            "collectionSession",
            "dataset",
            "series",
            "nonGeographicDataset",
            "dimensionGroup",
            "feature",
            "featureType",
            "propertyType",
            "fieldSession",
            "software",
            "service",
            "model",
            "tile",
        ],
    ),
    ("CI_DateTypeCode", &["creation", "publication", "revision"]),
    (
        "CI_RoleCode",
        &[
            "resourceProvider",
            "custodian",
            "owner",
            "user",
            "distributor",
            "originator",
            "pointOfContact",
            "principalInvestigator",
            "processor",
            "publisher",
            "author",
        ],
    ),
    (
        "MD_ProgressCode",
        &[
            "completed",
            "historicalArchive",
            "obsolete",
            "onGoing",
            "planned",
            "required",
            "underDevelopment",
        ],
    ),
    (
        "MD_CharacterSetCode",
        &[
            "ucs2", "ucs4", "utf7", "utf8", "utf16", "8859part1", "8859part2", "8859part3",
            "8859part4", "8859part5", "8859part6", "8859part7", "8859part8", "8859part9",
            "8859part10", "8859part11", "8859part13", "8859part14", "8859part15", "8859part16",
            "jis", "shiftJIS", "eucJP", "usAscii", "ebcdic", "eucKR", "big5", "GB2312",
        ],
    ),
    (
        "MD_RestrictionCode",
        &[
            "copyright",
            "patent",
            "patentPending",
            "trademark",
            "license",
            "intellectualPropertyRights",
            "restricted",
            "otherRestrictions",
        ],
    ),
    (
        "MD_ClassificationCode",
        &[
            "unclassified",
            "restricted",
            "confidential",
            "secret",
            "topSecret",
        ],
    ),
    (
        "MD_MaintenanceFrequencyCode",
        &[
            "continual",
            "daily",
            "weekly",
            "fortnightly",
            "monthly",
            "quarterly",
            "biannually",
            "annually",
            "asNeeded",
            "irregular",
            "notPlanned",
            "unknown",
        ],
    ),
    (
        "MD_SpatialRepresentationTypeCode",
        &["vector", "grid", "textTable", "tin", "stereoModel", "video"],
    ),
];

/// Codelist element tables keyed by list name
#[derive(Debug, Clone, Default)]
pub struct Codelists {
    lists: HashMap<String, Vec<String>>,
}

impl Codelists {
    /// The ISO 19115 lists shipped with the engine
    pub fn builtin() -> Self {
        let lists = BUILTIN_CODELISTS
            .iter()
            .map(|(name, labels)| {
                (
                    name.to_string(),
                    labels.iter().map(|l| l.to_string()).collect(),
                )
            })
            .collect();
        Self { lists }
    }

    /// Add or replace a list
    pub fn insert(&mut self, name: impl Into<String>, labels: Vec<String>) {
        self.lists.insert(name.into(), labels);
    }

    /// Number of known lists
    pub fn len(&self) -> usize {
        self.lists.len()
    }

    /// Whether no list is known
    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// Resolve a stored code to its label.
    ///
    /// Numeric codes are 1-based domain codes (`"005"` is the fifth
    /// element). A non-numeric code that already names an element is
    /// returned in its canonical spelling.
    pub fn label(&self, list: &str, code: &str) -> Option<&str> {
        let labels = self.lists.get(list)?;
        let code = code.trim();
        match code.parse::<usize>() {
            Ok(0) => None,
            Ok(n) => labels.get(n - 1).map(String::as_str),
            Err(_) => labels
                .iter()
                .find(|label| label.eq_ignore_ascii_case(code))
                .map(String::as_str),
        }
    }
}

/// Converts raw values into index-ready strings
#[derive(Debug, Clone, Default)]
pub struct ValueNormalizer {
    codelists: Codelists,
}

impl ValueNormalizer {
    /// Create a normalizer over the given codelists
    pub fn new(codelists: Codelists) -> Self {
        Self { codelists }
    }

    /// Normalizer with the built-in codelists only
    pub fn with_builtin_codelists() -> Self {
        Self::new(Codelists::builtin())
    }

    /// Normalize a value to its index string.
    ///
    /// Always yields a non-empty string; values that cannot be read
    /// become the sentinel. Fails only for unsupported value types.
    pub fn normalize(&self, value: &RawValue) -> Result<String> {
        Ok(self
            .normalize_member(value)?
            .unwrap_or_else(|| SENTINEL.to_string()))
    }

    /// Normalize one value; `None` means the value is omitted
    fn normalize_member(&self, value: &RawValue) -> Result<Option<String>> {
        let normalized = match value {
            RawValue::Null => Some(SENTINEL.to_string()),
            RawValue::Code { list, code } => Some(self.normalize_code(list, code)),
            RawValue::Date(text) => Some(normalize_date(text)),
            RawValue::Integer(text) => normalize_integer(text),
            RawValue::Real(text) => normalize_real(text),
            RawValue::Decimal(text) => normalize_decimal(text),
            RawValue::List(values) => Some(self.normalize_list(values)?),
            RawValue::Text(text) => {
                let text = text.trim();
                Some(if text.is_empty() {
                    SENTINEL.to_string()
                } else {
                    text.to_string()
                })
            }
            RawValue::Node(name) => {
                return Err(MetacatError::UnsupportedValue(format!(
                    "element <{name}> has no scalar value"
                )))
            }
        };
        Ok(normalized)
    }

    fn normalize_code(&self, list: &str, code: &str) -> String {
        match self.codelists.label(list, code) {
            Some(label) => label.to_string(),
            None => {
                tracing::warn!("Unresolved code '{}' in codelist {}", code, list);
                SENTINEL.to_string()
            }
        }
    }

    fn normalize_list(&self, values: &[RawValue]) -> Result<String> {
        let mut members = Vec::with_capacity(values.len());
        for value in values {
            if let Some(member) = self.normalize_member(value)? {
                if member != SENTINEL {
                    members.push(member);
                }
            }
        }

        if members.is_empty() {
            Ok(SENTINEL.to_string())
        } else {
            Ok(members.join(","))
        }
    }
}

/// Render a date literal as `yyyyMMdd`, or the sentinel
pub fn normalize_date(text: &str) -> String {
    match parse_date(text) {
        Some(date) => date.format(DATE_FORMAT).to_string(),
        None => {
            tracing::warn!("Unparsable date '{}'", text);
            SENTINEL.to_string()
        }
    }
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    let text = text
        .strip_suffix('Z')
        .or_else(|| text.strip_suffix('z'))
        .unwrap_or(text);

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.date());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(&format!("{text}-01"), "%Y-%m-%d") {
        return Some(date);
    }
    if text.len() == 4 {
        if let Ok(year) = text.parse::<i32>() {
            return NaiveDate::from_ymd_opt(year, 1, 1);
        }
    }
    None
}

fn normalize_integer(text: &str) -> Option<String> {
    match text.trim().parse::<i64>() {
        Ok(n) => Some(n.to_string()),
        Err(e) => {
            tracing::warn!("Dropping unparsable integer '{}': {}", text, e);
            None
        }
    }
}

fn normalize_real(text: &str) -> Option<String> {
    match text.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => Some(n.to_string()),
        Ok(_) => {
            tracing::warn!("Dropping non-finite real '{}'", text);
            None
        }
        Err(e) => {
            tracing::warn!("Dropping unparsable real '{}': {}", text, e);
            None
        }
    }
}

fn normalize_decimal(text: &str) -> Option<String> {
    let text = text.trim();
    let has_digits = |m: Option<regex::Match<'_>>| m.is_some_and(|m| !m.as_str().is_empty());
    let parsed = DECIMAL
        .captures(text)
        .filter(|caps| has_digits(caps.get(2)) || has_digits(caps.get(3)));

    let Some(caps) = parsed else {
        tracing::warn!("Dropping unparsable decimal '{}'", text);
        return None;
    };

    let integer = caps.get(2).map_or("", |m| m.as_str()).trim_start_matches('0');
    let fraction = caps.get(3).map_or("", |m| m.as_str()).trim_end_matches('0');
    let integer = if integer.is_empty() { "0" } else { integer };

    let mut out = String::new();
    let is_zero = integer == "0" && fraction.is_empty();
    if caps.get(1).is_some_and(|m| m.as_str() == "-") && !is_zero {
        out.push('-');
    }
    out.push_str(integer);
    if !fraction.is_empty() {
        out.push('.');
        out.push_str(fraction);
    }
    Some(out)
}
