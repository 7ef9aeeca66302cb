//! Path expressions over structured records.
//!
//! Grammar:
//!
//! ```text
//! plain        := segment ("/" segment)*
//! segment      := [prefix ":"] name ["[" n "]"]
//! conditional  := plain "#" attr "=" value ":" plain
//! ```
//!
//! - Namespace prefixes are dropped: `gmd:title` matches any element
//!   whose local name is `title`.
//! - `name[n]` keeps only the n-th repetition of `name` under each
//!   parent. `n` is written 0-based and stored as a 1-based
//!   repetition counter; at most one ordinal per expression.
//! - `anchor#attr=value:continuation` resolves `anchor`, keeps the
//!   elements whose `attr` equals `value`, then resolves
//!   `continuation` below each of them. The split happens on the
//!   first `#`, the first `=` after it and the first `:` after that.
//!
//! Expressions are parsed once when field sets are built. Resolution
//! never fails: a path that matches nothing yields no elements.

use crate::core::error::{MetacatError, Result};
use crate::core::record::element::Element;
use std::fmt;
use std::str::FromStr;

/// One step of a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Local name to match
    pub name: String,

    /// 1-based repetition to keep, if an ordinal was given
    pub repetition: Option<usize>,
}

/// A parsed path expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpression {
    source: String,
    kind: PathKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathKind {
    Plain(Vec<Segment>),
    Conditional {
        anchor: Vec<Segment>,
        attr: String,
        value: String,
        continuation: Vec<Segment>,
    },
}

/// Where resolution starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Above the root: the first segment names the root element
    Document,

    /// At the root: the first segment names a child of the root
    Root,
}

impl PathExpression {
    /// Parse an expression, failing fast on malformed syntax
    pub fn parse(expression: &str) -> Result<Self> {
        let source = expression.trim();
        if source.is_empty() {
            return Err(MetacatError::invalid_path(expression, "empty expression"));
        }

        let kind = match source.split_once('#') {
            None => PathKind::Plain(parse_segments(source, source)?),
            Some((anchor, rest)) => {
                let (attr, rest) = rest
                    .split_once('=')
                    .ok_or_else(|| MetacatError::invalid_path(source, "missing '=' after '#'"))?;
                let (value, continuation) = rest
                    .split_once(':')
                    .ok_or_else(|| MetacatError::invalid_path(source, "missing ':' after '='"))?;

                let attr = local_name(attr.trim());
                if attr.is_empty() {
                    return Err(MetacatError::invalid_path(source, "empty condition attribute"));
                }
                if value.is_empty() {
                    return Err(MetacatError::invalid_path(source, "empty condition value"));
                }

                PathKind::Conditional {
                    anchor: parse_segments(anchor, source)?,
                    attr: attr.to_string(),
                    value: value.to_string(),
                    continuation: parse_segments(continuation, source)?,
                }
            }
        };

        let ordinals = match &kind {
            PathKind::Plain(segments) => count_ordinals(segments),
            PathKind::Conditional {
                anchor,
                continuation,
                ..
            } => count_ordinals(anchor) + count_ordinals(continuation),
        };
        if ordinals > 1 {
            return Err(MetacatError::invalid_path(
                source,
                "at most one ordinal selector is allowed",
            ));
        }

        Ok(Self {
            source: source.to_string(),
            kind,
        })
    }

    /// The expression as written
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether this is a conditional (`#attr=value:`) expression
    pub fn is_conditional(&self) -> bool {
        matches!(self.kind, PathKind::Conditional { .. })
    }

    /// Resolve against `root`, returning matches in document order
    pub fn resolve<'a>(&self, root: &'a Element, origin: Origin) -> Vec<&'a Element> {
        let start: &'a [Element] = match origin {
            Origin::Document => std::slice::from_ref(root),
            Origin::Root => root.children.as_slice(),
        };

        match &self.kind {
            PathKind::Plain(segments) => walk(vec![start], segments),
            PathKind::Conditional {
                anchor,
                attr,
                value,
                continuation,
            } => walk(vec![start], anchor)
                .into_iter()
                .filter(|candidate| condition_holds(candidate, attr, value))
                .flat_map(|found| walk(vec![found.children.as_slice()], continuation))
                .collect(),
        }
    }
}

impl FromStr for PathExpression {
    type Err = MetacatError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for PathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn local_name(name: &str) -> &str {
    match name.rsplit_once(':') {
        Some((_, local)) => local,
        None => name,
    }
}

fn count_ordinals(segments: &[Segment]) -> usize {
    segments.iter().filter(|s| s.repetition.is_some()).count()
}

fn parse_segments(path: &str, source: &str) -> Result<Vec<Segment>> {
    let path = path.trim().trim_start_matches('/');
    if path.is_empty() {
        return Err(MetacatError::invalid_path(source, "empty path"));
    }
    path.split('/').map(|raw| parse_segment(raw, source)).collect()
}

fn parse_segment(raw: &str, source: &str) -> Result<Segment> {
    let raw = raw.trim();
    let (name, repetition) = match raw.find('[') {
        None => (raw, None),
        Some(open) => {
            let inner = raw[open + 1..].strip_suffix(']').ok_or_else(|| {
                MetacatError::invalid_path(source, format!("unterminated ordinal in '{raw}'"))
            })?;
            let ordinal: usize = inner.trim().parse().map_err(|_| {
                MetacatError::invalid_path(source, format!("ordinal '{inner}' is not a number"))
            })?;
            // Written 0-based, counted 1-based
            (&raw[..open], Some(ordinal + 1))
        }
    };

    let name = local_name(name);
    if name.is_empty() {
        return Err(MetacatError::invalid_path(source, "empty segment"));
    }

    Ok(Segment {
        name: name.to_string(),
        repetition,
    })
}

fn walk<'a>(mut frontier: Vec<&'a [Element]>, segments: &[Segment]) -> Vec<&'a Element> {
    let mut matched = Vec::new();

    for (depth, segment) in segments.iter().enumerate() {
        matched = frontier
            .iter()
            .flat_map(|siblings| select(siblings, segment))
            .collect();

        if depth + 1 < segments.len() {
            frontier = matched.iter().map(|e| e.children.as_slice()).collect();
        }
    }

    matched
}

fn select<'a>(siblings: &'a [Element], segment: &Segment) -> Vec<&'a Element> {
    let mut repetition = 0;
    let mut out = Vec::new();

    for element in siblings.iter().filter(|e| e.name == segment.name) {
        repetition += 1;
        match segment.repetition {
            Some(wanted) if wanted != repetition => {}
            _ => out.push(element),
        }
    }

    out
}

fn condition_holds(candidate: &Element, attr: &str, value: &str) -> bool {
    if let Some(actual) = candidate.attribute(attr) {
        return actual == value;
    }
    candidate
        .children
        .iter()
        .filter(|child| child.name == attr)
        .any(|child| child.scalar_text().as_deref() == Some(value))
}
