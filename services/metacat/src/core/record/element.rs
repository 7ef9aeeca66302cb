//! In-memory element tree for structured records.
//!
//! Records arrive as XML documents. They are parsed once with
//! `quick_xml`'s namespace-aware reader into a small owned tree
//! that the path resolver and the dialect adapters walk.

use crate::core::error::{MetacatError, Result};
use crate::core::record::family::SchemaFamily;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;

/// A single element of a structured record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Resolved namespace URI, if the element is namespace-qualified
    pub namespace: Option<String>,

    /// Local name (prefix stripped)
    pub name: String,

    /// Attributes keyed by local name, in document order
    pub attributes: Vec<(String, String)>,

    /// Concatenated character data directly under this element
    pub text: String,

    /// Child elements in document order
    pub children: Vec<Element>,
}

impl Element {
    /// Create an element with no namespace
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the namespace URI
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Add an attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Set the text content
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Append a child element
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Look up an attribute by local name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// First child with the given local name
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Whether the namespace URI equals `uri`
    pub fn in_namespace(&self, uri: &str) -> bool {
        self.namespace.as_deref() == Some(uri)
    }

    /// Best-effort scalar reading used for comparisons.
    ///
    /// Codelist elements compare by their `codeListValue`, leaves by
    /// their trimmed text, and single-child wrappers by their child.
    pub fn scalar_text(&self) -> Option<String> {
        if let Some(code) = self.attribute("codeListValue") {
            return Some(code.to_string());
        }
        if self.children.is_empty() {
            let text = self.text.trim();
            if !text.is_empty() {
                return Some(text.to_string());
            }
            return self.attribute("value").map(str::to_string);
        }
        match self.children.as_slice() {
            [only] => only.scalar_text(),
            _ => None,
        }
    }
}

/// A structured record: its catalog identifier plus the parsed tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlRecord {
    pub identifier: String,
    pub root: Element,
}

impl XmlRecord {
    /// Wrap an already-built tree
    pub fn new(identifier: impl Into<String>, root: Element) -> Self {
        Self {
            identifier: identifier.into(),
            root,
        }
    }

    /// Parse an XML document under a known identifier
    pub fn parse(identifier: impl Into<String>, xml: &str) -> Result<Self> {
        Ok(Self::new(identifier, parse_document(xml)?))
    }

    /// Parse a document whose identifier is carried inside it
    pub fn parse_detect(xml: &str) -> Result<Self> {
        let root = parse_document(xml)?;
        let family = SchemaFamily::classify(&root);
        let identifier = family.extract_identifier(&root).ok_or_else(|| {
            MetacatError::XmlError(format!(
                "no identifier found in {family} record <{}>",
                root.name
            ))
        })?;
        Ok(Self::new(identifier, root))
    }
}

/// Parse an XML document into its root [`Element`]
pub fn parse_document(xml: &str) -> Result<Element> {
    let mut reader = NsReader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let (resolved, event) = reader
            .read_resolved_event()
            .map_err(|e| MetacatError::XmlError(e.to_string()))?;

        match event {
            Event::Start(start) => {
                stack.push(open_element(&resolved, &start)?);
            }
            Event::Empty(start) => {
                let element = open_element(&resolved, &start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| MetacatError::XmlError("unbalanced end tag".to_string()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    let unescaped = text
                        .unescape()
                        .map_err(|e| MetacatError::XmlError(e.to_string()))?;
                    current.text.push_str(&unescaped);
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(MetacatError::XmlError(format!(
            "unexpected end of document: {} unclosed element(s)",
            stack.len()
        )));
    }

    root.ok_or_else(|| MetacatError::XmlError("document has no root element".to_string()))
}

fn open_element(resolved: &ResolveResult<'_>, start: &BytesStart<'_>) -> Result<Element> {
    let namespace = match resolved {
        ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.as_ref()).into_owned()),
        _ => None,
    };

    let mut element = Element::new(String::from_utf8_lossy(start.local_name().as_ref()));
    element.namespace = namespace;

    for attr in start.attributes() {
        let attr = attr.map_err(|e| MetacatError::XmlError(e.to_string()))?;
        let key = attr.key;
        // Namespace declarations are resolved by the reader, not kept
        if key.as_ref() == b"xmlns" || key.as_ref().starts_with(b"xmlns:") {
            continue;
        }
        let value = attr
            .unescape_value()
            .map_err(|e| MetacatError::XmlError(e.to_string()))?;
        element.attributes.push((
            String::from_utf8_lossy(key.local_name().as_ref()).into_owned(),
            value.into_owned(),
        ));
    }

    Ok(element)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_some() {
                return Err(MetacatError::XmlError(
                    "document has more than one root element".to_string(),
                ));
            }
            *root = Some(element);
        }
    }
    Ok(())
}
