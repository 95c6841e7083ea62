//! XML document handling
//!
//! This module provides a small mutable element tree used for both schema
//! files and instance documents. Names are kept exactly as written
//! (`xs:element`, `this:record`); namespace declarations live next to the
//! attributes on the element that declares them.
//!
//! Schema files are parsed with `roxmltree`, instance documents with
//! `quick-xml`. Both produce the same [`Element`] tree, which is written back
//! out with `quick-xml`.

use crate::error::{Error, ParseError, Result};
use crate::names;
use crate::namespaces::Namespace;
use crate::paths::{self, Step};
use crate::XML_NAMESPACE;
use indexmap::IndexMap;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

/// XML Element in the document tree
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    /// Element name as written, possibly prefixed
    pub name: String,
    /// Element attributes in document order
    pub attributes: IndexMap<String, String>,
    /// Namespace declarations made on this element
    pub namespaces: Vec<Namespace>,
    /// Text content (if any)
    pub text: Option<String>,
    /// Child elements
    pub children: Vec<Element>,
}

impl Element {
    /// Create a new element
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Get the local name of the element
    pub fn local_name(&self) -> &str {
        names::local_name(&self.name)
    }

    /// Get the prefix of the element name, empty when unprefixed
    pub fn prefix(&self) -> &str {
        names::prefix(&self.name)
    }

    /// Get an attribute value by name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }

    /// Get a non-empty attribute value by name
    pub fn non_empty_attribute(&self, name: &str) -> Option<&str> {
        self.attribute(name).filter(|v| !v.trim().is_empty())
    }

    /// True if the attribute is present
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Set an attribute value
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Remove an attribute, keeping the order of the others
    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        self.attributes.shift_remove(name)
    }

    /// Declare a namespace on this element, replacing a declaration of the
    /// same prefix
    pub fn declare_namespace(&mut self, ns: Namespace) {
        match self.namespaces.iter_mut().find(|n| n.prefix == ns.prefix) {
            Some(existing) => *existing = ns,
            None => self.namespaces.push(ns),
        }
    }

    /// Add a child element
    pub fn add_child(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Set text content
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = Some(text.into());
    }

    /// Text content, empty when absent
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// First child with the given name
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// First child with the given name, mutably
    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.children.iter_mut().find(|c| c.name == name)
    }

    /// Children with the given name
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Number of children with the given name
    pub fn count_children(&self, name: &str) -> usize {
        self.children_named(name).count()
    }

    /// First child with the given local name, whatever its prefix
    pub fn find_local(&self, local_name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.local_name() == local_name)
    }

    /// Children with the given local name, whatever their prefix
    pub fn find_children<'a>(
        &'a self,
        local_name: &'a str,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.children
            .iter()
            .filter(move |c| c.local_name() == local_name)
    }

    /// True when the element has no text, no non-blank attribute and only
    /// empty children
    pub fn is_empty(&self) -> bool {
        self.text().trim().is_empty()
            && self.attributes.values().all(|v| v.trim().is_empty())
            && self.children.iter().all(Element::is_empty)
    }

    /// Remove text and children, keeping attributes
    pub fn clear_content(&mut self) {
        self.text = None;
        self.children.clear();
    }

    /// Select a descendant by relative path steps
    pub fn select_steps(&self, steps: &[Step]) -> Option<&Element> {
        let Some((first, rest)) = steps.split_first() else {
            return Some(self);
        };
        let index = first.index.unwrap_or(1);
        self.children
            .iter()
            .filter(|c| first.matches(&c.name))
            .nth(index.checked_sub(1)?)?
            .select_steps(rest)
    }

    /// Select a descendant by relative path steps, mutably
    pub fn select_steps_mut(&mut self, steps: &[Step]) -> Option<&mut Element> {
        let Some((first, rest)) = steps.split_first() else {
            return Some(self);
        };
        let index = first.index.unwrap_or(1);
        self.children
            .iter_mut()
            .filter(|c| first.matches(&c.name))
            .nth(index.checked_sub(1)?)?
            .select_steps_mut(rest)
    }
}

/// XML Document representation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Root element of the document
    pub root: Element,
}

impl Document {
    /// Create a document around a root element
    pub fn new(root: Element) -> Self {
        Self { root }
    }

    /// Parse an XML document from a string
    pub fn from_string(xml: &str) -> Result<Self> {
        Self::parse(xml.as_bytes())
    }

    /// Parse an XML document from bytes
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        reader.trim_text(true);

        let mut root: Option<Element> = None;
        let mut element_stack: Vec<Element> = Vec::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    element_stack.push(Self::parse_element(&e)?);
                }
                Ok(Event::End(_)) => {
                    if let Some(current) = element_stack.pop() {
                        match element_stack.last_mut() {
                            Some(parent) => parent.add_child(current),
                            None => root = Some(current),
                        }
                    }
                }
                Ok(Event::Empty(e)) => {
                    let element = Self::parse_element(&e)?;
                    match element_stack.last_mut() {
                        Some(parent) => parent.add_child(element),
                        None => root = Some(element),
                    }
                }
                Ok(Event::Text(e)) => {
                    if let Some(current) = element_stack.last_mut() {
                        let text = e
                            .unescape()
                            .map_err(|e| Error::Xml(format!("Failed to unescape text: {}", e)))?;
                        append_text(current, &text);
                    }
                }
                Ok(Event::CData(e)) => {
                    if let Some(current) = element_stack.last_mut() {
                        let text = String::from_utf8_lossy(&e.into_inner()).to_string();
                        append_text(current, &text);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::Xml(format!(
                        "Error parsing XML at position {}: {}",
                        reader.buffer_position(),
                        e
                    )))
                }
                _ => {}
            }
            buf.clear();
        }

        root.map(Document::new)
            .ok_or_else(|| Error::Xml("document has no root element".to_string()))
    }

    fn parse_element(start: &BytesStart) -> Result<Element> {
        let name = std::str::from_utf8(start.name().as_ref())
            .map_err(|e| Error::Xml(format!("Invalid element name: {}", e)))?
            .to_string();

        let mut element = Element::new(name);

        for attr_result in start.attributes() {
            let attr = attr_result
                .map_err(|e| Error::Xml(format!("Failed to parse attribute: {}", e)))?;

            let attr_name = std::str::from_utf8(attr.key.as_ref())
                .map_err(|e| Error::Xml(format!("Invalid attribute name: {}", e)))?;

            let attr_value = attr
                .unescape_value()
                .map_err(|e| Error::Xml(format!("Failed to unescape attribute value: {}", e)))?
                .to_string();

            if attr_name == "xmlns" {
                element.namespaces.push(Namespace::new("", attr_value));
            } else if let Some(prefix) = attr_name.strip_prefix("xmlns:") {
                element.namespaces.push(Namespace::new(prefix, attr_value));
            } else {
                element.set_attribute(attr_name, attr_value);
            }
        }

        Ok(element)
    }

    /// Parse a schema file.
    ///
    /// `location` is only used for error messages.
    pub fn parse_schema(text: &str, location: &str) -> Result<Self> {
        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..roxmltree::ParsingOptions::default()
        };
        let doc = roxmltree::Document::parse_with_options(text, options).map_err(|e| {
            ParseError::new(e.to_string())
                .with_location(location)
                .with_line(e.pos().row)
        })?;
        Ok(Document::new(convert_node(doc.root_element(), None)))
    }

    /// Get the root element
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Get the root element mutably
    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    /// Select an element by absolute path (`/catalog/item[2]`)
    pub fn select(&self, path: &str) -> Option<&Element> {
        let steps = paths::steps(path);
        let (first, rest) = steps.split_first()?;
        if first.attribute || !first.matches(&self.root.name) || first.index.unwrap_or(1) != 1 {
            return None;
        }
        if rest.last().map_or(false, |s| s.attribute) {
            return None;
        }
        self.root.select_steps(rest)
    }

    /// Select an element by absolute path, mutably
    pub fn select_mut(&mut self, path: &str) -> Option<&mut Element> {
        let steps = paths::steps(path);
        let (first, rest) = steps.split_first()?;
        if first.attribute || !first.matches(&self.root.name) || first.index.unwrap_or(1) != 1 {
            return None;
        }
        if rest.last().map_or(false, |s| s.attribute) {
            return None;
        }
        self.root.select_steps_mut(rest)
    }

    /// Value of the attribute named by an `.../@name` path
    pub fn attribute(&self, path: &str) -> Option<&str> {
        if !paths::is_attribute_path(path) {
            return None;
        }
        let owner = self.select(&paths::parent(path))?;
        owner.attribute(&paths::leaf(path))
    }

    /// Serialize with indentation and an XML declaration
    pub fn to_xml_string(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        write_element(&mut writer, &self.root)?;
        String::from_utf8(writer.into_inner()).map_err(|e| Error::Xml(e.to_string()))
    }

    /// Serialize on one line without a declaration
    pub fn to_compact_string(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        write_element(&mut writer, &self.root)?;
        String::from_utf8(writer.into_inner()).map_err(|e| Error::Xml(e.to_string()))
    }
}

fn append_text(element: &mut Element, text: &str) {
    if text.trim().is_empty() {
        return;
    }
    match element.text.as_mut() {
        Some(existing) => existing.push_str(text),
        None => element.text = Some(text.to_string()),
    }
}

fn write_element<W: std::io::Write>(writer: &mut Writer<W>, element: &Element) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for ns in &element.namespaces {
        start.push_attribute((ns.declaration_name().as_str(), ns.uri.as_str()));
    }
    for (name, value) in &element.attributes {
        start.push_attribute((name.as_str(), value.as_str()));
    }

    let text = element.text.as_deref().filter(|t| !t.is_empty());
    if element.children.is_empty() && text.is_none() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    if let Some(text) = text {
        writer.write_event(Event::Text(BytesText::new(text)))?;
    }
    for child in &element.children {
        write_element(writer, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}

fn prefixed_name(node: &roxmltree::Node, uri: Option<&str>, local: &str, allow_default: bool) -> String {
    let Some(uri) = uri else {
        return local.to_string();
    };
    if uri == XML_NAMESPACE {
        return format!("xml:{}", local);
    }
    let mut named = None;
    for ns in node.namespaces().filter(|ns| ns.uri() == uri) {
        match ns.name() {
            None if allow_default => return local.to_string(),
            Some(prefix) if named.is_none() => named = Some(prefix),
            _ => {}
        }
    }
    names::make_qualified(named.unwrap_or(""), local)
}

fn convert_node(node: roxmltree::Node, parent: Option<roxmltree::Node>) -> Element {
    let tag = node.tag_name();
    let mut element = Element::new(prefixed_name(&node, tag.namespace(), tag.name(), true));

    for ns in node.namespaces() {
        if ns.uri() == XML_NAMESPACE {
            continue;
        }
        let inherited = parent.map_or(false, |p| {
            p.namespaces()
                .any(|pns| pns.name() == ns.name() && pns.uri() == ns.uri())
        });
        if !inherited {
            element
                .namespaces
                .push(Namespace::new(ns.name().unwrap_or(""), ns.uri()));
        }
    }

    for attr in node.attributes() {
        let name = prefixed_name(&node, attr.namespace(), attr.name(), false);
        element.set_attribute(name, attr.value());
    }

    let mut text = String::new();
    for child in node.children() {
        if child.is_element() {
            element.add_child(convert_node(child, Some(node)));
        } else if child.is_text() {
            text.push_str(child.text().unwrap_or(""));
        }
    }
    if !text.trim().is_empty() {
        element.text = Some(text.trim().to_string());
    }

    element
}
