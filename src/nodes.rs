//! Per-path schema facts
//!
//! Every element and attribute of the template has one [`SchemaNode`],
//! keyed in the [`SchemaNodeMap`] by its normalized path (no occurrence
//! indices).

use crate::definitions::{Definition, Occurs};
use crate::documents::Element;
use crate::paths;
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Arc;

/// Element or attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeKind {
    /// Element node
    Element,
    /// Attribute node
    Attribute,
}

/// The `use` of an attribute declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum AttributeUse {
    /// `use="optional"`, the default
    #[default]
    Optional,
    /// `use="required"`
    Required,
    /// `use="prohibited"`
    Prohibited,
}

impl AttributeUse {
    /// Parse a `use` attribute value
    pub fn from_attribute(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("required") => Self::Required,
            Some("prohibited") => Self::Prohibited,
            _ => Self::Optional,
        }
    }
}

/// Facts about one template path
#[derive(Debug, Clone, Serialize)]
pub struct SchemaNode {
    /// Normalized path
    pub path: String,
    /// Element or attribute
    pub kind: NodeKind,
    /// Declared type, as `name (namespace)`
    pub type_name: String,
    /// Declared type
    #[serde(skip)]
    pub type_def: Arc<Definition>,
    /// Type values are checked against once derivations are followed
    #[serde(skip)]
    pub validating_type: Arc<Definition>,
    /// Occurrence bounds; attributes use (0|1, 1)
    pub occurs: Occurs,
    /// `nillable` declaration
    pub nillable: bool,
    /// Value is fixed
    pub read_only: bool,
    /// Declaration is abstract
    pub is_abstract: bool,
    /// `substitutionGroup` as declared, for substitution members
    #[serde(skip_serializing_if = "Option::is_none")]
    pub substitution_group: Option<String>,
    /// Instance name of the head element, for substitution members
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_element_name: Option<String>,
    /// Instance names of the members, for substitution heads
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub substitution_members: Vec<String>,
    /// Position in walk order
    pub doc_order_index: usize,
    /// The parent's content model is a choice containing this element
    pub choice_member: bool,
    /// Expansion stopped here because the type repeats too often
    pub recursive: bool,
    /// `use` of an attribute
    pub attribute_use: AttributeUse,
    /// `fixed` value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed: Option<String>,
    /// Template fragment saved for substitution members and abstract
    /// elements
    #[serde(skip)]
    pub fragment: Option<Element>,
}

impl SchemaNode {
    /// Node for an element
    pub fn element(path: impl Into<String>, type_def: Arc<Definition>, occurs: Occurs) -> Self {
        Self::new(path.into(), NodeKind::Element, type_def, occurs)
    }

    /// Node for an attribute
    pub fn attribute(
        path: impl Into<String>,
        type_def: Arc<Definition>,
        attribute_use: AttributeUse,
    ) -> Self {
        let min = u32::from(attribute_use == AttributeUse::Required);
        let mut node = Self::new(path.into(), NodeKind::Attribute, type_def, Occurs::new(min, Some(1)));
        node.attribute_use = attribute_use;
        node
    }

    fn new(path: String, kind: NodeKind, type_def: Arc<Definition>, occurs: Occurs) -> Self {
        Self {
            path,
            kind,
            type_name: type_def.key().to_string(),
            validating_type: Arc::clone(&type_def),
            type_def,
            occurs,
            nillable: false,
            read_only: false,
            is_abstract: false,
            substitution_group: None,
            head_element_name: None,
            substitution_members: Vec::new(),
            doc_order_index: 0,
            choice_member: false,
            recursive: false,
            attribute_use: AttributeUse::Optional,
            fixed: None,
            fragment: None,
        }
    }

    /// Instance name of the node
    pub fn name(&self) -> String {
        paths::node_name(&self.path)
    }

    /// True for element nodes
    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    /// True for attribute nodes
    pub fn is_attribute(&self) -> bool {
        self.kind == NodeKind::Attribute
    }

    /// Elements need `minOccurs > 0`; attributes need `use="required"`
    pub fn is_required(&self) -> bool {
        match self.kind {
            NodeKind::Element => self.occurs.min > 0,
            NodeKind::Attribute => self.attribute_use == AttributeUse::Required,
        }
    }

    /// True when more than one occurrence is allowed
    pub fn is_repeating(&self) -> bool {
        self.occurs.is_repeating()
    }

    /// True for elements substituting for a head
    pub fn is_substitution_member(&self) -> bool {
        self.head_element_name.is_some()
    }

    /// True for substitution group heads
    pub fn is_head(&self) -> bool {
        !self.substitution_members.is_empty()
    }

    /// Type definition key as `name (namespace)` of the validating type
    pub fn validating_type_name(&self) -> String {
        self.validating_type.key().to_string()
    }
}

/// Path-indexed schema nodes in walk order
#[derive(Debug, Clone, Default)]
pub struct SchemaNodeMap {
    nodes: IndexMap<String, SchemaNode>,
}

impl SchemaNodeMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node under its normalized path.
    ///
    /// The first node for a path wins; returns false when the path was
    /// already present.
    pub fn insert(&mut self, mut node: SchemaNode) -> bool {
        let key = paths::normalize(&node.path);
        if self.nodes.contains_key(&key) {
            return false;
        }
        node.doc_order_index = self.nodes.len();
        node.path = key.clone();
        self.nodes.insert(key, node);
        true
    }

    /// Node for a path, in any index or encoded form
    pub fn get(&self, path: &str) -> Option<&SchemaNode> {
        self.nodes.get(&lookup_key(path))
    }

    /// Mutable node for a path
    pub fn get_mut(&mut self, path: &str) -> Option<&mut SchemaNode> {
        self.nodes.get_mut(&lookup_key(path))
    }

    /// True if a node exists for the path
    pub fn contains(&self, path: &str) -> bool {
        self.nodes.contains_key(&lookup_key(path))
    }

    /// All nodes in walk order
    pub fn values(&self) -> impl Iterator<Item = &SchemaNode> {
        self.nodes.values()
    }

    /// Paths of element nodes in walk order
    pub fn element_keys(&self) -> Vec<&str> {
        self.keys_of(NodeKind::Element)
    }

    /// Paths of attribute nodes in walk order
    pub fn attribute_keys(&self) -> Vec<&str> {
        self.keys_of(NodeKind::Attribute)
    }

    fn keys_of(&self, kind: NodeKind) -> Vec<&str> {
        self.nodes
            .values()
            .filter(|n| n.kind == kind)
            .map(|n| n.path.as_str())
            .collect()
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

fn lookup_key(path: &str) -> String {
    paths::normalize(&paths::decode(path))
}
