//! Read-only queries over a mined schema and its template
//!
//! [`SchemaHelper`] answers the questions an editor asks about a path in an
//! instance document: can it repeat, is it required, which compositor
//! orders its children, what does a fresh copy of it look like. Paths may
//! carry `[N]` or encoded `_N_` indices; lookups always go through the
//! normalized form.

use crate::datatypes::{BuiltinDatatypes, DatatypeValidator};
use crate::definitions::{CompositorKind, Compositor, Definition, SimpleVariety};
use crate::documents::{Document, Element};
use crate::error::{Error, Result, ValidationError};
use crate::miner::{DefinitionMiner, MinedSchema};
use crate::nodes::{SchemaNode, SchemaNodeMap};
use crate::paths;
use crate::settings::{RequiredContentPolicy, Settings};
use crate::walker::{StructureWalker, Template};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::{debug, trace};

const MAX_TYPE_STEPS: usize = 64;

/// Query facade over a schema and its template document
pub struct SchemaHelper {
    schema: MinedSchema,
    template: Template,
    validator: Box<dyn DatatypeValidator>,
    minimal: OnceCell<Document>,
}

impl std::fmt::Debug for SchemaHelper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaHelper")
            .field("location", &self.schema.location)
            .field("root", &self.root_element_name())
            .field("nodes", &self.template.nodes.len())
            .finish()
    }
}

impl SchemaHelper {
    /// Mine the schema at `location` with default settings and expand its
    /// template
    pub fn new(location: &str, root_element: Option<&str>) -> Result<Self> {
        Self::with_settings(location, root_element, Settings::default())
    }

    /// Mine and expand with explicit settings
    pub fn with_settings(
        location: &str,
        root_element: Option<&str>,
        settings: Settings,
    ) -> Result<Self> {
        let schema = DefinitionMiner::with_settings(settings).mine(location, root_element)?;
        Self::from_mined(schema)
    }

    /// Expand the template of an already mined schema
    pub fn from_mined(schema: MinedSchema) -> Result<Self> {
        let template = StructureWalker::new(&schema).expand()?;
        Ok(Self {
            schema,
            template,
            validator: Box::new(BuiltinDatatypes::new()),
            minimal: OnceCell::new(),
        })
    }

    /// Replace the datatype validator used by [`Self::check_valid_value`]
    pub fn with_validator(mut self, validator: Box<dyn DatatypeValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// The mined schema
    pub fn schema(&self) -> &MinedSchema {
        &self.schema
    }

    /// The expanded template
    pub fn template(&self) -> &Template {
        &self.template
    }

    /// The template document
    pub fn instance_document(&self) -> &Document {
        &self.template.document
    }

    /// Schema nodes by path
    pub fn nodes(&self) -> &SchemaNodeMap {
        &self.template.nodes
    }

    /// Settings the schema was mined with
    pub fn settings(&self) -> &Settings {
        &self.schema.settings
    }

    /// True when instance names carry namespace prefixes
    pub fn namespace_enabled(&self) -> bool {
        self.template.namespace_enabled
    }

    /// Instance name of the root element
    pub fn root_element_name(&self) -> String {
        self.schema.root_element_name()
    }

    /// Target namespace of the root schema file, empty when none
    pub fn target_namespace(&self) -> &str {
        self.schema
            .names
            .registry
            .target_namespace_uri()
            .unwrap_or_default()
    }

    /// Location of the root schema file
    pub fn schema_location(&self) -> String {
        self.schema.location.as_str()
    }

    /// Schema node for a path
    pub fn schema_node(&self, path: &str) -> Option<&SchemaNode> {
        let node = self.template.nodes.get(path);
        if node.is_none() {
            trace!(path, "no schema node");
        }
        node
    }

    /// Schema node of the parent of a path
    pub fn parent_node(&self, path: &str) -> Option<&SchemaNode> {
        let parent = paths::parent(&paths::decode(path));
        if parent.is_empty() {
            return None;
        }
        self.template.nodes.get(&parent)
    }

    /// Mark the node at `path` read-only; false when no node exists
    pub fn set_read_only(&mut self, path: &str) -> bool {
        match self.template.nodes.get_mut(path) {
            Some(node) => {
                node.read_only = true;
                true
            }
            None => false,
        }
    }

    /// Global definition by instance-level QName
    pub fn global_def(&self, qualified_name: &str) -> Option<Arc<Definition>> {
        self.schema
            .definitions
            .lookup(qualified_name, &self.schema.names.registry)
            .or_else(|| {
                let root = &self.schema.root_key;
                self.schema.resolve(qualified_name, root)
            })
    }

    /// Type definition of the node at a path
    pub fn global_def_for_path(&self, path: &str) -> Option<Arc<Definition>> {
        self.schema_node(path).map(|n| Arc::clone(&n.type_def))
    }

    /// Content model of the node at a path
    pub fn compositor(&self, path: &str) -> Option<&Compositor> {
        self.schema_node(path)?.type_def.compositor()
    }

    /// Content model of the parent of a path
    pub fn parent_compositor(&self, path: &str) -> Option<&Compositor> {
        self.parent_node(path)?.type_def.compositor()
    }

    /// True when the node's type has a content model
    pub fn has_compositor(&self, path: &str) -> bool {
        self.compositor(path).is_some()
    }

    /// True when the node's content model is a choice
    pub fn has_choice_compositor(&self, path: &str) -> bool {
        self.compositor_kind(path) == Some(CompositorKind::Choice)
    }

    /// True when the node's content model is a sequence
    pub fn has_sequence_compositor(&self, path: &str) -> bool {
        self.compositor_kind(path) == Some(CompositorKind::Sequence)
    }

    fn compositor_kind(&self, path: &str) -> Option<CompositorKind> {
        self.compositor(path).map(|c| c.kind)
    }

    /// True when the node is a member of its parent's choice
    pub fn is_choice_member(&self, path: &str) -> bool {
        self.schema_node(path).map_or(false, |n| n.choice_member)
    }

    /// True when the node has a choice content model that may repeat
    pub fn is_multi_choice_element(&self, path: &str) -> bool {
        self.compositor(path)
            .map_or(false, |c| c.kind == CompositorKind::Choice && c.occurs.is_repeating())
    }

    /// True when the node is the only member of its parent's compositor
    pub fn is_singleton(&self, path: &str) -> bool {
        self.parent_compositor(path)
            .map_or(false, |c| c.members.len() == 1)
    }

    /// True when more than one occurrence of the node is allowed.
    ///
    /// Enumerations with maxOccurs > 1 are multi-selects, not repeating
    /// elements. A lone member of a repeating compositor repeats too.
    pub fn is_repeating_element(&self, path: &str) -> bool {
        let Some(node) = self.schema_node(path) else {
            return false;
        };
        if node.occurs.is_repeating() && !self.is_enumeration_type(&node.type_def) {
            return true;
        }
        self.parent_compositor(path)
            .map_or(false, |c| c.members.len() == 1 && c.occurs.is_repeating())
    }

    /// True when expansion stopped at the node because its type recurses
    pub fn is_recursive_element(&self, path: &str) -> bool {
        self.schema_node(path).map_or(false, |n| n.recursive)
    }

    /// True when the node is the single, complex, repeating child of its
    /// parent
    pub fn is_repeating_complex_singleton(&self, path: &str) -> bool {
        self.has_repeating_complex_singleton(&paths::parent(&paths::decode(path)))
    }

    /// True when the node at `path` holds a single complex child that
    /// repeats
    pub fn has_repeating_complex_singleton(&self, path: &str) -> bool {
        self.repeating_complex_singleton_child_name(path).is_some()
    }

    /// Name of the single complex repeating child of the node at `path`
    pub fn repeating_complex_singleton_child_name(&self, path: &str) -> Option<String> {
        let normalized = paths::normalize(&paths::decode(path));
        let element = self.template.element(&normalized)?;
        let [child] = element.children.as_slice() else {
            return None;
        };
        let child_path = paths::join(&normalized, &child.name);
        let node = self.schema_node(&child_path)?;
        if matches!(node.type_def.as_ref(), Definition::Complex(_))
            && self.is_repeating_element(&child_path)
        {
            Some(child.name.clone())
        } else {
            None
        }
    }

    /// True when the node stands for an `xs:any` wildcard
    pub fn is_any_type_element(&self, path: &str) -> bool {
        self.schema_node(&self.decode_any_type_path(path))
            .map_or(false, |n| {
                matches!(n.type_def.as_ref(), Definition::BuiltIn(b) if b.is_any())
            })
    }

    /// True when the node's type is an enumeration and it may occur
    /// without bound
    pub fn is_multi_select(&self, path: &str) -> bool {
        self.schema_node(path).map_or(false, |n| {
            self.is_enumeration_type(&n.type_def) && n.occurs.is_unbounded()
        })
    }

    /// True when the node's content is a sequence of exactly one element
    /// whose type is an enumeration
    pub fn has_multi_select(&self, path: &str) -> bool {
        let Some(node) = self.schema_node(path) else {
            return false;
        };
        if !node.is_element() {
            return false;
        }
        let Some(compositor) = node.type_def.compositor() else {
            return false;
        };
        if compositor.kind != CompositorKind::Sequence {
            return false;
        }
        let [member] = compositor.members.as_slice() else {
            return false;
        };
        let child_path = paths::join(&node.path, &member.name);
        self.schema_node(&child_path)
            .map_or(false, |child| self.is_enumeration_type(&child.type_def))
    }

    /// [`Self::has_multi_select`] for an optional node
    pub fn has_optional_multi_select(&self, path: &str) -> bool {
        self.has_multi_select(path)
            && self.schema_node(path).map_or(false, |n| n.occurs.min == 0)
    }

    /// [`Self::has_multi_select`] for a required node
    pub fn has_required_multi_select(&self, path: &str) -> bool {
        self.has_multi_select(path)
            && self.schema_node(path).map_or(false, |n| n.occurs.min > 0)
    }

    /// True for a required element of complex type
    pub fn is_required_branch(&self, path: &str) -> bool {
        self.schema_node(path).map_or(false, |n| {
            n.is_element() && matches!(n.type_def.as_ref(), Definition::Complex(_)) && n.is_required()
        })
    }

    /// True for an attribute with `use="required"`
    pub fn is_required_attribute(&self, path: &str) -> bool {
        self.schema_node(path)
            .map_or(false, |n| n.is_attribute() && n.is_required())
    }

    /// True when the element must carry text content
    pub fn is_required_content_element(&self, path: &str) -> bool {
        let Some(node) = self.schema_node(path) else {
            return false;
        };
        if node.is_attribute() {
            return false;
        }
        let Definition::Complex(ct) = node.type_def.as_ref() else {
            return node.is_required();
        };
        match self.schema.settings.required_content {
            RequiredContentPolicy::DerivedNonString if ct.is_derived() => {
                !matches!(node.validating_type.as_ref(), Definition::BuiltIn(b) if b.is_string())
            }
            _ => node.is_required(),
        }
    }

    /// True for an enumeration, or a union whose members are all
    /// enumerations
    pub fn is_enumeration_type(&self, def: &Definition) -> bool {
        self.is_enumeration_at(def, 0)
    }

    fn is_enumeration_at(&self, def: &Definition, depth: usize) -> bool {
        let Definition::Simple(st) = def else {
            return false;
        };
        if st.is_enumeration() {
            return true;
        }
        if !st.is_union() || depth > MAX_TYPE_STEPS {
            return false;
        }
        let members = self.union_members(def);
        !members.is_empty() && members.iter().all(|m| self.is_enumeration_at(m, depth + 1))
    }

    /// True for a union of enumerations plus exactly one string member
    pub fn is_combo_union_type(&self, def: &Definition) -> bool {
        let Definition::Simple(st) = def else {
            return false;
        };
        if !st.is_union() {
            return false;
        }
        let mut string_member = false;
        for member in self.union_members(def) {
            if self.is_enumeration_type(&member) {
                continue;
            }
            let is_string = matches!(member.as_ref(), Definition::BuiltIn(b) if b.is_string());
            if is_string && !string_member {
                string_member = true;
            } else {
                return false;
            }
        }
        string_member
    }

    /// Enumerated values of a type; union members are concatenated
    pub fn enumeration_values(&self, def: &Definition) -> Vec<String> {
        let mut values = Vec::new();
        self.collect_enumeration_values(def, &mut values, 0);
        values
    }

    fn collect_enumeration_values(&self, def: &Definition, values: &mut Vec<String>, depth: usize) {
        let Definition::Simple(st) = def else {
            return;
        };
        if depth > MAX_TYPE_STEPS {
            return;
        }
        if st.is_union() {
            for member in self.union_members(def) {
                self.collect_enumeration_values(&member, values, depth + 1);
            }
        } else {
            values.extend(st.enumeration_values().iter().cloned());
        }
    }

    fn union_members(&self, def: &Definition) -> Vec<Arc<Definition>> {
        let Definition::Simple(st) = def else {
            return Vec::new();
        };
        st.union_member_type_names()
            .iter()
            .filter_map(|name| self.schema.resolve(name, def.location()))
            .collect()
    }

    /// Names of the template children of the node at `path`, in order
    pub fn children_order(&self, path: &str) -> Vec<String> {
        let normalized = paths::normalize(&paths::decode(path));
        self.template
            .element(&normalized)
            .map(|e| e.children.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Rewrite a trailing `xs:any` step to the `*` wildcard used in
    /// instance documents, keeping its index
    pub fn encode_any_type_path(&self, path: &str) -> String {
        let any = self.schema.names.any_element_name();
        let leaf = paths::leaf(path);
        match leaf.strip_prefix(any.as_str()) {
            Some(rest) if rest.is_empty() || rest.starts_with('[') => {
                format!("{}/*{}", paths::parent(path), rest)
            }
            _ => path.to_string(),
        }
    }

    /// Rewrite a trailing `*` step back to the `xs:any` name the template
    /// uses
    pub fn decode_any_type_path(&self, path: &str) -> String {
        let leaf = paths::leaf(path);
        match leaf.strip_prefix('*') {
            Some(rest) => format!(
                "{}/{}{}",
                paths::parent(path),
                self.schema.names.any_element_name(),
                rest
            ),
            None => path.to_string(),
        }
    }

    /// Check a value against a named type
    pub fn check_valid_value(&self, type_name: &str, value: &str) -> Result<()> {
        let def = self
            .global_def(type_name)
            .ok_or_else(|| Error::UnresolvedReference {
                name: type_name.to_string(),
                context: "value check".to_string(),
            })?;
        self.check_value(&def, value, 0).map_err(|err| match err {
            Error::Validation(e) if e.type_name.is_none() => {
                Error::Validation(e.with_type(type_name).with_value(value))
            }
            other => other,
        })
    }

    /// Check a value against a type definition
    pub fn check_value_for(&self, def: &Definition, value: &str) -> Result<()> {
        self.check_value(def, value, 0)
    }

    fn check_value(&self, def: &Definition, value: &str, depth: usize) -> Result<()> {
        if depth > MAX_TYPE_STEPS {
            return Err(Error::LimitExceeded(format!(
                "type derivation of {} is too deep to check values",
                def.name()
            )));
        }
        match def {
            Definition::BuiltIn(b) => self.validator.validate(&b.info.name, value),
            Definition::Simple(st) => match &st.variety {
                SimpleVariety::Restriction { enumeration, .. } if !enumeration.is_empty() => {
                    if enumeration.iter().any(|v| v == value) {
                        Ok(())
                    } else {
                        Err(Error::Validation(
                            ValidationError::new(format!(
                                "value is not one of {}",
                                enumeration.join(", ")
                            ))
                            .with_type(def.name())
                            .with_value(value),
                        ))
                    }
                }
                SimpleVariety::Restriction { base, .. } => match base {
                    Some(base) => self.check_named(base, def, value, depth),
                    None => Ok(()),
                },
                SimpleVariety::List { item_type } => match item_type {
                    Some(item) => value
                        .split_whitespace()
                        .try_for_each(|v| self.check_named(item, def, v, depth)),
                    None => Ok(()),
                },
                SimpleVariety::Union { .. } => {
                    let members = self.union_members(def);
                    if members.is_empty()
                        || members.iter().any(|m| self.check_value(m, value, depth + 1).is_ok())
                    {
                        Ok(())
                    } else {
                        Err(Error::Validation(
                            ValidationError::new("value matches no member of the union")
                                .with_type(def.name())
                                .with_value(value),
                        ))
                    }
                }
            },
            Definition::Complex(ct) if ct.has_simple_content() => {
                match ct.derivation.as_ref() {
                    Some(derivation) => self.check_named(&derivation.base, def, value, depth),
                    None => Ok(()),
                }
            }
            _ => Ok(()),
        }
    }

    fn check_named(&self, name: &str, context: &Definition, value: &str, depth: usize) -> Result<()> {
        match self.schema.resolve(name, context.location()) {
            Some(def) => self.check_value(&def, value, depth + 1),
            None => {
                debug!(type_name = name, "unresolved type accepts any value");
                Ok(())
            }
        }
    }

    /// A copy of the template holding only required content.
    ///
    /// Optional attributes and elements, choice members, wildcards and
    /// abstract elements are removed throughout.
    pub fn minimal_document(&self) -> Document {
        self.minimal
            .get_or_init(|| {
                let mut document = self.template.document.clone();
                let root_path = paths::join("", &document.root.name);
                self.prune(&mut document.root, &root_path);
                debug!(root = %root_path, "built minimal document");
                document
            })
            .clone()
    }

    /// A fresh, pruned copy of the template element at `path`.
    ///
    /// Substitution members and abstract elements come from the fragment
    /// saved on their node.
    pub fn new_element(&self, path: &str) -> Option<Element> {
        let normalized = paths::normalize(&paths::decode(path));
        let node = self.schema_node(&normalized)?;
        let mut element = match &node.fragment {
            Some(fragment) => fragment.clone(),
            None => self.template.element(&normalized)?.clone(),
        };
        self.prune(&mut element, &normalized);
        Some(element)
    }

    fn prune(&self, element: &mut Element, path: &str) {
        let nodes = &self.template.nodes;
        element.attributes.retain(|name, _| {
            nodes
                .get(&paths::join_attribute(path, name))
                .map_or(true, SchemaNode::is_required)
        });
        element.children.retain(|child| {
            let child_path = paths::join(path, &child.name);
            match nodes.get(&child_path) {
                Some(node) => {
                    node.is_required()
                        && !node.is_abstract
                        && !node.choice_member
                        && !self.is_any_type_element(&child_path)
                }
                None => {
                    trace!(path = %child_path, "keeping element without schema node");
                    true
                }
            }
        });
        for child in &mut element.children {
            let child_path = paths::join(path, &child.name);
            self.prune(child, &child_path);
        }
    }
}
