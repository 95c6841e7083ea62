//! Template expansion
//!
//! [`StructureWalker`] expands the root element declaration of a
//! [`MinedSchema`] into a template document holding one example of every
//! element and attribute, and records a [`SchemaNode`] per template path.
//!
//! The walker keeps a namespace stack and a reader stack. Entering a
//! definition pushes the definition's namespace and the reader of the file
//! that defined it, so unqualified names always resolve in the context of
//! the file they were written in.

use crate::definitions::{
    xsd_attrs, xsd_elements, BuiltIn, DefKey, Definition, Occurs,
};
use crate::documents::{Document, Element};
use crate::error::{Error, Result};
use crate::miner::MinedSchema;
use crate::names;
use crate::namespaces::Namespace;
use crate::nodes::{AttributeUse, SchemaNode, SchemaNodeMap};
use crate::paths;
use crate::reader::{unresolved_name, SchemaReader};
use crate::{XML_NAMESPACE, XSD_NAMESPACE, XSI_NAMESPACE};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, trace};

/// Name of the scratch element the template root is built under
const HATRACK: &str = "hatrack";

const MAX_DERIVATION_STEPS: usize = 64;

/// Schema components that never produce template content
const IGNORED_COMPONENTS: &[&str] = &[
    xsd_elements::ANY_ATTRIBUTE,
    xsd_elements::SIMPLE_TYPE,
    xsd_elements::COMPLEX_TYPE,
    xsd_elements::ANNOTATION,
    "enumeration",
    "pattern",
    "length",
    "minLength",
    "maxLength",
    "minInclusive",
    "maxInclusive",
    "minExclusive",
    "maxExclusive",
    "totalDigits",
    "fractionDigits",
    "whiteSpace",
    "key",
    "keyref",
    "unique",
    "selector",
    "field",
    "assert",
    "assertion",
    "openContent",
];

/// The expanded template
#[derive(Debug, Clone)]
pub struct Template {
    /// Instance-shaped document with one example of every node
    pub document: Document,
    /// Facts per normalized path
    pub nodes: SchemaNodeMap,
    /// True when instance names carry namespace prefixes
    pub namespace_enabled: bool,
}

impl Template {
    /// Path of the root element
    pub fn root_path(&self) -> String {
        paths::join("", &self.document.root.name)
    }

    /// Template element at a path
    pub fn element(&self, path: &str) -> Option<&Element> {
        self.document.select(&paths::decode(path))
    }
}

/// Declaration facts carried from an element declaration to its node
#[derive(Debug, Default)]
struct ElementFacts {
    occurs: Occurs,
    nillable: bool,
    fixed: Option<String>,
    is_abstract: bool,
    substitution_group: Option<String>,
    head_element_name: Option<String>,
    substitution_members: Vec<String>,
}

/// Expands a mined schema into a [`Template`]
pub struct StructureWalker<'a> {
    schema: &'a MinedSchema,
    ns_stack: Vec<String>,
    reader_stack: Vec<&'a SchemaReader>,
    nodes: SchemaNodeMap,
    depth: usize,
}

impl<'a> StructureWalker<'a> {
    /// Walker over a mined schema
    pub fn new(schema: &'a MinedSchema) -> Self {
        Self {
            schema,
            ns_stack: Vec::new(),
            reader_stack: Vec::new(),
            nodes: SchemaNodeMap::new(),
            depth: 0,
        }
    }

    /// Expand the root element into the template
    pub fn expand(mut self) -> Result<Template> {
        let schema = self.schema;
        if let Some(reader) = schema.root_reader() {
            self.reader_stack.push(reader);
            self.ns_stack.push(reader.target_namespace.uri.clone());
        }

        let mut hatrack = Element::new(HATRACK);
        let root = Arc::clone(&schema.root_element);
        let mut visited = HashSet::new();
        self.expand_reference(root, Occurs::once(), &mut hatrack, "", &mut visited)?;

        let mut root = hatrack
            .children
            .into_iter()
            .next()
            .ok_or_else(|| Error::Schema("root element produced no template content".to_string()))?;
        self.declare_namespaces(&mut root);

        let mut document = Document::new(root);
        self.detach_substitutes(&mut document);
        debug!(
            nodes = self.nodes.len(),
            root = %document.root.name,
            "expanded template"
        );

        Ok(Template {
            document,
            nodes: self.nodes,
            namespace_enabled: schema.names.namespace_enabled,
        })
    }

    fn enter(&mut self, def: &Definition) {
        let schema = self.schema;
        if let Some(reader) = schema.reader(def.location()) {
            self.reader_stack.push(reader);
            self.ns_stack.push(def.namespace_uri().to_string());
        }
    }

    fn leave(&mut self, def: &Definition) {
        if self.schema.reader(def.location()).is_some() {
            self.reader_stack.pop();
            self.ns_stack.pop();
        }
    }

    fn current_ns(&self) -> &str {
        self.ns_stack.last().map(String::as_str).unwrap_or("")
    }

    /// Resolve a QName through the reader stack, innermost file first
    fn resolve(&self, qualified_name: &str) -> Option<Arc<Definition>> {
        self.reader_stack
            .iter()
            .rev()
            .find_map(|reader| reader.resolve(qualified_name, &self.schema.definitions))
    }

    fn require(&self, qualified_name: &str, what: &str) -> Result<Arc<Definition>> {
        if let Some(def) = self.resolve(qualified_name) {
            return Ok(def);
        }
        let Some(reader) = self.reader_stack.last() else {
            return Err(Error::UnresolvedReference {
                name: qualified_name.trim().to_string(),
                context: format!("{} in schema", what),
            });
        };
        Err(unresolved_name(
            qualified_name,
            &reader.namespaces,
            &format!("{} in {}", what, reader.location),
        ))
    }

    fn string_type() -> Arc<Definition> {
        Arc::new(Definition::BuiltIn(BuiltIn::new("string", XSD_NAMESPACE)))
    }

    fn process(&mut self, component: &Element, parent: &mut Element, parent_path: &str) -> Result<()> {
        match component.local_name() {
            xsd_elements::ELEMENT => self.process_element(component, parent, parent_path),
            xsd_elements::ATTRIBUTE => self.process_attribute(component, parent, parent_path),
            xsd_elements::SEQUENCE
            | xsd_elements::CHOICE
            | xsd_elements::ALL
            | xsd_elements::SIMPLE_CONTENT
            | xsd_elements::COMPLEX_CONTENT => self.process_children(component, parent, parent_path),
            xsd_elements::RESTRICTION => {
                debug!(
                    base = component.attribute(xsd_attrs::BASE).unwrap_or_default(),
                    path = parent_path,
                    "trusting restriction members without checking the base"
                );
                self.process_children(component, parent, parent_path)
            }
            xsd_elements::EXTENSION => self.process_extension(component, parent, parent_path),
            xsd_elements::GROUP => self.process_group(component, parent, parent_path),
            xsd_elements::ATTRIBUTE_GROUP => {
                self.process_attribute_group(component, parent, parent_path)
            }
            xsd_elements::ANY => self.process_any(component, parent, parent_path),
            other if IGNORED_COMPONENTS.contains(&other) => {
                trace!(component = other, path = parent_path, "skipping");
                Ok(())
            }
            other => Err(Error::Schema(format!(
                "unsupported schema component '{}' under {}",
                other, parent_path
            ))),
        }
    }

    fn process_children(
        &mut self,
        component: &Element,
        parent: &mut Element,
        parent_path: &str,
    ) -> Result<()> {
        for child in &component.children {
            self.process(child, parent, parent_path)?;
        }
        Ok(())
    }

    fn process_element(
        &mut self,
        component: &Element,
        parent: &mut Element,
        parent_path: &str,
    ) -> Result<()> {
        if let Some(reference) = component.non_empty_attribute(xsd_attrs::REF) {
            let def = self.require(reference, "element reference")?;
            if def.as_global_element().is_none() {
                return Err(Error::UnresolvedReference {
                    name: reference.to_string(),
                    context: format!("element reference under {}", parent_path),
                });
            }
            let mut visited = HashSet::new();
            return self.expand_reference(
                def,
                Occurs::from_element(component),
                parent,
                parent_path,
                &mut visited,
            );
        }

        let Some(local) = component.non_empty_attribute(xsd_attrs::NAME) else {
            return Err(Error::Schema(format!(
                "element without name or ref under {}",
                parent_path
            )));
        };
        let name = self.schema.names.name(self.current_ns(), local);
        let type_def = match component.non_empty_attribute(xsd_attrs::TYPE) {
            Some(type_name) => self.require(type_name, "element type")?,
            None => Self::string_type(),
        };
        let facts = ElementFacts {
            occurs: Occurs::from_element(component),
            nillable: crate::definitions::parse_bool(component.attribute(xsd_attrs::NILLABLE)),
            fixed: component.attribute(xsd_attrs::FIXED).map(str::to_string),
            ..ElementFacts::default()
        };
        self.emit_element(name, type_def, facts, parent, parent_path)
    }

    /// Expand a referenced global element: its substitution members first,
    /// then the element itself
    fn expand_reference(
        &mut self,
        def: Arc<Definition>,
        occurs: Occurs,
        parent: &mut Element,
        parent_path: &str,
        visited: &mut HashSet<DefKey>,
    ) -> Result<()> {
        if !visited.insert(def.key()) {
            return Ok(());
        }
        let Some(global) = def.as_global_element() else {
            return Ok(());
        };
        for member_key in &global.substitution_members {
            if let Some(member) = self.schema.definitions.get_key(member_key) {
                trace!(head = %def.name(), member = %member.name(), "expanding substitution member");
                self.expand_reference(member, occurs, parent, parent_path, visited)?;
            }
        }

        self.enter(&def);
        let result = self.expand_global(&def, occurs, parent, parent_path);
        self.leave(&def);
        result
    }

    fn expand_global(
        &mut self,
        def: &Arc<Definition>,
        occurs: Occurs,
        parent: &mut Element,
        parent_path: &str,
    ) -> Result<()> {
        let Some(global) = def.as_global_element() else {
            return Ok(());
        };
        let type_def = match &global.type_name {
            Some(type_name) => self.require(type_name, "element type")?,
            None => Self::string_type(),
        };
        let head_element_name = match &global.substitution_group {
            Some(head) => Some(
                self.resolve(head)
                    .map(|h| self.schema.instance_name(&h))
                    .unwrap_or_else(|| names::local_name(head).to_string()),
            ),
            None => None,
        };
        let substitution_members = global
            .substitution_members
            .iter()
            .map(|k| self.schema.names.name(&k.namespace, &k.name))
            .collect();
        let facts = ElementFacts {
            occurs,
            nillable: global.nillable,
            fixed: global.fixed.clone(),
            is_abstract: global.is_abstract,
            substitution_group: global.substitution_group.clone(),
            head_element_name,
            substitution_members,
        };
        let name = self.schema.instance_name(def);
        self.emit_element(name, type_def, facts, parent, parent_path)
    }

    fn emit_element(
        &mut self,
        name: String,
        type_def: Arc<Definition>,
        facts: ElementFacts,
        parent: &mut Element,
        parent_path: &str,
    ) -> Result<()> {
        let path = paths::join(parent_path, &name);
        if self.nodes.contains(&path) {
            trace!(path = %path, "element already expanded under this parent");
            return Ok(());
        }

        let mut element = Element::new(name.clone());
        let mut node = SchemaNode::element(path.clone(), Arc::clone(&type_def), facts.occurs);
        node.nillable = facts.nillable;
        node.is_abstract = facts.is_abstract;
        node.substitution_group = facts.substitution_group;
        node.head_element_name = facts.head_element_name;
        node.substitution_members = facts.substitution_members;
        node.fixed = facts.fixed.clone();
        node.choice_member = self.is_choice_member(parent_path, &name);
        node.validating_type = self.validating_type(&type_def);
        if let Some(fixed) = &facts.fixed {
            element.set_text(fixed.clone());
            node.read_only = true;
        }

        match type_def.as_ref() {
            Definition::BuiltIn(_) | Definition::Simple(_) => {
                self.nodes.insert(node);
            }
            Definition::Complex(_) => {
                let key = type_def.key();
                if self.schema.cycles.is_cyclic(&key) && self.is_recursive(parent_path, &key) {
                    debug!(path = %path, type_name = %key, "recursion bound reached, not expanding");
                    node.recursive = true;
                    self.nodes.insert(node);
                    parent.add_child(element);
                    return Ok(());
                }
                self.nodes.insert(node);

                self.depth += 1;
                self.schema.settings.limits.check_expansion_depth(self.depth)?;
                self.enter(&type_def);
                let mut result = Ok(());
                for child in &type_def.element().children {
                    result = self.process(child, &mut element, &path);
                    if result.is_err() {
                        break;
                    }
                }
                self.leave(&type_def);
                self.depth -= 1;
                result?;
            }
            other => {
                return Err(Error::Schema(format!(
                    "'{}' is a {}, not a type, at {}",
                    other.name(),
                    other.kind(),
                    path
                )))
            }
        }
        parent.add_child(element);
        Ok(())
    }

    fn process_extension(
        &mut self,
        component: &Element,
        parent: &mut Element,
        parent_path: &str,
    ) -> Result<()> {
        if let Some(base) = component.non_empty_attribute(xsd_attrs::BASE) {
            let base_def = self.require(base, "extension base")?;
            if let Definition::Complex(_) = base_def.as_ref() {
                self.depth += 1;
                self.schema.settings.limits.check_expansion_depth(self.depth)?;
                self.enter(&base_def);
                let mut result = Ok(());
                for child in &base_def.element().children {
                    result = self.process(child, parent, parent_path);
                    if result.is_err() {
                        break;
                    }
                }
                self.leave(&base_def);
                self.depth -= 1;
                result?;
            }
        }
        self.process_children(component, parent, parent_path)
    }

    fn process_group(
        &mut self,
        component: &Element,
        parent: &mut Element,
        parent_path: &str,
    ) -> Result<()> {
        let Some(reference) = component.non_empty_attribute(xsd_attrs::REF) else {
            return self.process_children(component, parent, parent_path);
        };
        let def = self.require(reference, "group reference")?;
        if !matches!(def.as_ref(), Definition::ModelGroup(_)) {
            return Err(Error::UnresolvedReference {
                name: reference.to_string(),
                context: format!("group reference under {}", parent_path),
            });
        }
        self.enter(&def);
        let result = self.process_children(def.element(), parent, parent_path);
        self.leave(&def);
        result
    }

    fn process_attribute_group(
        &mut self,
        component: &Element,
        parent: &mut Element,
        parent_path: &str,
    ) -> Result<()> {
        let Some(reference) = component.non_empty_attribute(xsd_attrs::REF) else {
            return self.process_children(component, parent, parent_path);
        };
        let def = self.require(reference, "attributeGroup reference")?;
        if !matches!(def.as_ref(), Definition::AttributeGroup(_)) {
            return Err(Error::UnresolvedReference {
                name: reference.to_string(),
                context: format!("attributeGroup reference under {}", parent_path),
            });
        }
        self.enter(&def);
        let result = self.process_children(def.element(), parent, parent_path);
        self.leave(&def);
        result
    }

    fn process_attribute(
        &mut self,
        component: &Element,
        parent: &mut Element,
        parent_path: &str,
    ) -> Result<()> {
        let attribute_use = AttributeUse::from_attribute(component.attribute(xsd_attrs::USE));
        if attribute_use == AttributeUse::Prohibited {
            trace!(path = parent_path, "skipping prohibited attribute");
            return Ok(());
        }

        let (name, type_def, fixed) = if let Some(reference) =
            component.non_empty_attribute(xsd_attrs::REF)
        {
            let def = self.require(reference, "attribute reference")?;
            let uri = def.namespace_uri().to_string();
            let name = if uri != self.current_ns() || uri == XML_NAMESPACE {
                self.schema.names.registry.qualify(&uri, def.name())
            } else {
                def.name().to_string()
            };
            match def.as_ref() {
                Definition::GlobalAttribute(global) => {
                    self.enter(&def);
                    let type_def = match &global.type_name {
                        Some(type_name) => self.require(type_name, "attribute type"),
                        None => Ok(Self::string_type()),
                    };
                    self.leave(&def);
                    let fixed = component
                        .attribute(xsd_attrs::FIXED)
                        .map(str::to_string)
                        .or_else(|| global.fixed.clone());
                    (name, type_def?, fixed)
                }
                Definition::BuiltIn(_) => (name, Self::string_type(), None),
                _ => {
                    return Err(Error::UnresolvedReference {
                        name: reference.to_string(),
                        context: format!("attribute reference under {}", parent_path),
                    })
                }
            }
        } else {
            let Some(local) = component.non_empty_attribute(xsd_attrs::NAME) else {
                return Err(Error::Schema(format!(
                    "attribute without name or ref under {}",
                    parent_path
                )));
            };
            let type_def = match component.non_empty_attribute(xsd_attrs::TYPE) {
                Some(type_name) => self.require(type_name, "attribute type")?,
                None => Self::string_type(),
            };
            let fixed = component.attribute(xsd_attrs::FIXED).map(str::to_string);
            (local.to_string(), type_def, fixed)
        };

        if parent.has_attribute(&name) {
            trace!(path = parent_path, attribute = %name, "attribute already present");
            return Ok(());
        }
        let path = paths::join_attribute(parent_path, &name);
        let mut node = SchemaNode::attribute(path, Arc::clone(&type_def), attribute_use);
        node.read_only = fixed.is_some();
        node.fixed = fixed.clone();
        self.nodes.insert(node);
        parent.set_attribute(name, fixed.unwrap_or_default());
        Ok(())
    }

    fn process_any(
        &mut self,
        component: &Element,
        parent: &mut Element,
        parent_path: &str,
    ) -> Result<()> {
        let name = self.schema.names.any_element_name();
        let path = paths::join(parent_path, &name);
        if self.nodes.contains(&path) {
            return Ok(());
        }
        let any_type = Arc::new(Definition::BuiltIn(BuiltIn::new("any", XSD_NAMESPACE)));
        let mut node = SchemaNode::element(path, any_type, Occurs::from_element(component));
        node.choice_member = self.is_choice_member(parent_path, &name);
        self.nodes.insert(node);
        parent.add_child(Element::new(name));
        Ok(())
    }

    fn is_choice_member(&self, parent_path: &str, name: &str) -> bool {
        self.nodes
            .get(parent_path)
            .and_then(|n| n.type_def.compositor())
            .map_or(false, |c| c.is_choice_member(name))
    }

    /// Walk the ancestors of a new node, counting repeated types
    fn is_recursive(&self, parent_path: &str, type_key: &DefKey) -> bool {
        let bound = self.schema.settings.limits.recursion_bound;
        let mut seen = vec![type_key.clone()];
        let mut level = 0;
        let mut path = parent_path.to_string();
        while !path.is_empty() {
            if let Some(node) = self.nodes.get(&path) {
                let key = node.type_def.key();
                if seen.contains(&key) {
                    level += 1;
                    if level >= bound {
                        return true;
                    }
                }
                seen.push(key);
            }
            path = paths::parent(&path);
        }
        false
    }

    /// Follow extension bases of complex types to the type values are
    /// checked against
    fn validating_type(&self, type_def: &Arc<Definition>) -> Arc<Definition> {
        let mut current = Arc::clone(type_def);
        for _ in 0..MAX_DERIVATION_STEPS {
            let Definition::Complex(ct) = current.as_ref() else {
                break;
            };
            let Some(base) = ct.extension_base() else {
                break;
            };
            let Some(next) = self.schema.resolve(base, current.location()) else {
                break;
            };
            current = next;
        }
        current
    }

    fn declare_namespaces(&self, root: &mut Element) {
        let names = &self.schema.names;
        let target = names
            .registry
            .target_namespace_uri()
            .unwrap_or_default()
            .to_string();
        let schema_location = format!("{} {}", target, self.schema.location);

        if names.namespace_enabled {
            root.declare_namespace(Namespace::new("xsi", XSI_NAMESPACE));
            root.set_attribute("xsi:schemaLocation", schema_location);
            for ns in names.registry.iter() {
                if ns.prefix.is_empty()
                    || ns.uri.is_empty()
                    || ns.uri == XSD_NAMESPACE
                    || ns.uri == XML_NAMESPACE
                    || ns.uri == XSI_NAMESPACE
                {
                    continue;
                }
                root.declare_namespace(ns.clone());
            }
        } else if !target.is_empty() {
            root.declare_namespace(Namespace::new("", target));
            root.declare_namespace(Namespace::new("xsi", XSI_NAMESPACE));
            root.set_attribute("xsi:schemaLocation", schema_location);
        }
    }

    /// Detach substitution members from the template and clear abstract
    /// elements, saving each fragment on its node
    fn detach_substitutes(&mut self, document: &mut Document) {
        let paths: Vec<String> = self
            .nodes
            .element_keys()
            .into_iter()
            .map(str::to_string)
            .collect();
        for path in paths {
            let Some(node) = self.nodes.get(&path) else {
                continue;
            };
            let (is_member, is_abstract) = (node.is_substitution_member(), node.is_abstract);
            if !is_member && !is_abstract {
                continue;
            }

            let mut fragment = None;
            if is_member {
                fragment = detach(document, &path);
            }
            if is_abstract {
                match fragment.as_mut() {
                    Some(detached) => detached.clear_content(),
                    None => {
                        if let Some(element) = document.select_mut(&path) {
                            element.clear_content();
                            fragment = Some(element.clone());
                        }
                    }
                }
            }
            if let (Some(node), Some(fragment)) = (self.nodes.get_mut(&path), fragment) {
                trace!(path = %path, "saved template fragment");
                node.fragment = Some(fragment);
            }
        }
    }
}

fn detach(document: &mut Document, path: &str) -> Option<Element> {
    let name = paths::node_name(path);
    let parent = document.select_mut(&paths::parent(path))?;
    let position = parent.children.iter().position(|c| c.name == name)?;
    Some(parent.children.remove(position))
}
