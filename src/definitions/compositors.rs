//! Compositors: ordered content models
//!
//! A [`Compositor`] is the effective `sequence`, `choice` or `all` of a
//! complex type or model group. Members are named with their instance
//! names, so they can be compared directly against template and document
//! element names.

use super::{
    xsd_attrs, xsd_elements, ComplexType, DefKey, Definition, GlobalDefMap, GlobalElement,
    ModelGroup,
};
use crate::documents::Element;
use crate::error::{Error, Result};
use crate::namespaces::InstanceNames;
use crate::reader::SchemaReader;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

/// Occurrence bounds (minOccurs, maxOccurs)
/// None for max means unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Occurs {
    /// Minimum number of occurrences (default 1)
    pub min: u32,
    /// Maximum number of occurrences (None = unbounded, default 1)
    pub max: Option<u32>,
}

impl Occurs {
    /// Create new occurrence bounds
    pub fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    /// Default occurrence (1, 1)
    pub fn once() -> Self {
        Self::new(1, Some(1))
    }

    /// Read `minOccurs`/`maxOccurs` from a declaration
    pub fn from_element(elem: &Element) -> Self {
        let min = elem
            .attribute(xsd_attrs::MIN_OCCURS)
            .and_then(|s| s.trim().parse::<u32>().ok())
            .unwrap_or(1);

        let max = match elem.attribute(xsd_attrs::MAX_OCCURS).map(str::trim) {
            Some("unbounded") => None,
            Some(s) => s.parse::<u32>().ok().or(Some(1)),
            None => Some(1),
        };

        Self::new(min, max)
    }

    /// True when maxOccurs is unbounded
    pub fn is_unbounded(&self) -> bool {
        self.max.is_none()
    }

    /// True when more than one occurrence is allowed
    pub fn is_repeating(&self) -> bool {
        self.max.map_or(true, |max| max > 1)
    }

    /// True when minOccurs is 0
    pub fn is_optional(&self) -> bool {
        self.min == 0
    }
}

impl Default for Occurs {
    fn default() -> Self {
        Self::once()
    }
}

/// Kind of compositor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum CompositorKind {
    /// Ordered sequence of members
    #[default]
    Sequence,
    /// One of several members
    Choice,
    /// Members in any order
    All,
}

impl CompositorKind {
    /// Parse from element local name
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            xsd_elements::SEQUENCE => Some(Self::Sequence),
            xsd_elements::CHOICE => Some(Self::Choice),
            xsd_elements::ALL => Some(Self::All),
            _ => None,
        }
    }
}

impl std::fmt::Display for CompositorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sequence => write!(f, "sequence"),
            Self::Choice => write!(f, "choice"),
            Self::All => write!(f, "all"),
        }
    }
}

/// Kind of compositor member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MemberKind {
    /// Local element declaration
    Element,
    /// Reference to a global element
    ElementRef,
    /// Reference to a model group
    GroupRef,
    /// Nested compositor
    Compositor,
    /// `any` wildcard
    Any,
}

/// One member of a compositor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositorMember {
    /// Kind of member
    pub kind: MemberKind,
    /// Instance name; the group's local name for group references; empty
    /// for nested compositors
    pub name: String,
    /// Occurrence bounds
    pub occurs: Occurs,
    /// Content of a group reference or nested compositor
    pub nested: Option<Compositor>,
    /// Instance names of elements substituting for a referenced head
    pub substitution_names: Vec<String>,
    /// True when the referenced element is abstract
    pub is_abstract: bool,
}

impl CompositorMember {
    fn new(kind: MemberKind, name: impl Into<String>, occurs: Occurs) -> Self {
        Self {
            kind,
            name: name.into(),
            occurs,
            nested: None,
            substitution_names: Vec::new(),
            is_abstract: false,
        }
    }

    /// True when an element of this name fills this member directly
    pub fn matches(&self, name: &str) -> bool {
        match self.kind {
            MemberKind::Element | MemberKind::Any => self.name == name,
            MemberKind::ElementRef => {
                self.name == name || self.substitution_names.iter().any(|n| n == name)
            }
            MemberKind::GroupRef | MemberKind::Compositor => false,
        }
    }

    /// True when an element of this name fills this member, looking into
    /// nested compositors
    pub fn contains(&self, name: &str) -> bool {
        self.matches(name) || self.nested.as_ref().map_or(false, |c| c.contains(name))
    }
}

/// An effective content model
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Compositor {
    /// Sequence, choice or all
    pub kind: CompositorKind,
    /// Occurrence bounds of the compositor itself
    pub occurs: Occurs,
    /// Members in declaration order, extension levels appended
    pub members: Vec<CompositorMember>,
}

impl Compositor {
    /// Create an empty compositor
    pub fn new(kind: CompositorKind, occurs: Occurs) -> Self {
        Self {
            kind,
            occurs,
            members: Vec::new(),
        }
    }

    /// Names of element, reference and wildcard members
    pub fn member_names(&self) -> Vec<&str> {
        self.members
            .iter()
            .filter(|m| {
                matches!(
                    m.kind,
                    MemberKind::Element | MemberKind::ElementRef | MemberKind::Any
                )
            })
            .map(|m| m.name.as_str())
            .collect()
    }

    /// Position of the member an element of this name belongs to.
    ///
    /// A name reached through a group reference or nested compositor gets
    /// the position of that member.
    pub fn index_of_member(&self, name: &str) -> Option<usize> {
        self.members
            .iter()
            .position(|m| m.kind != MemberKind::ElementRef && m.name == name)
            .or_else(|| self.members.iter().position(|m| m.name == name))
            .or_else(|| self.members.iter().position(|m| m.contains(name)))
    }

    /// True when some member, directly or nested, takes this name
    pub fn contains(&self, name: &str) -> bool {
        self.members.iter().any(|m| m.contains(name))
    }

    /// True when an element of this name sits inside a choice, either this
    /// compositor or one nested through inline compositors and group
    /// references
    pub fn is_choice_member(&self, name: &str) -> bool {
        if self.members.iter().any(|m| m.matches(name)) {
            return self.kind == CompositorKind::Choice;
        }
        self.members
            .iter()
            .filter_map(|m| m.nested.as_ref())
            .find(|c| c.contains(name))
            .map_or(false, |c| self.kind == CompositorKind::Choice || c.is_choice_member(name))
    }

    /// True when a direct member has this name
    pub fn has_member(&self, name: &str) -> bool {
        self.members.iter().any(|m| m.name == name)
    }

    /// Member an element of this name fills, matching substitution names
    pub fn member(&self, name: &str) -> Option<&CompositorMember> {
        self.members
            .iter()
            .find(|m| m.matches(name))
            .or_else(|| {
                self.members
                    .iter()
                    .filter_map(|m| m.nested.as_ref())
                    .find_map(|c| c.member(name))
            })
    }

    /// Every element name an instance may use, in member order.
    ///
    /// Group references and nested compositors are flattened; a
    /// substitution head contributes its members, then itself unless it is
    /// abstract.
    pub fn leaf_member_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for member in &self.members {
            match member.kind {
                MemberKind::Element | MemberKind::Any => names.push(member.name.clone()),
                MemberKind::ElementRef => {
                    names.extend(member.substitution_names.iter().cloned());
                    if !member.is_abstract {
                        names.push(member.name.clone());
                    }
                }
                MemberKind::GroupRef | MemberKind::Compositor => {
                    if let Some(nested) = &member.nested {
                        names.extend(nested.leaf_member_names());
                    }
                }
            }
        }
        names
    }

    /// Sum of member maxOccurs, `None` when any member is unbounded
    pub fn max_instance_elements(&self) -> Option<u32> {
        self.members
            .iter()
            .try_fold(0u32, |total, m| m.occurs.max.map(|max| total.saturating_add(max)))
    }
}

const MAX_GROUP_NESTING: usize = 64;

/// Computes effective compositors once every schema file is read
pub(crate) struct CompositorBuilder<'a> {
    pub defs: &'a GlobalDefMap,
    pub readers: &'a IndexMap<String, SchemaReader>,
    pub names: &'a InstanceNames,
}

impl<'a> CompositorBuilder<'a> {
    /// Effective compositor of a complex type.
    ///
    /// An extension under `complexContent` starts from the chain root's
    /// model and appends each level's own members, root first. A
    /// restriction keeps its own explicit members.
    pub fn for_complex(&self, ct: &ComplexType) -> Result<Option<Compositor>> {
        if ct.has_simple_content() {
            return Ok(None);
        }

        let mut extensions: Vec<(Option<Element>, String)> = Vec::new();
        let mut current = ct.clone();
        let root_model = loop {
            if !current.is_complex_extension() {
                break current
                    .own_model_element()
                    .cloned()
                    .map(|m| (m, current.info.location.clone()));
            }
            if extensions.len() > MAX_GROUP_NESTING {
                return Err(Error::Schema(format!(
                    "extension chain of '{}' is too deep",
                    ct.info.name
                )));
            }
            extensions.push((
                current.own_model_element().cloned(),
                current.info.location.clone(),
            ));
            let base_name = current.extension_base().unwrap_or_default().to_string();
            let base = self.resolve(&base_name, &current.info.location)?;
            match base.as_ref() {
                Definition::Complex(base_ct) => current = base_ct.clone(),
                _ => break None,
            }
        };

        let mut chain = root_model.into_iter().chain(
            extensions
                .into_iter()
                .rev()
                .filter_map(|(model, location)| model.map(|m| (m, location))),
        );

        let Some((first, first_location)) = chain.next() else {
            return Ok(None);
        };
        let mut compositor = self.build(&first, &first_location, 0)?;
        for (model, location) in chain {
            if model.local_name() == xsd_elements::GROUP {
                if let Some(member) = self.member(&model, &location, 0)? {
                    compositor.members.push(member);
                }
                continue;
            }
            for child in &model.children {
                if let Some(member) = self.member(child, &location, 0)? {
                    compositor.members.push(member);
                }
            }
        }
        Ok(Some(compositor))
    }

    /// Compositor of a named model group
    pub fn for_group(&self, group: &ModelGroup, depth: usize) -> Result<Option<Compositor>> {
        match group.model_element() {
            Some(model) => Ok(Some(self.build(model, &group.info.location, depth + 1)?)),
            None => Ok(None),
        }
    }

    fn build(&self, model: &Element, location: &str, depth: usize) -> Result<Compositor> {
        if depth > MAX_GROUP_NESTING {
            return Err(Error::Schema(format!(
                "model group nesting exceeds {} levels in {}",
                MAX_GROUP_NESTING, location
            )));
        }

        if model.local_name() == xsd_elements::GROUP {
            let group = self.group_ref(model, location)?;
            return Ok(self.for_group(&group, depth)?.unwrap_or_default());
        }

        let kind = CompositorKind::from_tag(model.local_name()).unwrap_or_default();
        let mut compositor = Compositor::new(kind, Occurs::from_element(model));
        for child in &model.children {
            if let Some(member) = self.member(child, location, depth)? {
                compositor.members.push(member);
            }
        }
        Ok(compositor)
    }

    fn member(
        &self,
        elem: &Element,
        location: &str,
        depth: usize,
    ) -> Result<Option<CompositorMember>> {
        let occurs = Occurs::from_element(elem);
        let member = match elem.local_name() {
            xsd_elements::ELEMENT => {
                if let Some(name) = elem.non_empty_attribute(xsd_attrs::NAME) {
                    let uri = self.reader(location)?.target_namespace.uri.clone();
                    CompositorMember::new(MemberKind::Element, self.names.name(&uri, name), occurs)
                } else if let Some(reference) = elem.non_empty_attribute(xsd_attrs::REF) {
                    let def = self.resolve(reference, location)?;
                    let global = def.as_global_element().ok_or_else(|| Error::UnresolvedReference {
                        name: reference.to_string(),
                        context: format!("element reference in {}", location),
                    })?;
                    let mut member = CompositorMember::new(
                        MemberKind::ElementRef,
                        self.names.name(def.namespace_uri(), def.name()),
                        occurs,
                    );
                    member.is_abstract = global.is_abstract;
                    member.substitution_names = self.substitution_names(global);
                    member
                } else {
                    return Ok(None);
                }
            }
            xsd_elements::GROUP => {
                let group = self.group_ref(elem, location)?;
                let mut member =
                    CompositorMember::new(MemberKind::GroupRef, group.info.name.clone(), occurs);
                member.nested = self.for_group(&group, depth + 1)?;
                member
            }
            xsd_elements::SEQUENCE | xsd_elements::CHOICE | xsd_elements::ALL => {
                let mut member = CompositorMember::new(MemberKind::Compositor, "", occurs);
                member.nested = Some(self.build(elem, location, depth + 1)?);
                member
            }
            xsd_elements::ANY => {
                CompositorMember::new(MemberKind::Any, self.names.any_element_name(), occurs)
            }
            _ => return Ok(None),
        };
        Ok(Some(member))
    }

    fn group_ref(&self, elem: &Element, location: &str) -> Result<ModelGroup> {
        let reference = elem.non_empty_attribute(xsd_attrs::REF).unwrap_or_default();
        match self.resolve(reference, location)?.as_ref() {
            Definition::ModelGroup(group) => Ok(group.clone()),
            _ => Err(Error::UnresolvedReference {
                name: reference.to_string(),
                context: format!("group reference in {}", location),
            }),
        }
    }

    fn substitution_names(&self, head: &GlobalElement) -> Vec<String> {
        let mut names = Vec::new();
        let mut visited: HashSet<DefKey> = HashSet::new();
        let mut pending: Vec<DefKey> = head.substitution_members.iter().rev().cloned().collect();
        while let Some(key) = pending.pop() {
            if !visited.insert(key.clone()) {
                continue;
            }
            if let Some(Definition::GlobalElement(member)) =
                self.defs.get(&key.name, &key.namespace).as_deref()
            {
                names.push(self.names.name(&key.namespace, &key.name));
                pending.extend(member.substitution_members.iter().rev().cloned());
            }
        }
        names
    }

    fn reader(&self, location: &str) -> Result<&'a SchemaReader> {
        self.readers
            .get(location)
            .ok_or_else(|| Error::Resource(format!("no reader for {}", location)))
    }

    fn resolve(&self, qname: &str, location: &str) -> Result<Arc<Definition>> {
        self.reader(location)?.require(qname, self.defs, location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(name: &str, occurs: Occurs) -> CompositorMember {
        CompositorMember::new(MemberKind::Element, name, occurs)
    }

    fn catalog() -> Compositor {
        let mut head = CompositorMember::new(MemberKind::ElementRef, "item", Occurs::new(0, None));
        head.substitution_names = vec!["book".to_string(), "magazine".to_string()];
        head.is_abstract = true;

        let mut group = CompositorMember::new(MemberKind::GroupRef, "extras", Occurs::once());
        let mut nested = Compositor::new(CompositorKind::Choice, Occurs::once());
        nested.members.push(element("note", Occurs::once()));
        group.nested = Some(nested);

        let mut compositor = Compositor::new(CompositorKind::Sequence, Occurs::once());
        compositor.members.push(element("title", Occurs::once()));
        compositor.members.push(head);
        compositor.members.push(group);
        compositor.members.push(element("tag", Occurs::new(0, None)));
        compositor
    }

    #[test]
    fn test_occurs_from_element() {
        let mut elem = Element::new("xs:element");
        assert_eq!(Occurs::from_element(&elem), Occurs::once());

        elem.set_attribute("minOccurs", "0");
        elem.set_attribute("maxOccurs", "unbounded");
        let occurs = Occurs::from_element(&elem);
        assert!(occurs.is_optional());
        assert!(occurs.is_unbounded());
        assert!(occurs.is_repeating());

        elem.set_attribute("maxOccurs", "1");
        assert!(!Occurs::from_element(&elem).is_repeating());
    }

    #[test]
    fn test_member_lookup() {
        let compositor = catalog();
        assert_eq!(compositor.member_names(), vec!["title", "item", "tag"]);
        assert_eq!(compositor.index_of_member("tag"), Some(3));
        assert_eq!(compositor.index_of_member("note"), Some(2));
        assert_eq!(compositor.index_of_member("book"), Some(1));
        assert_eq!(compositor.index_of_member("missing"), None);
        assert_eq!(compositor.member("magazine").unwrap().name, "item");
        assert_eq!(compositor.member("note").unwrap().name, "note");
        assert!(compositor.contains("note"));
        assert!(!compositor.has_member("note"));
    }

    #[test]
    fn test_choice_members_at_any_depth() {
        let compositor = catalog();
        assert!(compositor.is_choice_member("note"));
        assert!(!compositor.is_choice_member("title"));
        assert!(!compositor.is_choice_member("book"));
        assert!(!compositor.is_choice_member("missing"));

        // sequence(a, sequence(choice(b, c)), d)
        let mut choice = Compositor::new(CompositorKind::Choice, Occurs::once());
        choice.members.push(element("b", Occurs::once()));
        choice.members.push(element("c", Occurs::once()));
        let mut inner_choice = CompositorMember::new(MemberKind::Compositor, "", Occurs::once());
        inner_choice.nested = Some(choice);
        let mut inner = Compositor::new(CompositorKind::Sequence, Occurs::once());
        inner.members.push(inner_choice);
        let mut inner_sequence =
            CompositorMember::new(MemberKind::Compositor, "", Occurs::once());
        inner_sequence.nested = Some(inner);

        let mut outer = Compositor::new(CompositorKind::Sequence, Occurs::once());
        outer.members.push(element("a", Occurs::once()));
        outer.members.push(inner_sequence);
        outer.members.push(element("d", Occurs::new(1, None)));
        assert!(outer.is_choice_member("b"));
        assert!(outer.is_choice_member("c"));
        assert!(!outer.is_choice_member("a"));
        assert!(!outer.is_choice_member("d"));
    }

    #[test]
    fn test_leaf_member_names() {
        assert_eq!(
            catalog().leaf_member_names(),
            vec!["title", "book", "magazine", "note", "tag"]
        );
    }

    #[test]
    fn test_max_instance_elements() {
        assert_eq!(catalog().max_instance_elements(), None);

        let mut bounded = Compositor::new(CompositorKind::Sequence, Occurs::once());
        bounded.members.push(element("a", Occurs::new(1, Some(2))));
        bounded.members.push(element("b", Occurs::once()));
        assert_eq!(bounded.max_instance_elements(), Some(3));
    }

    #[test]
    fn test_kind_from_tag() {
        assert_eq!(CompositorKind::from_tag("choice"), Some(CompositorKind::Choice));
        assert_eq!(CompositorKind::from_tag("group"), None);
        assert_eq!(CompositorKind::All.to_string(), "all");
    }
}
