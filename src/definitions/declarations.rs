//! Global element and attribute declarations, model groups and attribute
//! groups

use super::complex_types::is_model_element;
use super::{parse_bool, xsd_attrs, Compositor, DefInfo, DefKey};
use crate::documents::Element;

/// A top-level `element` declaration
#[derive(Debug, Clone)]
pub struct GlobalElement {
    /// Common data
    pub info: DefInfo,
    /// Type QName, `None` when the declaration has no `type`
    pub type_name: Option<String>,
    /// Head of the substitution group this element belongs to
    pub substitution_group: Option<String>,
    /// `abstract` attribute
    pub is_abstract: bool,
    /// `nillable` attribute
    pub nillable: bool,
    /// `fixed` value
    pub fixed: Option<String>,
    /// Elements naming this one as their substitution group head, in the
    /// order they were read
    pub substitution_members: Vec<DefKey>,
}

impl GlobalElement {
    /// Build from the defining `element` element
    pub fn from_info(info: DefInfo) -> Self {
        let element = &info.element;
        let type_name = element.non_empty_attribute(xsd_attrs::TYPE).map(str::to_string);
        let substitution_group = element
            .non_empty_attribute(xsd_attrs::SUBSTITUTION_GROUP)
            .map(str::to_string);
        let is_abstract = parse_bool(element.attribute(xsd_attrs::ABSTRACT));
        let nillable = parse_bool(element.attribute(xsd_attrs::NILLABLE));
        let fixed = element.attribute(xsd_attrs::FIXED).map(str::to_string);
        Self {
            info,
            type_name,
            substitution_group,
            is_abstract,
            nillable,
            fixed,
            substitution_members: Vec::new(),
        }
    }

    /// True if other elements substitute for this one
    pub fn is_head(&self) -> bool {
        !self.substitution_members.is_empty()
    }

    /// True if this element substitutes for a head
    pub fn is_substitution_member(&self) -> bool {
        self.substitution_group.is_some()
    }
}

/// A top-level `attribute` declaration
#[derive(Debug, Clone)]
pub struct GlobalAttribute {
    /// Common data
    pub info: DefInfo,
    /// Type QName
    pub type_name: Option<String>,
    /// `fixed` value
    pub fixed: Option<String>,
}

impl GlobalAttribute {
    /// Build from the defining `attribute` element
    pub fn from_info(info: DefInfo) -> Self {
        let type_name = info
            .element
            .non_empty_attribute(xsd_attrs::TYPE)
            .map(str::to_string);
        let fixed = info.element.attribute(xsd_attrs::FIXED).map(str::to_string);
        Self {
            info,
            type_name,
            fixed,
        }
    }
}

/// A named `group`
#[derive(Debug, Clone)]
pub struct ModelGroup {
    /// Common data
    pub info: DefInfo,
    /// Content model, filled in after all files are read
    pub compositor: Option<Compositor>,
}

impl ModelGroup {
    /// Build from the defining `group` element
    pub fn from_info(info: DefInfo) -> Self {
        Self {
            info,
            compositor: None,
        }
    }

    /// The compositor element of the group
    pub fn model_element(&self) -> Option<&Element> {
        self.info.children().iter().find(|c| is_model_element(c))
    }
}

/// A named `attributeGroup`
#[derive(Debug, Clone)]
pub struct AttributeGroup {
    /// Common data
    pub info: DefInfo,
}

impl AttributeGroup {
    /// Build from the defining `attributeGroup` element
    pub fn from_info(info: DefInfo) -> Self {
        Self { info }
    }

    /// Attribute declarations and nested attribute group references
    pub fn members(&self) -> &[Element] {
        self.info.children()
    }
}
