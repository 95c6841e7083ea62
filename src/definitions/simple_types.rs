//! Named simple types

use super::{xsd_attrs, xsd_elements, DefInfo};

/// How a simple type is built
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimpleVariety {
    /// Restriction of a base type, possibly by enumeration
    Restriction {
        /// Base type QName
        base: Option<String>,
        /// Enumerated values, empty when not an enumeration
        enumeration: Vec<String>,
    },
    /// Whitespace-separated list of an item type
    List {
        /// Item type QName
        item_type: Option<String>,
    },
    /// Union of member types
    Union {
        /// Member type QNames
        member_types: Vec<String>,
    },
}

/// A named simple type
#[derive(Debug, Clone)]
pub struct SimpleType {
    /// Common data
    pub info: DefInfo,
    /// Restriction, list or union
    pub variety: SimpleVariety,
}

impl SimpleType {
    /// Build from the defining `simpleType` element
    pub fn from_info(info: DefInfo) -> Self {
        let variety = match info.first_child() {
            Some(child) if child.local_name() == xsd_elements::UNION => SimpleVariety::Union {
                member_types: child
                    .attribute(xsd_attrs::MEMBER_TYPES)
                    .unwrap_or("")
                    .split_whitespace()
                    .map(str::to_string)
                    .collect(),
            },
            Some(child) if child.local_name() == xsd_elements::LIST => SimpleVariety::List {
                item_type: child.non_empty_attribute(xsd_attrs::ITEM_TYPE).map(str::to_string),
            },
            Some(child) if child.local_name() == xsd_elements::RESTRICTION => {
                SimpleVariety::Restriction {
                    base: child.non_empty_attribute(xsd_attrs::BASE).map(str::to_string),
                    enumeration: child
                        .find_children(xsd_elements::ENUMERATION)
                        .filter_map(|e| e.attribute(xsd_attrs::VALUE))
                        .map(str::to_string)
                        .collect(),
                }
            }
            _ => SimpleVariety::Restriction {
                base: None,
                enumeration: Vec::new(),
            },
        };
        Self { info, variety }
    }

    /// True if the type restricts by enumeration
    pub fn is_enumeration(&self) -> bool {
        matches!(&self.variety, SimpleVariety::Restriction { enumeration, .. } if !enumeration.is_empty())
    }

    /// True for a union
    pub fn is_union(&self) -> bool {
        matches!(self.variety, SimpleVariety::Union { .. })
    }

    /// True for a list
    pub fn is_list(&self) -> bool {
        matches!(self.variety, SimpleVariety::List { .. })
    }

    /// Member type names of a union, empty otherwise
    pub fn union_member_type_names(&self) -> &[String] {
        match &self.variety {
            SimpleVariety::Union { member_types } => member_types,
            _ => &[],
        }
    }

    /// Enumerated values of this type alone
    pub fn enumeration_values(&self) -> &[String] {
        match &self.variety {
            SimpleVariety::Restriction { enumeration, .. } => enumeration,
            _ => &[],
        }
    }

    /// Restriction base QName
    pub fn base_name(&self) -> Option<&str> {
        match &self.variety {
            SimpleVariety::Restriction { base, .. } => base.as_deref(),
            _ => None,
        }
    }

    /// List item type QName
    pub fn item_type_name(&self) -> Option<&str> {
        match &self.variety {
            SimpleVariety::List { item_type } => item_type.as_deref(),
            _ => None,
        }
    }
}
