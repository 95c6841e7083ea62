//! Schema definition model
//!
//! Every named schema component is one variant of [`Definition`]. Each
//! variant carries a [`DefInfo`] with its identity (namespace URI and local
//! name), the file it came from, and a copy of its defining XSD element.

pub mod builtins;
pub mod complex_types;
pub mod compositors;
pub mod declarations;
pub mod globals;
pub mod simple_types;

pub use builtins::BuiltIn;
pub use complex_types::{ComplexType, Derivation, DerivationMethod};
pub use compositors::{Compositor, CompositorKind, CompositorMember, MemberKind, Occurs};
pub use declarations::{AttributeGroup, GlobalAttribute, GlobalElement, ModelGroup};
pub use globals::GlobalDefMap;
pub use simple_types::{SimpleType, SimpleVariety};

use crate::documents::Element;
use crate::namespaces::Namespace;
use serde::Serialize;
use std::fmt;

/// XSD element names
pub(crate) mod xsd_elements {
    pub const SCHEMA: &str = "schema";
    pub const ELEMENT: &str = "element";
    pub const COMPLEX_TYPE: &str = "complexType";
    pub const SIMPLE_TYPE: &str = "simpleType";
    pub const ATTRIBUTE: &str = "attribute";
    pub const ATTRIBUTE_GROUP: &str = "attributeGroup";
    pub const GROUP: &str = "group";
    pub const SEQUENCE: &str = "sequence";
    pub const CHOICE: &str = "choice";
    pub const ALL: &str = "all";
    pub const ANNOTATION: &str = "annotation";
    pub const IMPORT: &str = "import";
    pub const INCLUDE: &str = "include";
    pub const REDEFINE: &str = "redefine";
    pub const RESTRICTION: &str = "restriction";
    pub const EXTENSION: &str = "extension";
    pub const LIST: &str = "list";
    pub const UNION: &str = "union";
    pub const COMPLEX_CONTENT: &str = "complexContent";
    pub const SIMPLE_CONTENT: &str = "simpleContent";
    pub const ANY: &str = "any";
    pub const ANY_ATTRIBUTE: &str = "anyAttribute";
    pub const ENUMERATION: &str = "enumeration";
}

/// XSD attribute names
pub(crate) mod xsd_attrs {
    pub const NAME: &str = "name";
    pub const TYPE: &str = "type";
    pub const REF: &str = "ref";
    pub const BASE: &str = "base";
    pub const MIN_OCCURS: &str = "minOccurs";
    pub const MAX_OCCURS: &str = "maxOccurs";
    pub const SUBSTITUTION_GROUP: &str = "substitutionGroup";
    pub const ABSTRACT: &str = "abstract";
    pub const NILLABLE: &str = "nillable";
    pub const FIXED: &str = "fixed";
    pub const USE: &str = "use";
    pub const MEMBER_TYPES: &str = "memberTypes";
    pub const ITEM_TYPE: &str = "itemType";
    pub const VALUE: &str = "value";
    pub const MIXED: &str = "mixed";
    pub const TARGET_NAMESPACE: &str = "targetNamespace";
    pub const SCHEMA_LOCATION: &str = "schemaLocation";
    pub const NAMESPACE: &str = "namespace";
}

/// Parse an `xs:boolean` attribute value
pub(crate) fn parse_bool(value: Option<&str>) -> bool {
    matches!(value.map(str::trim), Some("true") | Some("1"))
}

/// Identity of a global definition
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DefKey {
    /// Namespace URI
    pub namespace: String,
    /// Local name
    pub name: String,
}

impl DefKey {
    /// Create a new key
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for DefKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.namespace)
    }
}

/// Common data of every definition
#[derive(Debug, Clone)]
pub struct DefInfo {
    /// Local name
    pub name: String,
    /// Namespace, with the prefix used in the defining file
    pub namespace: Namespace,
    /// Key of the schema file that defined it
    pub location: String,
    /// Defining XSD element, annotations removed
    pub element: Element,
}

impl DefInfo {
    /// Create definition info
    pub fn new(
        name: impl Into<String>,
        namespace: Namespace,
        location: impl Into<String>,
        element: Element,
    ) -> Self {
        Self {
            name: name.into(),
            namespace,
            location: location.into(),
            element,
        }
    }

    /// Identity of the definition
    pub fn key(&self) -> DefKey {
        DefKey::new(self.namespace.uri.clone(), self.name.clone())
    }

    /// Child elements of the defining element
    pub fn children(&self) -> &[Element] {
        &self.element.children
    }

    /// First child of the defining element
    pub fn first_child(&self) -> Option<&Element> {
        self.element.children.first()
    }
}

/// Kind of a definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DefinitionKind {
    /// XSD built-in datatype
    #[serde(rename = "builtin")]
    BuiltIn,
    /// Named simple type
    #[serde(rename = "simpleType")]
    Simple,
    /// Named complex type
    #[serde(rename = "complexType")]
    Complex,
    /// Named model group
    #[serde(rename = "group")]
    ModelGroup,
    /// Global element declaration
    #[serde(rename = "element")]
    GlobalElement,
    /// Global attribute declaration
    #[serde(rename = "attribute")]
    GlobalAttribute,
    /// Named attribute group
    #[serde(rename = "attributeGroup")]
    AttributeGroup,
}

impl DefinitionKind {
    /// Parse from a command-line style name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "builtin" => Some(Self::BuiltIn),
            "simple" | "simpleType" => Some(Self::Simple),
            "complex" | "complexType" => Some(Self::Complex),
            "group" | "modelGroup" => Some(Self::ModelGroup),
            "element" => Some(Self::GlobalElement),
            "attribute" => Some(Self::GlobalAttribute),
            "attributeGroup" => Some(Self::AttributeGroup),
            _ => None,
        }
    }
}

impl fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BuiltIn => write!(f, "builtin"),
            Self::Simple => write!(f, "simpleType"),
            Self::Complex => write!(f, "complexType"),
            Self::ModelGroup => write!(f, "group"),
            Self::GlobalElement => write!(f, "element"),
            Self::GlobalAttribute => write!(f, "attribute"),
            Self::AttributeGroup => write!(f, "attributeGroup"),
        }
    }
}

/// A named schema component
#[derive(Debug, Clone)]
pub enum Definition {
    /// XSD built-in datatype
    BuiltIn(BuiltIn),
    /// Named simple type
    Simple(SimpleType),
    /// Named complex type
    Complex(ComplexType),
    /// Named model group
    ModelGroup(ModelGroup),
    /// Global element declaration
    GlobalElement(GlobalElement),
    /// Global attribute declaration
    GlobalAttribute(GlobalAttribute),
    /// Named attribute group
    AttributeGroup(AttributeGroup),
}

impl Definition {
    /// Build a definition from its defining element, dispatching on the
    /// element's local name
    pub fn from_info(info: DefInfo) -> Option<Self> {
        let def = match info.element.local_name() {
            xsd_elements::SIMPLE_TYPE => Definition::Simple(SimpleType::from_info(info)),
            xsd_elements::COMPLEX_TYPE => Definition::Complex(ComplexType::from_info(info)),
            xsd_elements::GROUP => Definition::ModelGroup(ModelGroup::from_info(info)),
            xsd_elements::ELEMENT => Definition::GlobalElement(GlobalElement::from_info(info)),
            xsd_elements::ATTRIBUTE => {
                Definition::GlobalAttribute(GlobalAttribute::from_info(info))
            }
            xsd_elements::ATTRIBUTE_GROUP => {
                Definition::AttributeGroup(AttributeGroup::from_info(info))
            }
            _ => return None,
        };
        Some(def)
    }

    /// Common data
    pub fn info(&self) -> &DefInfo {
        match self {
            Definition::BuiltIn(d) => &d.info,
            Definition::Simple(d) => &d.info,
            Definition::Complex(d) => &d.info,
            Definition::ModelGroup(d) => &d.info,
            Definition::GlobalElement(d) => &d.info,
            Definition::GlobalAttribute(d) => &d.info,
            Definition::AttributeGroup(d) => &d.info,
        }
    }

    /// Kind of this definition
    pub fn kind(&self) -> DefinitionKind {
        match self {
            Definition::BuiltIn(_) => DefinitionKind::BuiltIn,
            Definition::Simple(_) => DefinitionKind::Simple,
            Definition::Complex(_) => DefinitionKind::Complex,
            Definition::ModelGroup(_) => DefinitionKind::ModelGroup,
            Definition::GlobalElement(_) => DefinitionKind::GlobalElement,
            Definition::GlobalAttribute(_) => DefinitionKind::GlobalAttribute,
            Definition::AttributeGroup(_) => DefinitionKind::AttributeGroup,
        }
    }

    /// Local name
    pub fn name(&self) -> &str {
        &self.info().name
    }

    /// Namespace URI
    pub fn namespace_uri(&self) -> &str {
        &self.info().namespace.uri
    }

    /// Key of the defining schema file
    pub fn location(&self) -> &str {
        &self.info().location
    }

    /// Defining XSD element
    pub fn element(&self) -> &Element {
        &self.info().element
    }

    /// Identity of this definition
    pub fn key(&self) -> DefKey {
        self.info().key()
    }

    /// True for type definitions
    pub fn is_type(&self) -> bool {
        matches!(
            self,
            Definition::BuiltIn(_) | Definition::Simple(_) | Definition::Complex(_)
        )
    }

    /// True for the built-in of the given local name
    pub fn is_builtin(&self, local_name: &str) -> bool {
        matches!(self, Definition::BuiltIn(b) if b.info.name == local_name)
    }

    /// Effective content model of a complex type or model group
    pub fn compositor(&self) -> Option<&Compositor> {
        match self {
            Definition::Complex(ct) => ct.compositor.as_ref(),
            Definition::ModelGroup(group) => group.compositor.as_ref(),
            _ => None,
        }
    }

    /// As a simple type
    pub fn as_simple(&self) -> Option<&SimpleType> {
        match self {
            Definition::Simple(st) => Some(st),
            _ => None,
        }
    }

    /// As a complex type
    pub fn as_complex(&self) -> Option<&ComplexType> {
        match self {
            Definition::Complex(ct) => Some(ct),
            _ => None,
        }
    }

    /// As a global element
    pub fn as_global_element(&self) -> Option<&GlobalElement> {
        match self {
            Definition::GlobalElement(ge) => Some(ge),
            _ => None,
        }
    }

    /// As a global attribute
    pub fn as_global_attribute(&self) -> Option<&GlobalAttribute> {
        match self {
            Definition::GlobalAttribute(ga) => Some(ga),
            _ => None,
        }
    }

    /// Serializable summary
    pub fn summary(&self) -> DefinitionSummary {
        let detail = match self {
            Definition::Simple(st) => st.base_name().map(str::to_string),
            Definition::Complex(ct) => ct
                .derivation
                .as_ref()
                .map(|d| format!("{} of {}", d.method, d.base)),
            Definition::GlobalElement(ge) => ge.type_name.clone(),
            Definition::GlobalAttribute(ga) => ga.type_name.clone(),
            _ => None,
        };
        DefinitionSummary {
            name: self.name().to_string(),
            namespace: self.namespace_uri().to_string(),
            kind: self.kind(),
            location: self.location().to_string(),
            detail,
        }
    }
}

/// Serializable description of a definition
#[derive(Debug, Clone, Serialize)]
pub struct DefinitionSummary {
    /// Local name
    pub name: String,
    /// Namespace URI
    pub namespace: String,
    /// Kind
    pub kind: DefinitionKind,
    /// Defining file
    pub location: String,
    /// Type, base or derivation, when meaningful
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}
