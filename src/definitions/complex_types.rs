//! Named complex types
//!
//! A complex type's content model is read from its first child: a
//! compositor (`sequence`, `choice`, `all`), a `group` reference, or a
//! `simpleContent`/`complexContent` derivation. The effective compositor,
//! with extension chains flattened, is computed once every file is read and
//! stored in [`ComplexType::compositor`].

use super::{parse_bool, xsd_attrs, xsd_elements, Compositor, DefInfo};
use crate::documents::Element;

/// Derivation method for complex types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DerivationMethod {
    /// Type derived by restriction
    #[default]
    Restriction,
    /// Type derived by extension
    Extension,
}

impl DerivationMethod {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "restriction" => Some(Self::Restriction),
            "extension" => Some(Self::Extension),
            _ => None,
        }
    }
}

impl std::fmt::Display for DerivationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Restriction => write!(f, "restriction"),
            Self::Extension => write!(f, "extension"),
        }
    }
}

/// Base type and method of a derived complex type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derivation {
    /// Extension or restriction
    pub method: DerivationMethod,
    /// Base type QName as written
    pub base: String,
    /// True under `simpleContent`, false under `complexContent`
    pub simple_content: bool,
}

/// Content compositors a model element may start with
pub(crate) fn is_model_element(element: &Element) -> bool {
    matches!(
        element.local_name(),
        xsd_elements::SEQUENCE | xsd_elements::CHOICE | xsd_elements::ALL | xsd_elements::GROUP
    )
}

/// A named complex type
#[derive(Debug, Clone)]
pub struct ComplexType {
    /// Common data
    pub info: DefInfo,
    /// Base type, for derived types
    pub derivation: Option<Derivation>,
    /// Effective content model, filled in after all files are read
    pub compositor: Option<Compositor>,
    /// `abstract` attribute
    pub is_abstract: bool,
    /// `mixed` attribute
    pub mixed: bool,
}

impl ComplexType {
    /// Build from the defining `complexType` element
    pub fn from_info(info: DefInfo) -> Self {
        let derivation = info.first_child().and_then(|content| {
            let simple_content = match content.local_name() {
                xsd_elements::SIMPLE_CONTENT => true,
                xsd_elements::COMPLEX_CONTENT => false,
                _ => return None,
            };
            content.children.iter().find_map(|d| {
                let method = DerivationMethod::from_str(d.local_name())?;
                Some(Derivation {
                    method,
                    base: d.non_empty_attribute(xsd_attrs::BASE)?.to_string(),
                    simple_content,
                })
            })
        });
        let is_abstract = parse_bool(info.element.attribute(xsd_attrs::ABSTRACT));
        let mixed = parse_bool(info.element.attribute(xsd_attrs::MIXED));
        Self {
            info,
            derivation,
            compositor: None,
            is_abstract,
            mixed,
        }
    }

    /// Local name of the first child, which names the content model
    pub fn content_model(&self) -> Option<&str> {
        self.info.first_child().map(Element::local_name)
    }

    /// True for simple or complex content derivations
    pub fn is_derived(&self) -> bool {
        self.derivation.is_some()
    }

    /// True for `simpleContent`
    pub fn has_simple_content(&self) -> bool {
        self.content_model() == Some(xsd_elements::SIMPLE_CONTENT)
    }

    /// True for `complexContent`
    pub fn has_complex_content(&self) -> bool {
        self.content_model() == Some(xsd_elements::COMPLEX_CONTENT)
    }

    /// True when derived by extension under `complexContent`
    pub fn is_complex_extension(&self) -> bool {
        matches!(
            &self.derivation,
            Some(d) if !d.simple_content && d.method == DerivationMethod::Extension
        )
    }

    fn derivation_element(&self, method: DerivationMethod) -> Option<&Element> {
        let content = self.info.first_child()?;
        if !matches!(
            content.local_name(),
            xsd_elements::SIMPLE_CONTENT | xsd_elements::COMPLEX_CONTENT
        ) {
            return None;
        }
        content
            .children
            .iter()
            .find(|c| DerivationMethod::from_str(c.local_name()) == Some(method))
    }

    /// The `extension` element under simple or complex content
    pub fn extension_element(&self) -> Option<&Element> {
        self.derivation_element(DerivationMethod::Extension)
    }

    /// The `restriction` element under simple or complex content
    pub fn restriction_element(&self) -> Option<&Element> {
        self.derivation_element(DerivationMethod::Restriction)
    }

    /// Base type QName of an extension
    pub fn extension_base(&self) -> Option<&str> {
        match &self.derivation {
            Some(d) if d.method == DerivationMethod::Extension => Some(&d.base),
            _ => None,
        }
    }

    /// Base type QName of a restriction
    pub fn restriction_base(&self) -> Option<&str> {
        match &self.derivation {
            Some(d) if d.method == DerivationMethod::Restriction => Some(&d.base),
            _ => None,
        }
    }

    /// The model element this type declares itself, ignoring any base.
    ///
    /// For a plain type this is its first child when that is a compositor
    /// or group reference; for a derivation it is the first compositor
    /// inside the `extension` or `restriction`.
    pub fn own_model_element(&self) -> Option<&Element> {
        let first = self.info.first_child()?;
        if is_model_element(first) {
            return Some(first);
        }
        let derivation = self
            .extension_element()
            .or_else(|| self.restriction_element())?;
        derivation.children.iter().find(|c| is_model_element(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::Document;
    use crate::namespaces::Namespace;

    fn complex(xml: &str) -> ComplexType {
        let doc = Document::from_string(xml).unwrap();
        ComplexType::from_info(DefInfo::new("c", Namespace::none(), "a.xsd", doc.root))
    }

    #[test]
    fn test_plain_sequence() {
        let ct = complex(
            r#"<xs:complexType name="c"><xs:sequence><xs:element name="a"/></xs:sequence>
               <xs:attribute name="id"/></xs:complexType>"#,
        );
        assert_eq!(ct.content_model(), Some("sequence"));
        assert!(!ct.is_derived());
        assert_eq!(ct.own_model_element().unwrap().local_name(), "sequence");
    }

    #[test]
    fn test_complex_extension() {
        let ct = complex(
            r#"<xs:complexType name="c"><xs:complexContent>
                 <xs:extension base="baseType"><xs:sequence><xs:element name="url"/></xs:sequence></xs:extension>
               </xs:complexContent></xs:complexType>"#,
        );
        assert!(ct.is_derived());
        assert!(ct.has_complex_content());
        assert!(ct.is_complex_extension());
        assert_eq!(ct.extension_base(), Some("baseType"));
        assert_eq!(ct.restriction_base(), None);
        assert_eq!(ct.own_model_element().unwrap().local_name(), "sequence");
    }

    #[test]
    fn test_simple_content_restriction() {
        let ct = complex(
            r#"<xs:complexType name="c" abstract="true"><xs:simpleContent>
                 <xs:restriction base="priced"><xs:maxLength value="3"/></xs:restriction>
               </xs:simpleContent></xs:complexType>"#,
        );
        assert!(ct.has_simple_content());
        assert!(ct.is_abstract);
        assert!(!ct.is_complex_extension());
        assert_eq!(ct.restriction_base(), Some("priced"));
        assert!(ct.restriction_element().is_some());
        assert!(ct.own_model_element().is_none());
    }
}
