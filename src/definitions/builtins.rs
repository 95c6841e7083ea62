//! XSD built-in datatypes
//!
//! Built-ins are never read from a schema file. A lookup of any name in the
//! XSD or XML namespace produces one on demand.

use super::DefInfo;
use crate::documents::Element;
use crate::namespaces::Namespace;
use crate::XSD_NAMESPACE;

/// Location recorded for built-in definitions
pub const BUILTIN_LOCATION: &str = "builtin";

/// A built-in datatype placeholder
#[derive(Debug, Clone)]
pub struct BuiltIn {
    /// Common data; the element is a bare `simpleType`
    pub info: DefInfo,
}

impl BuiltIn {
    /// Create a built-in for a local name in the given namespace
    pub fn new(name: impl Into<String>, namespace_uri: impl Into<String>) -> Self {
        let name = name.into();
        let mut element = Element::new("simpleType");
        element.set_attribute("name", name.clone());
        Self {
            info: DefInfo::new(
                name,
                Namespace::new("", namespace_uri),
                BUILTIN_LOCATION,
                element,
            ),
        }
    }

    /// True for the XSD `string` type
    pub fn is_string(&self) -> bool {
        self.info.name == "string" && self.info.namespace.uri == XSD_NAMESPACE
    }

    /// True for the wildcard placeholder used by `xs:any`
    pub fn is_any(&self) -> bool {
        self.info.name == "any"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin() {
        let string = BuiltIn::new("string", XSD_NAMESPACE);
        assert!(string.is_string());
        assert!(!string.is_any());
        assert_eq!(string.info.location, BUILTIN_LOCATION);

        let any = BuiltIn::new("any", XSD_NAMESPACE);
        assert!(any.is_any());
    }
}
