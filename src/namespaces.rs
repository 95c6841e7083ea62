//! XML namespace handling
//!
//! This module provides the [`NamespaceRegistry`], a bidirectional
//! prefix/URI map with target and default namespace tracking. One registry
//! is built per schema file and one for the instance document; they are
//! passed around explicitly rather than shared.

use crate::documents::Element;
use crate::{XML_NAMESPACE, XSD_NAMESPACE};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// XML Namespace URI
pub type NamespaceUri = String;

/// Namespace prefix
pub type Prefix = String;

/// A prefix bound to a namespace URI
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Namespace {
    /// Prefix, empty for a default namespace
    pub prefix: Prefix,
    /// Namespace URI, empty for no namespace
    pub uri: NamespaceUri,
}

impl Namespace {
    /// Create a new namespace binding
    pub fn new(prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            uri: uri.into(),
        }
    }

    /// The empty namespace
    pub fn none() -> Self {
        Self::new("", "")
    }

    /// True for the empty namespace
    pub fn is_none(&self) -> bool {
        self.uri.is_empty()
    }

    /// True when the binding has no prefix
    pub fn is_default(&self) -> bool {
        self.prefix.is_empty()
    }

    /// Qualify a local name with this namespace's prefix
    pub fn qualify(&self, local_name: &str) -> String {
        if self.prefix.is_empty() {
            local_name.to_string()
        } else {
            format!("{}:{}", self.prefix, local_name)
        }
    }

    /// The `xmlns` attribute name declaring this namespace
    pub fn declaration_name(&self) -> String {
        if self.prefix.is_empty() {
            "xmlns".to_string()
        } else {
            format!("xmlns:{}", self.prefix)
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.prefix.is_empty() {
            write!(f, "{}", self.uri)
        } else {
            write!(f, "{}:{}", self.prefix, self.uri)
        }
    }
}

/// Prefix/URI registry for one schema file or one instance document
#[derive(Debug, Clone)]
pub struct NamespaceRegistry {
    /// Prefix to namespace
    prefix_map: IndexMap<Prefix, Namespace>,
    /// URI to namespace; the last registration for a URI wins
    uri_map: IndexMap<NamespaceUri, Namespace>,
    /// Target namespace URI
    target_namespace: Option<NamespaceUri>,
}

impl NamespaceRegistry {
    /// Create a registry that knows only the `xml` prefix
    pub fn new() -> Self {
        let mut registry = Self {
            prefix_map: IndexMap::new(),
            uri_map: IndexMap::new(),
            target_namespace: None,
        };
        registry.register(Namespace::new("xml", XML_NAMESPACE));
        registry
    }

    /// Register a namespace under its prefix and URI
    pub fn register(&mut self, ns: Namespace) {
        self.uri_map.insert(ns.uri.clone(), ns.clone());
        self.prefix_map.insert(ns.prefix.clone(), ns);
    }

    /// Register the declarations and `targetNamespace` of a schema root
    pub fn register_document(&mut self, root: &Element) {
        for ns in &root.namespaces {
            self.register(ns.clone());
        }
        if let Some(tns) = root.attribute("targetNamespace") {
            self.target_namespace = Some(tns.to_string());
        }
    }

    /// Set the target namespace URI
    pub fn set_target_namespace(&mut self, uri: impl Into<String>) {
        self.target_namespace = Some(uri.into());
    }

    /// Target namespace URI
    pub fn target_namespace_uri(&self) -> Option<&str> {
        self.target_namespace.as_deref()
    }

    /// Target namespace binding, if its URI is registered
    pub fn target_namespace(&self) -> Option<&Namespace> {
        self.target_namespace
            .as_deref()
            .and_then(|uri| self.ns_for_uri(uri))
    }

    /// Default (unprefixed) namespace
    pub fn default_namespace(&self) -> Option<&Namespace> {
        self.prefix_map.get("")
    }

    /// Namespace registered for the XSD URI
    pub fn schema_namespace(&self) -> Option<&Namespace> {
        self.ns_for_uri(XSD_NAMESPACE)
    }

    /// Namespace for a URI
    pub fn ns_for_uri(&self, uri: &str) -> Option<&Namespace> {
        self.uri_map.get(uri)
    }

    /// Namespace for a prefix
    pub fn ns_for_prefix(&self, prefix: &str) -> Option<&Namespace> {
        self.prefix_map.get(prefix)
    }

    /// Prefix bound to a URI
    pub fn prefix_for(&self, uri: &str) -> Option<&str> {
        self.uri_map.get(uri).map(|ns| ns.prefix.as_str())
    }

    /// URI bound to a prefix
    pub fn uri_for(&self, prefix: &str) -> Option<&str> {
        self.prefix_map.get(prefix).map(|ns| ns.uri.as_str())
    }

    /// All registered bindings, by prefix
    pub fn iter(&self) -> impl Iterator<Item = &Namespace> {
        self.prefix_map.values()
    }

    /// True when more than one distinct URI is registered, ignoring the
    /// XSD and XML namespaces
    pub fn is_multi_namespace(&self) -> bool {
        self.uri_map
            .keys()
            .filter(|uri| {
                !uri.is_empty() && uri.as_str() != XSD_NAMESPACE && uri.as_str() != XML_NAMESPACE
            })
            .count()
            > 1
    }

    /// Named binding for the default namespace.
    ///
    /// Returns an existing non-empty prefix mapping the default URI, or a
    /// binding of `fallback_prefix` to it. `None` when there is no default
    /// namespace.
    pub fn named_default(&self, fallback_prefix: &str) -> Option<Namespace> {
        let default = self.default_namespace()?;
        if default.uri.is_empty() {
            return None;
        }
        let existing = self
            .prefix_map
            .values()
            .find(|ns| !ns.prefix.is_empty() && ns.uri == default.uri);
        Some(match existing {
            Some(ns) => ns.clone(),
            None => Namespace::new(fallback_prefix, default.uri.clone()),
        })
    }

    /// Resolve a (possibly prefixed) name to its namespace URI.
    ///
    /// Unprefixed names belong to the default namespace when one is
    /// registered, otherwise to the target namespace.
    pub fn resolve_uri(&self, qualified_name: &str) -> Option<String> {
        match qualified_name.split_once(':') {
            Some((prefix, _)) => self.uri_for(prefix).map(str::to_string),
            None => match self.default_namespace() {
                Some(ns) => Some(ns.uri.clone()),
                None => Some(self.target_namespace.clone().unwrap_or_default()),
            },
        }
    }

    /// Qualify a local name with the prefix registered for `uri`
    pub fn qualify(&self, uri: &str, local_name: &str) -> String {
        match self.prefix_for(uri) {
            Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, local_name),
            _ => local_name.to_string(),
        }
    }

    /// Instance-document name for a definition.
    ///
    /// Names are prefixed only when `namespace_enabled` is set, so that
    /// single-namespace schemas produce plain local names.
    pub fn instance_name(&self, uri: &str, local_name: &str, namespace_enabled: bool) -> String {
        if namespace_enabled {
            self.qualify(uri, local_name)
        } else {
            local_name.to_string()
        }
    }
}

impl Default for NamespaceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Naming rules for the instance document
#[derive(Debug, Clone)]
pub struct InstanceNames {
    /// Instance-level registry, seeded from the root schema file
    pub registry: NamespaceRegistry,
    /// True when instance names carry prefixes
    pub namespace_enabled: bool,
}

impl InstanceNames {
    /// Naming rules over an instance registry
    pub fn new(registry: NamespaceRegistry) -> Self {
        let namespace_enabled = registry.is_multi_namespace();
        Self {
            registry,
            namespace_enabled,
        }
    }

    /// Instance name of a component with the given namespace and local name
    pub fn name(&self, uri: &str, local_name: &str) -> String {
        self.registry
            .instance_name(uri, local_name, self.namespace_enabled)
    }

    /// Name of the template element standing for an `xs:any` wildcard
    pub fn any_element_name(&self) -> String {
        match self.registry.prefix_for(XSD_NAMESPACE) {
            Some(prefix) if !prefix.is_empty() => format!("{}:any", prefix),
            _ => "xsd:any".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema_root(decls: &[(&str, &str)], tns: Option<&str>) -> Element {
        let mut root = Element::new("xs:schema");
        for (prefix, uri) in decls {
            root.namespaces.push(Namespace::new(*prefix, *uri));
        }
        if let Some(tns) = tns {
            root.set_attribute("targetNamespace", tns);
        }
        root
    }

    #[test]
    fn test_registry_knows_xml() {
        let registry = NamespaceRegistry::new();
        assert_eq!(registry.uri_for("xml"), Some(XML_NAMESPACE));
        assert!(!registry.is_multi_namespace());
    }

    #[test]
    fn test_last_registration_wins_for_uri() {
        let mut registry = NamespaceRegistry::new();
        registry.register(Namespace::new("a", "urn:x"));
        registry.register(Namespace::new("b", "urn:x"));
        assert_eq!(registry.prefix_for("urn:x"), Some("b"));
        assert_eq!(registry.uri_for("a"), Some("urn:x"));
    }

    #[test]
    fn test_multi_namespace_counts_distinct_uris() {
        let mut registry = NamespaceRegistry::new();
        registry.register_document(&schema_root(
            &[("xs", XSD_NAMESPACE), ("", "urn:a"), ("a", "urn:a")],
            Some("urn:a"),
        ));
        assert!(!registry.is_multi_namespace());

        registry.register(Namespace::new("b", "urn:b"));
        assert!(registry.is_multi_namespace());
    }

    #[test]
    fn test_named_default() {
        let mut registry = NamespaceRegistry::new();
        assert_eq!(registry.named_default("this"), None);

        registry.register(Namespace::new("", "urn:a"));
        assert_eq!(
            registry.named_default("this"),
            Some(Namespace::new("this", "urn:a"))
        );

        registry.register(Namespace::new("tns", "urn:a"));
        assert_eq!(
            registry.named_default("this"),
            Some(Namespace::new("tns", "urn:a"))
        );
    }

    #[test]
    fn test_resolve_uri() {
        let mut registry = NamespaceRegistry::new();
        registry.register(Namespace::new("xs", XSD_NAMESPACE));
        registry.set_target_namespace("urn:t");

        assert_eq!(
            registry.resolve_uri("xs:string").as_deref(),
            Some(XSD_NAMESPACE)
        );
        assert_eq!(registry.resolve_uri("item").as_deref(), Some("urn:t"));
        assert_eq!(registry.resolve_uri("zz:item"), None);

        registry.register(Namespace::new("", "urn:d"));
        assert_eq!(registry.resolve_uri("item").as_deref(), Some("urn:d"));
    }

    #[test]
    fn test_instance_name() {
        let mut registry = NamespaceRegistry::new();
        registry.register(Namespace::new("", "urn:a"));
        registry.register(Namespace::new("b", "urn:b"));

        assert_eq!(registry.instance_name("urn:b", "item", true), "b:item");
        assert_eq!(registry.instance_name("urn:a", "item", true), "item");
        assert_eq!(registry.instance_name("urn:b", "item", false), "item");
    }

    #[test]
    fn test_instance_names() {
        let mut registry = NamespaceRegistry::new();
        registry.register(Namespace::new("xs", XSD_NAMESPACE));
        registry.register(Namespace::new("this", "urn:a"));
        let names = InstanceNames::new(registry.clone());
        assert!(!names.namespace_enabled);
        assert_eq!(names.name("urn:a", "rec"), "rec");
        assert_eq!(names.any_element_name(), "xs:any");

        registry.register(Namespace::new("b", "urn:b"));
        let names = InstanceNames::new(registry);
        assert!(names.namespace_enabled);
        assert_eq!(names.name("urn:a", "rec"), "this:rec");
    }
}
