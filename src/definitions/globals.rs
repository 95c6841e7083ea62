//! Global definition registry
//!
//! [`GlobalDefMap`] holds every named definition of a schema file set,
//! keyed by namespace URI and then local name. Insertion order is kept so
//! enumeration follows reading order.

use super::{BuiltIn, DefKey, Definition, DefinitionKind};
use crate::error::{Error, Result};
use crate::names;
use crate::namespaces::NamespaceRegistry;
use crate::{XML_NAMESPACE, XSD_NAMESPACE};
use indexmap::IndexMap;
use std::sync::Arc;

/// Registry of global definitions
#[derive(Debug, Clone, Default)]
pub struct GlobalDefMap {
    map: IndexMap<String, IndexMap<String, Arc<Definition>>>,
}

impl GlobalDefMap {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition.
    ///
    /// Fails with [`Error::DuplicateDefinition`] when the (namespace, name)
    /// slot is taken, unless both definitions are built-ins.
    pub fn insert(&mut self, def: Definition) -> Result<()> {
        let slot = self
            .map
            .entry(def.namespace_uri().to_string())
            .or_default();
        if let Some(existing) = slot.get(def.name()) {
            if matches!(existing.as_ref(), Definition::BuiltIn(_))
                && matches!(def, Definition::BuiltIn(_))
            {
                return Ok(());
            }
            return Err(Error::DuplicateDefinition {
                name: def.name().to_string(),
                namespace: def.namespace_uri().to_string(),
                existing: existing.location().to_string(),
                new: def.location().to_string(),
            });
        }
        slot.insert(def.name().to_string(), Arc::new(def));
        Ok(())
    }

    /// Direct lookup by local name and namespace URI.
    ///
    /// Names in the XSD or XML namespace that are not registered yield a
    /// fresh built-in.
    pub fn get(&self, name: &str, uri: &str) -> Option<Arc<Definition>> {
        if let Some(def) = self.map.get(uri).and_then(|m| m.get(name)) {
            return Some(Arc::clone(def));
        }
        if uri == XSD_NAMESPACE || uri == XML_NAMESPACE {
            return Some(Arc::new(Definition::BuiltIn(BuiltIn::new(name, uri))));
        }
        None
    }

    /// Lookup by key
    pub fn get_key(&self, key: &DefKey) -> Option<Arc<Definition>> {
        self.get(&key.name, &key.namespace)
    }

    /// Lookup of a possibly prefixed name in a file's namespace context
    pub fn lookup(&self, qualified_name: &str, ctx: &NamespaceRegistry) -> Option<Arc<Definition>> {
        // QName values collapse whitespace
        let qualified_name = qualified_name.trim();
        let uri = ctx.resolve_uri(qualified_name)?;
        self.get(names::local_name(qualified_name), &uri)
    }

    /// Mutable access to a registered definition
    pub(crate) fn get_mut(&mut self, key: &DefKey) -> Option<&mut Definition> {
        self.map
            .get_mut(&key.namespace)
            .and_then(|m| m.get_mut(&key.name))
            .map(Arc::make_mut)
    }

    /// True if the key is registered
    pub fn contains(&self, key: &DefKey) -> bool {
        self.map
            .get(&key.namespace)
            .map_or(false, |m| m.contains_key(&key.name))
    }

    /// All definitions in reading order, grouped by namespace
    pub fn values(&self) -> impl Iterator<Item = &Arc<Definition>> {
        self.map.values().flat_map(|m| m.values())
    }

    /// All keys in reading order, grouped by namespace
    pub fn keys(&self) -> Vec<DefKey> {
        self.values().map(|d| d.key()).collect()
    }

    /// Definitions of one kind
    pub fn defs_of_kind(&self, kind: DefinitionKind) -> Vec<Arc<Definition>> {
        self.values()
            .filter(|d| d.kind() == kind)
            .cloned()
            .collect()
    }

    /// Global element declarations
    pub fn global_elements(&self) -> Vec<Arc<Definition>> {
        self.defs_of_kind(DefinitionKind::GlobalElement)
    }

    /// Named simple types
    pub fn simple_types(&self) -> Vec<Arc<Definition>> {
        self.defs_of_kind(DefinitionKind::Simple)
    }

    /// Named complex types
    pub fn complex_types(&self) -> Vec<Arc<Definition>> {
        self.defs_of_kind(DefinitionKind::Complex)
    }

    /// Namespace URIs with at least one definition
    pub fn namespace_uris(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(|s| s.as_str())
    }

    /// Definitions in one namespace
    pub fn in_namespace(&self, uri: &str) -> Vec<Arc<Definition>> {
        self.map
            .get(uri)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of registered definitions
    pub fn len(&self) -> usize {
        self.map.values().map(|m| m.len()).sum()
    }

    /// True if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definitions::DefInfo;
    use crate::documents::Element;
    use crate::namespaces::Namespace;

    fn complex(name: &str, uri: &str, location: &str) -> Definition {
        let mut element = Element::new("xs:complexType");
        element.set_attribute("name", name);
        Definition::from_info(DefInfo::new(name, Namespace::new("", uri), location, element))
            .unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let mut defs = GlobalDefMap::new();
        defs.insert(complex("itemType", "urn:a", "a.xsd")).unwrap();

        let def = defs.get("itemType", "urn:a").unwrap();
        assert_eq!(def.kind(), DefinitionKind::Complex);
        assert!(defs.get("itemType", "urn:b").is_none());
        assert_eq!(defs.len(), 1);
    }

    #[test]
    fn test_duplicate_definition() {
        let mut defs = GlobalDefMap::new();
        defs.insert(complex("itemType", "urn:a", "a.xsd")).unwrap();
        let err = defs
            .insert(complex("itemType", "urn:a", "b.xsd"))
            .unwrap_err();
        match err {
            Error::DuplicateDefinition { existing, new, .. } => {
                assert_eq!(existing, "a.xsd");
                assert_eq!(new, "b.xsd");
            }
            other => panic!("unexpected error {:?}", other),
        }

        defs.insert(complex("itemType", "urn:b", "b.xsd")).unwrap();
        assert_eq!(defs.len(), 2);
    }

    #[test]
    fn test_builtins_are_synthesized() {
        let defs = GlobalDefMap::new();
        let def = defs.get("string", XSD_NAMESPACE).unwrap();
        assert!(def.is_builtin("string"));
        assert!(defs.is_empty());

        let mut defs = GlobalDefMap::new();
        defs.insert(Definition::BuiltIn(BuiltIn::new("any", XSD_NAMESPACE)))
            .unwrap();
        defs.insert(Definition::BuiltIn(BuiltIn::new("any", XSD_NAMESPACE)))
            .unwrap();
    }

    #[test]
    fn test_lookup_through_context() {
        let mut defs = GlobalDefMap::new();
        defs.insert(complex("itemType", "urn:a", "a.xsd")).unwrap();

        let mut ctx = NamespaceRegistry::new();
        ctx.register(Namespace::new("a", "urn:a"));
        ctx.register(Namespace::new("xs", XSD_NAMESPACE));
        ctx.set_target_namespace("urn:a");

        assert!(defs.lookup("a:itemType", &ctx).is_some());
        assert!(defs.lookup("itemType", &ctx).is_some());
        assert!(defs.lookup("xs:int", &ctx).unwrap().is_builtin("int"));
        assert!(defs.lookup("zz:itemType", &ctx).is_none());
    }

    #[test]
    fn test_defs_of_kind() {
        let mut defs = GlobalDefMap::new();
        defs.insert(complex("a", "urn:a", "a.xsd")).unwrap();
        defs.insert(complex("b", "urn:a", "a.xsd")).unwrap();
        assert_eq!(defs.complex_types().len(), 2);
        assert!(defs.global_elements().is_empty());
        assert_eq!(defs.namespace_uris().collect::<Vec<_>>(), vec!["urn:a"]);
    }
}
