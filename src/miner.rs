//! Mining a schema file set
//!
//! [`DefinitionMiner`] reads the root schema file, follows every `include`
//! and `import` depth-first, and collects the named definitions of all
//! files into one [`GlobalDefMap`]. Substitution groups, cycle analysis
//! and effective content models are computed once every file is read.

use crate::cycles::{self, CycleReport};
use crate::definitions::compositors::CompositorBuilder;
use crate::definitions::{DefKey, Definition, GlobalDefMap};
use crate::documents::Document;
use crate::error::{Error, Result};
use crate::loaders::Loader;
use crate::locations::Location;
use crate::namespaces::{InstanceNames, NamespaceRegistry};
use crate::reader::{qualify_default_names, unresolved_directive, Directive, SchemaReader};
use crate::settings::Settings;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything known about a schema file set
#[derive(Debug, Clone)]
pub struct MinedSchema {
    /// Global definitions of every file
    pub definitions: GlobalDefMap,
    /// Namespace context of every file, by location key
    pub readers: IndexMap<String, SchemaReader>,
    /// Instance-document naming rules
    pub names: InstanceNames,
    /// Declaration of the template's root element
    pub root_element: Arc<Definition>,
    /// Location of the root schema file
    pub location: Location,
    /// Key of the root schema file
    pub root_key: String,
    /// Definitions on content cycles
    pub cycles: CycleReport,
    /// Settings used for mining
    pub settings: Settings,
}

impl MinedSchema {
    /// Namespace context of a file
    pub fn reader(&self, location: &str) -> Option<&SchemaReader> {
        self.readers.get(location)
    }

    /// Namespace context of the root file
    pub fn root_reader(&self) -> Option<&SchemaReader> {
        self.readers.get(&self.root_key)
    }

    /// Resolve a QName as written in the file at `location`
    pub fn resolve(&self, qualified_name: &str, location: &str) -> Option<Arc<Definition>> {
        self.reader(location)?
            .resolve(qualified_name, &self.definitions)
    }

    /// Resolve a QName, failing with [`Error::Namespace`] for an undeclared
    /// prefix and [`Error::UnresolvedReference`] otherwise
    pub fn require(&self, qualified_name: &str, location: &str) -> Result<Arc<Definition>> {
        match self.reader(location) {
            Some(reader) => reader.require(qualified_name, &self.definitions, location),
            None => Err(Error::UnresolvedReference {
                name: qualified_name.trim().to_string(),
                context: location.to_string(),
            }),
        }
    }

    /// Instance name of the root element
    pub fn root_element_name(&self) -> String {
        self.names
            .name(self.root_element.namespace_uri(), self.root_element.name())
    }

    /// Instance name of a definition
    pub fn instance_name(&self, def: &Definition) -> String {
        self.names.name(def.namespace_uri(), def.name())
    }
}

struct Pending {
    location: Location,
    default_target: Option<String>,
    document: Option<Document>,
}

/// Reads a schema file set into a [`MinedSchema`]
#[derive(Debug, Default)]
pub struct DefinitionMiner {
    settings: Settings,
}

impl DefinitionMiner {
    /// Miner with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Miner with the given settings
    pub fn with_settings(settings: Settings) -> Self {
        Self { settings }
    }

    fn loader(&self) -> Loader {
        Loader::new()
            .with_limits(self.settings.limits.clone())
            .with_allow_remote(self.settings.allow_remote)
    }

    /// Mine the schema rooted at `location`.
    ///
    /// `root_element` names the template's root; it may be an instance
    /// name or a local name. Without it the root file must declare exactly
    /// one global element.
    pub fn mine(&self, location: &str, root_element: Option<&str>) -> Result<MinedSchema> {
        let root_location = Location::from_str(location)?;
        let root_key = root_location.key();
        let loader = self.loader();
        let prefix = self.settings.named_default_prefix.as_str();

        let mut root_doc = load_document(&loader, &root_location, &root_key)?;
        let mut registry = NamespaceRegistry::new();
        registry.register_document(&root_doc.root);
        if registry.is_multi_namespace() {
            if let Some(named) = registry.named_default(prefix) {
                debug!(prefix = %named.prefix, uri = %named.uri, "naming default namespace of root schema");
                qualify_default_names(&mut root_doc.root, &named);
                registry.register(named);
            }
        }

        let mut definitions = GlobalDefMap::new();
        let mut readers: IndexMap<String, SchemaReader> = IndexMap::new();
        let mut processed: HashSet<String> = HashSet::new();
        let mut inline_index = 0usize;
        let mut pending = vec![Pending {
            location: root_location.clone(),
            default_target: None,
            document: Some(root_doc),
        }];

        while let Some(next) = pending.pop() {
            let key = next.location.key();
            if !processed.insert(key.clone()) {
                continue;
            }
            self.settings.limits.check_schema_files(processed.len())?;

            let document = match next.document {
                Some(document) => document,
                None => load_document(&loader, &next.location, &key)?,
            };
            let output = SchemaReader::read(
                document,
                &key,
                next.default_target.as_deref(),
                prefix,
                &mut inline_index,
            )?;
            for def in output.definitions {
                definitions.insert(def)?;
            }

            let mut discovered = Vec::with_capacity(output.directives.len());
            for directive in &output.directives {
                let location = locate(directive, &next.location, &root_location)?;
                discovered.push(Pending {
                    location,
                    default_target: Some(directive.namespace.clone()),
                    document: None,
                });
            }
            // depth-first, in document order
            pending.extend(discovered.into_iter().rev());
            readers.insert(key, output.reader);
        }

        if let Some(root_reader) = readers.get(&root_key) {
            let target = root_reader.target_namespace.clone();
            registry.set_target_namespace(target.uri.clone());
            let default_bound = registry.uri_for("").is_some();
            if registry.ns_for_uri(&target.uri).is_none()
                && (!target.prefix.is_empty() || !default_bound)
            {
                registry.register(target);
            }
        }
        let names = InstanceNames::new(registry);

        link_substitution_groups(&mut definitions, &readers)?;
        let cycles = cycles::analyze(&definitions, &readers)?;
        build_compositors(&mut definitions, &readers, &names)?;

        let root_element = select_root(&definitions, &names, &root_key, root_element)?;
        info!(
            files = readers.len(),
            definitions = definitions.len(),
            root = %root_element.name(),
            namespace_enabled = names.namespace_enabled,
            "mined schema"
        );

        Ok(MinedSchema {
            definitions,
            readers,
            names,
            root_element,
            location: root_location,
            root_key,
            cycles,
            settings: self.settings.clone(),
        })
    }
}

fn load_document(loader: &Loader, location: &Location, key: &str) -> Result<Document> {
    let text = loader.load(location)?;
    Document::parse_schema(&text, key)
}

/// Find a directive's file: first next to the including file, then next to
/// the root file
fn locate(directive: &Directive, including: &Location, root: &Location) -> Result<Location> {
    let mut attempts = Vec::new();
    for (relative_to, base) in [("including file", including), ("root file", root)] {
        match base.resolve(&directive.schema_location) {
            Ok(candidate) => {
                let found = candidate.exists();
                debug!(
                    attempt = attempts.len() + 1,
                    schema_location = %directive.schema_location,
                    candidate = %candidate,
                    relative_to,
                    found,
                    "resolving schema location"
                );
                attempts.push(candidate.to_string());
                if found {
                    return Ok(candidate);
                }
            }
            Err(err) => {
                debug!(
                    attempt = attempts.len() + 1,
                    schema_location = %directive.schema_location,
                    relative_to,
                    error = %err,
                    "schema location does not resolve"
                );
                attempts.push(format!("{} relative to {}", directive.schema_location, base));
            }
        }
    }
    warn!(schema_location = %directive.schema_location, "schema location not found");
    Err(unresolved_directive(directive, attempts))
}

fn link_substitution_groups(
    definitions: &mut GlobalDefMap,
    readers: &IndexMap<String, SchemaReader>,
) -> Result<()> {
    let mut links: Vec<(DefKey, DefKey)> = Vec::new();
    for def in definitions.values() {
        let Definition::GlobalElement(member) = def.as_ref() else {
            continue;
        };
        let Some(head_name) = member.substitution_group.as_deref() else {
            continue;
        };
        let head = readers
            .get(def.location())
            .and_then(|reader| reader.resolve(head_name, definitions))
            .filter(|head| matches!(head.as_ref(), Definition::GlobalElement(_)))
            .ok_or_else(|| Error::UnresolvedReference {
                name: head_name.to_string(),
                context: format!("substitutionGroup of element '{}'", def.name()),
            })?;
        links.push((head.key(), def.key()));
    }

    for (head, member) in links {
        debug!(head = %head, member = %member, "linking substitution group member");
        if let Some(Definition::GlobalElement(global)) = definitions.get_mut(&head) {
            global.substitution_members.push(member);
        }
    }
    Ok(())
}

fn build_compositors(
    definitions: &mut GlobalDefMap,
    readers: &IndexMap<String, SchemaReader>,
    names: &InstanceNames,
) -> Result<()> {
    let builder = CompositorBuilder {
        defs: &*definitions,
        readers,
        names,
    };
    let mut computed = Vec::new();
    for def in definitions.values() {
        let compositor = match def.as_ref() {
            Definition::Complex(ct) => builder.for_complex(ct)?,
            Definition::ModelGroup(group) => builder.for_group(group, 0)?,
            _ => continue,
        };
        computed.push((def.key(), compositor));
    }

    for (key, compositor) in computed {
        match definitions.get_mut(&key) {
            Some(Definition::Complex(ct)) => ct.compositor = compositor,
            Some(Definition::ModelGroup(group)) => group.compositor = compositor,
            _ => {}
        }
    }
    Ok(())
}

fn select_root(
    definitions: &GlobalDefMap,
    names: &InstanceNames,
    root_key: &str,
    requested: Option<&str>,
) -> Result<Arc<Definition>> {
    let elements = definitions.global_elements();
    let describe = |defs: &[Arc<Definition>]| {
        let mut candidates: Vec<String> = defs
            .iter()
            .map(|d| format!("{} ({})", d.name(), d.namespace_uri()))
            .collect();
        candidates.sort();
        candidates
    };

    let Some(requested) = requested else {
        let in_root: Vec<Arc<Definition>> = elements
            .iter()
            .filter(|d| d.location() == root_key)
            .cloned()
            .collect();
        let candidates = if in_root.is_empty() { &elements } else { &in_root };
        if candidates.len() == 1 {
            debug!(root = %candidates[0].name(), "single global element chosen as root");
            return Ok(Arc::clone(&candidates[0]));
        }
        return Err(Error::AmbiguousRootElement {
            requested: None,
            candidates: describe(candidates),
        });
    };

    if let Some(exact) = elements
        .iter()
        .find(|d| names.name(d.namespace_uri(), d.name()) == requested)
    {
        return Ok(Arc::clone(exact));
    }

    let local = crate::names::local_name(requested);
    let matching: Vec<Arc<Definition>> = elements
        .iter()
        .filter(|d| d.name() == local)
        .cloned()
        .collect();
    match matching.len() {
        1 => Ok(Arc::clone(&matching[0])),
        0 => Err(Error::AmbiguousRootElement {
            requested: Some(requested.to_string()),
            candidates: describe(&elements),
        }),
        _ => Err(Error::AmbiguousRootElement {
            requested: Some(requested.to_string()),
            candidates: describe(&matching),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> String {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path.to_string_lossy().to_string()
    }

    const LIBRARY: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
        xmlns:lib="urn:lib" targetNamespace="urn:lib">
      <xs:include schemaLocation="types/b.xsd"/>
      <xs:element name="library">
        <xs:complexType>
          <xs:sequence>
            <xs:element name="author" type="lib:authorType" maxOccurs="unbounded"/>
          </xs:sequence>
        </xs:complexType>
      </xs:element>
    </xs:schema>"#;

    const AUTHOR: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
      <xs:complexType name="authorType">
        <xs:sequence><xs:element name="name" type="xs:string"/></xs:sequence>
      </xs:complexType>
    </xs:schema>"#;

    #[test]
    fn test_include_relative_to_including_file() {
        let dir = TempDir::new().unwrap();
        let root = write(&dir, "a.xsd", LIBRARY);
        write(&dir, "types/b.xsd", AUTHOR);

        let schema = DefinitionMiner::new().mine(&root, None).unwrap();
        assert_eq!(schema.readers.len(), 2);
        assert_eq!(schema.root_element.name(), "library");
        let author = schema.definitions.get("authorType", "urn:lib").unwrap();
        assert!(author.as_complex().is_some());
        assert!(schema.definitions.get("library-inline-0", "urn:lib").is_some());
    }

    #[test]
    fn test_include_falls_back_to_root_directory() {
        let dir = TempDir::new().unwrap();
        let root = write(
            &dir,
            "a.xsd",
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 <xs:include schemaLocation="nested/mid.xsd"/>
                 <xs:element name="root" type="leafType"/>
               </xs:schema>"#,
        );
        write(
            &dir,
            "nested/mid.xsd",
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 <xs:include schemaLocation="leaf.xsd"/>
               </xs:schema>"#,
        );
        write(
            &dir,
            "leaf.xsd",
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 <xs:simpleType name="leafType"><xs:restriction base="xs:string"/></xs:simpleType>
               </xs:schema>"#,
        );

        let schema = DefinitionMiner::new().mine(&root, Some("root")).unwrap();
        assert_eq!(schema.readers.len(), 3);
        assert!(schema.definitions.get("leafType", "").is_some());
    }

    #[test]
    fn test_unresolved_include_lists_attempts() {
        let dir = TempDir::new().unwrap();
        let root = write(
            &dir,
            "a.xsd",
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 <xs:include schemaLocation="missing.xsd"/>
               </xs:schema>"#,
        );
        match DefinitionMiner::new().mine(&root, None).unwrap_err() {
            Error::UnresolvedInclude { location, attempts } => {
                assert_eq!(location, "missing.xsd");
                assert_eq!(attempts.len(), 2);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_substitution_members_are_linked() {
        let dir = TempDir::new().unwrap();
        let root = write(
            &dir,
            "a.xsd",
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 <xs:element name="shelf">
                   <xs:complexType><xs:sequence><xs:element ref="item" maxOccurs="unbounded"/></xs:sequence></xs:complexType>
                 </xs:element>
                 <xs:element name="item" abstract="true"/>
                 <xs:element name="book" substitutionGroup="item" type="xs:string"/>
                 <xs:element name="magazine" substitutionGroup="item" type="xs:string"/>
               </xs:schema>"#,
        );
        let schema = DefinitionMiner::new().mine(&root, Some("shelf")).unwrap();
        let item = schema.definitions.get("item", "").unwrap();
        let members: Vec<_> = item
            .as_global_element()
            .unwrap()
            .substitution_members
            .iter()
            .map(|k| k.name.as_str())
            .collect();
        assert_eq!(members, ["book", "magazine"]);

        let shelf_type = schema.definitions.get("shelf-inline-0", "").unwrap();
        let compositor = shelf_type.compositor().unwrap();
        assert_eq!(compositor.leaf_member_names(), ["book", "magazine"]);
    }

    #[test]
    fn test_ambiguous_root() {
        let dir = TempDir::new().unwrap();
        let root = write(
            &dir,
            "a.xsd",
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 <xs:element name="b" type="xs:string"/>
                 <xs:element name="a" type="xs:string"/>
               </xs:schema>"#,
        );
        match DefinitionMiner::new().mine(&root, None).unwrap_err() {
            Error::AmbiguousRootElement {
                requested,
                candidates,
            } => {
                assert_eq!(requested, None);
                assert_eq!(candidates, ["a ()", "b ()"]);
            }
            other => panic!("unexpected error {:?}", other),
        }

        assert!(matches!(
            DefinitionMiner::new().mine(&root, Some("c")),
            Err(Error::AmbiguousRootElement { .. })
        ));
        let schema = DefinitionMiner::new().mine(&root, Some("a")).unwrap();
        assert_eq!(schema.root_element_name(), "a");
    }

    #[test]
    fn test_duplicate_definition_across_files() {
        let dir = TempDir::new().unwrap();
        let root = write(
            &dir,
            "a.xsd",
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 <xs:include schemaLocation="b.xsd"/>
                 <xs:simpleType name="code"><xs:restriction base="xs:string"/></xs:simpleType>
                 <xs:element name="root" type="code"/>
               </xs:schema>"#,
        );
        write(
            &dir,
            "b.xsd",
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 <xs:simpleType name="code"><xs:restriction base="xs:token"/></xs:simpleType>
               </xs:schema>"#,
        );
        assert!(matches!(
            DefinitionMiner::new().mine(&root, None),
            Err(Error::DuplicateDefinition { .. })
        ));
    }
}
