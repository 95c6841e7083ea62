//! Reading a single schema file
//!
//! A [`SchemaReader`] owns the namespace context of one schema file. Reading
//! a file normalizes its default namespace, drops annotations, names every
//! anonymous type, and extracts the file's definitions and
//! `include`/`import` directives.

use crate::definitions::{xsd_attrs, xsd_elements, DefInfo, Definition, GlobalDefMap};
use crate::documents::{Document, Element};
use crate::error::{Error, ParseError, Result};
use crate::names;
use crate::namespaces::{Namespace, NamespaceRegistry};
use crate::XSD_NAMESPACE;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Attributes whose values are QNames
const QNAME_ATTRIBUTES: &[&str] = &[
    xsd_attrs::TYPE,
    xsd_attrs::REF,
    xsd_attrs::BASE,
    xsd_attrs::SUBSTITUTION_GROUP,
    xsd_attrs::ITEM_TYPE,
    "refer",
];

/// Kind of schema directive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    /// `include`: same target namespace
    Include,
    /// `import`: another namespace
    Import,
}

/// An `include` or `import` found in a schema file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Include or import
    pub kind: DirectiveKind,
    /// `schemaLocation` as written
    pub schema_location: String,
    /// Namespace the referenced file is read into
    pub namespace: String,
}

/// Everything read from one schema file
#[derive(Debug)]
pub struct ReadOutput {
    /// Namespace context of the file
    pub reader: SchemaReader,
    /// Definitions in document order
    pub definitions: Vec<Definition>,
    /// Directives in document order
    pub directives: Vec<Directive>,
}

/// Namespace context of one schema file
#[derive(Debug, Clone)]
pub struct SchemaReader {
    /// Key of the file
    pub location: String,
    /// Prefixes declared by the file
    pub namespaces: NamespaceRegistry,
    /// Target namespace of the file
    pub target_namespace: Namespace,
    /// Prefix of the XSD namespace in this file
    pub xsd_prefix: String,
}

impl SchemaReader {
    /// Read a parsed schema file.
    ///
    /// `default_target` is the includer's namespace, used when the file has
    /// no `targetNamespace`. `inline_index` numbers lifted anonymous types
    /// across the whole file set.
    pub fn read(
        mut document: Document,
        location: &str,
        default_target: Option<&str>,
        named_default_prefix: &str,
        inline_index: &mut usize,
    ) -> Result<ReadOutput> {
        if document.root.local_name() != xsd_elements::SCHEMA {
            return Err(ParseError::new(format!(
                "expected a schema root element, found '{}'",
                document.root.name
            ))
            .with_location(location)
            .into());
        }

        let mut namespaces = NamespaceRegistry::new();
        namespaces.register_document(&document.root);

        if namespaces.default_namespace().map(|ns| ns.uri.as_str()) == Some(XSD_NAMESPACE) {
            if let Some(named) = namespaces.named_default(named_default_prefix) {
                debug!(location, prefix = %named.prefix, "naming XSD default namespace");
                qualify_default_names(&mut document.root, &named);
                namespaces.register(named);
            }
        }

        let xsd_prefix = document.root.prefix().to_string();

        let target_uri = document
            .root
            .attribute(xsd_attrs::TARGET_NAMESPACE)
            .map(str::to_string)
            .or_else(|| default_target.map(str::to_string))
            .unwrap_or_default();
        namespaces.set_target_namespace(target_uri.clone());
        if namespaces.ns_for_uri(&target_uri).is_none() && namespaces.uri_for("").is_none() {
            namespaces.register(Namespace::new("", target_uri.clone()));
        }
        let target_namespace = namespaces
            .ns_for_uri(&target_uri)
            .cloned()
            .unwrap_or_else(|| Namespace::new("", target_uri.clone()));

        let reader = SchemaReader {
            location: location.to_string(),
            namespaces,
            target_namespace,
            xsd_prefix,
        };

        strip_annotations(&mut document.root);
        let directives = reader.directives(&document.root);

        reader.lift_inline_types(&mut document.root, xsd_elements::SIMPLE_TYPE, inline_index);
        reader.lift_inline_types(&mut document.root, xsd_elements::COMPLEX_TYPE, inline_index);

        let definitions = reader.extract_definitions(&document.root);
        debug!(
            location,
            target = %reader.target_namespace.uri,
            definitions = definitions.len(),
            directives = directives.len(),
            "read schema file"
        );

        Ok(ReadOutput {
            reader,
            definitions,
            directives,
        })
    }

    /// Resolve a QName written in this file
    pub fn resolve(&self, qualified_name: &str, defs: &GlobalDefMap) -> Option<Arc<Definition>> {
        defs.lookup(qualified_name, &self.namespaces)
    }

    /// Resolve a QName written in this file, failing when it names nothing
    pub fn require(
        &self,
        qualified_name: &str,
        defs: &GlobalDefMap,
        context: &str,
    ) -> Result<Arc<Definition>> {
        self.resolve(qualified_name, defs)
            .ok_or_else(|| unresolved_name(qualified_name, &self.namespaces, context))
    }

    /// Qualify a local name with this file's prefix for its target namespace
    pub fn target_qualified(&self, local_name: &str) -> String {
        self.namespaces
            .qualify(&self.target_namespace.uri, local_name)
    }

    fn directives(&self, root: &Element) -> Vec<Directive> {
        let mut directives = Vec::new();
        for child in &root.children {
            let kind = match child.local_name() {
                xsd_elements::INCLUDE => DirectiveKind::Include,
                xsd_elements::IMPORT => DirectiveKind::Import,
                xsd_elements::REDEFINE => {
                    warn!(location = %self.location, "redefine is read as a plain include");
                    DirectiveKind::Include
                }
                _ => continue,
            };
            let Some(schema_location) = child.non_empty_attribute(xsd_attrs::SCHEMA_LOCATION)
            else {
                debug!(location = %self.location, "skipping {} without schemaLocation", child.local_name());
                continue;
            };
            let namespace = match kind {
                DirectiveKind::Include => self.target_namespace.uri.clone(),
                DirectiveKind::Import => child
                    .attribute(xsd_attrs::NAMESPACE)
                    .unwrap_or_default()
                    .to_string(),
            };
            directives.push(Directive {
                kind,
                schema_location: schema_location.to_string(),
                namespace,
            });
        }
        directives
    }

    /// Name every anonymous `type_tag` element after its nearest named
    /// ancestor, and point the parent at the new name
    fn lift_inline_types(&self, root: &mut Element, type_tag: &str, inline_index: &mut usize) {
        let context = root.attribute(xsd_attrs::NAME).unwrap_or_default().to_string();
        self.lift_children(root, &context, type_tag, inline_index);
    }

    fn lift_children(
        &self,
        parent: &mut Element,
        context_name: &str,
        type_tag: &str,
        inline_index: &mut usize,
    ) {
        let parent_name = parent
            .non_empty_attribute(xsd_attrs::NAME)
            .unwrap_or(context_name)
            .to_string();

        for i in 0..parent.children.len() {
            let child = &parent.children[i];
            if child.local_name() == type_tag && !child.has_attribute(xsd_attrs::NAME) {
                let base = if parent_name.is_empty() {
                    "anonymous"
                } else {
                    parent_name.as_str()
                };
                let type_name = format!("{}-inline-{}", base, *inline_index);
                *inline_index += 1;
                trace!(name = %type_name, "lifting inline {}", type_tag);

                parent.children[i].set_attribute(xsd_attrs::NAME, type_name.clone());
                let reference = self.target_qualified(&type_name);
                match parent.local_name() {
                    xsd_elements::UNION => {
                        let members = parent
                            .attribute(xsd_attrs::MEMBER_TYPES)
                            .unwrap_or_default()
                            .trim()
                            .to_string();
                        let members = if members.is_empty() {
                            reference
                        } else {
                            format!("{} {}", members, reference)
                        };
                        parent.set_attribute(xsd_attrs::MEMBER_TYPES, members);
                    }
                    xsd_elements::RESTRICTION => parent.set_attribute(xsd_attrs::BASE, reference),
                    xsd_elements::LIST => parent.set_attribute(xsd_attrs::ITEM_TYPE, reference),
                    _ => parent.set_attribute(xsd_attrs::TYPE, reference),
                }
            }
            self.lift_children(&mut parent.children[i], &parent_name, type_tag, inline_index);
        }
    }

    fn extract_definitions(&self, root: &Element) -> Vec<Definition> {
        let mut definitions = Vec::new();
        self.collect_types(root, &mut definitions);
        for child in &root.children {
            if matches!(
                child.local_name(),
                xsd_elements::GROUP
                    | xsd_elements::ELEMENT
                    | xsd_elements::ATTRIBUTE
                    | xsd_elements::ATTRIBUTE_GROUP
            ) {
                if let Some(def) = self.definition(child) {
                    definitions.push(def);
                }
            }
        }
        definitions
    }

    fn collect_types(&self, element: &Element, definitions: &mut Vec<Definition>) {
        for child in &element.children {
            if matches!(
                child.local_name(),
                xsd_elements::SIMPLE_TYPE | xsd_elements::COMPLEX_TYPE
            ) {
                if let Some(def) = self.definition(child) {
                    definitions.push(def);
                }
            }
            self.collect_types(child, definitions);
        }
    }

    fn definition(&self, element: &Element) -> Option<Definition> {
        let name = element.non_empty_attribute(xsd_attrs::NAME)?;
        Definition::from_info(DefInfo::new(
            name,
            self.target_namespace.clone(),
            self.location.clone(),
            element.clone(),
        ))
    }
}

/// Give unprefixed element names and QName values the prefix of `named`
pub(crate) fn qualify_default_names(root: &mut Element, named: &Namespace) {
    root.declare_namespace(named.clone());
    qualify_element(root, &named.prefix);
}

fn qualify_element(element: &mut Element, prefix: &str) {
    if !names::is_qualified(&element.name) {
        element.name = names::make_qualified(prefix, &element.name);
    }
    for attr in QNAME_ATTRIBUTES {
        if let Some(value) = element.attributes.get_mut(*attr) {
            let trimmed = value.trim();
            if !trimmed.is_empty() && !names::is_qualified(trimmed) {
                *value = names::make_qualified(prefix, trimmed);
            }
        }
    }
    if let Some(value) = element.attributes.get_mut(xsd_attrs::MEMBER_TYPES) {
        *value = value
            .split_whitespace()
            .map(|member| {
                if names::is_qualified(member) {
                    member.to_string()
                } else {
                    names::make_qualified(prefix, member)
                }
            })
            .collect::<Vec<_>>()
            .join(" ");
    }
    for child in &mut element.children {
        qualify_element(child, prefix);
    }
}

/// Remove `annotation` elements everywhere in the tree
pub(crate) fn strip_annotations(element: &mut Element) {
    element
        .children
        .retain(|c| c.local_name() != xsd_elements::ANNOTATION);
    for child in &mut element.children {
        strip_annotations(child);
    }
}

/// Parse and read a schema file from text
pub(crate) fn read_text(
    text: &str,
    location: &str,
    default_target: Option<&str>,
    named_default_prefix: &str,
    inline_index: &mut usize,
) -> Result<ReadOutput> {
    let document = Document::parse_schema(text, location)?;
    SchemaReader::read(
        document,
        location,
        default_target,
        named_default_prefix,
        inline_index,
    )
}

/// Error for a QName that resolves to no definition.
///
/// A prefix the file never declared is [`Error::Namespace`]; anything else
/// is [`Error::UnresolvedReference`].
pub(crate) fn unresolved_name(qualified_name: &str, ctx: &NamespaceRegistry, context: &str) -> Error {
    let name = qualified_name.trim();
    let prefix = names::prefix(name);
    if !prefix.is_empty() && ctx.uri_for(prefix).is_none() {
        return Error::Namespace(format!(
            "undeclared prefix '{}' in '{}' ({})",
            prefix, name, context
        ));
    }
    Error::UnresolvedReference {
        name: name.to_string(),
        context: context.to_string(),
    }
}

/// Error for a directive that neither candidate location satisfies
pub(crate) fn unresolved_directive(directive: &Directive, attempts: Vec<String>) -> Error {
    Error::UnresolvedInclude {
        location: directive.schema_location.clone(),
        attempts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definitions::DefinitionKind;

    fn read(xsd: &str) -> ReadOutput {
        let mut index = 0;
        read_text(xsd, "test.xsd", None, "this", &mut index).unwrap()
    }

    #[test]
    fn test_rejects_non_schema_root() {
        let mut index = 0;
        let err = read_text("<root/>", "x.xml", None, "this", &mut index).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_target_namespace_and_definitions() {
        let output = read(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                         xmlns:c="urn:catalog" targetNamespace="urn:catalog">
                 <xs:annotation><xs:documentation>ignored</xs:documentation></xs:annotation>
                 <xs:element name="catalog" type="c:catalogType"/>
                 <xs:complexType name="catalogType">
                   <xs:sequence><xs:element name="title" type="xs:string"/></xs:sequence>
                 </xs:complexType>
                 <xs:group name="extras"><xs:sequence/></xs:group>
                 <xs:attributeGroup name="common"/>
                 <xs:attribute name="lang" type="xs:language"/>
               </xs:schema>"#,
        );
        assert_eq!(output.reader.target_namespace, Namespace::new("c", "urn:catalog"));
        assert_eq!(output.reader.xsd_prefix, "xs");

        let kinds: Vec<_> = output.definitions.iter().map(|d| d.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                DefinitionKind::Complex,
                DefinitionKind::GlobalElement,
                DefinitionKind::ModelGroup,
                DefinitionKind::AttributeGroup,
                DefinitionKind::GlobalAttribute,
            ]
        );
        assert!(output.definitions.iter().all(|d| d.namespace_uri() == "urn:catalog"));
    }

    #[test]
    fn test_target_namespace_keeps_declared_default() {
        let output = read(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                         xmlns="urn:shared" targetNamespace="urn:local">
                 <xs:element name="a" type="xs:string"/>
               </xs:schema>"#,
        );
        let reader = &output.reader;
        assert_eq!(reader.namespaces.uri_for(""), Some("urn:shared"));
        assert_eq!(reader.target_namespace.uri, "urn:local");
        assert_eq!(reader.namespaces.target_namespace_uri(), Some("urn:local"));
    }

    #[test]
    fn test_unresolved_names() {
        let output = read(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 <xs:simpleType name="code"><xs:restriction base="xs:string"/></xs:simpleType>
               </xs:schema>"#,
        );
        let mut defs = GlobalDefMap::new();
        for def in output.definitions {
            defs.insert(def).unwrap();
        }
        let reader = &output.reader;

        assert!(reader.require(" code ", &defs, "test").is_ok());
        assert!(reader.require("xs:string\n", &defs, "test").is_ok());
        assert!(matches!(
            reader.require("q:code", &defs, "test"),
            Err(Error::Namespace(_))
        ));
        match reader.require("missing", &defs, "test") {
            Err(Error::UnresolvedReference { name, context }) => {
                assert_eq!(name, "missing");
                assert_eq!(context, "test");
            }
            other => panic!("unexpected result {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_inline_types_are_lifted() {
        let output = read(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 <xs:element name="record">
                   <xs:complexType>
                     <xs:sequence>
                       <xs:element name="color">
                         <xs:simpleType>
                           <xs:restriction base="xs:string"><xs:enumeration value="red"/></xs:restriction>
                         </xs:simpleType>
                       </xs:element>
                     </xs:sequence>
                   </xs:complexType>
                 </xs:element>
               </xs:schema>"#,
        );
        let names: Vec<_> = output.definitions.iter().map(|d| d.name().to_string()).collect();
        assert!(names.contains(&"color-inline-0".to_string()));
        assert!(names.contains(&"record-inline-1".to_string()));

        let record = output
            .definitions
            .iter()
            .find(|d| d.name() == "record")
            .unwrap();
        assert_eq!(record.element().attribute("type"), Some("record-inline-1"));
    }

    #[test]
    fn test_inline_union_member_and_restriction_base() {
        let output = read(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 <xs:simpleType name="size">
                   <xs:union memberTypes="xs:int">
                     <xs:simpleType><xs:restriction base="xs:string"/></xs:simpleType>
                   </xs:union>
                 </xs:simpleType>
                 <xs:simpleType name="short">
                   <xs:restriction><xs:simpleType><xs:list itemType="xs:int"/></xs:simpleType></xs:restriction>
                 </xs:simpleType>
               </xs:schema>"#,
        );
        let size = output.definitions.iter().find(|d| d.name() == "size").unwrap();
        assert_eq!(
            size.as_simple().unwrap().union_member_type_names(),
            ["xs:int", "size-inline-0"]
        );
        let short = output.definitions.iter().find(|d| d.name() == "short").unwrap();
        assert_eq!(short.as_simple().unwrap().base_name(), Some("short-inline-1"));
    }

    #[test]
    fn test_xsd_default_namespace_is_named() {
        let output = read(
            r#"<schema xmlns="http://www.w3.org/2001/XMLSchema" xmlns:t="urn:t" targetNamespace="urn:t">
                 <element name="a" type="string"/>
                 <element name="b" type="t:bType"/>
               </schema>"#,
        );
        assert_eq!(output.reader.xsd_prefix, "this");
        let a = output.definitions.iter().find(|d| d.name() == "a").unwrap();
        assert_eq!(a.element().name, "this:element");
        assert_eq!(a.element().attribute("type"), Some("this:string"));
        let b = output.definitions.iter().find(|d| d.name() == "b").unwrap();
        assert_eq!(b.element().attribute("type"), Some("t:bType"));
    }

    #[test]
    fn test_chameleon_include_takes_includer_namespace() {
        let mut index = 0;
        let output = read_text(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 <xs:complexType name="authorType"/>
               </xs:schema>"#,
            "b.xsd",
            Some("urn:lib"),
            "this",
            &mut index,
        )
        .unwrap();
        assert_eq!(output.reader.target_namespace.uri, "urn:lib");
        assert_eq!(output.definitions[0].namespace_uri(), "urn:lib");
        assert_eq!(
            output.reader.namespaces.resolve_uri("authorType").as_deref(),
            Some("urn:lib")
        );
    }

    #[test]
    fn test_directives() {
        let output = read(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:a">
                 <xs:include schemaLocation="common.xsd"/>
                 <xs:import namespace="urn:b" schemaLocation="b/types.xsd"/>
                 <xs:import namespace="http://www.w3.org/XML/1998/namespace"/>
               </xs:schema>"#,
        );
        assert_eq!(
            output.directives,
            vec![
                Directive {
                    kind: DirectiveKind::Include,
                    schema_location: "common.xsd".to_string(),
                    namespace: "urn:a".to_string(),
                },
                Directive {
                    kind: DirectiveKind::Import,
                    schema_location: "b/types.xsd".to_string(),
                    namespace: "urn:b".to_string(),
                },
            ]
        );
    }
}
