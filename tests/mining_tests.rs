//! Mining tests against the fixture schemas.
//!
//! Covers include and import resolution, per-file namespace contexts and
//! root element selection over real multi-file schema sets.

mod fixture_facts;

use fixture_facts::{fixture, CatalogFacts, RecordFacts};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;
use xmlschema_template::definitions::{Definition, DefinitionKind};
use xmlschema_template::{DefinitionMiner, Error};

#[test]
fn test_include_contributes_definitions_to_the_target_namespace() {
    let schema = DefinitionMiner::new()
        .mine(&fixture("library/library.xsd"), None)
        .unwrap();

    assert_eq!(schema.readers.len(), 2);
    assert_eq!(schema.root_element_name(), "library");

    for name in CatalogFacts::LIBRARY_INCLUDED {
        let def = schema
            .definitions
            .get(name, CatalogFacts::LIBRARY_NAMESPACE)
            .unwrap_or_else(|| panic!("{} not mined", name));
        assert!(def.location().ends_with("authors.xsd"), "{}", def.location());
    }

    // A reference written in the including file resolves into the included one
    let author = schema
        .resolve("author", &schema.root_key)
        .expect("author resolves from library.xsd");
    assert_eq!(author.kind(), DefinitionKind::GlobalElement);
    assert_eq!(author.namespace_uri(), CatalogFacts::LIBRARY_NAMESPACE);
}

#[test]
fn test_import_keeps_namespaces_apart() {
    let schema = DefinitionMiner::new()
        .mine(&fixture("record/record.xsd"), None)
        .unwrap();

    assert!(schema.names.namespace_enabled);
    assert_eq!(schema.root_element_name(), RecordFacts::ROOT);

    let title = schema
        .definitions
        .get("title", RecordFacts::DC_NAMESPACE)
        .unwrap();
    assert!(title.location().ends_with("dc.xsd"));
    assert!(schema
        .definitions
        .get("title", RecordFacts::RECORD_NAMESPACE)
        .is_none());

    // dc.xsd binds no default namespace; its own context still resolves dc:
    let dc_reader = schema
        .readers
        .keys()
        .find(|key| key.ends_with("dc.xsd"))
        .unwrap();
    assert!(schema.resolve("dc:subject", dc_reader).is_some());
    assert!(schema.resolve("xs:string", dc_reader).is_some());

    let mut uris: Vec<&str> = schema.definitions.namespace_uris().collect();
    uris.sort_unstable();
    uris.dedup();
    assert!(uris.contains(&RecordFacts::DC_NAMESPACE));
    assert!(uris.contains(&RecordFacts::RECORD_NAMESPACE));
}

#[test]
fn test_root_selection_over_several_global_elements() {
    let path = fixture("substitution.xsd");
    assert!(matches!(
        DefinitionMiner::new().mine(&path, None),
        Err(Error::AmbiguousRootElement { .. })
    ));

    let schema = DefinitionMiner::new().mine(&path, Some("shelf")).unwrap();
    assert_eq!(schema.root_element_name(), "shelf");

    let publication = schema.definitions.get("publication", "").unwrap();
    let Definition::GlobalElement(head) = publication.as_ref() else {
        panic!("publication is not a global element");
    };
    assert!(head.is_abstract);
    let members: Vec<&str> = head
        .substitution_members
        .iter()
        .map(|key| key.name.as_str())
        .collect();
    assert_eq!(members, CatalogFacts::SHELF_MEMBERS);
}

#[test]
fn test_recursive_types_are_reported_as_cycles() {
    let schema = DefinitionMiner::new()
        .mine(&fixture("tree.xsd"), None)
        .unwrap();
    let tree_type = schema.definitions.get("treeType", "").unwrap();
    assert!(schema.cycles.is_cyclic(&tree_type.key()));

    let catalog = DefinitionMiner::new()
        .mine(&fixture("catalog.xsd"), None)
        .unwrap();
    assert!(catalog.cycles.is_empty());
}

#[test]
fn test_derivation_cycle_is_rejected_before_expansion() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("loop.xsd");
    fs::write(
        &path,
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
             <xs:element name="root" type="aType"/>
             <xs:complexType name="aType">
               <xs:complexContent><xs:extension base="bType"/></xs:complexContent>
             </xs:complexType>
             <xs:complexType name="bType">
               <xs:complexContent><xs:extension base="aType"/></xs:complexContent>
             </xs:complexType>
           </xs:schema>"#,
    )
    .unwrap();

    match DefinitionMiner::new().mine(path.to_str().unwrap(), None) {
        Err(Error::DerivationCycle { chain }) => {
            assert!(chain.len() >= 3, "{:?}", chain);
            assert_eq!(chain.first(), chain.last());
        }
        other => panic!("expected a derivation cycle, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_definition_summaries_serialize() {
    let schema = DefinitionMiner::new()
        .mine(&fixture("media.xsd"), None)
        .unwrap();
    let format = schema.definitions.get("formatType", "").unwrap();
    let json = serde_json::to_value(format.summary()).unwrap();
    assert_eq!(json["name"], "formatType");
    assert_eq!(json["kind"], "simpleType");
}
