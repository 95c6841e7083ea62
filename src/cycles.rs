//! Cycle analysis of the definition graph
//!
//! Definitions reference each other through `type`, `ref`, `base`,
//! `itemType` and `memberTypes`, and a substitution head reaches each of
//! its members. A definition lies on a content cycle when its strongly
//! connected component has more than one member or it references itself.
//! Only those definitions need the bounded ancestor check while walking.
//!
//! Derivation bases must not form a cycle at all; that is reported as
//! [`Error::DerivationCycle`].

use crate::definitions::{xsd_attrs, DefKey, Definition, GlobalDefMap};
use crate::documents::Element;
use crate::error::{Error, Result};
use crate::reader::SchemaReader;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use tracing::debug;

const REFERENCE_ATTRIBUTES: &[&str] = &[
    xsd_attrs::TYPE,
    xsd_attrs::REF,
    xsd_attrs::BASE,
    xsd_attrs::ITEM_TYPE,
];

/// Definitions found on a content cycle
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    cyclic: HashSet<DefKey>,
}

impl CycleReport {
    /// True when the definition can reach itself
    pub fn is_cyclic(&self, key: &DefKey) -> bool {
        self.cyclic.contains(key)
    }

    /// Number of cyclic definitions
    pub fn len(&self) -> usize {
        self.cyclic.len()
    }

    /// True when the graph is acyclic
    pub fn is_empty(&self) -> bool {
        self.cyclic.is_empty()
    }

    /// Cyclic definitions, sorted
    pub fn keys(&self) -> Vec<&DefKey> {
        let mut keys: Vec<_> = self.cyclic.iter().collect();
        keys.sort();
        keys
    }
}

/// Check derivation chains and find content cycles
pub(crate) fn analyze(
    defs: &GlobalDefMap,
    readers: &IndexMap<String, SchemaReader>,
) -> Result<CycleReport> {
    check_derivations(defs, readers)?;

    let graph = Graph::build(defs, readers);
    let cyclic = graph.cyclic_nodes();
    debug!(
        definitions = graph.nodes.len(),
        cyclic = cyclic.len(),
        "analysed definition graph"
    );
    Ok(CycleReport { cyclic })
}

fn base_of(def: &Definition) -> Option<&str> {
    match def {
        Definition::Complex(ct) => ct.derivation.as_ref().map(|d| d.base.as_str()),
        Definition::Simple(st) => st.base_name(),
        _ => None,
    }
}

fn resolve_in(
    qname: &str,
    location: &str,
    defs: &GlobalDefMap,
    readers: &IndexMap<String, SchemaReader>,
) -> Option<std::sync::Arc<Definition>> {
    readers.get(location).and_then(|r| r.resolve(qname, defs))
}

fn check_derivations(defs: &GlobalDefMap, readers: &IndexMap<String, SchemaReader>) -> Result<()> {
    let mut acyclic: HashSet<DefKey> = HashSet::new();
    for def in defs.values().filter(|d| d.is_type()) {
        let mut chain: Vec<DefKey> = vec![def.key()];
        let mut current = std::sync::Arc::clone(def);
        while let Some(base) = base_of(&current) {
            let Some(next) = resolve_in(base, current.location(), defs, readers) else {
                break;
            };
            if matches!(next.as_ref(), Definition::BuiltIn(_)) {
                break;
            }
            let key = next.key();
            if acyclic.contains(&key) {
                break;
            }
            if let Some(start) = chain.iter().position(|k| *k == key) {
                let mut names: Vec<String> =
                    chain[start..].iter().map(|k| k.name.clone()).collect();
                names.push(key.name);
                return Err(Error::DerivationCycle { chain: names });
            }
            chain.push(key);
            current = next;
        }
        acyclic.extend(chain);
    }
    Ok(())
}

struct Graph {
    nodes: Vec<DefKey>,
    edges: Vec<Vec<usize>>,
}

impl Graph {
    fn build(defs: &GlobalDefMap, readers: &IndexMap<String, SchemaReader>) -> Self {
        let nodes: Vec<DefKey> = defs
            .values()
            .filter(|d| !matches!(d.as_ref(), Definition::BuiltIn(_)))
            .map(|d| d.key())
            .collect();
        let index: HashMap<&DefKey, usize> =
            nodes.iter().enumerate().map(|(i, k)| (k, i)).collect();

        let mut edges = vec![Vec::new(); nodes.len()];
        for def in defs.values() {
            let Some(&from) = index.get(&def.key()) else {
                continue;
            };
            let mut targets = Vec::new();
            collect_references(def.element(), &mut targets);
            for target in targets {
                if let Some(to) = resolve_in(&target, def.location(), defs, readers)
                    .and_then(|t| index.get(&t.key()).copied())
                {
                    edges[from].push(to);
                }
            }
            if let Definition::GlobalElement(ge) = def.as_ref() {
                for member in &ge.substitution_members {
                    if let Some(&to) = index.get(member) {
                        edges[from].push(to);
                    }
                }
            }
            edges[from].sort_unstable();
            edges[from].dedup();
        }
        Self { nodes, edges }
    }

    /// Tarjan's strongly connected components, iteratively
    fn cyclic_nodes(&self) -> HashSet<DefKey> {
        let n = self.nodes.len();
        let mut index: Vec<Option<usize>> = vec![None; n];
        let mut lowlink = vec![0usize; n];
        let mut on_stack = vec![false; n];
        let mut stack: Vec<usize> = Vec::new();
        let mut next = 0usize;
        let mut cyclic = HashSet::new();

        for start in 0..n {
            if index[start].is_some() {
                continue;
            }
            let mut calls: Vec<(usize, usize)> = vec![(start, 0)];
            index[start] = Some(next);
            lowlink[start] = next;
            next += 1;
            stack.push(start);
            on_stack[start] = true;

            while let Some(&(v, edge)) = calls.last() {
                if edge < self.edges[v].len() {
                    if let Some(top) = calls.last_mut() {
                        top.1 += 1;
                    }
                    let w = self.edges[v][edge];
                    match index[w] {
                        None => {
                            index[w] = Some(next);
                            lowlink[w] = next;
                            next += 1;
                            stack.push(w);
                            on_stack[w] = true;
                            calls.push((w, 0));
                        }
                        Some(w_index) if on_stack[w] => {
                            lowlink[v] = lowlink[v].min(w_index);
                        }
                        Some(_) => {}
                    }
                    continue;
                }

                calls.pop();
                if let Some(&(parent, _)) = calls.last() {
                    lowlink[parent] = lowlink[parent].min(lowlink[v]);
                }
                if Some(lowlink[v]) != index[v] {
                    continue;
                }
                let mut component = Vec::new();
                while let Some(w) = stack.pop() {
                    on_stack[w] = false;
                    component.push(w);
                    if w == v {
                        break;
                    }
                }
                if component.len() > 1 || self.edges[v].contains(&v) {
                    cyclic.extend(component.into_iter().map(|i| self.nodes[i].clone()));
                }
            }
        }
        cyclic
    }
}

fn collect_references(element: &Element, targets: &mut Vec<String>) {
    for attr in REFERENCE_ATTRIBUTES {
        if let Some(value) = element.non_empty_attribute(attr) {
            targets.push(value.trim().to_string());
        }
    }
    if let Some(members) = element.attribute(xsd_attrs::MEMBER_TYPES) {
        targets.extend(members.split_whitespace().map(str::to_string));
    }
    for child in &element.children {
        collect_references(child, targets);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::read_text;

    fn load(xsd: &str) -> (GlobalDefMap, IndexMap<String, SchemaReader>) {
        let mut index = 0;
        let output = read_text(xsd, "a.xsd", None, "this", &mut index).unwrap();
        let mut defs = GlobalDefMap::new();
        for def in output.definitions {
            defs.insert(def).unwrap();
        }
        let mut readers = IndexMap::new();
        readers.insert("a.xsd".to_string(), output.reader);
        (defs, readers)
    }

    #[test]
    fn test_acyclic_schema() {
        let (defs, readers) = load(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 <xs:element name="root" type="rootType"/>
                 <xs:complexType name="rootType">
                   <xs:sequence><xs:element name="leaf" type="xs:string"/></xs:sequence>
                 </xs:complexType>
               </xs:schema>"#,
        );
        let report = analyze(&defs, &readers).unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn test_self_referencing_type_is_cyclic() {
        let (defs, readers) = load(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 <xs:element name="root" type="nodeType"/>
                 <xs:complexType name="nodeType">
                   <xs:sequence>
                     <xs:element name="child" type="nodeType" minOccurs="0"/>
                   </xs:sequence>
                 </xs:complexType>
                 <xs:complexType name="plain"/>
               </xs:schema>"#,
        );
        let report = analyze(&defs, &readers).unwrap();
        assert!(report.is_cyclic(&DefKey::new("", "nodeType")));
        assert!(!report.is_cyclic(&DefKey::new("", "root")));
        assert!(!report.is_cyclic(&DefKey::new("", "plain")));
    }

    #[test]
    fn test_mutual_recursion_through_elements() {
        let (defs, readers) = load(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 <xs:element name="a" type="aType"/>
                 <xs:element name="b" type="bType"/>
                 <xs:complexType name="aType"><xs:sequence><xs:element ref="b"/></xs:sequence></xs:complexType>
                 <xs:complexType name="bType"><xs:sequence><xs:element ref="a"/></xs:sequence></xs:complexType>
               </xs:schema>"#,
        );
        let report = analyze(&defs, &readers).unwrap();
        assert_eq!(report.len(), 4);
    }

    #[test]
    fn test_derivation_cycle_is_fatal() {
        let (defs, readers) = load(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 <xs:complexType name="a">
                   <xs:complexContent><xs:extension base="b"/></xs:complexContent>
                 </xs:complexType>
                 <xs:complexType name="b">
                   <xs:complexContent><xs:extension base="a"/></xs:complexContent>
                 </xs:complexType>
               </xs:schema>"#,
        );
        match analyze(&defs, &readers).unwrap_err() {
            Error::DerivationCycle { chain } => assert_eq!(chain, ["a", "b", "a"]),
            other => panic!("unexpected error {:?}", other),
        }
    }
}
