//! Schema-aware editing of instance documents
//!
//! [`DocMap`] edits a caller-owned [`Document`] by path. With a
//! [`SchemaHelper`] attached, new elements are built from the template and
//! placed where the parent's sequence says they belong; without one, new
//! elements are empty and appended.

use crate::definitions::CompositorKind;
use crate::documents::{Document, Element};
use crate::error::{Error, Result};
use crate::helper::SchemaHelper;
use crate::names;
use crate::paths;
use tracing::{debug, trace};

/// Path-addressed editor over a live document
pub struct DocMap<'a> {
    document: &'a mut Document,
    helper: Option<&'a SchemaHelper>,
}

impl<'a> DocMap<'a> {
    /// Editor without schema knowledge
    pub fn new(document: &'a mut Document) -> Self {
        Self {
            document,
            helper: None,
        }
    }

    /// Editor that orders and builds elements from a schema
    pub fn with_helper(document: &'a mut Document, helper: &'a SchemaHelper) -> Self {
        Self {
            document,
            helper: Some(helper),
        }
    }

    /// The edited document
    pub fn document(&self) -> &Document {
        &*self.document
    }

    /// True when an element or attribute exists at `path`
    pub fn node_exists(&self, path: &str) -> bool {
        let path = paths::decode(path);
        if path.trim().is_empty() {
            return false;
        }
        if paths::is_attribute_path(&path) {
            self.document.attribute(&path).is_some()
        } else {
            self.document.select(&path).is_some()
        }
    }

    /// Text of the element, or value of the attribute, at `path`; empty
    /// when no node exists
    pub fn get(&self, path: &str) -> String {
        let path = paths::decode(path);
        if paths::is_attribute_path(&path) {
            self.document.attribute(&path).unwrap_or_default().to_string()
        } else {
            self.document
                .select(&path)
                .map(|e| e.text().to_string())
                .unwrap_or_default()
        }
    }

    /// Set the value at `path`, creating the node and any missing
    /// ancestors first
    pub fn put(&mut self, path: &str, value: &str) -> Result<()> {
        let path = paths::decode(path);
        if !self.node_exists(&path) {
            self.create_new_node(&path)?;
        }
        self.set_value(&path, value)
    }

    /// Like [`Self::put`], but the path must be known to the schema
    pub fn smart_put(&mut self, path: &str, value: &str) -> Result<()> {
        let path = paths::decode(path);
        if let Some(helper) = self.helper {
            if helper.schema_node(&path).is_none() {
                return Err(Error::Mutation(format!("no schema node for {}", path)));
            }
        }
        self.put(&path, value)
    }

    fn set_value(&mut self, path: &str, value: &str) -> Result<()> {
        if paths::is_attribute_path(path) {
            let owner = self.select_owner(path)?;
            owner.set_attribute(paths::leaf(path), value);
        } else {
            let element = self
                .document
                .select_mut(path)
                .ok_or_else(|| Error::Mutation(format!("no element at {}", path)))?;
            element.set_text(value);
        }
        Ok(())
    }

    fn select_owner(&mut self, path: &str) -> Result<&mut Element> {
        let parent = paths::parent(path);
        self.document
            .select_mut(&parent)
            .ok_or_else(|| Error::Mutation(format!("no element at {}", parent)))
    }

    /// True when the element at `path` has text, attributes or child
    /// elements
    pub fn has_children(&self, path: &str) -> bool {
        let path = paths::decode(path);
        if paths::is_attribute_path(&path) {
            return false;
        }
        self.document.select(&path).map_or(false, |e| {
            !e.text().trim().is_empty() || !e.children.is_empty() || !e.attributes.is_empty()
        })
    }

    /// True when the node at `path` holds no value anywhere below it;
    /// false when no node exists
    pub fn is_empty(&self, path: &str) -> bool {
        let path = paths::decode(path);
        if paths::is_attribute_path(&path) {
            return self.document.attribute(&path).map_or(false, str::is_empty);
        }
        self.document.select(&path).map_or(false, Element::is_empty)
    }

    /// Remove the node at `path`; false when nothing was removed
    pub fn remove(&mut self, path: &str) -> bool {
        let path = paths::decode(path);
        if paths::is_attribute_path(&path) {
            return match self.select_owner(&path) {
                Ok(owner) => owner.remove_attribute(&paths::leaf(&path)).is_some(),
                Err(_) => false,
            };
        }
        let name = paths::node_name(&path);
        let index = paths::index(&path).max(1);
        let Some(parent) = self.document.select_mut(&paths::parent(&path)) else {
            return false;
        };
        match child_position(parent, &name, index) {
            Some(position) => {
                parent.children.remove(position);
                true
            }
            None => false,
        }
    }

    /// Remove the element at `path`, decoding form-encoded indices
    pub fn remove_element(&mut self, path: &str) -> bool {
        debug!(path, "removing element");
        self.remove(path)
    }

    /// Remove every sibling sharing the name of the element at `path`,
    /// returning how many were removed
    pub fn remove_siblings(&mut self, path: &str) -> Result<usize> {
        let path = paths::decode(path);
        if !self.node_exists(&path) {
            return Err(Error::Mutation(format!("no element at {}", path)));
        }
        let name = paths::node_name(&path);
        let parent = self.select_owner(&path)?;
        let before = parent.children.len();
        parent.children.retain(|c| c.name != name);
        Ok(before - parent.children.len())
    }

    /// Number of elements sharing the name of the node at `path`
    pub fn sibling_count(&self, path: &str) -> usize {
        let path = paths::decode(path);
        let name = paths::node_name(&path);
        self.document
            .select(&paths::parent(&path))
            .map_or(0, |parent| parent.count_children(&name))
    }

    /// Insert `element` right after the element at `reference_path`,
    /// creating the parent if needed
    pub fn add_element(&mut self, element: Element, reference_path: &str) -> Result<()> {
        let path = paths::decode(reference_path);
        let parent_path = paths::parent(&path);
        if self.document.select(&parent_path).is_none() {
            self.create_new_node(&parent_path)?;
        }
        let target = paths::sibling_path(&path, paths::index(&path).max(1) + 1);
        self.insert_element(element, &parent_path, &target)
    }

    /// Insert `element` into the element at `parent_path`.
    ///
    /// Without an index on `target_path`, or into an empty parent, the
    /// element goes where the parent's sequence places its name. With an
    /// index N it goes right after the (N-1)-th like-named child.
    pub fn insert_element(
        &mut self,
        element: Element,
        parent_path: &str,
        target_path: &str,
    ) -> Result<()> {
        let parent_path = paths::decode(parent_path);
        let target_index = paths::index(&paths::decode(target_path));
        let helper = self.helper;
        let parent = self
            .document
            .select_mut(&parent_path)
            .ok_or_else(|| Error::Mutation(format!("no parent element at {}", parent_path)))?;

        if parent.is_empty() || target_index == 0 {
            untargeted_insert(helper, parent, &parent_path, element);
            return Ok(());
        }
        targeted_insert(helper, parent, &parent_path, element, target_index)
    }

    /// Regroup the children of the element at `parent_path` into the order
    /// the template gives, keeping document order within each name
    pub fn order_sequence_elements(&mut self, parent_path: &str) -> Result<()> {
        let helper = self
            .helper
            .ok_or_else(|| Error::Mutation("ordering elements needs a schema".to_string()))?;
        let parent_path = paths::decode(parent_path);
        let order = helper.children_order(&parent_path);
        if order.len() < 2 {
            return Ok(());
        }
        let parent = self
            .document
            .select_mut(&parent_path)
            .ok_or_else(|| Error::Mutation(format!("no element at {}", parent_path)))?;
        parent.children.sort_by_cached_key(|child| {
            let name = member_name(Some(helper), &parent_path, child);
            order
                .iter()
                .position(|n| *n == name)
                .unwrap_or(order.len())
        });
        Ok(())
    }

    /// Create a node at `path`, and any missing ancestors.
    ///
    /// With a schema, elements are built from the template; a path index
    /// above 1 also creates the missing earlier siblings.
    pub fn create_new_node(&mut self, path: &str) -> Result<()> {
        let path = paths::decode(path);
        if self.node_exists(&path) {
            return Err(Error::Mutation(format!("node at {} already exists", path)));
        }
        let parent_path = paths::parent(&path);
        if parent_path.is_empty() {
            return Err(Error::Mutation(format!("cannot create a root element at {}", path)));
        }
        if self.document.select(&parent_path).is_none() {
            trace!(path = %parent_path, "creating missing parent");
            self.create_new_node(&parent_path)?;
            if self.node_exists(&path) {
                return Ok(());
            }
        }

        let name = paths::node_name(&path);
        if paths::is_attribute_path(&path) {
            if names::is_qualified(&name) && self.helper.is_none() {
                return Err(Error::Mutation(format!(
                    "qualified attribute {} needs a schema",
                    name
                )));
            }
            self.select_owner(&path)?.set_attribute(name, "");
            return Ok(());
        }

        let element = match self.helper.and_then(|h| h.new_element(&path)) {
            Some(element) => element,
            None => {
                if self.helper.is_some() {
                    debug!(path = %path, "no template for new element");
                }
                Element::new(name.clone())
            }
        };

        let index = paths::index(&path);
        for i in 1..index {
            let sibling = paths::sibling_path(&path, i);
            if !self.node_exists(&sibling) {
                self.insert_element(element.clone(), &parent_path, &sibling)?;
            }
        }
        self.insert_element(element, &parent_path, &path)
    }

    /// Create a new sibling after the last element sharing the name of the
    /// node at `path`
    pub fn create_new_sibling_node(&mut self, path: &str) -> Result<()> {
        let path = paths::decode(path);
        let count = self.sibling_count(&path);
        self.create_new_node(&paths::sibling_path(&path, count + 1))
    }
}

/// Position among all children of the `index`-th child named `name`
fn child_position(parent: &Element, name: &str, index: usize) -> Option<usize> {
    parent
        .children
        .iter()
        .enumerate()
        .filter(|(_, c)| c.name == name)
        .nth(index.checked_sub(1)?)
        .map(|(position, _)| position)
}

/// Name of the compositor member a child fills: its substitution head when
/// it is a substitution member, its own name otherwise
fn member_name(helper: Option<&SchemaHelper>, parent_path: &str, element: &Element) -> String {
    helper
        .and_then(|h| h.schema_node(&paths::join(parent_path, &element.name)))
        .and_then(|node| node.head_element_name.clone())
        .unwrap_or_else(|| element.name.clone())
}

fn untargeted_insert(
    helper: Option<&SchemaHelper>,
    parent: &mut Element,
    parent_path: &str,
    element: Element,
) {
    let compositor = helper
        .and_then(|h| h.compositor(parent_path))
        .filter(|c| c.kind == CompositorKind::Sequence);
    let Some(compositor) = compositor else {
        parent.add_child(element);
        return;
    };

    let Some(member_index) = compositor.index_of_member(&member_name(helper, parent_path, &element))
    else {
        debug!(element = %element.name, parent = parent_path, "element is not a sequence member, appending");
        parent.add_child(element);
        return;
    };

    let position = parent.children.iter().position(|child| {
        compositor
            .index_of_member(&member_name(helper, parent_path, child))
            .map_or(false, |index| index > member_index)
    });
    match position {
        Some(position) => parent.children.insert(position, element),
        None => parent.add_child(element),
    }
}

fn targeted_insert(
    helper: Option<&SchemaHelper>,
    parent: &mut Element,
    parent_path: &str,
    element: Element,
    target_index: usize,
) -> Result<()> {
    let target_name = member_name(helper, parent_path, &element);
    let mut seen = 0;
    let mut position = None;
    for (i, child) in parent.children.iter().enumerate() {
        if member_name(helper, parent_path, child) == target_name {
            seen += 1;
            if seen == target_index - 1 {
                position = Some(i + 1);
                break;
            }
        }
    }

    match position {
        Some(position) => {
            parent.children.insert(position, element);
            Ok(())
        }
        None if target_index == 1 => {
            untargeted_insert(helper, parent, parent_path, element);
            Ok(())
        }
        None => Err(Error::Mutation(format!(
            "no {} sibling at index {} in {}",
            target_name,
            target_index - 1,
            parent_path
        ))),
    }
}
