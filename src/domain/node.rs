//! Document node model
//!
//! A clinical document is held as an arena of [`DocumentNode`]s addressed by
//! [`NodeId`]. Processors mutate scalar values in place through the owning
//! [`Document`]; the traversal engine tracks visited nodes by id.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a node inside its [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in the arena
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One element of a hierarchical document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentNode {
    instance_type: String,
    name: String,
    value: Option<String>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    array_member: bool,
    resource: bool,
    location: String,
}

impl DocumentNode {
    /// Instance type name (`Patient`, `Address`, `positiveInt`, ...)
    pub fn instance_type(&self) -> &str {
        &self.instance_type
    }

    /// Element name under the parent (empty for the root)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Scalar value, if any
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Child ids in document order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Parent id (None for the root)
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Whether the node was an element of a repeating (array) field
    pub fn is_array_member(&self) -> bool {
        self.array_member
    }

    /// Stable location string, unique within the document
    pub fn location(&self) -> &str {
        &self.location
    }

    /// True when the node carries neither a value nor children
    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.children.is_empty()
    }
}

/// A parsed document tree
///
/// # Examples
///
/// ```
/// use medcloak::domain::Document;
///
/// let mut doc = Document::new("Patient");
/// let root = doc.root();
/// let address = doc.add_child(root, "address", "Address", None, true);
/// let postal = doc.add_child(address, "postalCode", "string", Some("98101".to_string()), false);
///
/// assert_eq!(doc.node(postal).location(), "Patient.address[0].postalCode[0]");
/// assert_eq!(doc.node(postal).value(), Some("98101"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    nodes: Vec<DocumentNode>,
}

impl Document {
    /// Creates a document containing only a root node of the given type
    pub fn new(root_type: impl Into<String>) -> Self {
        let root_type = root_type.into();
        let root = DocumentNode {
            location: root_type.clone(),
            instance_type: root_type,
            name: String::new(),
            value: None,
            children: Vec::new(),
            parent: None,
            array_member: false,
            resource: true,
        };
        Self { nodes: vec![root] }
    }

    /// Id of the root node
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Instance type of the root node (the resource type)
    pub fn root_type(&self) -> &str {
        self.nodes[0].instance_type()
    }

    /// Number of nodes in the document
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: a document has at least its root
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Borrow a node
    ///
    /// Panics if `id` does not belong to this document; ids are only minted
    /// by [`Document::add_child`] and [`Document::root`].
    pub fn node(&self, id: NodeId) -> &DocumentNode {
        &self.nodes[id.0]
    }

    /// Borrow a node if the id is valid for this document
    pub fn get(&self, id: NodeId) -> Option<&DocumentNode> {
        self.nodes.get(id.0)
    }

    /// Scalar value of a node
    pub fn value(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(DocumentNode::value)
    }

    /// Replace (or clear, with `None`) the scalar value of a node
    pub fn set_value(&mut self, id: NodeId, value: Option<String>) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.value = value;
        }
    }

    /// Children of a node
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(DocumentNode::children).unwrap_or(&[])
    }

    /// First child with the given element name
    pub fn find_child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|child| self.nodes[child.0].name == name)
    }

    /// All children with the given element name
    pub fn children_named<'a>(
        &'a self,
        parent: NodeId,
        name: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.children(parent)
            .iter()
            .copied()
            .filter(move |child| self.nodes[child.0].name == name)
    }

    /// Append a child node and return its id
    pub fn add_child(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        instance_type: impl Into<String>,
        value: Option<String>,
        array_member: bool,
    ) -> NodeId {
        let name = name.into();
        let ordinal = self.children_named(parent, &name).count();
        let location = format!("{}.{}[{}]", self.nodes[parent.0].location, name, ordinal);
        let id = NodeId(self.nodes.len());

        self.nodes.push(DocumentNode {
            instance_type: instance_type.into(),
            name,
            value,
            children: Vec::new(),
            parent: Some(parent),
            array_member,
            resource: false,
            location,
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Flag a node as an embedded resource (it carries its own `resourceType`)
    pub fn mark_resource(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.resource = true;
        }
    }

    /// Whether the node is the root or an embedded resource
    pub fn is_resource(&self, id: NodeId) -> bool {
        self.get(id).map(|node| node.resource).unwrap_or(false)
    }

    /// Pre-order traversal starting at (and including) `start`
    pub fn descendants(&self, start: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            order.push(id);
            // Reverse so the first child is visited first
            for child in self.children(id).iter().rev() {
                stack.push(*child);
            }
        }
        order
    }

    /// Look up a node by its location string
    pub fn find_by_location(&self, location: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|node| node.location == location)
            .map(NodeId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Document, NodeId, NodeId) {
        let mut doc = Document::new("Patient");
        let root = doc.root();
        let first = doc.add_child(root, "name", "HumanName", None, true);
        let second = doc.add_child(root, "name", "HumanName", None, true);
        doc.add_child(first, "family", "string", Some("Doe".to_string()), false);
        doc.add_child(second, "family", "string", Some("Roe".to_string()), false);
        (doc, first, second)
    }

    #[test]
    fn test_locations_are_unique_per_sibling() {
        let (doc, first, second) = sample();
        assert_eq!(doc.node(first).location(), "Patient.name[0]");
        assert_eq!(doc.node(second).location(), "Patient.name[1]");
        assert_ne!(doc.node(first).location(), doc.node(second).location());
    }

    #[test]
    fn test_descendants_pre_order() {
        let (doc, first, second) = sample();
        let order = doc.descendants(doc.root());
        assert_eq!(order.len(), 5);
        assert_eq!(order[0], doc.root());
        assert_eq!(order[1], first);
        assert_eq!(doc.node(order[2]).value(), Some("Doe"));
        assert_eq!(order[3], second);
    }

    #[test]
    fn test_set_value_and_clear() {
        let (mut doc, first, _) = sample();
        let family = doc.find_child(first, "family").unwrap();
        doc.set_value(family, Some("REDACTED".to_string()));
        assert_eq!(doc.value(family), Some("REDACTED"));
        doc.set_value(family, None);
        assert!(doc.node(family).is_empty());
    }

    #[test]
    fn test_find_by_location() {
        let (doc, _, second) = sample();
        assert_eq!(doc.find_by_location("Patient.name[1]"), Some(second));
        assert_eq!(doc.find_by_location("Patient.name[7]"), None);
    }
}
