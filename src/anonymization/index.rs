//! Node lookup index
//!
//! Built once per top-level document by a full pre-order traversal. Type- and
//! name-scoped rule patterns resolve against it instead of re-walking the tree.

use crate::domain::{Document, NodeId};
use std::collections::HashMap;

/// Instance-type and element-name lookup tables for one document
#[derive(Debug, Default, Clone)]
pub struct NodeLookupIndex {
    by_type: HashMap<String, Vec<NodeId>>,
    by_name: HashMap<String, Vec<NodeId>>,
}

impl NodeLookupIndex {
    /// Index every node of the document in pre-order
    pub fn build(document: &Document) -> Self {
        let mut index = Self::default();
        for id in document.descendants(document.root()) {
            let node = document.node(id);
            index
                .by_type
                .entry(node.instance_type().to_string())
                .or_default()
                .push(id);
            if !node.name().is_empty() {
                index
                    .by_name
                    .entry(node.name().to_string())
                    .or_default()
                    .push(id);
            }
        }
        tracing::trace!(
            types = index.by_type.len(),
            names = index.by_name.len(),
            "Node lookup index built"
        );
        index
    }

    /// Nodes with the given instance type, in document order
    pub fn nodes_by_type(&self, instance_type: &str) -> Option<&[NodeId]> {
        self.by_type.get(instance_type).map(Vec::as_slice)
    }

    /// Nodes with the given element name, in document order
    pub fn nodes_by_name(&self, name: &str) -> Option<&[NodeId]> {
        self.by_name.get(name).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_by_type_and_name() {
        let mut doc = Document::new("Patient");
        let root = doc.root();
        let home = doc.add_child(root, "address", "Address", None, true);
        let work = doc.add_child(root, "address", "Address", None, true);
        doc.add_child(home, "postalCode", "string", Some("98101".into()), false);
        doc.add_child(work, "postalCode", "string", Some("98052".into()), false);

        let index = NodeLookupIndex::build(&doc);
        assert_eq!(index.nodes_by_type("Address"), Some(&[home, work][..]));
        assert_eq!(index.nodes_by_name("postalCode").map(<[NodeId]>::len), Some(2));
        assert_eq!(index.nodes_by_type("Patient"), Some(&[root][..]));
        assert!(index.nodes_by_name("telecom").is_none());
    }
}
