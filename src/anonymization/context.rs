//! Per-run processing context

use crate::anonymization::rule::AnonymizationRule;
use crate::domain::{Document, NodeId};
use uuid::Uuid;

/// Mutable state for one top-level document run
///
/// The visited set is a bitset parallel to the document arena: once a node is
/// marked it is never processed again in the same run, which is what makes
/// "first rule wins" hold.
#[derive(Debug)]
pub struct ProcessContext<'a> {
    rules: &'a [AnonymizationRule],
    visited: Vec<bool>,
    run_id: Uuid,
}

impl<'a> ProcessContext<'a> {
    /// Fresh context sized for `document`
    pub fn new(rules: &'a [AnonymizationRule], document: &Document) -> Self {
        Self {
            rules,
            visited: vec![false; document.len()],
            run_id: Uuid::new_v4(),
        }
    }

    pub fn rules(&self) -> &'a [AnonymizationRule] {
        self.rules
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn is_visited(&self, node: NodeId) -> bool {
        self.visited.get(node.index()).copied().unwrap_or(false)
    }

    /// Mark a node; returns false if it was already visited
    pub fn mark_visited(&mut self, node: NodeId) -> bool {
        let index = node.index();
        if index >= self.visited.len() {
            self.visited.resize(index + 1, false);
        }
        !std::mem::replace(&mut self.visited[index], true)
    }

    pub fn visited_count(&self) -> usize {
        self.visited.iter().filter(|v| **v).count()
    }
}
