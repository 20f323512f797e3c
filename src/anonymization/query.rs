//! Relative path expressions
//!
//! The expression part of a rule pattern is a dotted list of steps evaluated
//! from a scope node:
//!
//! - `name` selects every child with that element name
//! - `*` selects every child
//! - `descendants()` selects every descendant (excluding the scope node)
//!
//! An empty expression selects the scope node itself.

use crate::domain::{AnonymizerError, Document, NodeId, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One step of a relative expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Step {
    Child(String),
    AnyChild,
    Descendants,
}

/// Parsed relative expression
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RelativeExpression {
    steps: Vec<Step>,
}

impl RelativeExpression {
    /// Parse a dotted expression
    ///
    /// # Errors
    ///
    /// Returns a configuration error for empty steps (`a..b`) or characters
    /// outside element-name syntax.
    pub fn parse(expression: &str) -> Result<Self> {
        let expression = expression.trim();
        if expression.is_empty() {
            return Ok(Self::default());
        }

        let mut steps = Vec::new();
        for raw in expression.split('.') {
            let step = raw.trim();
            let parsed = match step {
                "" => {
                    return Err(AnonymizerError::Configuration(format!(
                        "Empty step in expression '{expression}'"
                    )))
                }
                "*" => Step::AnyChild,
                "descendants()" => Step::Descendants,
                name if name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') =>
                {
                    Step::Child(name.to_string())
                }
                other => {
                    return Err(AnonymizerError::Configuration(format!(
                        "Unsupported step '{other}' in expression '{expression}'"
                    )))
                }
            };
            steps.push(parsed);
        }
        Ok(Self { steps })
    }

    /// Whether the expression selects the scope node itself
    pub fn is_identity(&self) -> bool {
        self.steps.is_empty()
    }

    /// Evaluate against a scope node, returning matches in document order
    pub fn evaluate(&self, document: &Document, scope: NodeId) -> Vec<NodeId> {
        let mut current = vec![scope];
        for step in &self.steps {
            let mut next = Vec::new();
            for node in current {
                match step {
                    Step::Child(name) => next.extend(document.children_named(node, name)),
                    Step::AnyChild => next.extend_from_slice(document.children(node)),
                    Step::Descendants => {
                        next.extend(document.descendants(node).into_iter().skip(1))
                    }
                }
            }
            current = next;
        }
        current
    }
}

impl fmt::Display for RelativeExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            match step {
                Step::Child(name) => f.write_str(name)?,
                Step::AnyChild => f.write_str("*")?,
                Step::Descendants => f.write_str("descendants()")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        let mut doc = Document::new("Patient");
        let root = doc.root();
        let address = doc.add_child(root, "address", "Address", None, true);
        doc.add_child(address, "city", "string", Some("Seattle".into()), false);
        doc.add_child(address, "postalCode", "string", Some("98101".into()), false);
        let second = doc.add_child(root, "address", "Address", None, true);
        doc.add_child(second, "postalCode", "string", Some("98052".into()), false);
        doc
    }

    #[test]
    fn test_empty_expression_is_identity() {
        let doc = doc();
        let expr = RelativeExpression::parse("").unwrap();
        assert!(expr.is_identity());
        assert_eq!(expr.evaluate(&doc, doc.root()), vec![doc.root()]);
    }

    #[test]
    fn test_child_steps_fan_out() {
        let doc = doc();
        let expr = RelativeExpression::parse("address.postalCode").unwrap();
        let values: Vec<_> = expr
            .evaluate(&doc, doc.root())
            .into_iter()
            .filter_map(|id| doc.value(id))
            .collect();
        assert_eq!(values, vec!["98101", "98052"]);
    }

    #[test]
    fn test_wildcard_and_descendants() {
        let doc = doc();
        let any = RelativeExpression::parse("address.*").unwrap();
        assert_eq!(any.evaluate(&doc, doc.root()).len(), 3);

        let all = RelativeExpression::parse("descendants()").unwrap();
        assert_eq!(all.evaluate(&doc, doc.root()).len(), doc.len() - 1);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(RelativeExpression::parse("address..city").is_err());
        assert!(RelativeExpression::parse("address.where(use='home')").is_err());
    }
}
