//! Keep and redact processors

use super::Processor;
use crate::anonymization::context::ProcessContext;
use crate::anonymization::result::{OperationKind, ProcessResult};
use crate::anonymization::settings::MethodSettings;
use crate::domain::{Document, NodeId, Result};

/// Leaves the node as is
///
/// Its only effect is to claim the node in the visited set so later rules
/// skip it.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepProcessor;

impl Processor for KeepProcessor {
    fn process(
        &self,
        _document: &mut Document,
        _node: Option<NodeId>,
        _context: Option<&ProcessContext<'_>>,
        _settings: Option<&MethodSettings>,
    ) -> Result<ProcessResult> {
        Ok(ProcessResult::new())
    }
}

/// Removes the node's scalar value
#[derive(Debug, Clone, Copy, Default)]
pub struct RedactProcessor;

impl Processor for RedactProcessor {
    fn process(
        &self,
        document: &mut Document,
        node: Option<NodeId>,
        _context: Option<&ProcessContext<'_>>,
        settings: Option<&MethodSettings>,
    ) -> Result<ProcessResult> {
        let mut result = ProcessResult::new();
        let (Some(node), Some(_)) = (node, settings) else {
            return Ok(result);
        };

        if document.value(node).is_some() {
            document.set_value(node, None);
            result.record(OperationKind::Redact, document, node);
        }
        Ok(result)
    }
}
