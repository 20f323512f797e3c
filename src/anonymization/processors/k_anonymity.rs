//! K-anonymity processor (per-node pass)

use super::Processor;
use crate::anonymization::context::ProcessContext;
use crate::anonymization::kanon::{generalize, GeneralizationStrategy};
use crate::anonymization::result::{OperationKind, ProcessResult};
use crate::anonymization::settings::MethodSettings;
use crate::domain::{AnonymizerError, Document, NodeId, Result};

/// Metric set on every result: the batch must still be validated
pub const BATCH_VALIDATION_REQUIRED: &str = "batch_validation_required";

/// Generalizes one quasi-identifier value
///
/// Never marks the result k-anonymized; only
/// [`crate::anonymization::kanon::ValidationReport::certify`] does that, after
/// the whole batch has been checked.
#[derive(Debug, Clone, Copy, Default)]
pub struct KAnonymityProcessor;

impl Processor for KAnonymityProcessor {
    fn process(
        &self,
        document: &mut Document,
        node: Option<NodeId>,
        _context: Option<&ProcessContext<'_>>,
        settings: Option<&MethodSettings>,
    ) -> Result<ProcessResult> {
        let mut result = ProcessResult::new();
        let (Some(node), Some(settings)) = (node, settings) else {
            return Ok(result);
        };
        let MethodSettings::KAnonymity(setting) = settings else {
            return Err(AnonymizerError::Configuration(
                "kAnonymity processor requires kAnonymity settings".to_string(),
            ));
        };
        let Some(value) = document.value(node) else {
            return Ok(result);
        };

        let generalized = generalize(value, setting.strategy(), setting.suppression());
        document.set_value(node, generalized);

        result.record(OperationKind::KAnonymity, document, node);
        let applied = match setting.strategy() {
            GeneralizationStrategy::Suppression => OperationKind::Redact,
            GeneralizationStrategy::Range | GeneralizationStrategy::Hierarchy => {
                OperationKind::Generalize
            }
        };
        result.record(applied, document, node);
        result.set_metric("k", setting.k());
        result.set_metric("generalization_strategy", setting.strategy().to_string());
        result.set_metric(BATCH_VALIDATION_REQUIRED, true);
        Ok(result)
    }
}
