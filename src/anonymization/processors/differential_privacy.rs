//! Differential-privacy processor
//!
//! Adds calibrated noise to a numeric leaf after charging the rule's epsilon
//! to its budget context. Budget is charged before the node is touched; a
//! denied charge leaves the node unmutated and surfaces as
//! [`PrivacyError::BudgetExhausted`].

use super::Processor;
use crate::anonymization::context::ProcessContext;
use crate::anonymization::privacy::{sample_noise, PrivacyBudgetTracker};
use crate::anonymization::result::{OperationKind, ProcessResult};
use crate::anonymization::settings::MethodSettings;
use crate::domain::{AnonymizerError, Document, NodeId, PrivacyError, Result};
use rand::rngs::OsRng;
use std::sync::Arc;

/// Integer bounds and floor for integer-family instance types
fn integer_bounds(instance_type: &str) -> Option<(i64, i64)> {
    let (min, max) = (i64::from(i32::MIN), i64::from(i32::MAX));
    match instance_type {
        "integer" => Some((min, max)),
        "positiveInt" => Some((1, max)),
        "unsignedInt" => Some((0, max)),
        "integer64" => Some((i64::MIN, i64::MAX)),
        _ => None,
    }
}

/// Apply `noise` to a scalar of the given instance type
///
/// Returns `None` when the value is not numeric. Overflow is clamped to the
/// type's representable range; integer-family types are rounded and floored
/// (`positiveInt` at 1, `unsignedInt` at 0).
pub fn perturb_value(value: &str, instance_type: &str, noise: f64) -> Option<String> {
    let original: f64 = value.trim().parse().ok()?;
    if !original.is_finite() {
        return None;
    }

    let mut noisy = original + noise;
    if !noisy.is_finite() {
        tracing::warn!(instance_type, "Noise addition overflowed, clamping");
        noisy = if noisy.is_sign_negative() { f64::MIN } else { f64::MAX };
    }

    match integer_bounds(instance_type) {
        Some((min, max)) => {
            let rounded = noisy.round();
            let clamped = if rounded < min as f64 {
                if instance_type == "integer" || instance_type == "integer64" {
                    tracing::warn!(instance_type, "Perturbed integer below range, clamping");
                }
                min
            } else if rounded > max as f64 {
                tracing::warn!(instance_type, "Perturbed integer above range, clamping");
                max
            } else {
                rounded as i64
            };
            Some(clamped.to_string())
        }
        None => Some(noisy.to_string()),
    }
}

/// Perturbs numeric values and charges the shared budget tracker
#[derive(Debug, Clone)]
pub struct DifferentialPrivacyProcessor {
    tracker: Arc<PrivacyBudgetTracker>,
}

impl DifferentialPrivacyProcessor {
    pub fn new(tracker: Arc<PrivacyBudgetTracker>) -> Self {
        Self { tracker }
    }

    pub fn tracker(&self) -> &Arc<PrivacyBudgetTracker> {
        &self.tracker
    }
}

impl Processor for DifferentialPrivacyProcessor {
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
        let MethodSettings::DifferentialPrivacy(setting) = settings else {
            return Err(AnonymizerError::Configuration(
                "differentialPrivacy processor requires differentialPrivacy settings".to_string(),
            ));
        };
        let Some(value) = document.value(node) else {
            return Ok(result);
        };
        if value.trim().parse::<f64>().map_or(true, |v| !v.is_finite()) {
            tracing::debug!(
                location = %document.node(node).location(),
                "Skipping non-numeric value"
            );
            return Ok(result);
        }

        let context = setting.budget_context();
        let epsilon = setting.epsilon();
        let Some(budget) = self.tracker.consume_with_snapshot(context, epsilon)? else {
            let remaining = self.tracker.remaining(context)?;
            tracing::warn!(
                context = %context,
                epsilon,
                remaining,
                location = %document.node(node).location(),
                "Privacy budget exhausted, node left unmodified"
            );
            return Err(PrivacyError::BudgetExhausted {
                context: context.to_string(),
                requested: epsilon,
                remaining,
            }
            .into());
        };

        let noise = sample_noise(&mut OsRng, setting);
        let instance_type = document.node(node).instance_type().to_string();
        if let Some(perturbed) = document
            .value(node)
            .and_then(|v| perturb_value(v, &instance_type, noise))
        {
            document.set_value(node, Some(perturbed));
        }

        result.record(OperationKind::Perturb, document, node);
        result.record(OperationKind::DifferentialPrivacy, document, node);
        result.mark_differentially_private();
        result.set_metric("epsilon_consumed", epsilon);
        result.set_metric("delta", setting.delta());
        result.set_metric("mechanism", setting.mechanism().to_string());
        result.set_metric("budget_context", context);
        result.set_metric("total_epsilon_consumed", budget.consumed);
        result.set_metric("remaining_budget", budget.remaining);

        if budget.approaching_limit {
            tracing::warn!(
                context = %context,
                remaining = budget.remaining,
                "Privacy budget approaching limit"
            );
        }
        Ok(result)
    }
}
