//! Rule matching and traversal engine
//!
//! This module provides the [`AnonymizerEngine`] that resolves each rule's
//! path pattern against a document, applies the bound processor to every
//! matched node and its descendants, and labels the document afterwards.
//!
//! # Architecture
//!
//! One run over one document:
//! - **Index**: a [`NodeLookupIndex`] is built once per document
//! - **Matching**: rules are applied in list order; a node already visited in
//!   this run is skipped together with its subtree (first rule wins)
//! - **Labeling**: the accumulated operation kinds become `meta.security` codes
//!
//! Documents are independent. A batch processes each document on its own
//! blocking worker; the only state they share is the privacy budget tracker.
//!
//! # Examples
//!
//! ```
//! use medcloak::anonymization::{AnonymizationRule, AnonymizerEngine, AnonymizerMethod, ProcessorRegistry};
//! use medcloak::anonymization::privacy::PrivacyBudgetTracker;
//! use medcloak::domain::JsonDocumentReader;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # fn example() -> medcloak::domain::Result<()> {
//! let rules = vec![AnonymizationRule::simple("Patient.name", AnonymizerMethod::Redact)?];
//! let registry = ProcessorRegistry::builtin(Arc::new(PrivacyBudgetTracker::new()));
//! let engine = AnonymizerEngine::new(rules, registry)?;
//!
//! let document = JsonDocumentReader::new().read(&json!({
//!     "resourceType": "Patient",
//!     "name": [{"family": "Chalmers", "given": ["Peter"]}]
//! }))?;
//! let outcome = engine.anonymize(document)?;
//! assert_eq!(outcome.labels.len(), 1);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

use crate::anonymization::context::ProcessContext;
use crate::anonymization::index::NodeLookupIndex;
use crate::anonymization::labels::{apply_security_labels, SecurityLabel};
use crate::anonymization::privacy::PrivacyBudgetTracker;
use crate::anonymization::processors::{Processor, ProcessorRegistry};
use crate::anonymization::result::ProcessResult;
use crate::anonymization::rule::AnonymizationRule;
use crate::config::MedcloakConfig;
use crate::domain::{AnonymizerError, Document, NodeId, Result};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Anonymized document with what was done to it
#[derive(Debug, Clone)]
pub struct AnonymizationOutcome {
    pub document: Document,
    pub result: ProcessResult,
    /// Labels newly added by this run
    pub labels: Vec<SecurityLabel>,
    pub run_id: Uuid,
    pub processing_time_ms: u64,
}

/// Rule matching and traversal engine
///
/// # Thread Safety
///
/// The engine is cheap to clone (rules and registry are behind `Arc`) and can
/// be shared across tasks. Processing of one document is synchronous.
#[derive(Debug, Clone)]
pub struct AnonymizerEngine {
    rules: Arc<[AnonymizationRule]>,
    registry: Arc<ProcessorRegistry>,
}

impl AnonymizerEngine {
    /// Create an engine from prepared rules and processors
    ///
    /// # Arguments
    ///
    /// * `rules` - Rules in application order
    /// * `registry` - Processors keyed by method
    ///
    /// # Errors
    ///
    /// Returns a configuration error if any rule uses a method that has no
    /// processor in `registry`.
    pub fn new(rules: Vec<AnonymizationRule>, registry: ProcessorRegistry) -> Result<Self> {
        registry.ensure_supports(&rules)?;
        tracing::info!(rules = rules.len(), "Anonymizer engine ready");
        Ok(Self {
            rules: rules.into(),
            registry: Arc::new(registry),
        })
    }

    /// Create an engine from configuration
    ///
    /// Builds and validates every rule, initializes the configured budget
    /// contexts on `tracker`, and uses the built-in processors.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A rule path or its settings are invalid
    /// - A budget context cannot be initialized
    /// - A rule uses `encrypt` or `substitute` (no built-in processor)
    pub fn from_config(config: &MedcloakConfig, tracker: Arc<PrivacyBudgetTracker>) -> Result<Self> {
        Self::from_config_with_registry(config, ProcessorRegistry::builtin(tracker))
    }

    /// Like [`from_config`](Self::from_config) with caller-registered processors
    pub fn from_config_with_registry(config: &MedcloakConfig, registry: ProcessorRegistry) -> Result<Self> {
        for budget in &config.budgets {
            registry
                .tracker()
                .initialize(&budget.context, budget.total_epsilon)?;
        }

        let rules = config
            .rules
            .iter()
            .map(|rule| AnonymizationRule::from_config(rule, &config.privacy))
            .collect::<Result<Vec<_>>>()?;

        Self::new(rules, registry)
    }

    pub fn rules(&self) -> &[AnonymizationRule] {
        &self.rules
    }

    pub fn registry(&self) -> &ProcessorRegistry {
        &self.registry
    }

    /// Budget tracker shared by every run of this engine
    pub fn tracker(&self) -> &Arc<PrivacyBudgetTracker> {
        self.registry.tracker()
    }

    /// Apply `context.rules()` to a document
    ///
    /// Rules run in list order. Processor errors abort the run and are
    /// returned unchanged; nodes already mutated by earlier matches stay
    /// mutated.
    ///
    /// # Errors
    ///
    /// Returns the first processor error, or a configuration error if a rule's
    /// method has no registered processor.
    pub fn process(&self, document: &mut Document, context: &mut ProcessContext<'_>) -> Result<ProcessResult> {
        let index = NodeLookupIndex::build(document);
        let mut run_result = ProcessResult::new();

        for rule in context.rules() {
            let processor = self.registry.get(rule.method()).ok_or_else(|| {
                AnonymizerError::Configuration(format!(
                    "No processor registered for method '{}'",
                    rule.method()
                ))
            })?;

            let matches = rule.pattern().resolve(document, &index);
            if matches.is_empty() {
                tracing::trace!(rule = %rule.path(), "Rule matched no nodes");
                continue;
            }

            let mut rule_result = ProcessResult::new();
            for node in matches {
                if context.is_visited(node) {
                    continue;
                }
                let applied = apply_to_subtree(document, node, processor.as_ref(), rule, context)
                    .inspect_err(|e| {
                        tracing::error!(
                            rule = %rule.path(),
                            method = %rule.method(),
                            location = %document.node(node).location(),
                            error = %e,
                            "Rule application failed"
                        );
                    })?;
                rule_result.merge(applied);
            }

            tracing::debug!(
                rule = %rule.path(),
                method = %rule.method(),
                operations = rule_result.records().len(),
                "Applied rule"
            );
            run_result.merge(rule_result);
        }

        Ok(run_result)
    }

    /// Anonymize one document with a fresh context and label it
    pub fn anonymize(&self, mut document: Document) -> Result<AnonymizationOutcome> {
        let start = Instant::now();
        let mut context = ProcessContext::new(&self.rules, &document);
        let result = self.process(&mut document, &mut context)?;
        let labels = apply_security_labels(&mut document, &result);

        let processing_time_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            run_id = %context.run_id(),
            resource_type = %document.root_type(),
            operations = result.records().len(),
            visited = context.visited_count(),
            processing_time_ms,
            "Anonymized document"
        );

        Ok(AnonymizationOutcome {
            run_id: context.run_id(),
            document,
            result,
            labels,
            processing_time_ms,
        })
    }

    /// Anonymize a batch, one blocking worker per document
    ///
    /// Results are returned in input order. A failing document (for example on
    /// budget exhaustion) yields an `Err` in its slot and does not affect the
    /// others.
    pub async fn anonymize_batch(&self, documents: Vec<Document>) -> Vec<Result<AnonymizationOutcome>> {
        let total = documents.len();
        let handles: Vec<_> = documents
            .into_iter()
            .map(|document| {
                let engine = self.clone();
                tokio::task::spawn_blocking(move || engine.anonymize(document))
            })
            .collect();

        let results: Vec<Result<AnonymizationOutcome>> = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|joined| {
                joined.unwrap_or_else(|e| {
                    Err(AnonymizerError::Processing {
                        rule: "batch worker".to_string(),
                        message: e.to_string(),
                    })
                })
            })
            .collect();

        let failed = results.iter().filter(|r| r.is_err()).count();
        if failed > 0 {
            tracing::warn!(total, failed, "Batch finished with failures");
        } else {
            tracing::info!(total, "Batch anonymized");
        }
        results
    }
}

/// Apply a processor to `start` and every descendant not yet visited
///
/// A visited node is skipped together with its subtree.
fn apply_to_subtree(
    document: &mut Document,
    start: NodeId,
    processor: &dyn Processor,
    rule: &AnonymizationRule,
    context: &mut ProcessContext<'_>,
) -> Result<ProcessResult> {
    let mut result = ProcessResult::new();
    let mut stack = vec![start];

    while let Some(node) = stack.pop() {
        if !context.mark_visited(node) {
            continue;
        }
        let applied = processor.process(document, Some(node), Some(&*context), Some(rule.settings()))?;
        result.merge(applied);

        // Reverse so children are visited in document order
        stack.extend(document.children(node).iter().rev().copied());
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anonymization::result::OperationKind;
    use crate::anonymization::rule::AnonymizerMethod;
    use crate::domain::JsonDocumentReader;
    use serde_json::json;

    fn engine(rules: Vec<AnonymizationRule>) -> AnonymizerEngine {
        let registry = ProcessorRegistry::builtin(Arc::new(PrivacyBudgetTracker::new()));
        AnonymizerEngine::new(rules, registry).unwrap()
    }

    fn patient() -> Document {
        JsonDocumentReader::new()
            .read(&json!({
                "resourceType": "Patient",
                "id": "example",
                "name": [{"family": "Chalmers", "given": ["Peter", "James"]}],
                "gender": "male",
                "birthDate": "1974-12-25"
            }))
            .unwrap()
    }

    #[test]
    fn test_empty_rule_list_leaves_document_unlabeled() {
        let outcome = engine(Vec::new()).anonymize(patient()).unwrap();
        assert!(outcome.result.is_empty());
        assert!(outcome.labels.is_empty());
        assert!(outcome.document.find_child(outcome.document.root(), "meta").is_none());
    }

    #[test]
    fn test_redact_applies_to_descendants() {
        let rules = vec![AnonymizationRule::simple("Patient.name", AnonymizerMethod::Redact).unwrap()];
        let outcome = engine(rules).anonymize(patient()).unwrap();

        let redacted = outcome
            .result
            .records()
            .iter()
            .filter(|r| r.kind == OperationKind::Redact)
            .count();
        assert_eq!(redacted, 3);
        assert_eq!(outcome.labels, vec![SecurityLabel::Redacted]);
    }

    #[test]
    fn test_first_rule_wins() {
        let rules = vec![
            AnonymizationRule::simple("Patient.name", AnonymizerMethod::Keep).unwrap(),
            AnonymizationRule::simple("HumanName::family", AnonymizerMethod::Redact).unwrap(),
        ];
        let outcome = engine(rules).anonymize(patient()).unwrap();
        assert!(outcome.result.is_empty());
        let doc = &outcome.document;
        let name = doc.find_child(doc.root(), "name").unwrap();
        let family = doc.find_child(name, "family").unwrap();
        assert_eq!(doc.value(family), Some("Chalmers"));
    }

    #[test]
    fn test_missing_processor_fails_construction() {
        let registry = ProcessorRegistry::builtin(Arc::new(PrivacyBudgetTracker::new()));
        let rules = vec![AnonymizationRule::simple("Patient.name", AnonymizerMethod::Substitute).unwrap()];
        assert!(matches!(
            AnonymizerEngine::new(rules, registry),
            Err(AnonymizerError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_batch_preserves_order() {
        let rules = vec![AnonymizationRule::simple("Patient.gender", AnonymizerMethod::Redact).unwrap()];
        let engine = engine(rules);
        let outcomes = engine.anonymize_batch(vec![patient(), patient(), patient()]).await;
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.iter().all(|o| o.as_ref().map(|o| o.labels.len() == 1).unwrap_or(false)));
    }
}
