//! Anonymization processors
//!
//! Every method implements [`Processor`]. The engine looks processors up in a
//! [`ProcessorRegistry`] keyed by [`AnonymizerMethod`]; built-ins come from an
//! exhaustive match, and callers register their own for methods without a
//! built-in (`encrypt`, `substitute`).

pub mod crypto_hash;
pub mod differential_privacy;
pub mod k_anonymity;
pub mod redaction;

use crate::anonymization::context::ProcessContext;
use crate::anonymization::privacy::PrivacyBudgetTracker;
use crate::anonymization::result::ProcessResult;
use crate::anonymization::rule::{AnonymizationRule, AnonymizerMethod};
use crate::anonymization::settings::MethodSettings;
use crate::domain::{AnonymizerError, Document, NodeId, Result};
use std::collections::HashMap;
use std::sync::Arc;

pub use crypto_hash::CryptoHashProcessor;
pub use differential_privacy::DifferentialPrivacyProcessor;
pub use k_anonymity::KAnonymityProcessor;
pub use redaction::{KeepProcessor, RedactProcessor};

/// Uniform interface of every anonymization method
///
/// A `None` node or `None` settings yields an empty result with no side
/// effects. Implementations may assume they are never invoked twice on the
/// same node within one run, but must not assume any order relative to other
/// rules.
pub trait Processor: Send + Sync {
    fn process(
        &self,
        document: &mut Document,
        node: Option<NodeId>,
        context: Option<&ProcessContext<'_>>,
        settings: Option<&MethodSettings>,
    ) -> Result<ProcessResult>;
}

/// Method-keyed processor table
#[derive(Clone)]
pub struct ProcessorRegistry {
    processors: HashMap<AnonymizerMethod, Arc<dyn Processor>>,
    tracker: Arc<PrivacyBudgetTracker>,
}

impl std::fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut methods: Vec<_> = self.processors.keys().map(AnonymizerMethod::as_str).collect();
        methods.sort_unstable();
        f.debug_struct("ProcessorRegistry")
            .field("methods", &methods)
            .finish()
    }
}

impl ProcessorRegistry {
    /// Registry with every built-in processor
    ///
    /// The differential-privacy processor draws from `tracker`.
    pub fn builtin(tracker: Arc<PrivacyBudgetTracker>) -> Self {
        let processors = AnonymizerMethod::ALL
            .into_iter()
            .filter_map(|method| {
                builtin_processor(method, &tracker).map(|processor| (method, processor))
            })
            .collect();
        Self {
            processors,
            tracker,
        }
    }

    /// Register or replace the processor for a method
    pub fn register(&mut self, method: AnonymizerMethod, processor: Arc<dyn Processor>) -> &mut Self {
        tracing::debug!(method = %method, "Registered processor");
        self.processors.insert(method, processor);
        self
    }

    pub fn get(&self, method: AnonymizerMethod) -> Option<&Arc<dyn Processor>> {
        self.processors.get(&method)
    }

    pub fn supports(&self, method: AnonymizerMethod) -> bool {
        self.processors.contains_key(&method)
    }

    /// Budget tracker shared by the differential-privacy processor
    pub fn tracker(&self) -> &Arc<PrivacyBudgetTracker> {
        &self.tracker
    }

    /// Fail if any rule uses a method with no processor
    pub fn ensure_supports(&self, rules: &[AnonymizationRule]) -> Result<()> {
        match rules.iter().find(|rule| !self.supports(rule.method())) {
            Some(rule) => Err(AnonymizerError::Configuration(format!(
                "No processor registered for method '{}' (rule '{}')",
                rule.method(),
                rule.path()
            ))),
            None => Ok(()),
        }
    }
}

fn builtin_processor(
    method: AnonymizerMethod,
    tracker: &Arc<PrivacyBudgetTracker>,
) -> Option<Arc<dyn Processor>> {
    match method {
        AnonymizerMethod::Keep => Some(Arc::new(KeepProcessor)),
        AnonymizerMethod::Redact => Some(Arc::new(RedactProcessor)),
        AnonymizerMethod::CryptoHash => Some(Arc::new(CryptoHashProcessor)),
        AnonymizerMethod::DifferentialPrivacy => {
            Some(Arc::new(DifferentialPrivacyProcessor::new(Arc::clone(tracker))))
        }
        AnonymizerMethod::KAnonymity => Some(Arc::new(KAnonymityProcessor)),
        AnonymizerMethod::Encrypt | AnonymizerMethod::Substitute => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry() {
        let registry = ProcessorRegistry::builtin(Arc::new(PrivacyBudgetTracker::new()));
        assert!(registry.supports(AnonymizerMethod::Redact));
        assert!(registry.supports(AnonymizerMethod::DifferentialPrivacy));
        assert!(!registry.supports(AnonymizerMethod::Encrypt));
        assert!(!registry.supports(AnonymizerMethod::Substitute));
    }

    #[test]
    fn test_ensure_supports_names_missing_method() {
        let registry = ProcessorRegistry::builtin(Arc::new(PrivacyBudgetTracker::new()));
        let rules = vec![AnonymizationRule::simple("Patient.name", AnonymizerMethod::Encrypt).unwrap()];
        let err = registry.ensure_supports(&rules).unwrap_err();
        assert!(err.to_string().contains("encrypt"));
    }

    #[test]
    fn test_register_external_processor() {
        let mut registry = ProcessorRegistry::builtin(Arc::new(PrivacyBudgetTracker::new()));
        registry.register(AnonymizerMethod::Substitute, Arc::new(KeepProcessor));
        assert!(registry.supports(AnonymizerMethod::Substitute));
    }
}
