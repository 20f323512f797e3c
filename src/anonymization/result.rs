//! Processor result records
//!
//! A [`ProcessResult`] is produced for every processor invocation and merged
//! upward through the traversal. The security-labeling pass reads the
//! operation kinds it accumulated.

use crate::domain::{Document, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of operation a processor applied to a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Value removed
    Redact,
    /// Value replaced by a keyed hash
    CryptoHash,
    /// Value encrypted
    Encrypt,
    /// Value replaced by a nearby value (noise)
    Perturb,
    /// Value replaced by a configured literal
    Substitute,
    /// Value coarsened (range, hierarchy)
    Generalize,
    /// Differential-privacy noise applied
    DifferentialPrivacy,
    /// Field prepared for k-anonymity
    KAnonymity,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Redact => "redact",
            Self::CryptoHash => "crypto_hash",
            Self::Encrypt => "encrypt",
            Self::Perturb => "perturb",
            Self::Substitute => "substitute",
            Self::Generalize => "generalize",
            Self::DifferentialPrivacy => "differential_privacy",
            Self::KAnonymity => "k_anonymity",
        };
        f.write_str(name)
    }
}

/// One applied operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessRecord {
    /// What was done
    pub kind: OperationKind,
    /// Node the operation touched
    pub node: NodeId,
    /// Location of that node, for reports
    pub location: String,
}

/// Metric value recorded by privacy-certifying processors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Text(String),
    Flag(bool),
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<usize> for MetricValue {
    fn from(value: usize) -> Self {
        Self::Number(value as f64)
    }
}

impl From<bool> for MetricValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<&str> for MetricValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MetricValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl MetricValue {
    /// Numeric view of the metric
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Text view of the metric
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Outcome of applying processors to nodes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessResult {
    records: Vec<ProcessRecord>,
    metrics: BTreeMap<String, MetricValue>,
    k_anonymized: bool,
    differentially_private: bool,
}

impl ProcessResult {
    /// Empty result
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an operation on a node
    pub fn record(&mut self, kind: OperationKind, document: &Document, node: NodeId) {
        self.records.push(ProcessRecord {
            kind,
            node,
            location: document.node(node).location().to_string(),
        });
    }

    /// Set a metric, replacing any previous value
    pub fn set_metric(&mut self, key: impl Into<String>, value: impl Into<MetricValue>) {
        self.metrics.insert(key.into(), value.into());
    }

    /// Mark the result as carrying differentially-private values
    pub fn mark_differentially_private(&mut self) {
        self.differentially_private = true;
    }

    /// Mark the result as belonging to a validated k-anonymous release
    pub fn mark_k_anonymized(&mut self) {
        self.k_anonymized = true;
    }

    /// Merge another result into this one
    ///
    /// Records are appended, metrics overlay (last write wins), flags OR.
    pub fn merge(&mut self, other: ProcessResult) {
        self.records.extend(other.records);
        self.metrics.extend(other.metrics);
        self.k_anonymized |= other.k_anonymized;
        self.differentially_private |= other.differentially_private;
    }

    /// Applied operations in order
    pub fn records(&self) -> &[ProcessRecord] {
        &self.records
    }

    /// Privacy metrics
    pub fn metrics(&self) -> &BTreeMap<String, MetricValue> {
        &self.metrics
    }

    /// Look up one metric
    pub fn metric(&self, key: &str) -> Option<&MetricValue> {
        self.metrics.get(key)
    }

    /// Whether any operation of this kind ran
    pub fn has_kind(&self, kind: OperationKind) -> bool {
        self.records.iter().any(|r| r.kind == kind)
    }

    /// Whether the result has been certified k-anonymous by batch validation
    pub fn is_k_anonymized(&self) -> bool {
        self.k_anonymized
    }

    /// Whether differential-privacy noise was applied
    pub fn is_differentially_private(&self) -> bool {
        self.differentially_private
    }

    /// True when nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.metrics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_unions_records_and_ors_flags() {
        let mut doc = Document::new("Patient");
        let a = doc.add_child(doc.root(), "gender", "code", Some("male".into()), false);
        let b = doc.add_child(doc.root(), "birthDate", "date", Some("1970".into()), false);

        let mut left = ProcessResult::new();
        left.record(OperationKind::Redact, &doc, a);
        left.set_metric("epsilon", 0.5);

        let mut right = ProcessResult::new();
        right.record(OperationKind::Perturb, &doc, b);
        right.set_metric("epsilon", 0.7);
        right.mark_differentially_private();

        left.merge(right);
        assert_eq!(left.records().len(), 2);
        assert_eq!(left.records()[1].location, "Patient.birthDate[0]");
        assert_eq!(left.metric("epsilon").and_then(MetricValue::as_f64), Some(0.7));
        assert!(left.is_differentially_private());
        assert!(!left.is_k_anonymized());
    }

    #[test]
    fn test_has_kind() {
        let mut doc = Document::new("Patient");
        let a = doc.add_child(doc.root(), "gender", "code", Some("male".into()), false);
        let mut result = ProcessResult::new();
        assert!(result.is_empty());
        result.record(OperationKind::Generalize, &doc, a);
        assert!(result.has_kind(OperationKind::Generalize));
        assert!(!result.has_kind(OperationKind::Redact));
    }
}
