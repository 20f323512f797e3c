//! Security labels
//!
//! After a run, the operation kinds that actually executed are mapped to HL7
//! v3 ObservationValue codes and merged into `meta.security` on the document
//! root. Merging is idempotent: a code already present is not added again.

use crate::anonymization::result::{OperationKind, ProcessResult};
use crate::domain::{Document, NodeId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Code system of every label written by the engine
pub const SECURITY_LABEL_SYSTEM: &str = "http://terminology.hl7.org/CodeSystem/v3-ObservationValue";

/// Security label codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SecurityLabel {
    Redacted,
    CryptoHashed,
    Masked,
    Perturbed,
    Substituted,
    Abstracted,
}

impl SecurityLabel {
    /// Every label, in the order they are written
    pub const ALL: [SecurityLabel; 6] = [
        Self::Redacted,
        Self::CryptoHashed,
        Self::Masked,
        Self::Perturbed,
        Self::Substituted,
        Self::Abstracted,
    ];

    /// Code as registered in the code system
    pub fn code(&self) -> &'static str {
        match self {
            Self::Redacted => "REDACTED",
            // Registered spelling
            Self::CryptoHashed => "CRYTOHASH",
            Self::Masked => "MASKED",
            Self::Perturbed => "PERTURBED",
            Self::Substituted => "SUBSTITUTED",
            Self::Abstracted => "ABSTRED",
        }
    }

    pub fn display(&self) -> &'static str {
        match self {
            Self::Redacted => "redacted",
            Self::CryptoHashed => "cryptographically hashed",
            Self::Masked => "masked",
            Self::Perturbed => "exact value is replaced with another exact value",
            Self::Substituted => "substituted",
            Self::Abstracted => "abstracted",
        }
    }

    /// Label for an operation kind, if it has one
    pub fn for_operation(kind: OperationKind) -> Option<Self> {
        match kind {
            OperationKind::Redact => Some(Self::Redacted),
            OperationKind::CryptoHash => Some(Self::CryptoHashed),
            OperationKind::Encrypt => Some(Self::Masked),
            OperationKind::Perturb => Some(Self::Perturbed),
            OperationKind::Substitute => Some(Self::Substituted),
            OperationKind::Generalize => Some(Self::Abstracted),
            OperationKind::DifferentialPrivacy | OperationKind::KAnonymity => None,
        }
    }
}

impl fmt::Display for SecurityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Labels implied by a run result, in canonical order
pub fn labels_for(result: &ProcessResult) -> Vec<SecurityLabel> {
    SecurityLabel::ALL
        .into_iter()
        .filter(|label| {
            result
                .records()
                .iter()
                .any(|record| SecurityLabel::for_operation(record.kind) == Some(*label))
        })
        .collect()
}

/// Merge the labels implied by `result` into `meta.security`
///
/// Returns the labels that were newly added. Nothing is written (not even an
/// empty `meta`) when the result implies no labels.
pub fn apply_security_labels(document: &mut Document, result: &ProcessResult) -> Vec<SecurityLabel> {
    let wanted = labels_for(result);
    if wanted.is_empty() {
        return Vec::new();
    }

    let root = document.root();
    let meta = match document.find_child(root, "meta") {
        Some(meta) => meta,
        None => document.add_child(root, "meta", "Meta", None, false),
    };

    let existing = existing_codes(document, meta);
    let mut added = Vec::new();
    for label in wanted {
        if existing.iter().any(|code| code == label.code()) {
            continue;
        }
        let coding = document.add_child(meta, "security", "Coding", None, true);
        document.add_child(coding, "system", "uri", Some(SECURITY_LABEL_SYSTEM.to_string()), false);
        document.add_child(coding, "code", "code", Some(label.code().to_string()), false);
        document.add_child(coding, "display", "string", Some(label.display().to_string()), false);
        added.push(label);
    }

    if !added.is_empty() {
        tracing::debug!(
            labels = ?added.iter().map(SecurityLabel::code).collect::<Vec<_>>(),
            "Added security labels"
        );
    }
    added
}

fn existing_codes(document: &Document, meta: NodeId) -> Vec<String> {
    document
        .children_named(meta, "security")
        .filter_map(|coding| document.find_child(coding, "code"))
        .filter_map(|code| document.value(code).map(str::to_string))
        .collect()
}
