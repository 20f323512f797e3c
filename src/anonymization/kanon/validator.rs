//! Equivalence-class validator
//!
//! Batch pass run after every document of a release has been generalized.
//! Records are grouped by the exact tuple of their quasi-identifier values;
//! any group smaller than `k` is a violation.

use super::settings::KAnonymitySetting;
use crate::anonymization::query::RelativeExpression;
use crate::anonymization::result::ProcessResult;
use crate::domain::{AnonymizerError, Document, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Separator used when one quasi-identifier matches several values
const MULTI_VALUE_SEPARATOR: &str = "|";

/// Quasi-identifier tuple of one record; `None` marks an absent value
pub type QuasiIdentifierKey = Vec<Option<String>>;

/// Records sharing one quasi-identifier tuple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquivalenceClass {
    pub key: QuasiIdentifierKey,
    pub size: usize,
}

impl EquivalenceClass {
    /// Key rendered for reports, absent values as `*`
    pub fn describe(&self) -> String {
        self.key
            .iter()
            .map(|v| v.as_deref().unwrap_or("*"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Outcome of validating one batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub k: usize,
    pub quasi_identifiers: Vec<String>,
    pub is_k_anonymized: bool,
    /// Smallest class found (the achieved k); 0 for an empty batch
    pub minimum_class_size: usize,
    pub total_records: usize,
    pub total_classes: usize,
    pub violations: Vec<EquivalenceClass>,
    /// Fraction of records that sit in violating classes
    pub suppression_rate: f64,
    #[serde(skip)]
    pub classes: Vec<EquivalenceClass>,
}

impl ValidationReport {
    /// Mark per-document results as k-anonymized when the batch passed
    ///
    /// Returns the number of results marked.
    pub fn certify(&self, results: &mut [ProcessResult]) -> usize {
        if !self.is_k_anonymized {
            return 0;
        }
        for result in results.iter_mut() {
            result.mark_k_anonymized();
        }
        results.len()
    }
}

/// Validates that a batch satisfies k-anonymity
#[derive(Debug, Clone)]
pub struct KAnonymityValidator {
    k: usize,
    quasi_identifiers: Vec<String>,
    expressions: Vec<RelativeExpression>,
}

impl KAnonymityValidator {
    /// Create a validator
    ///
    /// # Errors
    ///
    /// Fails when `k < 2`, when the quasi-identifier list is empty, or when a
    /// quasi-identifier is not a valid relative expression.
    pub fn new(k: usize, quasi_identifiers: Vec<String>) -> Result<Self> {
        if k < 2 {
            return Err(AnonymizerError::Validation(format!(
                "k must be >= 2 (k=1 provides no protection), got {k}"
            )));
        }
        if quasi_identifiers.is_empty() {
            return Err(AnonymizerError::Validation(
                "at least one quasi-identifier is required".to_string(),
            ));
        }
        let expressions = quasi_identifiers
            .iter()
            .map(|path| RelativeExpression::parse(path))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            k,
            quasi_identifiers,
            expressions,
        })
    }

    /// Validator using the same k and quasi-identifiers as a generalization rule
    pub fn from_setting(setting: &KAnonymitySetting) -> Result<Self> {
        Self::new(setting.k(), setting.quasi_identifiers().to_vec())
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn quasi_identifiers(&self) -> &[String] {
        &self.quasi_identifiers
    }

    /// Quasi-identifier tuple of one document
    ///
    /// Each quasi-identifier is evaluated from the document root; several
    /// matching values are joined in document order.
    pub fn extract_key(&self, document: &Document) -> QuasiIdentifierKey {
        self.expressions
            .iter()
            .map(|expression| {
                let values: Vec<&str> = expression
                    .evaluate(document, document.root())
                    .into_iter()
                    .filter_map(|node| document.value(node))
                    .collect();
                if values.is_empty() {
                    None
                } else {
                    Some(values.join(MULTI_VALUE_SEPARATOR))
                }
            })
            .collect()
    }

    /// Validate a batch of anonymized documents
    pub fn validate_documents(&self, documents: &[Document]) -> ValidationReport {
        let keys: Vec<QuasiIdentifierKey> =
            documents.iter().map(|doc| self.extract_key(doc)).collect();
        self.build_report(&keys)
    }

    /// Validate pre-extracted quasi-identifier tuples
    ///
    /// # Errors
    ///
    /// Fails when a record's arity differs from the quasi-identifier count.
    pub fn validate_records(&self, records: &[QuasiIdentifierKey]) -> Result<ValidationReport> {
        if let Some(bad) = records
            .iter()
            .position(|record| record.len() != self.quasi_identifiers.len())
        {
            return Err(AnonymizerError::Validation(format!(
                "record {} has {} values, expected {}",
                bad,
                records[bad].len(),
                self.quasi_identifiers.len()
            )));
        }
        Ok(self.build_report(records))
    }

    fn build_report(&self, keys: &[QuasiIdentifierKey]) -> ValidationReport {
        let classes = equivalence_classes(keys);
        let total_records = keys.len();

        let violations: Vec<EquivalenceClass> = classes
            .iter()
            .filter(|class| class.size < self.k)
            .cloned()
            .collect();
        let suppressed: usize = violations.iter().map(|class| class.size).sum();
        let minimum_class_size = classes.iter().map(|class| class.size).min().unwrap_or(0);

        let is_k_anonymized = total_records > 0 && violations.is_empty();
        let suppression_rate = if total_records == 0 {
            0.0
        } else {
            suppressed as f64 / total_records as f64
        };

        if is_k_anonymized {
            tracing::info!(
                k = self.k,
                records = total_records,
                classes = classes.len(),
                minimum_class_size,
                "Batch satisfies k-anonymity"
            );
        } else {
            tracing::warn!(
                k = self.k,
                records = total_records,
                violations = violations.len(),
                suppression_rate,
                "Batch does not satisfy k-anonymity"
            );
        }

        ValidationReport {
            k: self.k,
            quasi_identifiers: self.quasi_identifiers.clone(),
            is_k_anonymized,
            minimum_class_size,
            total_records,
            total_classes: classes.len(),
            violations,
            suppression_rate,
            classes,
        }
    }
}

/// Group tuples into equivalence classes, ordered by key
pub fn equivalence_classes(keys: &[QuasiIdentifierKey]) -> Vec<EquivalenceClass> {
    let mut counts: BTreeMap<&QuasiIdentifierKey, usize> = BTreeMap::new();
    for key in keys {
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(key, size)| EquivalenceClass {
            key: key.clone(),
            size,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(values: &[&str]) -> QuasiIdentifierKey {
        values.iter().map(|v| Some(v.to_string())).collect()
    }

    fn validator(k: usize) -> KAnonymityValidator {
        KAnonymityValidator::new(k, vec!["postalCode".into(), "gender".into()]).unwrap()
    }

    #[test]
    fn test_passing_batch() {
        let records = vec![
            key(&["981**", "male"]),
            key(&["981**", "male"]),
            key(&["982**", "female"]),
            key(&["982**", "female"]),
        ];
        let report = validator(2).validate_records(&records).unwrap();
        assert!(report.is_k_anonymized);
        assert_eq!(report.minimum_class_size, 2);
        assert_eq!(report.total_classes, 2);
        assert!(report.violations.is_empty());
        assert_eq!(report.suppression_rate, 0.0);
    }

    #[test]
    fn test_violating_class_is_reported() {
        let records = vec![
            key(&["981**", "male"]),
            key(&["981**", "male"]),
            key(&["981**", "male"]),
            key(&["982**", "female"]),
        ];
        let report = validator(3).validate_records(&records).unwrap();
        assert!(!report.is_k_anonymized);
        assert_eq!(report.minimum_class_size, 1);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].key, key(&["982**", "female"]));
        assert_eq!(report.suppression_rate, 0.25);
    }

    #[test]
    fn test_empty_batch_does_not_certify() {
        let report = validator(2).validate_records(&[]).unwrap();
        assert!(!report.is_k_anonymized);
        assert_eq!(report.minimum_class_size, 0);

        let mut results = vec![ProcessResult::new()];
        assert_eq!(report.certify(&mut results), 0);
        assert!(!results[0].is_k_anonymized());
    }

    #[test]
    fn test_arity_mismatch() {
        assert!(validator(2).validate_records(&[key(&["981**"])]).is_err());
    }

    #[test]
    fn test_rejects_weak_k() {
        assert!(KAnonymityValidator::new(1, vec!["gender".into()]).is_err());
        assert!(KAnonymityValidator::new(3, Vec::new()).is_err());
    }

    #[test]
    fn test_extract_key_from_document() {
        let mut doc = Document::new("Patient");
        let root = doc.root();
        doc.add_child(root, "gender", "code", Some("male".into()), false);
        let address = doc.add_child(root, "address", "Address", None, true);
        doc.add_child(address, "postalCode", "string", Some("981**".into()), false);

        let validator =
            KAnonymityValidator::new(2, vec!["address.postalCode".into(), "gender".into(), "birthDate".into()])
                .unwrap();
        assert_eq!(
            validator.extract_key(&doc),
            vec![Some("981**".to_string()), Some("male".to_string()), None]
        );
    }

    #[test]
    fn test_certify_marks_results() {
        let records = vec![key(&["a", "b"]), key(&["a", "b"])];
        let report = validator(2).validate_records(&records).unwrap();
        let mut results = vec![ProcessResult::new(), ProcessResult::new()];
        assert_eq!(report.certify(&mut results), 2);
        assert!(results.iter().all(ProcessResult::is_k_anonymized));
    }
}
