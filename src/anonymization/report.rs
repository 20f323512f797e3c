//! Certification reporting
//!
//! This module provides formatted reports for an anonymization release:
//! operation counts, k-anonymity validation, re-identification risk, and the
//! state of every privacy budget context.

use crate::anonymization::engine::AnonymizationOutcome;
use crate::anonymization::kanon::{RiskReport, ValidationReport};
use crate::anonymization::privacy::BudgetSnapshot;
use crate::anonymization::result::OperationKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maximum number of violating classes listed on the console
const MAX_LISTED_VIOLATIONS: usize = 10;

/// Release-level report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificationReport {
    /// When the report was generated
    pub generated_at: DateTime<Utc>,

    /// Documents anonymized successfully
    pub documents_processed: usize,

    /// Documents that failed
    pub documents_failed: usize,

    /// Applied operations by kind
    pub operations: BTreeMap<OperationKind, usize>,

    /// Documents whose values carry differential-privacy noise
    pub differentially_private_documents: usize,

    /// Total processing time (ms)
    pub total_processing_time_ms: u64,

    /// Batch k-anonymity validation, when run
    pub validation: Option<ValidationReport>,

    /// Re-identification risk, when assessed
    pub risk: Option<RiskReport>,

    /// Budget contexts after the run
    pub budgets: Vec<BudgetSnapshot>,

    /// Problems worth a human look
    pub warnings: Vec<String>,
}

impl CertificationReport {
    /// Create a new empty report
    pub fn new() -> Self {
        Self {
            generated_at: Utc::now(),
            documents_processed: 0,
            documents_failed: 0,
            operations: BTreeMap::new(),
            differentially_private_documents: 0,
            total_processing_time_ms: 0,
            validation: None,
            risk: None,
            budgets: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Account for one anonymized document
    pub fn add_outcome(&mut self, outcome: &AnonymizationOutcome) {
        self.documents_processed += 1;
        self.total_processing_time_ms += outcome.processing_time_ms;
        if outcome.result.is_differentially_private() {
            self.differentially_private_documents += 1;
        }
        for record in outcome.result.records() {
            *self.operations.entry(record.kind).or_insert(0) += 1;
        }
    }

    /// Account for one failed document
    pub fn add_failure(&mut self, message: impl Into<String>) {
        self.documents_failed += 1;
        self.warnings.push(message.into());
    }

    /// Attach batch validation and risk results
    pub fn set_certification(&mut self, validation: ValidationReport, risk: RiskReport) {
        if !validation.is_k_anonymized {
            self.warnings.push(format!(
                "Release is not {}-anonymous: {} violating classes, suppression rate {:.1}%",
                validation.k,
                validation.violations.len(),
                validation.suppression_rate * 100.0
            ));
        }
        self.validation = Some(validation);
        self.risk = Some(risk);
    }

    /// Attach budget snapshots, warning on contexts near their limit
    pub fn set_budgets(&mut self, budgets: Vec<BudgetSnapshot>) {
        for budget in budgets.iter().filter(|b| b.approaching_limit) {
            self.warnings.push(format!(
                "Budget context '{}' is approaching its limit ({:.3} of {:.3} consumed)",
                budget.context, budget.consumed, budget.total
            ));
        }
        self.budgets = budgets;
    }

    /// Whether the release passed every check that was run
    pub fn is_certified(&self) -> bool {
        self.documents_failed == 0
            && self
                .validation
                .as_ref()
                .map_or(true, |validation| validation.is_k_anonymized)
    }

    /// Format report for console output
    pub fn format_console(&self) -> String {
        let mut output = String::new();

        output.push('\n');
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push_str("                ANONYMIZATION CERTIFICATION REPORT             \n");
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push('\n');

        output.push_str("📊 SUMMARY\n");
        output.push_str("───────────────────────────────────────────────────────────────\n");
        output.push_str(&format!(
            "  Documents Processed:         {}\n",
            self.documents_processed
        ));
        output.push_str(&format!(
            "  Documents Failed:            {}\n",
            self.documents_failed
        ));
        output.push_str(&format!(
            "  Differentially Private:      {}\n",
            self.differentially_private_documents
        ));
        output.push_str(&format!(
            "  Total Processing Time:       {} ms\n",
            self.total_processing_time_ms
        ));
        output.push('\n');

        if !self.operations.is_empty() {
            output.push_str("🔧 OPERATIONS\n");
            output.push_str("───────────────────────────────────────────────────────────────\n");
            for (kind, count) in &self.operations {
                output.push_str(&format!("  {:30} {:>5}\n", kind.to_string(), count));
            }
            output.push('\n');
        }

        if let Some(validation) = &self.validation {
            output.push_str("🔒 K-ANONYMITY\n");
            output.push_str("───────────────────────────────────────────────────────────────\n");
            output.push_str(&format!(
                "  Quasi-identifiers:           {}\n",
                validation.quasi_identifiers.join(", ")
            ));
            output.push_str(&format!("  Required k:                  {}\n", validation.k));
            output.push_str(&format!(
                "  Achieved k:                  {}\n",
                validation.minimum_class_size
            ));
            output.push_str(&format!(
                "  Equivalence Classes:         {}\n",
                validation.total_classes
            ));
            output.push_str(&format!(
                "  Suppression Rate:            {:.2}%\n",
                validation.suppression_rate * 100.0
            ));
            output.push_str(&format!(
                "  Result:                      {}\n",
                if validation.is_k_anonymized { "PASS" } else { "FAIL" }
            ));
            for class in validation.violations.iter().take(MAX_LISTED_VIOLATIONS) {
                output.push_str(&format!("    • [{}] size {}\n", class.describe(), class.size));
            }
            if validation.violations.len() > MAX_LISTED_VIOLATIONS {
                output.push_str(&format!(
                    "    … and {} more\n",
                    validation.violations.len() - MAX_LISTED_VIOLATIONS
                ));
            }
            output.push('\n');
        }

        if let Some(risk) = &self.risk {
            output.push_str("🎯 RE-IDENTIFICATION RISK\n");
            output.push_str("───────────────────────────────────────────────────────────────\n");
            output.push_str(&format!(
                "  Prosecutor Risk:             {:.4}\n",
                risk.prosecutor_risk
            ));
            output.push_str(&format!(
                "  Journalist Risk:             {:.4}\n",
                risk.journalist_risk
            ));
            output.push_str(&format!("  Uniqueness:                  {:.4}\n", risk.uniqueness));
            output.push_str(&format!("  Risk Level:                  {}\n", risk.level));
            output.push('\n');
        }

        if !self.budgets.is_empty() {
            output.push_str("💰 PRIVACY BUDGETS\n");
            output.push_str("───────────────────────────────────────────────────────────────\n");
            for budget in &self.budgets {
                output.push_str(&format!(
                    "  {:30} {:>8.3} / {:<8.3} remaining {:.3}\n",
                    budget.context, budget.consumed, budget.total, budget.remaining
                ));
            }
            output.push('\n');
        }

        if !self.warnings.is_empty() {
            output.push_str("⚠️  WARNINGS\n");
            output.push_str("───────────────────────────────────────────────────────────────\n");
            for warning in &self.warnings {
                output.push_str(&format!("  • {}\n", warning));
            }
            output.push('\n');
        }

        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push('\n');

        output
    }

    /// Format report as JSON
    pub fn format_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write report to file
    pub fn write_to_file(&self, path: &std::path::Path) -> std::io::Result<()> {
        let json = self.format_json().map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

impl Default for CertificationReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anonymization::kanon::{KAnonymityValidator, RiskAssessor};

    fn certification(records: &[[&str; 1]], k: usize) -> (ValidationReport, RiskReport) {
        let keys: Vec<_> = records
            .iter()
            .map(|r| r.iter().map(|v| Some(v.to_string())).collect())
            .collect();
        let validation = KAnonymityValidator::new(k, vec!["gender".into()])
            .unwrap()
            .validate_records(&keys)
            .unwrap();
        let risk = RiskAssessor::new().assess(&validation.classes);
        (validation, risk)
    }

    #[test]
    fn test_report_creation() {
        let report = CertificationReport::new();
        assert_eq!(report.documents_processed, 0);
        assert!(report.is_certified());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_failed_validation_warns_and_fails() {
        let mut report = CertificationReport::new();
        let (validation, risk) = certification(&[["male"], ["male"], ["female"]], 2);
        report.set_certification(validation, risk);
        assert!(!report.is_certified());
        assert_eq!(report.warnings.len(), 1);

        let console = report.format_console();
        assert!(console.contains("K-ANONYMITY"));
        assert!(console.contains("FAIL"));
        assert!(console.contains("[female] size 1"));
    }

    #[test]
    fn test_json_round_trip_keeps_fields() {
        let mut report = CertificationReport::new();
        let (validation, risk) = certification(&[["male"], ["male"]], 2);
        report.set_certification(validation, risk);

        let json = report.format_json().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["validation"]["is_k_anonymized"], true);
        assert_eq!(parsed["risk"]["level"], "MEDIUM");
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        CertificationReport::new().write_to_file(&path).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("documents_processed"));
    }
}
