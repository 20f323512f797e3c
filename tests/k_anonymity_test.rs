//! Integration tests for generalization, batch validation and risk assessment

use medcloak::anonymization::kanon::{KAnonymityValidator, RiskAssessor, RiskLevel};
use medcloak::anonymization::privacy::PrivacyBudgetTracker;
use medcloak::anonymization::{AnonymizerEngine, ProcessResult};
use medcloak::config::parse_config;
use medcloak::domain::{Document, JsonDocumentReader};
use serde_json::json;
use std::sync::Arc;

const COHORT: [(&str, &str); 6] = [
    ("98101", "male"),
    ("98102", "male"),
    ("98103", "male"),
    ("98201", "female"),
    ("98202", "female"),
    ("98203", "female"),
];

fn cohort() -> Vec<Document> {
    let reader = JsonDocumentReader::new();
    COHORT
        .iter()
        .map(|(zip, gender)| {
            reader
                .read(&json!({
                    "resourceType": "Patient",
                    "gender": gender,
                    "address": [{"postalCode": zip}]
                }))
                .unwrap()
        })
        .collect()
}

fn engine() -> AnonymizerEngine {
    let config = parse_config(
        r#"
[[rules]]
path = "Patient.address.postalCode"
method = "kAnonymity"
settings = { k = 3, quasi_identifiers = ["address.postalCode", "gender"], strategy = "hierarchy" }
"#,
    )
    .unwrap();
    AnonymizerEngine::from_config(&config, Arc::new(PrivacyBudgetTracker::new())).unwrap()
}

fn validator() -> KAnonymityValidator {
    KAnonymityValidator::new(3, vec!["address.postalCode".into(), "gender".into()]).unwrap()
}

#[tokio::test]
async fn test_generalized_cohort_is_certified() {
    let outcomes = engine().anonymize_batch(cohort()).await;
    let (documents, mut results): (Vec<Document>, Vec<ProcessResult>) = outcomes
        .into_iter()
        .map(|o| {
            let o = o.unwrap();
            (o.document, o.result)
        })
        .unzip();

    // The per-document pass never certifies on its own
    assert!(results.iter().all(|r| !r.is_k_anonymized()));

    let report = validator().validate_documents(&documents);
    assert!(report.is_k_anonymized);
    assert_eq!(report.total_classes, 2);
    assert_eq!(report.minimum_class_size, 3);
    assert!(report.violations.is_empty());
    assert_eq!(report.suppression_rate, 0.0);

    assert_eq!(report.certify(&mut results), 6);
    assert!(results.iter().all(ProcessResult::is_k_anonymized));

    let risk = RiskAssessor::new().assess(&report.classes);
    assert!((risk.prosecutor_risk - 1.0 / 3.0).abs() < 1e-12);
    assert_eq!(risk.uniqueness, 0.0);
    assert_eq!(risk.level, RiskLevel::Medium);
}

#[test]
fn test_raw_cohort_fails_validation() {
    let report = validator().validate_documents(&cohort());
    assert!(!report.is_k_anonymized);
    assert_eq!(report.total_classes, 6);
    assert_eq!(report.minimum_class_size, 1);
    assert_eq!(report.violations.len(), 6);
    assert_eq!(report.suppression_rate, 1.0);

    let mut results = vec![ProcessResult::new(); 6];
    assert_eq!(report.certify(&mut results), 0);

    let risk = RiskAssessor::new().assess(&report.classes);
    assert_eq!(risk.prosecutor_risk, 1.0);
    assert_eq!(risk.level, RiskLevel::High);
}

#[test]
fn test_certification_is_sound() {
    // Every record of a passing batch sits in a class of at least k
    let records: Vec<Vec<Option<String>>> = ["a", "a", "a", "b", "b", "b", "b"]
        .iter()
        .map(|v| vec![Some(v.to_string())])
        .collect();
    let validator = KAnonymityValidator::new(3, vec!["gender".into()]).unwrap();
    let report = validator.validate_records(&records).unwrap();
    assert!(report.is_k_anonymized);
    assert!(report.classes.iter().all(|c| c.size >= 3));
    assert_eq!(report.classes.iter().map(|c| c.size).sum::<usize>(), records.len());
}

#[test]
fn test_prosecutor_risk_is_bounded_by_one_over_k() {
    let records: Vec<Vec<Option<String>>> = (0..20)
        .map(|i| vec![Some(format!("group-{}", i % 4))])
        .collect();
    let report = KAnonymityValidator::new(5, vec!["gender".into()])
        .unwrap()
        .validate_records(&records)
        .unwrap();
    assert!(report.is_k_anonymized);

    let risk = RiskAssessor::new().assess(&report.classes);
    assert!(risk.prosecutor_risk <= 1.0 / report.k as f64 + 1e-12);
    assert_eq!(risk.level, RiskLevel::Low);
}

#[test]
fn test_missing_quasi_identifier_forms_its_own_group() {
    let reader = JsonDocumentReader::new();
    let documents: Vec<Document> = [json!({"resourceType": "Patient", "gender": "male"}), json!({"resourceType": "Patient"})]
        .iter()
        .map(|v| reader.read(v).unwrap())
        .collect();

    let report = KAnonymityValidator::new(2, vec!["gender".into()])
        .unwrap()
        .validate_documents(&documents);
    assert_eq!(report.total_classes, 2);
    assert!(report
        .violations
        .iter()
        .any(|class| class.key == vec![None]));
}
