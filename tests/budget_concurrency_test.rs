//! Concurrency tests for the shared privacy budget tracker

use medcloak::anonymization::privacy::{BudgetOperation, PrivacyBudgetTracker};
use medcloak::anonymization::AnonymizerEngine;
use medcloak::config::parse_config;
use medcloak::domain::JsonDocumentReader;
use serde_json::json;
use std::sync::Arc;

#[test]
fn test_parallel_consumers_never_overspend() {
    let tracker = Arc::new(PrivacyBudgetTracker::new());
    tracker.initialize("study-7:labs", 3.0).unwrap();

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let tracker = Arc::clone(&tracker);
            std::thread::spawn(move || {
                (0..25)
                    .filter(|_| tracker.consume("study-7:labs", 0.05).unwrap())
                    .count()
            })
        })
        .collect();
    let granted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

    assert_eq!(granted, 60);
    assert!(tracker.consumed("study-7:labs").unwrap() <= 3.0);
    assert!(tracker.remaining("study-7:labs").unwrap() >= 0.0);

    let audit = tracker.audit_log("study-7:labs").unwrap();
    let successes = audit
        .iter()
        .filter(|e| e.operation == BudgetOperation::Consume && e.success)
        .count();
    let denials = audit
        .iter()
        .filter(|e| e.operation == BudgetOperation::Consume && !e.success)
        .count();
    assert_eq!(successes, 60);
    assert_eq!(denials, 16 * 25 - 60);
}

#[tokio::test]
async fn test_batch_shares_one_budget() {
    let config = parse_config(
        r#"
[[budgets]]
context = "study-7:hr"
total_epsilon = 2.0

[[rules]]
path = "Observation.valueQuantity.value"
method = "differentialPrivacy"
settings = { epsilon = 0.5, budget_context = "study-7:hr" }
"#,
    )
    .unwrap();
    let tracker = Arc::new(PrivacyBudgetTracker::new());
    let engine = AnonymizerEngine::from_config(&config, Arc::clone(&tracker)).unwrap();

    let reader = JsonDocumentReader::new();
    let documents = (0..10)
        .map(|i| {
            reader
                .read(&json!({
                    "resourceType": "Observation",
                    "valueQuantity": {"value": 60 + i, "unit": "/min"}
                }))
                .unwrap()
        })
        .collect();

    let outcomes = engine.anonymize_batch(documents).await;
    let succeeded = outcomes.iter().filter(|o| o.is_ok()).count();
    let exhausted = outcomes
        .iter()
        .filter(|o| matches!(o, Err(e) if e.is_budget_exhausted()))
        .count();

    assert_eq!(succeeded, 4);
    assert_eq!(exhausted, 6);
    assert!((tracker.consumed("study-7:hr").unwrap() - 2.0).abs() < 1e-9);
}
