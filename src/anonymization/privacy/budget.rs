//! Privacy budget tracker
//!
//! Per-context epsilon ledger shared by every worker that applies
//! differential privacy. Contexts must be initialized explicitly; reading or
//! consuming from an unknown context is an error rather than an implicit
//! default budget.
//!
//! # Thread Safety
//!
//! All ledgers sit behind one [`parking_lot::Mutex`]. `consume` performs its
//! check and its commit inside a single critical section, so two concurrent
//! consumptions can never both succeed past the total.
//!
//! # Examples
//!
//! ```
//! use medcloak::anonymization::privacy::PrivacyBudgetTracker;
//!
//! let tracker = PrivacyBudgetTracker::new();
//! tracker.initialize("cohort-7:release-1", 1.0).unwrap();
//!
//! assert!(tracker.consume("cohort-7:release-1", 0.6).unwrap());
//! assert!(!tracker.consume("cohort-7:release-1", 0.6).unwrap());
//! assert!((tracker.remaining("cohort-7:release-1").unwrap() - 0.4).abs() < 1e-12);
//! ```

use crate::domain::PrivacyError;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Slack absorbed when comparing accumulated float sums against the total
const EPSILON_TOLERANCE: f64 = 1e-9;

/// Default fraction of the total at which consumption warnings begin
pub const DEFAULT_WARNING_THRESHOLD: f64 = 0.8;

/// Ledger operation recorded in the audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetOperation {
    Initialize,
    Consume,
    Reset,
    ResetAll,
}

/// Immutable audit record of one state-changing call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetAuditEntry {
    pub timestamp: DateTime<Utc>,
    pub operation: BudgetOperation,
    /// Epsilon committed to the ledger; the requested amount on denials
    /// and 0 for initialize/reset
    pub epsilon: f64,
    pub consumed_after: f64,
    pub remaining_after: f64,
    pub success: bool,
}

/// Point-in-time view of one context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetSnapshot {
    pub context: String,
    pub total: f64,
    pub consumed: f64,
    pub remaining: f64,
    pub approaching_limit: bool,
    pub operations: usize,
}

#[derive(Debug)]
struct BudgetLedger {
    total: f64,
    consumed: f64,
    audit: Vec<BudgetAuditEntry>,
}

impl BudgetLedger {
    fn remaining(&self) -> f64 {
        (self.total - self.consumed).max(0.0)
    }

    fn snapshot(&self, context: &str, threshold: f64) -> BudgetSnapshot {
        BudgetSnapshot {
            context: context.to_string(),
            total: self.total,
            consumed: self.consumed,
            remaining: self.remaining(),
            approaching_limit: self.consumed >= threshold * self.total,
            operations: self.audit.len(),
        }
    }

    fn append(&mut self, context: &str, operation: BudgetOperation, epsilon: f64, success: bool) {
        let entry = BudgetAuditEntry {
            timestamp: Utc::now(),
            operation,
            epsilon,
            consumed_after: self.consumed,
            remaining_after: self.remaining(),
            success,
        };
        tracing::info!(
            target: "medcloak::audit",
            context = %context,
            operation = ?entry.operation,
            epsilon = entry.epsilon,
            consumed = entry.consumed_after,
            remaining = entry.remaining_after,
            success = entry.success,
            "Privacy budget operation"
        );
        self.audit.push(entry);
    }
}

/// Thread-safe per-context privacy budget ledger
///
/// Owned explicitly and shared by handle (`Arc<PrivacyBudgetTracker>`), so
/// independent pipelines and tests never share state by accident.
#[derive(Debug)]
pub struct PrivacyBudgetTracker {
    ledgers: Mutex<HashMap<String, BudgetLedger>>,
    warning_threshold: f64,
}

impl Default for PrivacyBudgetTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PrivacyBudgetTracker {
    /// Tracker with the default warning threshold (0.8)
    pub fn new() -> Self {
        Self {
            ledgers: Mutex::new(HashMap::new()),
            warning_threshold: DEFAULT_WARNING_THRESHOLD,
        }
    }

    /// Tracker with a custom warning threshold in `(0, 1]`
    pub fn with_warning_threshold(threshold: f64) -> Result<Self, PrivacyError> {
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(PrivacyError::InvalidParameter(format!(
                "warning threshold must be in (0, 1], got {threshold}"
            )));
        }
        Ok(Self {
            ledgers: Mutex::new(HashMap::new()),
            warning_threshold: threshold,
        })
    }

    /// Warning threshold as a fraction of the total
    pub fn warning_threshold(&self) -> f64 {
        self.warning_threshold
    }

    /// Create or re-create a context
    ///
    /// Re-initializing an existing context replaces its total and zeroes its
    /// consumption; the audit history is kept and gains an `Initialize` entry.
    pub fn initialize(&self, context: &str, total_budget: f64) -> Result<(), PrivacyError> {
        if !(total_budget.is_finite() && total_budget > 0.0) {
            return Err(PrivacyError::InvalidParameter(format!(
                "total budget must be > 0, got {total_budget}"
            )));
        }

        let mut ledgers = self.ledgers.lock();
        let ledger = ledgers.entry(context.to_string()).or_insert(BudgetLedger {
            total: total_budget,
            consumed: 0.0,
            audit: Vec::new(),
        });
        ledger.total = total_budget;
        ledger.consumed = 0.0;
        ledger.append(context, BudgetOperation::Initialize, 0.0, true);
        Ok(())
    }

    /// Atomically consume `epsilon` from a context
    ///
    /// Returns `Ok(false)` (and records a denied attempt) when the
    /// consumption would exceed the total; the ledger is left unchanged.
    ///
    /// # Errors
    ///
    /// [`PrivacyError::UninitializedContext`] for unknown contexts,
    /// [`PrivacyError::InvalidParameter`] for non-positive epsilon.
    pub fn consume(&self, context: &str, epsilon: f64) -> Result<bool, PrivacyError> {
        self.consume_with_snapshot(context, epsilon)
            .map(|snapshot| snapshot.is_some())
    }

    /// Like [`consume`](Self::consume), returning the post-commit state
    ///
    /// The snapshot is taken inside the same critical section as the commit,
    /// so its `consumed` and `remaining` describe exactly this consumption
    /// regardless of concurrent callers. `None` means the request was denied.
    pub fn consume_with_snapshot(
        &self,
        context: &str,
        epsilon: f64,
    ) -> Result<Option<BudgetSnapshot>, PrivacyError> {
        if !(epsilon.is_finite() && epsilon > 0.0) {
            return Err(PrivacyError::InvalidParameter(format!(
                "epsilon to consume must be > 0, got {epsilon}"
            )));
        }

        let mut ledgers = self.ledgers.lock();
        let ledger = ledgers
            .get_mut(context)
            .ok_or_else(|| PrivacyError::UninitializedContext(context.to_string()))?;

        let new_consumed = ledger.consumed + epsilon;
        if new_consumed > ledger.total + EPSILON_TOLERANCE {
            ledger.append(context, BudgetOperation::Consume, epsilon, false);
            tracing::warn!(
                context = %context,
                requested = epsilon,
                remaining = ledger.remaining(),
                "Privacy budget consumption denied"
            );
            return Ok(None);
        }

        // Overshoot within the tolerance is clamped; the audit records the
        // amount actually added to `consumed`.
        let before = ledger.consumed;
        ledger.consumed = new_consumed.min(ledger.total);
        let committed = ledger.consumed - before;
        if committed != epsilon {
            tracing::debug!(
                context = %context,
                requested = epsilon,
                committed,
                "Consumption clamped to total"
            );
        }
        ledger.append(context, BudgetOperation::Consume, committed, true);
        Ok(Some(ledger.snapshot(context, self.warning_threshold)))
    }

    /// Remaining epsilon
    pub fn remaining(&self, context: &str) -> Result<f64, PrivacyError> {
        self.with_ledger(context, BudgetLedger::remaining)
    }

    /// Consumed epsilon
    pub fn consumed(&self, context: &str) -> Result<f64, PrivacyError> {
        self.with_ledger(context, |ledger| ledger.consumed)
    }

    /// Total epsilon
    pub fn total(&self, context: &str) -> Result<f64, PrivacyError> {
        self.with_ledger(context, |ledger| ledger.total)
    }

    /// True once consumed reaches `warning_threshold * total`; never blocks
    pub fn is_approaching_limit(&self, context: &str) -> Result<bool, PrivacyError> {
        let threshold = self.warning_threshold;
        self.with_ledger(context, |ledger| ledger.consumed >= threshold * ledger.total)
    }

    /// Whether the context has been initialized
    pub fn is_initialized(&self, context: &str) -> bool {
        self.ledgers.lock().contains_key(context)
    }

    /// Zero the consumption of one context, keeping its audit history
    pub fn reset(&self, context: &str) -> Result<(), PrivacyError> {
        let mut ledgers = self.ledgers.lock();
        let ledger = ledgers
            .get_mut(context)
            .ok_or_else(|| PrivacyError::UninitializedContext(context.to_string()))?;
        ledger.consumed = 0.0;
        ledger.append(context, BudgetOperation::Reset, 0.0, true);
        Ok(())
    }

    /// Zero every context and drop all audit history
    ///
    /// Each context keeps a single `ResetAll` entry recording the reset.
    pub fn reset_all(&self) {
        let mut ledgers = self.ledgers.lock();
        for (context, ledger) in ledgers.iter_mut() {
            ledger.consumed = 0.0;
            ledger.audit.clear();
            ledger.append(context, BudgetOperation::ResetAll, 0.0, true);
        }
    }

    /// Copy of a context's audit log
    pub fn audit_log(&self, context: &str) -> Result<Vec<BudgetAuditEntry>, PrivacyError> {
        self.with_ledger(context, |ledger| ledger.audit.clone())
    }

    /// Snapshot of a context
    pub fn snapshot(&self, context: &str) -> Result<BudgetSnapshot, PrivacyError> {
        let threshold = self.warning_threshold;
        self.with_ledger(context, |ledger| ledger.snapshot(context, threshold))
    }

    /// Snapshots of every context, sorted by name
    pub fn snapshots(&self) -> Vec<BudgetSnapshot> {
        let mut contexts: Vec<String> = self.ledgers.lock().keys().cloned().collect();
        contexts.sort();
        contexts
            .iter()
            .filter_map(|context| self.snapshot(context).ok())
            .collect()
    }

    fn with_ledger<T>(
        &self,
        context: &str,
        f: impl FnOnce(&BudgetLedger) -> T,
    ) -> Result<T, PrivacyError> {
        let ledgers = self.ledgers.lock();
        ledgers
            .get(context)
            .map(f)
            .ok_or_else(|| PrivacyError::UninitializedContext(context.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_uninitialized_context_is_an_error() {
        let tracker = PrivacyBudgetTracker::new();
        assert_eq!(
            tracker.remaining("ds"),
            Err(PrivacyError::UninitializedContext("ds".to_string()))
        );
        assert!(tracker.consumed("ds").is_err());
        assert!(tracker.consume("ds", 0.1).is_err());
        assert!(tracker.reset("ds").is_err());
    }

    #[test]
    fn test_initialize_rejects_non_positive_total() {
        let tracker = PrivacyBudgetTracker::new();
        assert!(tracker.initialize("ds", 0.0).is_err());
        assert!(tracker.initialize("ds", -1.0).is_err());
        assert!(!tracker.is_initialized("ds"));
    }

    #[test]
    fn test_consumption_is_additive_until_total() {
        let tracker = PrivacyBudgetTracker::new();
        tracker.initialize("ds", 1.0).unwrap();
        for _ in 0..10 {
            assert!(tracker.consume("ds", 0.1).unwrap());
        }
        let before = tracker.consumed("ds").unwrap();
        assert!(!tracker.consume("ds", 0.1).unwrap());
        assert_eq!(tracker.consumed("ds").unwrap(), before);
        assert!(before <= tracker.total("ds").unwrap());
    }

    #[test]
    fn test_exhaustion_scenario() {
        let tracker = PrivacyBudgetTracker::new();
        tracker.initialize("ds", 1.0).unwrap();
        assert!(tracker.consume("ds", 0.6).unwrap());
        assert!((tracker.remaining("ds").unwrap() - 0.4).abs() < 1e-12);
        assert!(!tracker.consume("ds", 0.6).unwrap());
        assert!((tracker.remaining("ds").unwrap() - 0.4).abs() < 1e-12);

        let log = tracker.audit_log("ds").unwrap();
        assert_eq!(log.len(), 3);
        assert_eq!(log[0].operation, BudgetOperation::Initialize);
        assert!(log[1].success);
        assert!(!log[2].success);
        assert_eq!(log[2].epsilon, 0.6);
    }

    #[test]
    fn test_approaching_limit() {
        let tracker = PrivacyBudgetTracker::new();
        tracker.initialize("ds", 1.0).unwrap();
        tracker.consume("ds", 0.5).unwrap();
        assert!(!tracker.is_approaching_limit("ds").unwrap());
        tracker.consume("ds", 0.3).unwrap();
        assert!(tracker.is_approaching_limit("ds").unwrap());
    }

    #[test]
    fn test_reset_keeps_history_and_reset_all_clears_it() {
        let tracker = PrivacyBudgetTracker::new();
        tracker.initialize("a", 1.0).unwrap();
        tracker.initialize("b", 2.0).unwrap();
        tracker.consume("a", 0.5).unwrap();
        tracker.consume("b", 1.5).unwrap();

        tracker.reset("a").unwrap();
        assert_eq!(tracker.consumed("a").unwrap(), 0.0);
        assert_eq!(tracker.audit_log("a").unwrap().len(), 3);

        tracker.reset_all();
        assert_eq!(tracker.consumed("b").unwrap(), 0.0);
        let log = tracker.audit_log("b").unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].operation, BudgetOperation::ResetAll);
    }

    #[test]
    fn test_reinitialize_resets_context() {
        let tracker = PrivacyBudgetTracker::new();
        tracker.initialize("ds", 1.0).unwrap();
        tracker.consume("ds", 0.9).unwrap();
        tracker.initialize("ds", 3.0).unwrap();
        assert_eq!(tracker.consumed("ds").unwrap(), 0.0);
        assert_eq!(tracker.total("ds").unwrap(), 3.0);
    }

    #[test]
    fn test_reinitialize_keeps_audit_history() {
        let tracker = PrivacyBudgetTracker::new();
        tracker.initialize("ds", 1.0).unwrap();
        tracker.consume("ds", 0.6).unwrap();
        tracker.consume("ds", 0.6).unwrap();
        assert_eq!(tracker.audit_log("ds").unwrap().len(), 3);

        tracker.initialize("ds", 1.0).unwrap();
        let log = tracker.audit_log("ds").unwrap();
        assert_eq!(log.len(), 4);
        assert_eq!(log[1].operation, BudgetOperation::Consume);
        assert_eq!(log[1].epsilon, 0.6);
        assert_eq!(log[3].operation, BudgetOperation::Initialize);
        assert_eq!(log[3].consumed_after, 0.0);
    }

    #[test]
    fn test_consume_with_snapshot_reports_post_commit_state() {
        let tracker = PrivacyBudgetTracker::new();
        tracker.initialize("ds", 1.0).unwrap();
        let snapshot = tracker.consume_with_snapshot("ds", 0.25).unwrap().unwrap();
        assert_eq!(snapshot.consumed, 0.25);
        assert_eq!(snapshot.remaining, 0.75);
        assert_eq!(snapshot.operations, 2);
        assert!(!snapshot.approaching_limit);

        tracker.consume("ds", 0.7).unwrap();
        assert_eq!(tracker.consume_with_snapshot("ds", 0.5).unwrap(), None);
    }

    #[test]
    fn test_clamped_consumption_audits_committed_delta() {
        let tracker = PrivacyBudgetTracker::new();
        tracker.initialize("ds", 0.3).unwrap();
        for _ in 0..3 {
            assert!(tracker.consume("ds", 0.1).unwrap());
        }
        assert_eq!(tracker.consumed("ds").unwrap(), 0.3);

        let log = tracker.audit_log("ds").unwrap();
        for pair in log.windows(2) {
            assert_eq!(pair[1].epsilon, pair[1].consumed_after - pair[0].consumed_after);
        }
    }

    #[test]
    fn test_concurrent_consumption_never_overspends() {
        let tracker = Arc::new(PrivacyBudgetTracker::new());
        tracker.initialize("ds", 10.0).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                std::thread::spawn(move || {
                    (0..50)
                        .filter(|_| tracker.consume("ds", 0.1).unwrap())
                        .count()
                })
            })
            .collect();

        let granted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(granted, 100);
        assert!(tracker.consumed("ds").unwrap() <= 10.0);
    }

    #[test]
    fn test_custom_warning_threshold() {
        assert!(PrivacyBudgetTracker::with_warning_threshold(0.0).is_err());
        let tracker = PrivacyBudgetTracker::with_warning_threshold(0.5).unwrap();
        tracker.initialize("ds", 1.0).unwrap();
        tracker.consume("ds", 0.5).unwrap();
        assert!(tracker.snapshot("ds").unwrap().approaching_limit);
    }
}
