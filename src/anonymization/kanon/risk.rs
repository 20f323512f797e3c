//! Re-identification risk assessment

use super::validator::EquivalenceClass;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prosecutor risk above which a release is high risk
pub const HIGH_PROSECUTOR_RISK: f64 = 0.5;
/// Uniqueness ratio above which a release is high risk
pub const HIGH_UNIQUENESS: f64 = 0.05;
/// Prosecutor risk above which a release is medium risk
pub const MEDIUM_PROSECUTOR_RISK: f64 = 0.2;

/// Risk band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
        }
    }
}

/// Risk estimates for one batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    /// Worst case: `max(1 / class size)`
    pub prosecutor_risk: f64,
    /// Average case: `1 / class size` weighted by membership
    pub journalist_risk: f64,
    /// Singleton classes over total records
    pub uniqueness: f64,
    pub total_records: usize,
    pub total_classes: usize,
    pub level: RiskLevel,
}

/// Computes re-identification risk from equivalence classes
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskAssessor;

impl RiskAssessor {
    pub fn new() -> Self {
        Self
    }

    /// Assess a set of equivalence classes
    ///
    /// An empty set carries no records and is reported as zero risk.
    pub fn assess(&self, classes: &[EquivalenceClass]) -> RiskReport {
        let total_records: usize = classes.iter().map(|class| class.size).sum();
        let populated = classes.iter().filter(|class| class.size > 0);

        if total_records == 0 {
            return RiskReport {
                prosecutor_risk: 0.0,
                journalist_risk: 0.0,
                uniqueness: 0.0,
                total_records: 0,
                total_classes: 0,
                level: RiskLevel::Low,
            };
        }

        let prosecutor_risk = populated
            .clone()
            .map(|class| 1.0 / class.size as f64)
            .fold(0.0, f64::max);
        let total_classes = populated.clone().count();
        // sum over records of 1/size == number of classes
        let journalist_risk = total_classes as f64 / total_records as f64;
        let singletons = populated.filter(|class| class.size == 1).count();
        let uniqueness = singletons as f64 / total_records as f64;

        let level = classify(prosecutor_risk, uniqueness);
        tracing::debug!(
            prosecutor_risk,
            journalist_risk,
            uniqueness,
            level = %level,
            "Assessed re-identification risk"
        );

        RiskReport {
            prosecutor_risk,
            journalist_risk,
            uniqueness,
            total_records,
            total_classes,
            level,
        }
    }
}

fn classify(prosecutor_risk: f64, uniqueness: f64) -> RiskLevel {
    if prosecutor_risk > HIGH_PROSECUTOR_RISK || uniqueness > HIGH_UNIQUENESS {
        RiskLevel::High
    } else if prosecutor_risk > MEDIUM_PROSECUTOR_RISK {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}
