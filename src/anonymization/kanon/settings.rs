//! K-anonymity settings

use crate::anonymization::query::RelativeExpression;
use crate::anonymization::settings::{optional_str, RawSettings};
use crate::domain::{AnonymizerError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// How a quasi-identifier is coarsened on the per-node pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneralizationStrategy {
    /// Numeric bands (`30-39`, `90+`)
    #[default]
    Range,
    /// Prefix retention (`981**`, first word, first letter)
    Hierarchy,
    /// Remove the value
    Suppression,
}

impl fmt::Display for GeneralizationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Range => write!(f, "range"),
            Self::Hierarchy => write!(f, "hierarchy"),
            Self::Suppression => write!(f, "suppression"),
        }
    }
}

impl FromStr for GeneralizationStrategy {
    type Err = AnonymizerError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "range" => Ok(Self::Range),
            "hierarchy" => Ok(Self::Hierarchy),
            "suppression" | "suppress" => Ok(Self::Suppression),
            other => Err(AnonymizerError::Validation(format!(
                "Unknown generalization strategy '{other}'. Must be one of: range, hierarchy, suppression"
            ))),
        }
    }
}

/// Sub-strategy for suppression; both variants currently clear the value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressionStrategy {
    #[default]
    Suppress,
    Generalize,
}

impl FromStr for SuppressionStrategy {
    type Err = AnonymizerError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "suppress" | "suppression" => Ok(Self::Suppress),
            "generalize" | "generalization" => Ok(Self::Generalize),
            other => Err(AnonymizerError::Validation(format!(
                "Unknown suppression strategy '{other}'. Must be one of: suppress, generalize"
            ))),
        }
    }
}

/// Validated k-anonymity parameters for one rule
#[derive(Debug, Clone, PartialEq)]
pub struct KAnonymitySetting {
    k: usize,
    quasi_identifiers: Vec<String>,
    strategy: GeneralizationStrategy,
    suppression: SuppressionStrategy,
}

impl KAnonymitySetting {
    /// Validate and build a setting
    ///
    /// # Errors
    ///
    /// Returns [`AnonymizerError::Validation`] when `k < 2`, when no
    /// quasi-identifier is given, or when a quasi-identifier is not a valid
    /// relative expression.
    pub fn new(
        k: usize,
        quasi_identifiers: Vec<String>,
        strategy: GeneralizationStrategy,
        suppression: SuppressionStrategy,
    ) -> Result<Self> {
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
        for path in &quasi_identifiers {
            RelativeExpression::parse(path)?;
        }

        Ok(Self {
            k,
            quasi_identifiers,
            strategy,
            suppression,
        })
    }

    /// Build from a raw settings map
    ///
    /// Keys: `k` (required), `quasi_identifiers` (required list or
    /// comma-separated string), `strategy` (default range),
    /// `suppression_strategy` (default suppress).
    pub fn from_settings(raw: &RawSettings) -> Result<Self> {
        let k = match raw.get("k") {
            Some(Value::Number(n)) => n.as_u64().ok_or_else(|| {
                AnonymizerError::Validation(format!("Setting 'k' must be a positive integer, found {n}"))
            })?,
            Some(Value::String(s)) => s.trim().parse::<u64>().map_err(|_| {
                AnonymizerError::Validation(format!("Setting 'k' is not an integer: '{s}'"))
            })?,
            Some(other) => {
                return Err(AnonymizerError::Validation(format!(
                    "Setting 'k' must be an integer, found {other}"
                )))
            }
            None => {
                return Err(AnonymizerError::Validation(
                    "Missing required setting 'k'".to_string(),
                ))
            }
        };

        let quasi_identifiers = match raw.get("quasi_identifiers") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str().map(|s| s.trim().to_string()).ok_or_else(|| {
                        AnonymizerError::Validation(
                            "quasi_identifiers must be a list of strings".to_string(),
                        )
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            Some(Value::String(s)) => s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            _ => Vec::new(),
        };

        let strategy = match optional_str(raw, "strategy")? {
            Some(name) => name.parse()?,
            None => GeneralizationStrategy::default(),
        };
        let suppression = match optional_str(raw, "suppression_strategy")? {
            Some(name) => name.parse()?,
            None => SuppressionStrategy::default(),
        };

        Self::new(
            usize::try_from(k).map_err(|_| AnonymizerError::Validation(format!("k is too large: {k}")))?,
            quasi_identifiers,
            strategy,
            suppression,
        )
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn quasi_identifiers(&self) -> &[String] {
        &self.quasi_identifiers
    }

    pub fn strategy(&self) -> GeneralizationStrategy {
        self.strategy
    }

    pub fn suppression(&self) -> SuppressionStrategy {
        self.suppression
    }
}
