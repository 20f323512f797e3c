//! Configuration schema types
//!
//! This module defines the configuration structure for Medcloak.

use crate::anonymization::privacy::{validate_context_name, PrivacyPolicy};
use crate::anonymization::rule::AnonymizerMethod;
use crate::anonymization::settings::RawSettings;
use crate::domain::{JsonDocumentReader, TypeHints};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Main Medcloak configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MedcloakConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Differential-privacy policy
    #[serde(default)]
    pub privacy: PrivacyPolicy,

    /// Budget contexts initialized before any rule runs
    #[serde(default)]
    pub budgets: Vec<BudgetConfig>,

    /// Rules in application order
    #[serde(default)]
    pub rules: Vec<RuleConfig>,

    /// Element-name → instance-type hints layered over the built-ins
    #[serde(default = "TypeHints::empty")]
    pub type_hints: TypeHints,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl MedcloakConfig {
    /// Validates the configuration
    ///
    /// Rule settings are validated separately when rules are built.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.privacy.validate()?;

        let mut seen = HashSet::new();
        for budget in &self.budgets {
            budget.validate()?;
            if self.privacy.enforce_context_naming {
                validate_context_name(&budget.context).map_err(|e| e.to_string())?;
            }
            if !seen.insert(budget.context.as_str()) {
                return Err(format!(
                    "Budget context '{}' is configured more than once",
                    budget.context
                ));
            }
        }

        for (i, rule) in self.rules.iter().enumerate() {
            if rule.path.trim().is_empty() {
                return Err(format!("rules[{i}].path must not be empty"));
            }
        }

        self.logging.validate()?;
        Ok(())
    }

    /// JSON reader using the configured type hints
    pub fn document_reader(&self) -> JsonDocumentReader {
        JsonDocumentReader::with_hints(&self.type_hints)
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Keep writing the other documents of a batch when one fails
    #[serde(default = "default_true")]
    pub continue_on_error: bool,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            continue_on_error: true,
        }
    }
}

/// One budget context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Context identifier, e.g. `cohort-7:dp-release:2026-10-16`
    pub context: String,

    /// Total epsilon available to the context
    pub total_epsilon: f64,
}

impl BudgetConfig {
    fn validate(&self) -> Result<(), String> {
        if self.context.trim().is_empty() {
            return Err("budgets.context must not be empty".to_string());
        }
        if !(self.total_epsilon.is_finite() && self.total_epsilon > 0.0) {
            return Err(format!(
                "budgets.total_epsilon for '{}' must be > 0, got {}",
                self.context, self.total_epsilon
            ));
        }
        Ok(())
    }
}

/// One rule as written in configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Path pattern (`Patient.address`, `HumanName::family`)
    pub path: String,

    /// Method name (`redact`, `cryptoHash`, `differentialPrivacy`, ...)
    pub method: AnonymizerMethod,

    /// Method-specific settings
    #[serde(default)]
    pub settings: RawSettings,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local JSON file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy (daily, hourly, never)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }
        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path must not be empty when local logging is enabled".to_string());
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_local_path() -> String {
    "./logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}
