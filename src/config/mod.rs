//! Configuration management for Medcloak.
//!
//! This module provides TOML-based configuration loading, parsing, and validation.
//!
//! # Overview
//!
//! Medcloak uses TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `MEDCLOAK_<SECTION>_<KEY>` overrides
//! - Default values for optional settings
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Application settings (log level, batch error policy)
//! - [`PrivacyPolicy`](crate::anonymization::privacy::PrivacyPolicy) - Differential-privacy policy
//! - [`BudgetConfig`] - Budget contexts to initialize
//! - [`RuleConfig`] - Anonymization rules in application order
//! - [`LoggingConfig`] - Logging configuration
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [privacy]
//! max_epsilon = 10.0
//! enforce_context_naming = true
//!
//! [[budgets]]
//! context = "cohort-7:vitals:2026-10"
//! total_epsilon = 2.0
//!
//! [[rules]]
//! path = "Patient.identifier.value"
//! method = "cryptoHash"
//! settings = { key = "${MEDCLOAK_HASH_KEY}" }
//!
//! [[rules]]
//! path = "Observation.valueQuantity.value"
//! method = "differentialPrivacy"
//! settings = { epsilon = 0.5, sensitivity = 5.0, budget_context = "cohort-7:vitals:2026-10" }
//!
//! [[rules]]
//! path = "Patient.address.postalCode"
//! method = "kAnonymity"
//! settings = { k = 5, quasi_identifiers = ["address.postalCode", "gender"], strategy = "hierarchy" }
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, parse_config};
pub use schema::{ApplicationConfig, BudgetConfig, LoggingConfig, MedcloakConfig, RuleConfig};
pub use secret::{secret_string, SecretString, SecretValue};
