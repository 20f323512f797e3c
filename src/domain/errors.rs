//! Domain error types
//!
//! This module defines the error hierarchy for Medcloak.
//! All errors are domain-specific and don't expose third-party types.

use thiserror::Error;

/// Main Medcloak error type
///
/// This is the primary error type used throughout the library.
/// It wraps specific error types and provides context for error handling.
#[derive(Debug, Error)]
pub enum AnonymizerError {
    /// Configuration-related errors (unknown method, missing processor, bad rule)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Parameter validation errors raised while building typed settings
    #[error("Validation error: {0}")]
    Validation(String),

    /// Differential privacy and budget errors
    #[error("Privacy error: {0}")]
    Privacy(#[from] PrivacyError),

    /// A processor failed while applying a rule
    #[error("Processing error in rule '{rule}': {message}")]
    Processing { rule: String, message: String },

    /// Document structure errors (bad node id, malformed input document)
    #[error("Document error: {0}")]
    Document(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

/// Differential-privacy specific errors
///
/// Budget exhaustion is recoverable: the operation that hit it was aborted
/// before the node was mutated. An uninitialized context is a usage error.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PrivacyError {
    /// Epsilon, delta, sensitivity or mechanism rejected
    #[error("Invalid privacy parameter: {0}")]
    InvalidParameter(String),

    /// Consuming the requested epsilon would exceed the context total
    #[error("Privacy budget exhausted for context '{context}': requested {requested}, remaining {remaining}")]
    BudgetExhausted {
        context: String,
        requested: f64,
        remaining: f64,
    },

    /// The budget context was never initialized
    #[error("Privacy budget context '{0}' has not been initialized")]
    UninitializedContext(String),

    /// The budget context name failed the naming policy
    #[error("Invalid budget context name '{name}': {reason}")]
    InvalidContextName { name: String, reason: String },
}

impl AnonymizerError {
    /// Returns true if this error is a budget exhaustion
    ///
    /// Batch callers use this to skip a document instead of aborting the run.
    pub fn is_budget_exhausted(&self) -> bool {
        matches!(self, Self::Privacy(PrivacyError::BudgetExhausted { .. }))
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for AnonymizerError {
    fn from(err: std::io::Error) -> Self {
        AnonymizerError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for AnonymizerError {
    fn from(err: serde_json::Error) -> Self {
        AnonymizerError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for AnonymizerError {
    fn from(err: toml::de::Error) -> Self {
        AnonymizerError::Configuration(format!("TOML parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymizer_error_display() {
        let err = AnonymizerError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_privacy_error_conversion() {
        let privacy_err = PrivacyError::UninitializedContext("ds-1".to_string());
        let err: AnonymizerError = privacy_err.into();
        assert!(matches!(err, AnonymizerError::Privacy(_)));
        assert!(err.to_string().contains("ds-1"));
    }

    #[test]
    fn test_budget_exhausted_detection() {
        let err: AnonymizerError = PrivacyError::BudgetExhausted {
            context: "ds-1".to_string(),
            requested: 0.6,
            remaining: 0.4,
        }
        .into();
        assert!(err.is_budget_exhausted());

        let other: AnonymizerError =
            PrivacyError::InvalidParameter("epsilon".to_string()).into();
        assert!(!other.is_budget_exhausted());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: AnonymizerError = io_err.into();
        assert!(matches!(err, AnonymizerError::Io(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: AnonymizerError = json_err.into();
        assert!(matches!(err, AnonymizerError::Serialization(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let err: AnonymizerError = toml_err.into();
        assert!(matches!(err, AnonymizerError::Configuration(_)));
        assert!(err.to_string().contains("TOML parse error"));
    }

    #[test]
    fn test_anonymizer_error_implements_std_error() {
        let err = AnonymizerError::Validation("Test error".to_string());
        let _: &dyn std::error::Error = &err;
    }
}
