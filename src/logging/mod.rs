//! Logging and observability
//!
//! This module provides structured logging with support for:
//! - Console output with configurable log levels
//! - JSON-formatted local file logging with rotation
//! - Budget audit events on the `medcloak::audit` target
//!
//! # Example
//!
//! ```no_run
//! use medcloak::logging::init_logging;
//! use medcloak::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

// Re-export commonly used items
pub use structured::{init_logging, LoggingGuard};

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use medcloak::log_error_with_context;
/// use medcloak::domain::AnonymizerError;
///
/// let error = AnonymizerError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}

/// Log batch progress
///
/// # Example
///
/// ```no_run
/// use medcloak::log_batch_progress;
///
/// log_batch_progress!(100, 1000);
/// ```
#[macro_export]
macro_rules! log_batch_progress {
    ($current:expr, $total:expr) => {
        tracing::debug!(
            current = $current,
            total = $total,
            progress_pct = ($current as f64 / $total as f64 * 100.0),
            "Processing batch"
        );
    };
}
