//! Budget context naming policy
//!
//! Optional validation layer for budget context identifiers. Callers are
//! expected to use `dataset-id:operation-id:timestamp`; when the policy is
//! enforced, generic names and path-like identifiers are rejected so two
//! unrelated releases cannot end up spending from the same ledger by accident.

use crate::domain::PrivacyError;
use regex::Regex;
use std::sync::OnceLock;

/// Names that say nothing about the dataset they budget for
const GENERIC_NAMES: &[&str] = &["default", "shared", "global", "common", "test", "tmp"];

/// Maximum accepted context length
const MAX_CONTEXT_LEN: usize = 128;

fn allowed_characters() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.:\-]*$").expect("static context pattern is valid")
    })
}

/// Check a context identifier against the naming policy
///
/// # Examples
///
/// ```
/// use medcloak::anonymization::privacy::validate_context_name;
///
/// assert!(validate_context_name("cohort-7:dp-release:2026-10-16").is_ok());
/// assert!(validate_context_name("default").is_err());
/// assert!(validate_context_name("../other").is_err());
/// ```
pub fn validate_context_name(name: &str) -> Result<(), PrivacyError> {
    let reject = |reason: &str| PrivacyError::InvalidContextName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.trim().is_empty() {
        return Err(reject("context must not be empty"));
    }
    if name.len() > MAX_CONTEXT_LEN {
        return Err(reject("context is longer than 128 characters"));
    }
    if GENERIC_NAMES.contains(&name.to_ascii_lowercase().as_str()) {
        return Err(reject("generic context names are not allowed"));
    }
    if name.contains("..") || name.contains('/') || name.contains('\\') {
        return Err(reject("context must not look like a path"));
    }
    if !allowed_characters().is_match(name) {
        return Err(reject("only letters, digits, '_', '-', '.', ':' are allowed"));
    }
    Ok(())
}
