//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::MedcloakConfig;
use crate::domain::{AnonymizerError, Result};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

fn env_placeholder() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("static placeholder pattern is valid")
    })
}

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into MedcloakConfig
/// 4. Applies environment variable overrides (MEDCLOAK_* prefix)
/// 5. Validates the configuration
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - A referenced environment variable is not set
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use medcloak::config::load_config;
///
/// let config = load_config("medcloak.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<MedcloakConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(AnonymizerError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        AnonymizerError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parses configuration text, with substitution, overrides and validation
pub fn parse_config(contents: &str) -> Result<MedcloakConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: MedcloakConfig = toml::from_str(&contents)
        .map_err(|e| AnonymizerError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        AnonymizerError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = env_placeholder();
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let processed = re.replace_all(line, |caps: &regex::Captures<'_>| {
            let var_name = &caps[1];
            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                    caps[0].to_string()
                }
            }
        });
        result.push_str(&processed);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(AnonymizerError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

fn parse_override<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        AnonymizerError::Configuration(format!("Invalid value for {name}: '{value}'"))
    })
}

/// Applies environment variable overrides using MEDCLOAK_* prefix
///
/// Environment variables follow the pattern: MEDCLOAK_<SECTION>_<KEY>
/// For example: MEDCLOAK_APPLICATION_LOG_LEVEL, MEDCLOAK_PRIVACY_MAX_EPSILON
fn apply_env_overrides(config: &mut MedcloakConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("MEDCLOAK_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("MEDCLOAK_APPLICATION_CONTINUE_ON_ERROR") {
        config.application.continue_on_error =
            parse_override("MEDCLOAK_APPLICATION_CONTINUE_ON_ERROR", &val)?;
    }

    // Privacy overrides
    if let Ok(val) = std::env::var("MEDCLOAK_PRIVACY_MAX_EPSILON") {
        config.privacy.max_epsilon = Some(parse_override("MEDCLOAK_PRIVACY_MAX_EPSILON", &val)?);
    }
    if let Ok(val) = std::env::var("MEDCLOAK_PRIVACY_EPSILON_WARNING_LEVEL") {
        config.privacy.epsilon_warning_level =
            parse_override("MEDCLOAK_PRIVACY_EPSILON_WARNING_LEVEL", &val)?;
    }
    if let Ok(val) = std::env::var("MEDCLOAK_PRIVACY_ENFORCE_CONTEXT_NAMING") {
        config.privacy.enforce_context_naming =
            parse_override("MEDCLOAK_PRIVACY_ENFORCE_CONTEXT_NAMING", &val)?;
    }
    if let Ok(val) = std::env::var("MEDCLOAK_PRIVACY_WARNING_THRESHOLD") {
        config.privacy.warning_threshold =
            parse_override("MEDCLOAK_PRIVACY_WARNING_THRESHOLD", &val)?;
    }

    // Logging overrides
    if let Ok(val) = std::env::var("MEDCLOAK_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = parse_override("MEDCLOAK_LOGGING_LOCAL_ENABLED", &val)?;
    }
    if let Ok(val) = std::env::var("MEDCLOAK_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Ok(val) = std::env::var("MEDCLOAK_LOGGING_LOCAL_ROTATION") {
        config.logging.local_rotation = val;
    }

    Ok(())
}
