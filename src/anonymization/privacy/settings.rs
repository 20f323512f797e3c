//! Differential-privacy settings and policy

use super::naming::validate_context_name;
use crate::anonymization::settings::{optional_f64, optional_str, RawSettings};
use crate::domain::{PrivacyError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Noise mechanism applied to numeric fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseMechanism {
    /// Laplace noise, pure epsilon-DP
    #[default]
    Laplace,
    /// Gaussian noise, (epsilon, delta)-DP; requires delta > 0
    Gaussian,
    /// Exponential mechanism; numeric fields use the Laplace formula
    Exponential,
}

impl fmt::Display for NoiseMechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Laplace => write!(f, "laplace"),
            Self::Gaussian => write!(f, "gaussian"),
            Self::Exponential => write!(f, "exponential"),
        }
    }
}

impl FromStr for NoiseMechanism {
    type Err = PrivacyError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "laplace" => Ok(Self::Laplace),
            "gaussian" => Ok(Self::Gaussian),
            "exponential" => Ok(Self::Exponential),
            other => Err(PrivacyError::InvalidParameter(format!(
                "Unknown mechanism '{other}'. Must be one of: laplace, gaussian, exponential"
            ))),
        }
    }
}

/// Organisation-level differential-privacy policy
///
/// The hard epsilon ceiling and the naming check are opt-in: deployments
/// disagree on both, so they are configuration rather than constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivacyPolicy {
    /// Reject epsilon above this value when set
    #[serde(default)]
    pub max_epsilon: Option<f64>,

    /// Log a warning when epsilon exceeds this value
    #[serde(default = "default_epsilon_warning_level")]
    pub epsilon_warning_level: f64,

    /// Enforce the budget context naming convention
    #[serde(default)]
    pub enforce_context_naming: bool,

    /// Fraction of a context budget at which consumption warnings start
    #[serde(default = "default_warning_threshold")]
    pub warning_threshold: f64,
}

fn default_epsilon_warning_level() -> f64 {
    1.0
}

fn default_warning_threshold() -> f64 {
    0.8
}

impl Default for PrivacyPolicy {
    fn default() -> Self {
        Self {
            max_epsilon: None,
            epsilon_warning_level: default_epsilon_warning_level(),
            enforce_context_naming: false,
            warning_threshold: default_warning_threshold(),
        }
    }
}

impl PrivacyPolicy {
    /// Validate the policy values themselves
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(max) = self.max_epsilon {
            if !(max.is_finite() && max > 0.0) {
                return Err(format!("privacy.max_epsilon must be > 0, got {max}"));
            }
        }
        if !(self.warning_threshold > 0.0 && self.warning_threshold <= 1.0) {
            return Err(format!(
                "privacy.warning_threshold must be in (0, 1], got {}",
                self.warning_threshold
            ));
        }
        Ok(())
    }
}

/// Validated parameters for one differential-privacy rule
#[derive(Debug, Clone, PartialEq)]
pub struct DifferentialPrivacySetting {
    epsilon: f64,
    delta: f64,
    sensitivity: f64,
    mechanism: NoiseMechanism,
    budget_context: String,
}

impl DifferentialPrivacySetting {
    /// Validate and build a setting
    ///
    /// Fails before any randomness is drawn or budget touched.
    ///
    /// # Errors
    ///
    /// [`PrivacyError::InvalidParameter`] when epsilon or sensitivity is not
    /// positive, when Gaussian is requested without a positive delta, when
    /// delta is outside `[0, 1)`, or when epsilon exceeds the policy ceiling.
    /// [`PrivacyError::InvalidContextName`] when the budget context is empty or
    /// fails the enforced naming policy.
    pub fn new(
        epsilon: f64,
        delta: f64,
        sensitivity: f64,
        mechanism: NoiseMechanism,
        budget_context: impl Into<String>,
        policy: &PrivacyPolicy,
    ) -> std::result::Result<Self, PrivacyError> {
        let budget_context = budget_context.into();

        if !(epsilon.is_finite() && epsilon > 0.0) {
            return Err(PrivacyError::InvalidParameter(format!(
                "epsilon must be > 0, got {epsilon}"
            )));
        }
        if let Some(max) = policy.max_epsilon {
            if epsilon > max {
                return Err(PrivacyError::InvalidParameter(format!(
                    "epsilon {epsilon} exceeds the configured maximum {max}"
                )));
            }
        }
        if !(sensitivity.is_finite() && sensitivity > 0.0) {
            return Err(PrivacyError::InvalidParameter(format!(
                "sensitivity must be > 0, got {sensitivity}"
            )));
        }
        if !(delta.is_finite() && (0.0..1.0).contains(&delta)) {
            return Err(PrivacyError::InvalidParameter(format!(
                "delta must be in [0, 1), got {delta}"
            )));
        }
        if mechanism == NoiseMechanism::Gaussian && delta <= 0.0 {
            return Err(PrivacyError::InvalidParameter(
                "gaussian mechanism requires delta > 0".to_string(),
            ));
        }
        if budget_context.trim().is_empty() {
            return Err(PrivacyError::InvalidContextName {
                name: budget_context,
                reason: "a budget context is required".to_string(),
            });
        }
        if policy.enforce_context_naming {
            validate_context_name(&budget_context)?;
        }
        if epsilon > policy.epsilon_warning_level {
            tracing::warn!(
                epsilon,
                warning_level = policy.epsilon_warning_level,
                context = %budget_context,
                "Epsilon above recommended level provides weak privacy"
            );
        }

        Ok(Self {
            epsilon,
            delta,
            sensitivity,
            mechanism,
            budget_context,
        })
    }

    /// Build from a raw settings map
    ///
    /// Keys: `epsilon` (required), `budget_context` (required), `delta`
    /// (default 0), `sensitivity` (default 1), `mechanism` (default laplace).
    pub fn from_settings(raw: &RawSettings, policy: &PrivacyPolicy) -> Result<Self> {
        let epsilon = optional_f64(raw, "epsilon")?.ok_or_else(|| {
            PrivacyError::InvalidParameter("missing required setting 'epsilon'".to_string())
        })?;
        let delta = optional_f64(raw, "delta")?.unwrap_or(0.0);
        let sensitivity = optional_f64(raw, "sensitivity")?.unwrap_or(1.0);
        let mechanism = match optional_str(raw, "mechanism")? {
            Some(name) => name.parse()?,
            None => NoiseMechanism::default(),
        };
        let budget_context = optional_str(raw, "budget_context")?.ok_or_else(|| {
            PrivacyError::InvalidContextName {
                name: String::new(),
                reason: "a budget context is required".to_string(),
            }
        })?;

        Ok(Self::new(
            epsilon,
            delta,
            sensitivity,
            mechanism,
            budget_context,
            policy,
        )?)
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub fn sensitivity(&self) -> f64 {
        self.sensitivity
    }

    pub fn mechanism(&self) -> NoiseMechanism {
        self.mechanism
    }

    pub fn budget_context(&self) -> &str {
        &self.budget_context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AnonymizerError;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawSettings {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_from_settings_defaults() {
        let setting = DifferentialPrivacySetting::from_settings(
            &raw(json!({"epsilon": 0.5, "budget_context": "ds-1:age"})),
            &PrivacyPolicy::default(),
        )
        .unwrap();
        assert_eq!(setting.epsilon(), 0.5);
        assert_eq!(setting.delta(), 0.0);
        assert_eq!(setting.sensitivity(), 1.0);
        assert_eq!(setting.mechanism(), NoiseMechanism::Laplace);
        assert_eq!(setting.budget_context(), "ds-1:age");
    }

    #[test]
    fn test_rejects_non_positive_epsilon_and_sensitivity() {
        let policy = PrivacyPolicy::default();
        for (eps, sens) in [(-0.5, 1.0), (0.0, 1.0), (f64::NAN, 1.0), (1.0, 0.0), (1.0, -2.0)] {
            let err =
                DifferentialPrivacySetting::new(eps, 0.0, sens, NoiseMechanism::Laplace, "ctx", &policy)
                    .unwrap_err();
            assert!(matches!(err, PrivacyError::InvalidParameter(_)));
        }
    }

    #[test]
    fn test_gaussian_requires_delta() {
        let policy = PrivacyPolicy::default();
        assert!(DifferentialPrivacySetting::new(1.0, 0.0, 1.0, NoiseMechanism::Gaussian, "ctx", &policy)
            .is_err());
        assert!(DifferentialPrivacySetting::new(1.0, 1e-5, 1.0, NoiseMechanism::Gaussian, "ctx", &policy)
            .is_ok());
    }

    #[test]
    fn test_budget_context_is_mandatory() {
        let err = DifferentialPrivacySetting::from_settings(
            &raw(json!({"epsilon": 0.5})),
            &PrivacyPolicy::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            AnonymizerError::Privacy(PrivacyError::InvalidContextName { .. })
        ));
    }

    #[test]
    fn test_policy_ceiling_and_naming() {
        let policy = PrivacyPolicy {
            max_epsilon: Some(10.0),
            enforce_context_naming: true,
            ..PrivacyPolicy::default()
        };
        assert!(DifferentialPrivacySetting::new(12.0, 0.0, 1.0, NoiseMechanism::Laplace, "ds:op", &policy)
            .is_err());
        assert!(DifferentialPrivacySetting::new(1.0, 0.0, 1.0, NoiseMechanism::Laplace, "shared", &policy)
            .is_err());
        // Without a ceiling, large epsilon only warns
        assert!(DifferentialPrivacySetting::new(
            12.0,
            0.0,
            1.0,
            NoiseMechanism::Laplace,
            "shared",
            &PrivacyPolicy::default()
        )
        .is_ok());
    }

    #[test]
    fn test_unknown_mechanism() {
        let err = DifferentialPrivacySetting::from_settings(
            &raw(json!({"epsilon": 0.5, "budget_context": "ds", "mechanism": "uniform"})),
            &PrivacyPolicy::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("uniform"));
    }
}
