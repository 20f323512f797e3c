//! Anonymization rules
//!
//! A rule binds a [`PathPattern`] to an [`AnonymizerMethod`] and its typed
//! [`MethodSettings`]. Rules are built once from configuration and are
//! immutable for the rest of a run.

use crate::anonymization::index::NodeLookupIndex;
use crate::anonymization::kanon::KAnonymitySetting;
use crate::anonymization::privacy::{DifferentialPrivacySetting, PrivacyPolicy};
use crate::anonymization::query::RelativeExpression;
use crate::anonymization::settings::{CryptoHashSetting, MethodSettings, RawSettings};
use crate::config::RuleConfig;
use crate::domain::{AnonymizerError, Document, NodeId, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Anonymization method bound to a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnonymizerMethod {
    Keep,
    Redact,
    #[serde(alias = "crypto_hash", alias = "cryptohash")]
    CryptoHash,
    Encrypt,
    Substitute,
    #[serde(alias = "differential_privacy", alias = "perturb")]
    DifferentialPrivacy,
    #[serde(alias = "k_anonymity", alias = "kanonymity")]
    KAnonymity,
}

impl AnonymizerMethod {
    /// Every method, in declaration order
    pub const ALL: [AnonymizerMethod; 7] = [
        Self::Keep,
        Self::Redact,
        Self::CryptoHash,
        Self::Encrypt,
        Self::Substitute,
        Self::DifferentialPrivacy,
        Self::KAnonymity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keep => "keep",
            Self::Redact => "redact",
            Self::CryptoHash => "cryptoHash",
            Self::Encrypt => "encrypt",
            Self::Substitute => "substitute",
            Self::DifferentialPrivacy => "differentialPrivacy",
            Self::KAnonymity => "kAnonymity",
        }
    }
}

impl fmt::Display for AnonymizerMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnonymizerMethod {
    type Err = AnonymizerError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|method| method.as_str().to_ascii_lowercase() == normalized)
            .ok_or_else(|| AnonymizerError::Configuration(format!("Unknown anonymization method '{s}'")))
    }
}

/// Where a rule applies
///
/// - `Patient.address.city` is resource-scoped: the root must be a `Patient`
///   (case-insensitive) and the expression is evaluated from the root.
/// - `HumanName::given` is scoped: the key is looked up in the type index
///   first and in the element-name index second, then the expression is
///   evaluated from each hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    Resource {
        resource_type: String,
        expression: RelativeExpression,
    },
    Scoped {
        key: String,
        expression: RelativeExpression,
    },
}

impl PathPattern {
    /// Parse a pattern string
    pub fn parse(pattern: &str) -> Result<Self> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(AnonymizerError::Configuration(
                "Rule path must not be empty".to_string(),
            ));
        }

        if let Some((key, expression)) = pattern.split_once("::") {
            let key = key.trim();
            if key.is_empty() {
                return Err(AnonymizerError::Configuration(format!(
                    "Missing type or element name before '::' in '{pattern}'"
                )));
            }
            return Ok(Self::Scoped {
                key: key.to_string(),
                expression: RelativeExpression::parse(expression)?,
            });
        }

        let (resource_type, expression) = pattern.split_once('.').unwrap_or((pattern, ""));
        Ok(Self::Resource {
            resource_type: resource_type.trim().to_string(),
            expression: RelativeExpression::parse(expression)?,
        })
    }

    /// Nodes matched in a document, in resolution order
    pub fn resolve(&self, document: &Document, index: &NodeLookupIndex) -> Vec<NodeId> {
        match self {
            Self::Resource {
                resource_type,
                expression,
            } => {
                if document.root_type().eq_ignore_ascii_case(resource_type) {
                    expression.evaluate(document, document.root())
                } else {
                    Vec::new()
                }
            }
            Self::Scoped { key, expression } => {
                let scopes = index
                    .nodes_by_type(key)
                    .or_else(|| index.nodes_by_name(key))
                    .unwrap_or_default();
                scopes
                    .iter()
                    .flat_map(|&scope| expression.evaluate(document, scope))
                    .collect()
            }
        }
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resource {
                resource_type,
                expression,
            } if expression.is_identity() => write!(f, "{resource_type}"),
            Self::Resource {
                resource_type,
                expression,
            } => write!(f, "{resource_type}.{expression}"),
            Self::Scoped { key, expression } => write!(f, "{key}::{expression}"),
        }
    }
}

/// One configured transformation
#[derive(Debug, Clone)]
pub struct AnonymizationRule {
    path: String,
    pattern: PathPattern,
    method: AnonymizerMethod,
    settings: MethodSettings,
}

impl AnonymizationRule {
    /// Build a rule, validating method settings up front
    ///
    /// # Errors
    ///
    /// Returns the settings error unchanged (for example
    /// [`crate::domain::PrivacyError::InvalidParameter`] for a bad epsilon),
    /// or a configuration error for a malformed path.
    pub fn new(
        path: &str,
        method: AnonymizerMethod,
        raw: &RawSettings,
        policy: &PrivacyPolicy,
    ) -> Result<Self> {
        let pattern = PathPattern::parse(path)?;
        let settings = match method {
            AnonymizerMethod::CryptoHash => {
                MethodSettings::CryptoHash(CryptoHashSetting::from_settings(raw)?)
            }
            AnonymizerMethod::DifferentialPrivacy => MethodSettings::DifferentialPrivacy(
                DifferentialPrivacySetting::from_settings(raw, policy)?,
            ),
            AnonymizerMethod::KAnonymity => {
                MethodSettings::KAnonymity(KAnonymitySetting::from_settings(raw)?)
            }
            AnonymizerMethod::Keep
            | AnonymizerMethod::Redact
            | AnonymizerMethod::Encrypt
            | AnonymizerMethod::Substitute => MethodSettings::Raw(raw.clone()),
        };

        Ok(Self {
            path: path.trim().to_string(),
            pattern,
            method,
            settings,
        })
    }

    /// Build from a configuration entry
    pub fn from_config(config: &RuleConfig, policy: &PrivacyPolicy) -> Result<Self> {
        Self::new(&config.path, config.method, &config.settings, policy).inspect_err(|e| {
            tracing::error!(rule = %config.path, method = %config.method, error = %e, "Invalid rule");
        })
    }

    /// Rule without settings, for methods that take none
    pub fn simple(path: &str, method: AnonymizerMethod) -> Result<Self> {
        Self::new(path, method, &RawSettings::new(), &PrivacyPolicy::default())
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn method(&self) -> AnonymizerMethod {
        self.method
    }

    pub fn settings(&self) -> &MethodSettings {
        &self.settings
    }
}
