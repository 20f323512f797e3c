//! Typed per-rule settings
//!
//! Rule settings arrive from configuration as a loosely-typed map. They are
//! converted once, when the rule is built, into a [`MethodSettings`] variant so
//! processors never re-parse strings on the hot path.

use crate::anonymization::kanon::KAnonymitySetting;
use crate::anonymization::privacy::DifferentialPrivacySetting;
use crate::config::SecretString;
use crate::domain::{AnonymizerError, Result};
use secrecy::ExposeSecret;
use serde_json::{Map, Value};

/// Loosely-typed settings map as loaded from configuration
pub type RawSettings = Map<String, Value>;

/// Validated settings for one rule
#[derive(Debug, Clone)]
pub enum MethodSettings {
    /// Keyed-hash settings
    CryptoHash(CryptoHashSetting),
    /// Differential-privacy parameters
    DifferentialPrivacy(DifferentialPrivacySetting),
    /// K-anonymity generalization parameters
    KAnonymity(KAnonymitySetting),
    /// Settings for externally registered processors, passed through untouched
    Raw(RawSettings),
}

/// Key material for the keyed-hash processor
#[derive(Debug, Clone)]
pub struct CryptoHashSetting {
    key: SecretString,
}

impl CryptoHashSetting {
    /// Build from a raw settings map; `key` is required and non-empty
    pub fn from_settings(raw: &RawSettings) -> Result<Self> {
        let key = required_str(raw, "key")?;
        if key.is_empty() {
            return Err(AnonymizerError::Validation(
                "cryptoHash key must not be empty".to_string(),
            ));
        }
        Ok(Self {
            key: crate::config::secret_string(key.to_string()),
        })
    }

    /// Key bytes, exposed only to the hashing call
    pub fn key_bytes(&self) -> &[u8] {
        self.key.expose_secret().as_ref().as_bytes()
    }
}

/// Read an optional float setting, accepting integers too
pub(crate) fn optional_f64(raw: &RawSettings, key: &str) -> Result<Option<f64>> {
    match raw.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_f64().map(Some).ok_or_else(|| {
            AnonymizerError::Validation(format!("Setting '{key}' is not a finite number"))
        }),
        Some(Value::String(s)) => s.trim().parse::<f64>().map(Some).map_err(|_| {
            AnonymizerError::Validation(format!("Setting '{key}' is not a number: '{s}'"))
        }),
        Some(other) => Err(AnonymizerError::Validation(format!(
            "Setting '{key}' must be a number, found {other}"
        ))),
    }
}

/// Read an optional string setting
pub(crate) fn optional_str<'a>(raw: &'a RawSettings, key: &str) -> Result<Option<&'a str>> {
    match raw.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(AnonymizerError::Validation(format!(
            "Setting '{key}' must be a string, found {other}"
        ))),
    }
}

/// Read a required string setting
pub(crate) fn required_str<'a>(raw: &'a RawSettings, key: &str) -> Result<&'a str> {
    optional_str(raw, key)?
        .ok_or_else(|| AnonymizerError::Validation(format!("Missing required setting '{key}'")))
}
