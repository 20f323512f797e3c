//! Secret handling for key material in configuration
//!
//! Hash keys are wrapped in [`secrecy::Secret`] as soon as they leave the raw
//! settings map. The wrapped value is zeroized on drop and its `Debug` output
//! is redacted, so a rule can be logged without leaking its key.
//!
//! # Example
//!
//! ```rust
//! use medcloak::config::secret_string;
//! use secrecy::ExposeSecret;
//!
//! let key = secret_string("hash-key".to_string());
//! assert_eq!(key.expose_secret().as_ref(), "hash-key");
//! assert!(!format!("{key:?}").contains("hash-key"));
//! ```

use secrecy::{CloneableSecret, DebugSecret, Secret, SerializableSecret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

/// Newtype wrapper for String that implements the required traits for Secret
#[derive(Clone, Debug, Zeroize)]
#[zeroize(drop)]
pub struct SecretValue(String);

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}
impl SerializableSecret for SecretValue {}

impl From<String> for SecretValue {
    fn from(s: String) -> Self {
        SecretValue(s)
    }
}

impl AsRef<str> for SecretValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl SecretValue {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for SecretValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretValue)
    }
}

/// Secret string: zeroized on drop, redacted in `Debug`
pub type SecretString = Secret<SecretValue>;

/// Wrap a string as a [`SecretString`]
#[inline]
pub fn secret_string(value: String) -> SecretString {
    Secret::new(SecretValue::from(value))
}
