//! Keyed-hash processor

use super::Processor;
use crate::anonymization::context::ProcessContext;
use crate::anonymization::result::{OperationKind, ProcessResult};
use crate::anonymization::settings::MethodSettings;
use crate::domain::{AnonymizerError, Document, NodeId, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Replaces the value with hex `HMAC-SHA256(key, value)`
///
/// Equal inputs under the same key hash equally, so joins across documents
/// survive pseudonymization.
#[derive(Debug, Clone, Copy, Default)]
pub struct CryptoHashProcessor;

/// Hex-encoded HMAC-SHA256 of `value`
pub fn keyed_hash(key: &[u8], value: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| AnonymizerError::Configuration(format!("Invalid hash key: {e}")))?;
    mac.update(value.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

impl Processor for CryptoHashProcessor {
    fn process(
        &self,
        document: &mut Document,
        node: Option<NodeId>,
        _context: Option<&ProcessContext<'_>>,
        settings: Option<&MethodSettings>,
    ) -> Result<ProcessResult> {
        let mut result = ProcessResult::new();
        let (Some(node), Some(settings)) = (node, settings) else {
            return Ok(result);
        };
        let MethodSettings::CryptoHash(setting) = settings else {
            return Err(AnonymizerError::Configuration(
                "cryptoHash processor requires cryptoHash settings".to_string(),
            ));
        };

        let Some(value) = document.value(node) else {
            return Ok(result);
        };
        let hashed = keyed_hash(setting.key_bytes(), value)?;
        document.set_value(node, Some(hashed));
        result.record(OperationKind::CryptoHash, document, node);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anonymization::settings::{CryptoHashSetting, RawSettings};
    use serde_json::json;

    fn settings(key: &str) -> MethodSettings {
        let raw: RawSettings = json!({ "key": key }).as_object().cloned().unwrap();
        MethodSettings::CryptoHash(CryptoHashSetting::from_settings(&raw).unwrap())
    }

    #[test]
    fn test_hash_is_keyed_and_stable() {
        let a = keyed_hash(b"k1", "12345").unwrap();
        assert_eq!(a, keyed_hash(b"k1", "12345").unwrap());
        assert_ne!(a, keyed_hash(b"k2", "12345").unwrap());
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_process_replaces_value() {
        let mut doc = Document::new("Patient");
        let root = doc.root();
        let id = doc.add_child(root, "id", "id", Some("example".into()), false);

        let result = CryptoHashProcessor
            .process(&mut doc, Some(id), None, Some(&settings("secret")))
            .unwrap();
        assert_eq!(doc.value(id), Some(keyed_hash(b"secret", "example").unwrap().as_str()));
        assert!(result.has_kind(OperationKind::CryptoHash));
    }

    #[test]
    fn test_wrong_settings_variant_is_rejected() {
        let mut doc = Document::new("Patient");
        let root = doc.root();
        let id = doc.add_child(root, "id", "id", Some("example".into()), false);
        let raw = MethodSettings::Raw(RawSettings::new());
        assert!(CryptoHashProcessor.process(&mut doc, Some(id), None, Some(&raw)).is_err());
        assert_eq!(doc.value(id), Some("example"));
    }
}
