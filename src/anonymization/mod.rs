//! Anonymization module for Medcloak
//!
//! This module applies configurable, path-addressed rules to clinical
//! documents and certifies the statistical privacy of a release.
//!
//! # Architecture
//!
//! The anonymization pipeline consists of:
//! - **Matching**: rule patterns resolved against a per-document node index
//! - **Processing**: method-specific [`Processor`]s (redact, keyed hash,
//!   differential privacy, k-anonymity generalization)
//! - **Labeling**: HL7 v3 security labels merged into `meta.security`
//! - **Certification**: batch k-anonymity validation, re-identification risk
//!   and privacy budget accounting
//!
//! # Usage
//!
//! ```rust,ignore
//! use medcloak::anonymization::AnonymizerEngine;
//! use medcloak::anonymization::privacy::PrivacyBudgetTracker;
//!
//! let tracker = Arc::new(PrivacyBudgetTracker::new());
//! let engine = AnonymizerEngine::from_config(&config, tracker)?;
//! let outcome = engine.anonymize(document)?;
//! ```

pub mod context;
pub mod engine;
pub mod index;
pub mod kanon;
pub mod labels;
pub mod privacy;
pub mod processors;
pub mod query;
pub mod report;
pub mod result;
pub mod rule;
pub mod settings;

// Re-export main types
pub use context::ProcessContext;
pub use engine::{AnonymizationOutcome, AnonymizerEngine};
pub use index::NodeLookupIndex;
pub use labels::{apply_security_labels, SecurityLabel};
pub use processors::{Processor, ProcessorRegistry};
pub use report::CertificationReport;
pub use result::{MetricValue, OperationKind, ProcessRecord, ProcessResult};
pub use rule::{AnonymizationRule, AnonymizerMethod, PathPattern};
pub use settings::{CryptoHashSetting, MethodSettings, RawSettings};
