// Medcloak - clinical document anonymization
// Licensed under the MIT License

//! # Medcloak - clinical document anonymization
//!
//! Medcloak de-identifies FHIR-style clinical JSON documents with a list of
//! path-matched rules and certifies the released batch.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Matching** rules against a document tree by resource type or element name
//! - **Transforming** values: redact, keyed hash, differential-privacy noise,
//!   k-anonymity generalization
//! - **Accounting** privacy budget per context, atomically and with an audit trail
//! - **Certifying** a batch for k-anonymity and re-identification risk
//! - **Labeling** each document with HL7 v3 security codes
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`anonymization`] - Rule engine, processors, privacy and k-anonymity
//! - [`domain`] - Document tree, JSON adapter, and error types
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use medcloak::anonymization::privacy::PrivacyBudgetTracker;
//! use medcloak::anonymization::AnonymizerEngine;
//! use medcloak::config::load_config;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("medcloak.toml")?;
//!     let tracker = Arc::new(PrivacyBudgetTracker::new());
//!     let engine = AnonymizerEngine::from_config(&config, tracker)?;
//!
//!     let document = config
//!         .document_reader()
//!         .read_str(r#"{"resourceType": "Patient", "birthDate": "1970-01-01"}"#)?;
//!     let outcomes = engine.anonymize_batch(vec![document]).await;
//!
//!     println!("Anonymized {} documents", outcomes.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Medcloak uses the [`domain::AnonymizerError`] type for all errors; privacy
//! failures are wrapped from [`domain::PrivacyError`]:
//!
//! ```rust,no_run
//! use medcloak::domain::AnonymizerError;
//!
//! fn example() -> Result<(), AnonymizerError> {
//!     let config = medcloak::config::load_config("medcloak.toml")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Logging
//!
//! Medcloak uses structured logging with the `tracing` crate. Budget
//! operations are emitted on the `medcloak::audit` target.

pub mod anonymization;
pub mod cli;
pub mod config;
pub mod domain;
pub mod logging;
