//! Certify command implementation
//!
//! This module implements the `certify` command: validate an already
//! anonymized release for k-anonymity and report re-identification risk.

use super::input::read_inputs;
use crate::anonymization::kanon::{KAnonymitySetting, KAnonymityValidator, RiskAssessor};
use crate::anonymization::{AnonymizerMethod, CertificationReport};
use crate::config::{load_config, MedcloakConfig};
use crate::log_error_with_context;
use clap::Args;
use std::path::PathBuf;

/// Arguments for the certify command
#[derive(Args, Debug)]
pub struct CertifyArgs {
    /// Input JSON file or directory of JSON files
    #[arg(short, long)]
    pub input: PathBuf,

    /// Required minimum class size (defaults to the first kAnonymity rule)
    #[arg(long)]
    pub k: Option<usize>,

    /// Comma-separated quasi-identifier expressions
    #[arg(long, value_name = "PATHS")]
    pub quasi_identifiers: Option<String>,

    /// Print the report as JSON instead of the console summary
    #[arg(long)]
    pub json: bool,
}

impl CertifyArgs {
    /// Execute the certify command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(input = %self.input.display(), "Starting certify command");

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                log_error_with_context!(&e, "Failed to load configuration");
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        let validator = match self.validator(&config) {
            Ok(v) => v,
            Err(e) => {
                println!("❌ Cannot determine k-anonymity parameters");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        let mut report = CertificationReport::new();
        let mut documents = Vec::new();
        for input in read_inputs(&self.input, &config.document_reader())? {
            match input.document {
                Ok(document) => documents.push(document),
                Err(e) => report.add_failure(format!("{}: {e}", input.path.display())),
            }
        }

        let validation = validator.validate_documents(&documents);
        let risk = RiskAssessor::new().assess(&validation.classes);
        report.set_certification(validation, risk);

        if self.json {
            println!("{}", report.format_json()?);
        } else {
            println!("{}", report.format_console());
        }

        Ok(if report.is_certified() { 0 } else { 1 })
    }

    /// Command-line parameters, falling back to the configured rule
    fn validator(&self, config: &MedcloakConfig) -> anyhow::Result<KAnonymityValidator> {
        let configured = config
            .rules
            .iter()
            .find(|rule| rule.method == AnonymizerMethod::KAnonymity)
            .map(|rule| KAnonymitySetting::from_settings(&rule.settings))
            .transpose()?;

        let k = self
            .k
            .or_else(|| configured.as_ref().map(KAnonymitySetting::k))
            .ok_or_else(|| anyhow::anyhow!("--k is required when no kAnonymity rule is configured"))?;

        let quasi_identifiers = match &self.quasi_identifiers {
            Some(list) => list
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => configured
                .as_ref()
                .map(|setting| setting.quasi_identifiers().to_vec())
                .ok_or_else(|| {
                    anyhow::anyhow!(
                        "--quasi-identifiers is required when no kAnonymity rule is configured"
                    )
                })?,
        };

        Ok(KAnonymityValidator::new(k, quasi_identifiers)?)
    }
}
