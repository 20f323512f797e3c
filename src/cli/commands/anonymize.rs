//! Anonymize command implementation
//!
//! This module implements the `anonymize` command: read JSON documents,
//! apply the configured rules, write the results and a certification report.

use super::input::read_inputs;
use crate::anonymization::kanon::{KAnonymitySetting, KAnonymityValidator, RiskAssessor};
use crate::anonymization::privacy::PrivacyBudgetTracker;
use crate::anonymization::{AnonymizerEngine, CertificationReport, MethodSettings};
use crate::config::load_config;
use crate::domain::{write_document, Document};
use crate::{log_batch_progress, log_error_with_context};
use clap::Args;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Arguments for the anonymize command
#[derive(Args, Debug)]
pub struct AnonymizeArgs {
    /// Input JSON file or directory of JSON files
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output directory for anonymized documents
    #[arg(short, long, default_value = "./anonymized")]
    pub output: PathBuf,

    /// Write the certification report as JSON to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Print the report as JSON instead of the console summary
    #[arg(long)]
    pub json: bool,
}

impl AnonymizeArgs {
    /// Execute the anonymize command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(input = %self.input.display(), "Starting anonymize command");

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                log_error_with_context!(&e, "Failed to load configuration");
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        let tracker = Arc::new(PrivacyBudgetTracker::with_warning_threshold(
            config.privacy.warning_threshold,
        )?);
        let engine = match AnonymizerEngine::from_config(&config, tracker) {
            Ok(engine) => engine,
            Err(e) => {
                log_error_with_context!(&e, "Failed to build anonymization rules");
                println!("❌ Invalid anonymization rules");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        let inputs = read_inputs(&self.input, &config.document_reader())?;
        std::fs::create_dir_all(&self.output)?;

        let mut report = CertificationReport::new();
        let mut paths = Vec::new();
        let mut documents = Vec::new();
        for input in inputs {
            match input.document {
                Ok(document) => {
                    paths.push(input.path);
                    documents.push(document);
                }
                Err(e) => report.add_failure(format!("{}: {e}", input.path.display())),
            }
        }

        let total = documents.len();
        let outcomes = engine.anonymize_batch(documents).await;

        let mut anonymized: Vec<Document> = Vec::with_capacity(total);
        let mut results = Vec::with_capacity(total);
        for (i, (path, outcome)) in paths.iter().zip(outcomes).enumerate() {
            let done = i + 1;
            log_batch_progress!(done, total);
            match outcome {
                Ok(outcome) => {
                    report.add_outcome(&outcome);
                    write_output(&self.output, path, &outcome.document)?;
                    results.push(outcome.result);
                    anonymized.push(outcome.document);
                }
                Err(e) => {
                    log_error_with_context!(&e, "Failed to anonymize document");
                    report.add_failure(format!("{}: {e}", path.display()));
                    if !config.application.continue_on_error {
                        println!("❌ Stopping on first failure: {e}");
                        return Ok(1);
                    }
                }
            }
        }

        if let Some(setting) = k_anonymity_setting(&engine) {
            let validator = KAnonymityValidator::from_setting(setting)?;
            let validation = validator.validate_documents(&anonymized);
            let certified = validation.certify(&mut results);
            let risk = RiskAssessor::new().assess(&validation.classes);
            tracing::info!(certified, level = %risk.level, "Batch certification complete");
            report.set_certification(validation, risk);
        }
        report.set_budgets(engine.tracker().snapshots());

        if self.json {
            println!("{}", report.format_json()?);
        } else {
            println!("{}", report.format_console());
        }
        if let Some(path) = &self.report {
            report.write_to_file(path)?;
            println!("📄 Report written to {}", path.display());
        }

        Ok(if report.is_certified() { 0 } else { 1 })
    }
}

/// First k-anonymity rule's settings; the batch is validated against them
fn k_anonymity_setting(engine: &AnonymizerEngine) -> Option<&KAnonymitySetting> {
    engine.rules().iter().find_map(|rule| match rule.settings() {
        MethodSettings::KAnonymity(setting) => Some(setting),
        _ => None,
    })
}

fn write_output(output_dir: &Path, input: &Path, document: &Document) -> anyhow::Result<()> {
    let file_name = input
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("Input path {} has no file name", input.display()))?;
    let json = serde_json::to_string_pretty(&write_document(document))?;
    std::fs::write(output_dir.join(file_name), json)?;
    Ok(())
}
