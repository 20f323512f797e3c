//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the Medcloak configuration file and every rule it defines.

use crate::anonymization::privacy::PrivacyBudgetTracker;
use crate::anonymization::AnonymizerEngine;
use crate::config::load_config;
use clap::Args;
use std::sync::Arc;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // Load configuration
        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration file loaded successfully");
                c
            }
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        // Build the rules against a scratch tracker
        let tracker = Arc::new(PrivacyBudgetTracker::new());
        match AnonymizerEngine::from_config(&config, tracker) {
            Ok(engine) => {
                println!("✅ Configuration is valid");
                println!();
                println!("Configuration Summary:");
                println!("  Log Level: {}", config.application.log_level);
                println!("  Continue On Error: {}", config.application.continue_on_error);
                match config.privacy.max_epsilon {
                    Some(max) => println!("  Max Epsilon: {max}"),
                    None => println!("  Max Epsilon: (none)"),
                }
                println!(
                    "  Enforce Context Naming: {}",
                    config.privacy.enforce_context_naming
                );
                println!("  Budget Contexts: {}", config.budgets.len());
                for budget in &config.budgets {
                    println!("    • {} (ε = {})", budget.context, budget.total_epsilon);
                }
                println!("  Rules: {}", engine.rules().len());
                for rule in engine.rules() {
                    println!("    • {} → {}", rule.path(), rule.method());
                }
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                Ok(2) // Configuration error exit code
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_valid_config_exits_zero() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            "[[budgets]]\ncontext = \"ds-1:age\"\ntotal_epsilon = 2.0\n\n[[rules]]\npath = \"Patient.name\"\nmethod = \"redact\"\n",
        )
        .unwrap();
        let code = ValidateArgs {}
            .execute(file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn test_rule_without_processor_exits_two() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            "[[rules]]\npath = \"Patient.name\"\nmethod = \"encrypt\"\n",
        )
        .unwrap();
        let code = ValidateArgs {}
            .execute(file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(code, 2);
    }
}
