//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Medcloak using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Medcloak - clinical document anonymization
#[derive(Parser, Debug)]
#[command(name = "medcloak")]
#[command(version, about, long_about = None)]
#[command(author = "Medcloak Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "medcloak.toml", env = "MEDCLOAK_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "MEDCLOAK_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Anonymize JSON documents with the configured rules
    Anonymize(commands::anonymize::AnonymizeArgs),

    /// Check a batch of documents for k-anonymity and re-identification risk
    Certify(commands::certify::CertifyArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),
}
