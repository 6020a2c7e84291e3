//! Validate-config command implementation

use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    ///
    /// Loads the configuration file, applying environment substitution and
    /// overrides, and runs full validation without touching the network or
    /// the database.
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config = config_path, "Validating configuration");

        match load_config(config_path) {
            Ok(config) => {
                println!("Configuration is valid: {config_path}");
                println!("  Registry: {}", config.registry.base_url);
                println!("  Period: {}", config.ingest.period);
                println!("  Document type: {}", config.ingest.document_type);
                Ok(0)
            }
            Err(e) => {
                tracing::error!(error = %e, "Configuration validation failed");
                eprintln!("Configuration validation failed: {e}");
                Ok(2) // Configuration error exit code
            }
        }
    }
}
