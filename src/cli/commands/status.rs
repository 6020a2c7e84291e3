//! Status command implementation
//!
//! Reports row counts from the store so the completeness of past runs can
//! be audited without SQL access.

use crate::adapters::postgres::{PostgresClient, PostgresStore};
use crate::config::load_config;
use clap::Args;
use std::sync::Arc;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Starting status command");

        let config = load_config(config_path)?;

        let client = match PostgresClient::new(config.postgresql.clone()) {
            Ok(c) => Arc::new(c),
            Err(e) => {
                eprintln!("Failed to create database client: {e}");
                return Ok(4); // Connection error exit code
            }
        };

        if let Err(e) = client.test_connection().await {
            tracing::error!(error = %e, "Database connection failed");
            eprintln!("Database connection failed: {e}");
            return Ok(4);
        }

        let store = PostgresStore::new(client.clone());
        let counts = match store.counts().await {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to query store counts");
                eprintln!("Failed to query store counts: {e}");
                return Ok(5); // Fatal error exit code
            }
        };

        println!("Store status ({})", client.connection_string_safe());
        println!("  Drugs: {}", counts.drugs);
        println!("  Documents: {}", counts.documents);
        println!(
            "  Total document size: {:.1} MB",
            counts.total_pdf_bytes as f64 / (1024.0 * 1024.0)
        );
        match counts.last_document_at {
            Some(at) => println!("  Last document stored: {}", at.to_rfc3339()),
            None => println!("  Last document stored: never"),
        }

        Ok(0)
    }
}
