//! Ingest command implementation
//!
//! Runs the full pipeline: catalog, per-item detail, documents, persistence.

use crate::config::load_config;
use crate::core::ingest::IngestCoordinator;
use clap::Args;
use tokio::sync::watch;

/// Arguments for the ingest command
#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Override the reporting period (YYYY.MM)
    #[arg(long)]
    pub period: Option<String>,

    /// Override the document type filter
    #[arg(long)]
    pub document_type: Option<String>,

    /// Cap the run to the first N catalog items
    #[arg(long)]
    pub limit: Option<usize>,

    /// Override the number of items processed concurrently
    #[arg(long)]
    pub parallel: Option<usize>,
}

impl IngestArgs {
    /// Execute the ingest command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting ingest command");

        let mut config = load_config(config_path)?;

        // Apply CLI overrides
        if let Some(period) = &self.period {
            tracing::info!(period = %period, "Overriding period from CLI");
            config.ingest.period = period.clone();
        }
        if let Some(doc_type) = &self.document_type {
            tracing::info!(document_type = %doc_type, "Overriding document type from CLI");
            config.ingest.document_type = doc_type.clone();
        }
        if let Some(limit) = self.limit {
            tracing::info!(limit = limit, "Overriding item limit from CLI");
            config.ingest.item_limit = Some(limit);
        }
        if let Some(parallel) = self.parallel {
            tracing::info!(parallel = parallel, "Overriding parallelism from CLI");
            config.ingest.parallel_items = parallel;
        }

        // Validate configuration before touching the network or the database
        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(2); // Configuration error exit code
        }

        // Confirmation prompt (unless --yes)
        if !self.yes {
            println!("Ingest configuration:");
            println!("  Period: {}", config.ingest.period);
            println!("  Document type: {}", config.ingest.document_type);
            println!(
                "  Item limit: {}",
                config
                    .ingest
                    .item_limit
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "none".to_string())
            );
            println!("  Parallel items: {}", config.ingest.parallel_items);
            println!();
            print!("Proceed with ingest? [y/N]: ");
            use std::io::{self, Write};
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;

            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Ingest cancelled.");
                return Ok(0);
            }
        }

        tracing::info!("Creating ingest coordinator");
        let coordinator = match IngestCoordinator::new(config, shutdown_signal).await {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create ingest coordinator");
                eprintln!("Failed to initialize ingest: {e}");
                return Ok(4); // Connection error exit code
            }
        };

        println!("Starting ingest...");
        println!();

        let summary = match coordinator.execute_ingest().await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Ingest failed");
                eprintln!("Ingest failed: {e}");
                return Ok(5); // Fatal error exit code
            }
        };

        // Display summary
        println!();
        println!("Ingest summary:");
        println!("  Catalog size: {}", summary.catalog_size);
        println!("  Items processed: {}", summary.items_processed);
        println!("  Items persisted: {}", summary.items_persisted);
        println!("  Items skipped: {}", summary.items_skipped);
        println!("  Items failed: {}", summary.items_failed);
        println!("  Documents persisted: {}", summary.documents_persisted);
        println!("  Documents skipped: {}", summary.documents_skipped);
        println!("  Documents failed: {}", summary.documents_failed);
        println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
        println!();

        if !summary.errors.is_empty() {
            println!("Errors encountered:");
            for error in &summary.errors {
                println!("  - {:?}: {}", error.error_type, error.message);
                if let Some(context) = &error.context {
                    println!("    Context: {context}");
                }
            }
            println!();
        }

        // Determine exit code
        let exit_code = if summary.interrupted {
            println!("Ingest interrupted gracefully. Progress saved.");
            println!("Run the same command to resume; existing rows are never duplicated.");
            tracing::info!("Ingest interrupted by operator signal");
            130 // SIGINT exit code
        } else if summary.is_aborted() {
            println!("Ingest aborted.");
            5
        } else if summary.is_successful() {
            println!("Ingest completed successfully.");
            0
        } else {
            println!("Ingest completed with failures.");
            1 // Partial success
        };

        Ok(exit_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_args_defaults() {
        let args = IngestArgs {
            yes: false,
            period: None,
            document_type: None,
            limit: None,
            parallel: None,
        };

        assert!(!args.yes);
        assert!(args.period.is_none());
        assert!(args.limit.is_none());
    }
}
