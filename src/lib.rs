// Medreg - Drug Registry Ingestion Tool
// Copyright (c) 2025 Medreg Contributors
// Licensed under the MIT License

//! # Medreg - Drug Registry Ingestion
//!
//! Medreg is a batch ingestion tool that pulls a national drug registry's
//! catalog and the associated regulatory PDF documents from its REST API and
//! persists them into PostgreSQL for downstream use.
//!
//! ## Overview
//!
//! One run performs, for a configured reporting period:
//! - **Catalog retrieval**: the paginated list of item codes, fetched once
//! - **Per-item detail lookup**: full metadata, upserted into the `drugs` table
//! - **Document discovery and download**: descriptors filtered by document
//!   type, each binary downloaded and inserted into the `documents` table
//!
//! Reruns are idempotent: drug rows are upserted by code, document rows are
//! unique on `(drug_code, document_id)`, so an interrupted run can simply be
//! restarted.
//!
//! ## Architecture
//!
//! Medreg follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (the ingestion pipeline)
//! - [`adapters`] - External integrations (registry API, PostgreSQL)
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use medreg::config::load_config;
//! use medreg::core::ingest::IngestCoordinator;
//! use tokio::sync::watch;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("medreg.toml")?;
//!
//!     let (_shutdown_tx, shutdown_rx) = watch::channel(false);
//!     let coordinator = IngestCoordinator::new(config, shutdown_rx).await?;
//!
//!     let summary = coordinator.execute_ingest().await?;
//!     println!(
//!         "{} items persisted, {} documents persisted",
//!         summary.items_persisted, summary.documents_persisted
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Failure Containment
//!
//! Failures are scoped to the smallest unit of work: a failed document never
//! affects its siblings, a failed item never affects other items. Only two
//! conditions abort a run - the catalog being unavailable and loss of the
//! database connection. Every skip and failure is logged with the drug code
//! (and document id where applicable), and the final summary reports
//! persisted/skipped/failed counts for both items and documents.
//!
//! ## Error Handling
//!
//! Medreg uses the [`domain::MedregError`] type for all errors:
//!
//! ```rust,no_run
//! use medreg::domain::MedregError;
//!
//! fn example() -> Result<(), MedregError> {
//!     let config = medreg::config::load_config("medreg.toml")?;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
