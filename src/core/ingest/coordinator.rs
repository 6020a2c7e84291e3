//! Ingest coordinator - main orchestrator for the ingestion run
//!
//! Drives the run state machine: fetch the catalog once, then for each item
//! fetch detail, persist the drug row, enumerate documents, and
//! download-then-persist each one. Failures are contained at the smallest
//! unit - a failed document never affects its siblings, a failed item never
//! affects other items - and only catalog failure or persistence connection
//! loss aborts the run.

use crate::adapters::postgres::{DocumentInsert, DrugStore, PostgresClient, PostgresStore};
use crate::adapters::registry::{HttpRegistryClient, RegistrySource, RequestPacer};
use crate::config::MedregConfig;
use crate::core::ingest::outcome::ItemOutcome;
use crate::core::ingest::summary::{IngestError, IngestErrorType, IngestSummary, RunPhase};
use crate::domain::errors::RegistryError;
use crate::domain::{DocumentDescriptor, DocumentRecord, DrugCode, Result};
use futures::stream::StreamExt;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

/// Ingest coordinator
pub struct IngestCoordinator {
    config: MedregConfig,
    registry: Arc<dyn RegistrySource>,
    store: Arc<dyn DrugStore>,
    shutdown: watch::Receiver<bool>,
}

impl IngestCoordinator {
    /// Create a coordinator wired to the real registry and PostgreSQL
    ///
    /// Connects to PostgreSQL, bootstraps the schema, and builds the HTTP
    /// client with the shared request pacer and document size guard.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is unusable or the database is
    /// unreachable.
    pub async fn new(config: MedregConfig, shutdown: watch::Receiver<bool>) -> Result<Self> {
        let pacer = config
            .ingest
            .min_request_interval()
            .map(|interval| Arc::new(RequestPacer::new(interval)));

        let registry = HttpRegistryClient::new(
            config.registry.clone(),
            pacer,
            config.ingest.max_document_bytes(),
        )?;

        let pg_client = Arc::new(PostgresClient::new(config.postgresql.clone())?);
        pg_client.test_connection().await?;
        pg_client.ensure_schema().await?;
        tracing::info!(
            database = %pg_client.connection_string_safe(),
            "Connected to PostgreSQL"
        );

        let store = PostgresStore::new(pg_client);

        Ok(Self::with_components(
            config,
            Arc::new(registry),
            Arc::new(store),
            shutdown,
        ))
    }

    /// Create a coordinator over explicit components
    ///
    /// Used by tests to drive the pipeline against in-memory doubles.
    pub fn with_components(
        config: MedregConfig,
        registry: Arc<dyn RegistrySource>,
        store: Arc<dyn DrugStore>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            config,
            registry,
            store,
            shutdown,
        }
    }

    /// Execute the ingestion run
    ///
    /// Always returns a summary; per-item and per-document failures are
    /// folded into it rather than propagated. The summary's terminal phase
    /// distinguishes a completed run from an aborted one.
    pub async fn execute_ingest(&self) -> Result<IngestSummary> {
        let start_time = Instant::now();
        let mut summary = IngestSummary::new();

        self.enter_phase(RunPhase::Initializing);
        if let Err(e) = self.config.validate() {
            summary.add_error(IngestError::new(IngestErrorType::Configuration, e));
            summary.phase = RunPhase::Aborted;
            return Ok(summary.with_duration(start_time.elapsed()));
        }

        self.enter_phase(RunPhase::FetchingCatalog);
        let mut codes = match self
            .registry
            .fetch_catalog(&self.config.ingest.period, self.config.ingest.page_size)
            .await
        {
            Ok(codes) => codes,
            Err(e) => {
                tracing::error!(
                    period = %self.config.ingest.period,
                    error = %e,
                    "Catalog fetch failed, no downstream work is possible"
                );
                summary.add_error(
                    IngestError::new(IngestErrorType::Catalog, e.to_string())
                        .with_context(format!("period={}", self.config.ingest.period)),
                );
                summary.phase = RunPhase::Aborted;
                return Ok(summary.with_duration(start_time.elapsed()));
            }
        };
        summary.catalog_size = codes.len();

        if let Some(limit) = self.config.ingest.item_limit {
            if codes.len() > limit {
                tracing::info!(
                    limit = limit,
                    catalog_size = codes.len(),
                    "Capping run to the first items of the catalog"
                );
                codes.truncate(limit);
            }
        }

        self.enter_phase(RunPhase::ProcessingItems);
        let aborted = if self.config.ingest.parallel_items <= 1 {
            self.run_sequential(&codes, &mut summary).await
        } else {
            self.run_pooled(&codes, self.config.ingest.parallel_items, &mut summary)
                .await
        };

        self.enter_phase(RunPhase::Summarizing);
        summary.phase = if aborted {
            RunPhase::Aborted
        } else {
            RunPhase::Done
        };
        summary = summary.with_duration(start_time.elapsed());
        summary.log_summary();

        Ok(summary)
    }

    fn enter_phase(&self, phase: RunPhase) {
        tracing::debug!(phase = phase.as_str(), "Entering run phase");
    }

    /// Default scheduling: one item fully processed before the next begins
    ///
    /// Returns true if the run must abort.
    async fn run_sequential(&self, codes: &[DrugCode], summary: &mut IngestSummary) -> bool {
        let total = codes.len();

        for (index, code) in codes.iter().enumerate() {
            if *self.shutdown.borrow() {
                tracing::info!("Shutdown requested, stopping before the next item");
                summary.interrupted = true;
                return false;
            }

            let outcome = self.process_item(code).await;
            let fatal = outcome.fatal;
            self.apply_outcome(outcome, index + 1, total, summary);

            if fatal {
                return true;
            }
        }

        false
    }

    /// Bounded-parallel scheduling
    ///
    /// Up to `width` items are in flight at once; completed outcomes are
    /// folded into the summary by this single loop, so counters are never
    /// shared between workers. On shutdown or a fatal failure, in-flight
    /// items finish and no new ones start.
    async fn run_pooled(
        &self,
        codes: &[DrugCode],
        width: usize,
        summary: &mut IngestSummary,
    ) -> bool {
        let total = codes.len();
        let abort = AtomicBool::new(false);

        let mut outcomes = futures::stream::iter(codes.to_vec())
            .map(|code| {
                let abort = &abort;
                async move {
                    if *self.shutdown.borrow() || abort.load(Ordering::SeqCst) {
                        return None;
                    }
                    Some(self.process_item(&code).await)
                }
            })
            .buffer_unordered(width);

        let mut completed = 0;
        while let Some(slot) = outcomes.next().await {
            match slot {
                Some(outcome) => {
                    completed += 1;
                    if outcome.fatal {
                        abort.store(true, Ordering::SeqCst);
                    }
                    self.apply_outcome(outcome, completed, total, summary);
                }
                None => {
                    if *self.shutdown.borrow() {
                        summary.interrupted = true;
                    }
                }
            }
        }

        abort.load(Ordering::SeqCst)
    }

    /// Fold one outcome into the summary and emit the per-item progress line
    fn apply_outcome(
        &self,
        outcome: ItemOutcome,
        position: usize,
        total: usize,
        summary: &mut IngestSummary,
    ) {
        tracing::info!(
            code = %outcome.code,
            position = position,
            total = total,
            status = outcome.status_label(),
            documents_persisted = outcome.documents_persisted,
            documents_skipped = outcome.documents_skipped,
            documents_failed = outcome.documents_failed,
            "Item processed"
        );

        summary.record_item(&outcome);
        for error in outcome.errors {
            summary.add_error(error);
        }
    }

    /// Process one catalog item to completion
    ///
    /// The full sequence - detail, drug persistence, document metadata, all
    /// document downloads - runs before this returns, regardless of
    /// individual document failures.
    async fn process_item(&self, code: &DrugCode) -> ItemOutcome {
        let record = match self.registry.fetch_detail(code).await {
            Ok(record) => record,
            Err(e @ (RegistryError::NotFound(_) | RegistryError::SchemaMismatch(_))) => {
                tracing::warn!(code = %code, error = %e, "Skipping item");
                return ItemOutcome::skipped(code.clone(), e.to_string());
            }
            Err(e) => {
                tracing::error!(code = %code, error = %e, "Detail fetch failed");
                let mut outcome = ItemOutcome::failed(code.clone(), e.to_string());
                outcome.errors.push(
                    IngestError::new(IngestErrorType::Detail, e.to_string())
                        .with_context(format!("code={code}")),
                );
                return outcome;
            }
        };

        // The drug row must be committed before any of its documents
        if let Err(e) = self.store.upsert_drug(&record).await {
            let fatal = e.is_connection_loss();
            tracing::error!(code = %code, error = %e, fatal = fatal, "Drug persistence failed");
            let mut outcome = ItemOutcome::failed(code.clone(), e.to_string());
            outcome.errors.push(
                IngestError::new(IngestErrorType::Storage, e.to_string())
                    .with_context(format!("code={code}")),
            );
            if fatal {
                outcome = outcome.fatal();
            }
            return outcome;
        }

        let mut outcome = ItemOutcome::persisted(code.clone());

        let descriptors = match self
            .registry
            .fetch_document_metadata(code, &self.config.ingest.document_type)
            .await
        {
            Ok(descriptors) => descriptors,
            Err(e) => {
                tracing::warn!(code = %code, error = %e, "Document metadata fetch failed");
                outcome.documents_failed += 1;
                outcome.errors.push(
                    IngestError::new(IngestErrorType::Document, format!("metadata: {e}"))
                        .with_context(format!("code={code}")),
                );
                return outcome;
            }
        };

        let mut seen_ids = HashSet::new();
        for descriptor in &descriptors {
            if !seen_ids.insert(descriptor.document_id.clone()) {
                tracing::warn!(
                    code = %code,
                    document_id = %descriptor.document_id,
                    "Duplicate document id in metadata, skipping"
                );
                outcome.documents_skipped += 1;
                continue;
            }

            self.process_document(code, descriptor, &mut outcome).await;
            if outcome.fatal {
                break;
            }
        }

        outcome
    }

    /// Download one document and persist it
    async fn process_document(
        &self,
        code: &DrugCode,
        descriptor: &DocumentDescriptor,
        outcome: &mut ItemOutcome,
    ) {
        let bytes = match self.registry.fetch_document(descriptor).await {
            Ok(bytes) => bytes,
            Err(e @ RegistryError::OversizeDocument { .. }) => {
                tracing::warn!(
                    code = %code,
                    document_id = %descriptor.document_id,
                    error = %e,
                    "Skipping oversize document"
                );
                outcome.documents_skipped += 1;
                return;
            }
            Err(e) => {
                tracing::error!(
                    code = %code,
                    document_id = %descriptor.document_id,
                    error = %e,
                    "Document download failed"
                );
                outcome.documents_failed += 1;
                outcome.errors.push(
                    IngestError::new(IngestErrorType::Document, e.to_string()).with_context(
                        format!("code={code}, document_id={}", descriptor.document_id),
                    ),
                );
                return;
            }
        };

        let record = DocumentRecord::new(code.clone(), descriptor, bytes);
        match self.store.insert_document_if_absent(&record).await {
            Ok(DocumentInsert::Inserted) => outcome.documents_persisted += 1,
            Ok(DocumentInsert::AlreadyPresent) => outcome.documents_skipped += 1,
            Err(e) => {
                let fatal = e.is_connection_loss();
                tracing::error!(
                    code = %code,
                    document_id = %descriptor.document_id,
                    error = %e,
                    fatal = fatal,
                    "Document persistence failed"
                );
                outcome.documents_failed += 1;
                outcome.errors.push(
                    IngestError::new(IngestErrorType::Storage, e.to_string()).with_context(
                        format!("code={code}, document_id={}", descriptor.document_id),
                    ),
                );
                if fatal {
                    outcome.fatal = true;
                }
            }
        }
    }
}
