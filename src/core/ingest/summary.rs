//! Ingest run summary and reporting
//!
//! The summary owns every run-level counter; there is no global mutable
//! state. The coordinator feeds it `ItemOutcome` values and it reports the
//! final tallies that make a partial run auditable.

use crate::core::ingest::outcome::{ItemOutcome, ItemStatus};
use std::time::Duration;

/// Run phases of the ingestion state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// Validating configuration and connecting to collaborators
    Initializing,
    /// Retrieving the catalog of item codes
    FetchingCatalog,
    /// Iterating items
    ProcessingItems,
    /// Computing and emitting the final report
    Summarizing,
    /// Run completed
    Done,
    /// Run aborted: catalog unavailable or persistence connection lost
    Aborted,
}

impl RunPhase {
    /// Phase name for structured logging
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Initializing => "initializing",
            RunPhase::FetchingCatalog => "fetching_catalog",
            RunPhase::ProcessingItems => "processing_items",
            RunPhase::Summarizing => "summarizing",
            RunPhase::Done => "done",
            RunPhase::Aborted => "aborted",
        }
    }
}

/// Summary of an ingestion run
#[derive(Debug, Clone)]
pub struct IngestSummary {
    /// Number of codes the catalog returned (before any cap)
    pub catalog_size: usize,

    /// Items the pipeline attempted
    pub items_processed: usize,

    /// Items whose drug row was written
    pub items_persisted: usize,

    /// Items skipped (not found upstream, unusable payload)
    pub items_skipped: usize,

    /// Items that failed
    pub items_failed: usize,

    /// Documents written
    pub documents_persisted: usize,

    /// Documents skipped (already stored, duplicate id, oversize)
    pub documents_skipped: usize,

    /// Documents that failed
    pub documents_failed: usize,

    /// Duration of the run
    pub duration: Duration,

    /// Whether an operator shutdown interrupted the run
    pub interrupted: bool,

    /// Terminal phase (Done or Aborted)
    pub phase: RunPhase,

    /// Errors encountered during the run
    pub errors: Vec<IngestError>,
}

impl IngestSummary {
    /// Create a new empty summary
    pub fn new() -> Self {
        Self {
            catalog_size: 0,
            items_processed: 0,
            items_persisted: 0,
            items_skipped: 0,
            items_failed: 0,
            documents_persisted: 0,
            documents_skipped: 0,
            documents_failed: 0,
            duration: Duration::from_secs(0),
            interrupted: false,
            phase: RunPhase::Initializing,
            errors: Vec::new(),
        }
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Add an error
    pub fn add_error(&mut self, error: IngestError) {
        self.errors.push(error);
    }

    /// Fold one item outcome into the counters
    pub fn record_item(&mut self, outcome: &ItemOutcome) {
        self.items_processed += 1;
        match outcome.status {
            ItemStatus::Persisted => self.items_persisted += 1,
            ItemStatus::Skipped(_) => self.items_skipped += 1,
            ItemStatus::Failed(_) => self.items_failed += 1,
        }
        self.documents_persisted += outcome.documents_persisted;
        self.documents_skipped += outcome.documents_skipped;
        self.documents_failed += outcome.documents_failed;
    }

    /// Whether the run aborted before completing the catalog
    pub fn is_aborted(&self) -> bool {
        self.phase == RunPhase::Aborted
    }

    /// Check if the run was fully successful
    pub fn is_successful(&self) -> bool {
        !self.is_aborted()
            && !self.interrupted
            && self.items_failed == 0
            && self.documents_failed == 0
            && self.errors.is_empty()
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            phase = self.phase.as_str(),
            catalog_size = self.catalog_size,
            items_processed = self.items_processed,
            items_persisted = self.items_persisted,
            items_skipped = self.items_skipped,
            items_failed = self.items_failed,
            documents_persisted = self.documents_persisted,
            documents_skipped = self.documents_skipped,
            documents_failed = self.documents_failed,
            interrupted = self.interrupted,
            duration_secs = self.duration.as_secs(),
            "Ingest completed"
        );

        if !self.errors.is_empty() {
            tracing::warn!(
                error_count = self.errors.len(),
                "Ingest completed with errors"
            );
            for error in &self.errors {
                tracing::warn!(
                    error_type = ?error.error_type,
                    message = %error.message,
                    context = error.context.as_deref().unwrap_or(""),
                    "Ingest error"
                );
            }
        }
    }
}

impl Default for IngestSummary {
    fn default() -> Self {
        Self::new()
    }
}

/// Type of ingest error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestErrorType {
    /// Catalog fetch failure (fatal)
    Catalog,
    /// Per-item detail failure
    Detail,
    /// Per-document failure
    Document,
    /// Storage failure
    Storage,
    /// Configuration error
    Configuration,
    /// Unknown error
    Unknown,
}

/// Ingest error with context
#[derive(Debug, Clone)]
pub struct IngestError {
    /// Type of error
    pub error_type: IngestErrorType,

    /// Error message
    pub message: String,

    /// Optional context (e.g. drug code, document id)
    pub context: Option<String>,
}

impl IngestError {
    /// Create a new ingest error
    pub fn new(error_type: IngestErrorType, message: impl Into<String>) -> Self {
        Self {
            error_type,
            message: message.into(),
            context: None,
        }
    }

    /// Add context to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}
