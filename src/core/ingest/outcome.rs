//! Per-item processing outcomes
//!
//! Each catalog item produces one `ItemOutcome`, the immutable result
//! message the coordinator aggregates into the run summary. In the pooled
//! variant these are the only values that cross worker boundaries; counters
//! are never shared.

use crate::core::ingest::summary::IngestError;
use crate::domain::DrugCode;

/// Terminal status of one item's detail-and-persist step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemStatus {
    /// Drug row written (inserted or overwritten)
    Persisted,
    /// Item skipped: not found upstream or payload unusable
    Skipped(String),
    /// Item failed: retries exhausted or storage error
    Failed(String),
}

/// Result of processing one catalog item
#[derive(Debug, Clone)]
pub struct ItemOutcome {
    /// The item's registry code
    pub code: DrugCode,

    /// Status of the drug record itself
    pub status: ItemStatus,

    /// Documents written for this item
    pub documents_persisted: usize,

    /// Documents skipped (already stored, duplicate id, oversize)
    pub documents_skipped: usize,

    /// Documents that failed download or persistence
    pub documents_failed: usize,

    /// Errors worth surfacing in the run summary
    pub errors: Vec<IngestError>,

    /// Set when the failure means no further writes are possible
    /// (persistence connection loss); aborts the run
    pub fatal: bool,
}

impl ItemOutcome {
    /// Outcome for a persisted item, before document processing
    pub fn persisted(code: DrugCode) -> Self {
        Self::with_status(code, ItemStatus::Persisted)
    }

    /// Outcome for a skipped item
    pub fn skipped(code: DrugCode, reason: impl Into<String>) -> Self {
        Self::with_status(code, ItemStatus::Skipped(reason.into()))
    }

    /// Outcome for a failed item
    pub fn failed(code: DrugCode, reason: impl Into<String>) -> Self {
        Self::with_status(code, ItemStatus::Failed(reason.into()))
    }

    fn with_status(code: DrugCode, status: ItemStatus) -> Self {
        Self {
            code,
            status,
            documents_persisted: 0,
            documents_skipped: 0,
            documents_failed: 0,
            errors: Vec::new(),
            fatal: false,
        }
    }

    /// Marks the outcome as run-fatal
    pub fn fatal(mut self) -> Self {
        self.fatal = true;
        self
    }

    /// Short status label for progress logging
    pub fn status_label(&self) -> &'static str {
        match self.status {
            ItemStatus::Persisted => "persisted",
            ItemStatus::Skipped(_) => "skipped",
            ItemStatus::Failed(_) => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code() -> DrugCode {
        DrugCode::new("0094156").unwrap()
    }

    #[test]
    fn test_constructors_set_status() {
        assert_eq!(ItemOutcome::persisted(code()).status, ItemStatus::Persisted);
        assert!(matches!(
            ItemOutcome::skipped(code(), "not found").status,
            ItemStatus::Skipped(_)
        ));
        assert!(matches!(
            ItemOutcome::failed(code(), "timeout").status,
            ItemStatus::Failed(_)
        ));
    }

    #[test]
    fn test_fatal_flag() {
        let outcome = ItemOutcome::failed(code(), "connection lost").fatal();
        assert!(outcome.fatal);
        assert!(!ItemOutcome::failed(code(), "other").fatal);
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(ItemOutcome::persisted(code()).status_label(), "persisted");
        assert_eq!(ItemOutcome::skipped(code(), "x").status_label(), "skipped");
        assert_eq!(ItemOutcome::failed(code(), "x").status_label(), "failed");
    }
}
