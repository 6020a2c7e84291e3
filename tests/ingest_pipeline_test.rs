//! Pipeline integration tests
//!
//! Drives the coordinator against in-memory registry and store doubles to
//! exercise the run-level properties: fault isolation, cap correctness,
//! rerun idempotence, resumability, write ordering, and abort behavior.

use async_trait::async_trait;
use medreg::adapters::postgres::{DocumentInsert, DrugStore};
use medreg::adapters::registry::RegistrySource;
use medreg::config::{
    secret_string, ApplicationConfig, Environment, IngestConfig, LoggingConfig, MedregConfig,
    PostgreSQLConfig, RegistryConfig,
};
use medreg::core::ingest::{IngestCoordinator, RunPhase};
use medreg::domain::errors::{DatabaseError, RegistryError};
use medreg::domain::{DocumentDescriptor, DocumentId, DocumentRecord, DrugCode, DrugRecord};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// In-memory registry double
#[derive(Default)]
struct MockRegistry {
    catalog: Vec<String>,
    fail_catalog: bool,
    not_found: HashSet<String>,
    fail_detail: HashSet<String>,
    documents: HashMap<String, Vec<DocumentDescriptor>>,
    binaries: HashMap<String, Vec<u8>>,
    fail_binaries: HashSet<String>,
}

impl MockRegistry {
    fn with_catalog(codes: &[&str]) -> Self {
        Self {
            catalog: codes.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        }
    }

    fn add_document(&mut self, code: &str, document_id: &str, content: Vec<u8>) {
        self.documents
            .entry(code.to_string())
            .or_default()
            .push(descriptor(document_id));
        self.binaries.insert(document_id.to_string(), content);
    }
}

#[async_trait]
impl RegistrySource for MockRegistry {
    async fn fetch_catalog(
        &self,
        _period: &str,
        _page_size: usize,
    ) -> Result<Vec<DrugCode>, RegistryError> {
        if self.fail_catalog {
            return Err(RegistryError::ServerError {
                status: 503,
                message: "simulated outage".to_string(),
            });
        }
        Ok(self
            .catalog
            .iter()
            .map(|c| DrugCode::new(c.clone()).unwrap())
            .collect())
    }

    async fn fetch_detail(&self, code: &DrugCode) -> Result<DrugRecord, RegistryError> {
        if self.fail_detail.contains(code.as_str()) {
            return Err(RegistryError::Timeout("simulated timeout".to_string()));
        }
        if self.not_found.contains(code.as_str()) {
            return Err(RegistryError::NotFound(code.to_string()));
        }
        Ok(DrugRecord {
            code: code.as_str().to_string(),
            name: format!("DRUG {code}"),
            atc_code: "N02BE01".to_string(),
            ..Default::default()
        })
    }

    async fn fetch_document_metadata(
        &self,
        code: &DrugCode,
        _doc_type: &str,
    ) -> Result<Vec<DocumentDescriptor>, RegistryError> {
        Ok(self.documents.get(code.as_str()).cloned().unwrap_or_default())
    }

    async fn fetch_document(
        &self,
        descriptor: &DocumentDescriptor,
    ) -> Result<Vec<u8>, RegistryError> {
        let id = descriptor.document_id.as_str();
        if self.fail_binaries.contains(id) {
            return Err(RegistryError::Timeout("simulated timeout".to_string()));
        }
        self.binaries
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }
}

/// In-memory store double enforcing the same constraints as the schema
#[derive(Default)]
struct MemoryStore {
    drugs: Mutex<BTreeMap<String, DrugRecord>>,
    documents: Mutex<BTreeMap<(String, String), Vec<u8>>>,
    drug_upserts: AtomicUsize,
    fail_drug_upserts_after: Option<usize>,
    violations: Mutex<Vec<String>>,
}

impl MemoryStore {
    fn drug_count(&self) -> usize {
        self.drugs.lock().unwrap().len()
    }

    fn document_count(&self) -> usize {
        self.documents.lock().unwrap().len()
    }

    fn document_size(&self, code: &str, document_id: &str) -> Option<usize> {
        self.documents
            .lock()
            .unwrap()
            .get(&(code.to_string(), document_id.to_string()))
            .map(|content| content.len())
    }

    fn seed_drug(&self, code: &str) {
        self.drugs.lock().unwrap().insert(
            code.to_string(),
            DrugRecord {
                code: code.to_string(),
                name: format!("DRUG {code}"),
                ..Default::default()
            },
        );
    }

    fn seed_document(&self, code: &str, document_id: &str, content: Vec<u8>) {
        self.documents
            .lock()
            .unwrap()
            .insert((code.to_string(), document_id.to_string()), content);
    }
}

#[async_trait]
impl DrugStore for MemoryStore {
    async fn upsert_drug(&self, record: &DrugRecord) -> Result<(), DatabaseError> {
        let n = self.drug_upserts.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = self.fail_drug_upserts_after {
            if n >= limit {
                return Err(DatabaseError::ConnectionLost(
                    "simulated connection loss".to_string(),
                ));
            }
        }
        self.drugs
            .lock()
            .unwrap()
            .insert(record.code.clone(), record.clone());
        Ok(())
    }

    async fn insert_document_if_absent(
        &self,
        record: &DocumentRecord,
    ) -> Result<DocumentInsert, DatabaseError> {
        // Mirrors the foreign key: the owning drug row must exist first
        if !self
            .drugs
            .lock()
            .unwrap()
            .contains_key(record.drug_code.as_str())
        {
            self.violations.lock().unwrap().push(format!(
                "document {} references missing drug {}",
                record.document_id, record.drug_code
            ));
            return Err(DatabaseError::Query(
                "foreign key violation".to_string(),
            ));
        }

        let key = (
            record.drug_code.as_str().to_string(),
            record.document_id.as_str().to_string(),
        );
        let mut documents = self.documents.lock().unwrap();
        if documents.contains_key(&key) {
            Ok(DocumentInsert::AlreadyPresent)
        } else {
            documents.insert(key, record.pdf_data.clone());
            Ok(DocumentInsert::Inserted)
        }
    }
}

fn descriptor(document_id: &str) -> DocumentDescriptor {
    DocumentDescriptor {
        document_id: DocumentId::new(document_id).unwrap(),
        file_name: format!("SPC_{document_id}.pdf"),
        doc_type: "spc".to_string(),
    }
}

fn test_config(item_limit: Option<usize>, parallel_items: usize) -> MedregConfig {
    MedregConfig {
        application: ApplicationConfig::default(),
        environment: Environment::Development,
        registry: RegistryConfig::default(),
        ingest: IngestConfig {
            period: "2025.07".to_string(),
            document_type: "spc".to_string(),
            item_limit,
            page_size: 500,
            parallel_items,
            min_request_interval_ms: 0,
            max_document_size_mb: 0,
        },
        postgresql: PostgreSQLConfig {
            connection_string: secret_string(
                "postgresql://medreg:pw@localhost:5432/medreg".to_string(),
            ),
            max_connections: 10,
            connection_timeout_seconds: 30,
            statement_timeout_seconds: 60,
            ssl_mode: "prefer".to_string(),
        },
        logging: LoggingConfig::default(),
    }
}

async fn run(
    registry: Arc<MockRegistry>,
    store: Arc<MemoryStore>,
    config: MedregConfig,
) -> medreg::core::ingest::IngestSummary {
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    IngestCoordinator::with_components(config, registry, store, shutdown_rx)
        .execute_ingest()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_example_scenario() {
    // Two items; the first has one matching document, the second none
    let mut registry = MockRegistry::with_catalog(&["0094156", "0012345"]);
    registry.add_document("0094156", "175233", vec![0u8; 245_760]);
    let registry = Arc::new(registry);
    let store = Arc::new(MemoryStore::default());

    let summary = run(registry, store.clone(), test_config(None, 1)).await;

    assert_eq!(summary.phase, RunPhase::Done);
    assert_eq!(summary.items_processed, 2);
    assert_eq!(summary.items_persisted, 2);
    assert_eq!(summary.items_skipped, 0);
    assert_eq!(summary.documents_persisted, 1);
    assert_eq!(summary.documents_skipped, 0);
    assert_eq!(summary.documents_failed, 0);
    assert!(summary.is_successful());

    assert_eq!(store.drug_count(), 2);
    assert_eq!(store.document_count(), 1);
    assert_eq!(store.document_size("0094156", "175233"), Some(245_760));
}

#[tokio::test]
async fn test_fault_isolation_one_failing_detail() {
    let mut registry = MockRegistry::with_catalog(&["0000001", "0000002", "0000003"]);
    registry.fail_detail.insert("0000002".to_string());
    let registry = Arc::new(registry);
    let store = Arc::new(MemoryStore::default());

    let summary = run(registry, store.clone(), test_config(None, 1)).await;

    assert_eq!(summary.phase, RunPhase::Done);
    assert_eq!(summary.items_processed, 3);
    assert_eq!(summary.items_persisted, 2);
    assert_eq!(summary.items_failed, 1);
    assert_eq!(store.drug_count(), 2);
}

#[tokio::test]
async fn test_not_found_item_is_skipped_not_failed() {
    let mut registry = MockRegistry::with_catalog(&["0000001", "0000002"]);
    registry.not_found.insert("0000001".to_string());
    let registry = Arc::new(registry);
    let store = Arc::new(MemoryStore::default());

    let summary = run(registry, store.clone(), test_config(None, 1)).await;

    assert_eq!(summary.items_skipped, 1);
    assert_eq!(summary.items_persisted, 1);
    assert_eq!(summary.items_failed, 0);
    assert_eq!(store.drug_count(), 1);
}

#[tokio::test]
async fn test_item_cap_limits_processing() {
    let registry = Arc::new(MockRegistry::with_catalog(&[
        "0000001", "0000002", "0000003", "0000004", "0000005",
    ]));
    let store = Arc::new(MemoryStore::default());

    let summary = run(registry, store.clone(), test_config(Some(2), 1)).await;

    assert_eq!(summary.catalog_size, 5);
    assert_eq!(summary.items_processed, 2);
    assert_eq!(store.drug_count(), 2);
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let mut registry = MockRegistry::with_catalog(&["0094156", "0012345"]);
    registry.add_document("0094156", "175233", vec![1u8; 1024]);
    let registry = Arc::new(registry);
    let store = Arc::new(MemoryStore::default());

    let first = run(registry.clone(), store.clone(), test_config(None, 1)).await;
    assert_eq!(first.documents_persisted, 1);

    let drugs_after_first = store.drug_count();
    let documents_after_first = store.document_count();

    let second = run(registry, store.clone(), test_config(None, 1)).await;

    // Same row counts, nothing re-inserted
    assert_eq!(store.drug_count(), drugs_after_first);
    assert_eq!(store.document_count(), documents_after_first);
    assert_eq!(second.items_persisted, 2);
    assert_eq!(second.documents_persisted, 0);
    assert_eq!(second.documents_skipped, 1);
}

#[tokio::test]
async fn test_resumability_fills_only_missing_documents() {
    let mut registry = MockRegistry::with_catalog(&["0000001", "0000002"]);
    registry.add_document("0000001", "doc-1", vec![1u8; 100]);
    registry.add_document("0000002", "doc-2", vec![2u8; 200]);
    let registry = Arc::new(registry);

    // Prior partial run persisted both drugs but only the first document
    let store = Arc::new(MemoryStore::default());
    store.seed_drug("0000001");
    store.seed_drug("0000002");
    store.seed_document("0000001", "doc-1", vec![1u8; 100]);

    let summary = run(registry, store.clone(), test_config(None, 1)).await;

    assert_eq!(summary.documents_persisted, 1);
    assert_eq!(summary.documents_skipped, 1);
    assert_eq!(store.document_count(), 2);
    assert_eq!(store.document_size("0000002", "doc-2"), Some(200));
}

#[tokio::test]
async fn test_drug_committed_before_documents() {
    let mut registry = MockRegistry::with_catalog(&["0094156"]);
    registry.add_document("0094156", "175233", vec![0u8; 64]);
    let registry = Arc::new(registry);
    let store = Arc::new(MemoryStore::default());

    run(registry, store.clone(), test_config(None, 1)).await;

    // The store records any document insert attempted before its drug row
    assert!(store.violations.lock().unwrap().is_empty());
    assert_eq!(store.document_count(), 1);
}

#[tokio::test]
async fn test_catalog_failure_aborts_run() {
    let mut registry = MockRegistry::with_catalog(&["0000001"]);
    registry.fail_catalog = true;
    let registry = Arc::new(registry);
    let store = Arc::new(MemoryStore::default());

    let summary = run(registry, store.clone(), test_config(None, 1)).await;

    assert_eq!(summary.phase, RunPhase::Aborted);
    assert_eq!(summary.items_processed, 0);
    assert_eq!(store.drug_count(), 0);
    assert!(!summary.errors.is_empty());
}

#[tokio::test]
async fn test_connection_loss_aborts_run() {
    let registry = Arc::new(MockRegistry::with_catalog(&[
        "0000001", "0000002", "0000003",
    ]));
    let store = Arc::new(MemoryStore {
        fail_drug_upserts_after: Some(1),
        ..Default::default()
    });

    let summary = run(registry, store.clone(), test_config(None, 1)).await;

    assert_eq!(summary.phase, RunPhase::Aborted);
    // First item persisted, second hit the dead connection, third never ran
    assert_eq!(summary.items_processed, 2);
    assert_eq!(summary.items_persisted, 1);
    assert_eq!(summary.items_failed, 1);
    assert_eq!(store.drug_count(), 1);
}

#[tokio::test]
async fn test_document_failure_does_not_affect_siblings() {
    let mut registry = MockRegistry::with_catalog(&["0094156"]);
    registry.add_document("0094156", "doc-bad", vec![0u8; 10]);
    registry.add_document("0094156", "doc-good", vec![0u8; 20]);
    registry.fail_binaries.insert("doc-bad".to_string());
    let registry = Arc::new(registry);
    let store = Arc::new(MemoryStore::default());

    let summary = run(registry, store.clone(), test_config(None, 1)).await;

    assert_eq!(summary.phase, RunPhase::Done);
    assert_eq!(summary.items_persisted, 1);
    assert_eq!(summary.documents_failed, 1);
    assert_eq!(summary.documents_persisted, 1);
    assert_eq!(store.document_size("0094156", "doc-good"), Some(20));
}

#[tokio::test]
async fn test_duplicate_document_ids_skipped() {
    let mut registry = MockRegistry::with_catalog(&["0094156"]);
    registry.add_document("0094156", "175233", vec![0u8; 32]);
    // Metadata repeats the same document id
    registry
        .documents
        .get_mut("0094156")
        .unwrap()
        .push(descriptor("175233"));
    let registry = Arc::new(registry);
    let store = Arc::new(MemoryStore::default());

    let summary = run(registry, store.clone(), test_config(None, 1)).await;

    assert_eq!(summary.documents_persisted, 1);
    assert_eq!(summary.documents_skipped, 1);
    assert_eq!(store.document_count(), 1);
}

#[tokio::test]
async fn test_pooled_run_processes_all_items() {
    let mut registry = MockRegistry::with_catalog(&[
        "0000001", "0000002", "0000003", "0000004", "0000005", "0000006",
    ]);
    registry.add_document("0000003", "doc-3", vec![0u8; 128]);
    let registry = Arc::new(registry);
    let store = Arc::new(MemoryStore::default());

    let summary = run(registry, store.clone(), test_config(None, 4)).await;

    assert_eq!(summary.phase, RunPhase::Done);
    assert_eq!(summary.items_processed, 6);
    assert_eq!(summary.items_persisted, 6);
    assert_eq!(summary.documents_persisted, 1);
    assert_eq!(store.drug_count(), 6);
    assert!(store.violations.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_shutdown_signal_stops_between_items() {
    let registry = Arc::new(MockRegistry::with_catalog(&["0000001", "0000002"]));
    let store = Arc::new(MemoryStore::default());

    // Signal shutdown before the run starts; no items should be processed
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    shutdown_tx.send(true).unwrap();

    let summary = IngestCoordinator::with_components(
        test_config(None, 1),
        registry,
        store.clone(),
        shutdown_rx,
    )
    .execute_ingest()
    .await
    .unwrap();

    assert!(summary.interrupted);
    assert_eq!(summary.items_processed, 0);
    assert_eq!(store.drug_count(), 0);
}
