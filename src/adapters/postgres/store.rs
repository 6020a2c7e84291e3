//! Drug and document persistence
//!
//! The persistence gateway: the only component that touches the relational
//! store. Writes are single statements, so each record is committed
//! atomically. Drug rows are upserted (a rerun overwrites with identical
//! data); document rows are insert-only with conflict suppression so reruns
//! never duplicate a `(drug_code, document_id)` pair.

use crate::adapters::postgres::client::PostgresClient;
use crate::domain::errors::DatabaseError;
use crate::domain::{DocumentRecord, DrugRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Outcome of a conditional document insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentInsert {
    /// A new row was written
    Inserted,
    /// The `(drug_code, document_id)` pair already existed; nothing written
    AlreadyPresent,
}

/// Storage interface for the ingestion pipeline
///
/// The coordinator depends on this trait rather than on the PostgreSQL
/// implementation so the per-item control flow can be exercised against
/// in-memory doubles.
#[async_trait]
pub trait DrugStore: Send + Sync {
    /// Inserts or fully overwrites the drug row keyed by its code
    ///
    /// Idempotent: repeated application with the same input yields the same
    /// stored state. Must succeed before any document for the code is
    /// attempted.
    async fn upsert_drug(&self, record: &DrugRecord) -> Result<(), DatabaseError>;

    /// Inserts a document row unless the `(drug_code, document_id)` pair
    /// already exists
    ///
    /// An existing pair is a no-op success, which is what makes interrupted
    /// runs resumable without duplication.
    async fn insert_document_if_absent(
        &self,
        record: &DocumentRecord,
    ) -> Result<DocumentInsert, DatabaseError>;
}

/// Row counts and sizes reported by the status command
#[derive(Debug, Clone)]
pub struct StoreCounts {
    /// Rows in the drugs table
    pub drugs: i64,
    /// Rows in the documents table
    pub documents: i64,
    /// Sum of stored document sizes in bytes
    pub total_pdf_bytes: i64,
    /// Most recent document insertion time
    pub last_document_at: Option<DateTime<Utc>>,
}

/// PostgreSQL implementation of [`DrugStore`]
pub struct PostgresStore {
    client: Arc<PostgresClient>,
}

impl PostgresStore {
    /// Create a new store over a shared client
    pub fn new(client: Arc<PostgresClient>) -> Self {
        Self { client }
    }

    /// Get a reference to the underlying client
    pub fn client(&self) -> &Arc<PostgresClient> {
        &self.client
    }

    /// Current row counts, used by the status command
    pub async fn counts(&self) -> Result<StoreCounts, DatabaseError> {
        let rows = self
            .client
            .query(
                r#"
                SELECT
                    (SELECT COUNT(*) FROM drugs) AS drugs,
                    (SELECT COUNT(*) FROM documents) AS documents,
                    (SELECT COALESCE(SUM(pdf_size), 0) FROM documents) AS total_pdf_bytes,
                    (SELECT MAX(created_at) FROM documents) AS last_document_at
                "#,
                &[],
            )
            .await?;

        let row = rows
            .first()
            .ok_or_else(|| DatabaseError::Query("counts query returned no rows".to_string()))?;

        Ok(StoreCounts {
            drugs: row.get("drugs"),
            documents: row.get("documents"),
            total_pdf_bytes: row.get("total_pdf_bytes"),
            last_document_at: row.get("last_document_at"),
        })
    }
}

#[async_trait]
impl DrugStore for PostgresStore {
    async fn upsert_drug(&self, record: &DrugRecord) -> Result<(), DatabaseError> {
        let upsert_query = r#"
            INSERT INTO drugs (
                code, name, strength, dosage_form, package_size,
                administration_route, supplement, container_type,
                marketing_holder, holder_country, registration_status,
                atc_code, registration_number, ddd_amount, ddd_unit,
                ddd_per_package, dispensing_mode, shelf_life, shelf_life_unit,
                registered_name, safety_features, package_language,
                registration_date
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23
            )
            ON CONFLICT (code) DO UPDATE SET
                name = EXCLUDED.name,
                strength = EXCLUDED.strength,
                dosage_form = EXCLUDED.dosage_form,
                package_size = EXCLUDED.package_size,
                administration_route = EXCLUDED.administration_route,
                supplement = EXCLUDED.supplement,
                container_type = EXCLUDED.container_type,
                marketing_holder = EXCLUDED.marketing_holder,
                holder_country = EXCLUDED.holder_country,
                registration_status = EXCLUDED.registration_status,
                atc_code = EXCLUDED.atc_code,
                registration_number = EXCLUDED.registration_number,
                ddd_amount = EXCLUDED.ddd_amount,
                ddd_unit = EXCLUDED.ddd_unit,
                ddd_per_package = EXCLUDED.ddd_per_package,
                dispensing_mode = EXCLUDED.dispensing_mode,
                shelf_life = EXCLUDED.shelf_life,
                shelf_life_unit = EXCLUDED.shelf_life_unit,
                registered_name = EXCLUDED.registered_name,
                safety_features = EXCLUDED.safety_features,
                package_language = EXCLUDED.package_language,
                registration_date = EXCLUDED.registration_date
        "#;

        self.client
            .execute(
                upsert_query,
                &[
                    &record.code,
                    &record.name,
                    &record.strength,
                    &record.dosage_form,
                    &record.package_size,
                    &record.administration_route,
                    &record.supplement,
                    &record.container_type,
                    &record.marketing_holder,
                    &record.holder_country,
                    &record.registration_status,
                    &record.atc_code,
                    &record.registration_number,
                    &record.ddd_amount,
                    &record.ddd_unit,
                    &record.ddd_per_package,
                    &record.dispensing_mode,
                    &record.shelf_life,
                    &record.shelf_life_unit,
                    &record.registered_name,
                    &record.safety_features,
                    &record.package_language,
                    &record.registration_date,
                ],
            )
            .await?;

        tracing::debug!(code = %record.code, "Drug row upserted");
        Ok(())
    }

    async fn insert_document_if_absent(
        &self,
        record: &DocumentRecord,
    ) -> Result<DocumentInsert, DatabaseError> {
        let insert_query = r#"
            INSERT INTO documents (
                drug_code, document_id, doc_type, file_name, pdf_data, pdf_size
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (drug_code, document_id) DO NOTHING
        "#;

        let affected = self
            .client
            .execute(
                insert_query,
                &[
                    &record.drug_code.as_str(),
                    &record.document_id.as_str(),
                    &record.doc_type,
                    &record.file_name,
                    &record.pdf_data,
                    &record.pdf_size(),
                ],
            )
            .await?;

        if affected == 0 {
            tracing::debug!(
                code = %record.drug_code,
                document_id = %record.document_id,
                "Document row already present"
            );
            Ok(DocumentInsert::AlreadyPresent)
        } else {
            tracing::debug!(
                code = %record.drug_code,
                document_id = %record.document_id,
                pdf_size = record.pdf_size(),
                "Document row inserted"
            );
            Ok(DocumentInsert::Inserted)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_insert_outcomes_compare() {
        assert_eq!(DocumentInsert::Inserted, DocumentInsert::Inserted);
        assert_ne!(DocumentInsert::Inserted, DocumentInsert::AlreadyPresent);
    }
}
