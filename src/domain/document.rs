//! Document domain models
//!
//! `DocumentDescriptor` is the transient metadata returned by the registry's
//! document-metadata endpoint; `DocumentRecord` is the downloaded document as
//! written to the `documents` table. Records are immutable once stored: the
//! pipeline inserts them at most once per `(drug code, document id)` pair and
//! never updates or deletes them.

use crate::domain::ids::{DocumentId, DrugCode};

/// Metadata describing one downloadable regulatory document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentDescriptor {
    /// Document identifier, scoped per item by the registry
    pub document_id: DocumentId,

    /// Source file name as reported by the registry (e.g. `SPC_0094156.pdf`)
    pub file_name: String,

    /// Document type tag (e.g. `spc`)
    pub doc_type: String,
}

/// A downloaded document ready for persistence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRecord {
    /// Owning drug code (foreign key to the drugs table)
    pub drug_code: DrugCode,

    /// Document identifier
    pub document_id: DocumentId,

    /// Document type tag
    pub doc_type: String,

    /// Source file name
    pub file_name: String,

    /// Raw binary content
    pub pdf_data: Vec<u8>,
}

impl DocumentRecord {
    /// Builds a record from a descriptor and downloaded content
    pub fn new(drug_code: DrugCode, descriptor: &DocumentDescriptor, pdf_data: Vec<u8>) -> Self {
        Self {
            drug_code,
            document_id: descriptor.document_id.clone(),
            doc_type: descriptor.doc_type.clone(),
            file_name: descriptor.file_name.clone(),
            pdf_data,
        }
    }

    /// Byte length of the stored content
    ///
    /// Persisted alongside the content so downstream consumers can size
    /// results without fetching the blob.
    pub fn pdf_size(&self) -> i32 {
        self.pdf_data.len() as i32
    }
}
