//! Domain models and types for Medreg.
//!
//! This module contains the core domain models, types, and business rules.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`DrugCode`], [`DocumentId`])
//! - **Domain models** ([`DrugRecord`], [`DocumentDescriptor`], [`DocumentRecord`])
//! - **Error types** ([`MedregError`], [`RegistryError`], [`DatabaseError`])
//! - **Result type alias** ([`Result`])
//!
//! # Type Safety
//!
//! Medreg uses the newtype pattern for identifiers to prevent mixing
//! different ID types:
//!
//! ```rust
//! use medreg::domain::{DrugCode, DocumentId};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let code = DrugCode::new("0094156")?;
//! let document_id = DocumentId::new("SPC-175233")?;
//!
//! // This won't compile - type safety prevents mixing IDs
//! // let wrong: DrugCode = document_id;  // Compile error!
//! # Ok(())
//! # }
//! ```

pub mod document;
pub mod drug;
pub mod errors;
pub mod ids;
pub mod result;

// Re-export commonly used types for convenience
pub use document::{DocumentDescriptor, DocumentRecord};
pub use drug::DrugRecord;
pub use errors::{DatabaseError, MedregError, RegistryError};
pub use ids::{DocumentId, DrugCode};
pub use result::Result;
