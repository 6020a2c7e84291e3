//! Drug record domain model
//!
//! One `DrugRecord` corresponds to one row in the `drugs` table. The
//! attribute set is fixed and mirrors the upstream detail payload; every
//! attribute is stored as text because the registry serves a stringly-typed
//! payload (numeric-looking fields arrive as strings or numbers
//! interchangeably between reporting periods).

use crate::domain::ids::DrugCode;

/// Full metadata for one registry item
///
/// A record is only ever written as a whole (single-statement upsert), so a
/// stored row is either absent or fully populated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrugRecord {
    /// Registry code, primary key in storage
    pub code: String,
    pub name: String,
    pub strength: String,
    pub dosage_form: String,
    pub package_size: String,
    pub administration_route: String,
    pub supplement: String,
    pub container_type: String,
    pub marketing_holder: String,
    pub holder_country: String,
    pub registration_status: String,
    pub atc_code: String,
    pub registration_number: String,
    pub ddd_amount: String,
    pub ddd_unit: String,
    pub ddd_per_package: String,
    pub dispensing_mode: String,
    pub shelf_life: String,
    pub shelf_life_unit: String,
    pub registered_name: String,
    pub safety_features: String,
    pub package_language: String,
    pub registration_date: String,
}

impl DrugRecord {
    /// Returns the typed code for this record
    ///
    /// # Errors
    ///
    /// Returns an error if the stored code is not a valid [`DrugCode`].
    pub fn drug_code(&self) -> Result<DrugCode, String> {
        DrugCode::new(self.code.clone())
    }
}
