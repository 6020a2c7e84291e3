//! Registry API wire models
//!
//! Payload structures for the registry's REST endpoints. The upstream is
//! stringly typed and inconsistent between reporting periods (numeric fields
//! arrive as strings or numbers interchangeably), so every scalar field is
//! deserialized through a coercing helper rather than a fixed type.

use crate::domain::{DocumentDescriptor, DocumentId, DrugRecord};
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

/// Coerces a scalar JSON value (string, number, bool, null) into a String
///
/// Arrays and objects are rejected; they indicate a payload shape change.
fn stringly<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(de::Error::custom(format!(
            "expected scalar value, got {other}"
        ))),
    }
}

/// Detail payload from `GET /items/{code}`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrugDetailPayload {
    #[serde(default, deserialize_with = "stringly")]
    pub code: String,
    #[serde(default, deserialize_with = "stringly")]
    pub name: String,
    #[serde(default, deserialize_with = "stringly")]
    pub strength: String,
    #[serde(default, deserialize_with = "stringly")]
    pub dosage_form: String,
    #[serde(default, deserialize_with = "stringly")]
    pub package_size: String,
    #[serde(default, deserialize_with = "stringly")]
    pub administration_route: String,
    #[serde(default, deserialize_with = "stringly")]
    pub supplement: String,
    #[serde(default, deserialize_with = "stringly")]
    pub container_type: String,
    #[serde(default, deserialize_with = "stringly")]
    pub marketing_holder: String,
    #[serde(default, deserialize_with = "stringly")]
    pub holder_country: String,
    #[serde(default, deserialize_with = "stringly")]
    pub registration_status: String,
    #[serde(default, deserialize_with = "stringly")]
    pub atc_code: String,
    #[serde(default, deserialize_with = "stringly")]
    pub registration_number: String,
    #[serde(default, deserialize_with = "stringly")]
    pub ddd_amount: String,
    #[serde(default, deserialize_with = "stringly")]
    pub ddd_unit: String,
    #[serde(default, deserialize_with = "stringly")]
    pub ddd_per_package: String,
    #[serde(default, deserialize_with = "stringly")]
    pub dispensing_mode: String,
    #[serde(default, deserialize_with = "stringly")]
    pub shelf_life: String,
    #[serde(default, deserialize_with = "stringly")]
    pub shelf_life_unit: String,
    #[serde(default, deserialize_with = "stringly")]
    pub registered_name: String,
    #[serde(default, deserialize_with = "stringly")]
    pub safety_features: String,
    #[serde(default, deserialize_with = "stringly")]
    pub package_language: String,
    #[serde(default, deserialize_with = "stringly")]
    pub registration_date: String,
}

impl DrugDetailPayload {
    /// Maps the payload onto a domain record
    ///
    /// # Errors
    ///
    /// Returns an error if the required `code` field is missing or empty.
    pub fn into_record(self) -> Result<DrugRecord, String> {
        if self.code.trim().is_empty() {
            return Err("detail payload is missing the 'code' field".to_string());
        }
        Ok(DrugRecord {
            code: self.code,
            name: self.name,
            strength: self.strength,
            dosage_form: self.dosage_form,
            package_size: self.package_size,
            administration_route: self.administration_route,
            supplement: self.supplement,
            container_type: self.container_type,
            marketing_holder: self.marketing_holder,
            holder_country: self.holder_country,
            registration_status: self.registration_status,
            atc_code: self.atc_code,
            registration_number: self.registration_number,
            ddd_amount: self.ddd_amount,
            ddd_unit: self.ddd_unit,
            ddd_per_package: self.ddd_per_package,
            dispensing_mode: self.dispensing_mode,
            shelf_life: self.shelf_life,
            shelf_life_unit: self.shelf_life_unit,
            registered_name: self.registered_name,
            safety_features: self.safety_features,
            package_language: self.package_language,
            registration_date: self.registration_date,
        })
    }
}

/// One entry from `GET /documents-metadata/{code}`
///
/// The endpoint returns either a list or, for items with a single document,
/// a bare object; the client normalizes both into a list of these.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadataPayload {
    #[serde(default, deserialize_with = "stringly")]
    pub id: String,
    #[serde(default, deserialize_with = "stringly")]
    pub file_name: String,
    #[serde(default, rename = "type", deserialize_with = "stringly")]
    pub doc_type: String,
}

impl DocumentMetadataPayload {
    /// Maps the payload onto a descriptor
    ///
    /// A missing `type` falls back to the requested document type; a missing
    /// file name falls back to `{type}_{id}.pdf`.
    ///
    /// # Errors
    ///
    /// Returns an error if the document id is missing or invalid.
    pub fn into_descriptor(self, requested_type: &str) -> Result<DocumentDescriptor, String> {
        let document_id = DocumentId::new(self.id)?;
        let doc_type = if self.doc_type.is_empty() {
            requested_type.to_string()
        } else {
            self.doc_type
        };
        let file_name = if self.file_name.is_empty() {
            format!("{}_{}.pdf", doc_type.to_uppercase(), document_id)
        } else {
            self.file_name
        };
        Ok(DocumentDescriptor {
            document_id,
            file_name,
            doc_type,
        })
    }
}
