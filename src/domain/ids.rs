//! Domain identifier types with validation
//!
//! Newtype wrappers for the registry identifiers. Each type ensures type
//! safety (a drug code can never be passed where a document id is expected)
//! and validates basic format constraints on construction.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum length of a registry drug code (schema: VARCHAR(20))
const MAX_DRUG_CODE_LEN: usize = 20;

/// Maximum length of a document identifier (schema: VARCHAR(64))
const MAX_DOCUMENT_ID_LEN: usize = 64;

/// Drug code newtype wrapper
///
/// Represents the registry's unique code for one medicinal product.
/// Typically a zero-padded numeric string such as `"0094156"`, but the
/// registry treats it as opaque and so does Medreg.
///
/// # Examples
///
/// ```
/// use medreg::domain::ids::DrugCode;
/// use std::str::FromStr;
///
/// let code = DrugCode::from_str("0094156").unwrap();
/// assert_eq!(code.as_str(), "0094156");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DrugCode(String);

impl DrugCode {
    /// Creates a new DrugCode from a string
    ///
    /// # Errors
    ///
    /// Returns an error if the code is empty, contains whitespace, or
    /// exceeds the stored column width.
    pub fn new(code: impl Into<String>) -> Result<Self, String> {
        let code = code.into();
        if code.trim().is_empty() {
            return Err("Drug code cannot be empty".to_string());
        }
        if code.len() > MAX_DRUG_CODE_LEN {
            return Err(format!(
                "Drug code exceeds {MAX_DRUG_CODE_LEN} characters: {code}"
            ));
        }
        if code.chars().any(char::is_whitespace) {
            return Err(format!("Drug code cannot contain whitespace: {code:?}"));
        }
        Ok(Self(code))
    }

    /// Returns the code as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for DrugCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DrugCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for DrugCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Document identifier newtype wrapper
///
/// Identifies one regulatory document within the registry. The API scopes
/// these per item, which is why uniqueness in storage is enforced on the
/// `(drug code, document id)` pair rather than on the id alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(String);

impl DocumentId {
    /// Creates a new DocumentId from a string
    ///
    /// # Errors
    ///
    /// Returns an error if the id is empty or exceeds the stored column width.
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Document id cannot be empty".to_string());
        }
        if id.len() > MAX_DOCUMENT_ID_LEN {
            return Err(format!(
                "Document id exceeds {MAX_DOCUMENT_ID_LEN} characters: {id}"
            ));
        }
        Ok(Self(id))
    }

    /// Returns the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DocumentId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for DocumentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
