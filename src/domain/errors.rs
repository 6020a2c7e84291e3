//! Domain error types
//!
//! This module defines the error hierarchy for Medreg. All errors are
//! domain-specific and don't expose third-party types; the registry and
//! database sub-enums carry the transient-versus-terminal classification the
//! pipeline's retry and abort policies are built on.

use thiserror::Error;

/// Main Medreg error type
///
/// This is the primary error type used throughout the application.
/// It wraps specific error types and provides context for error handling.
#[derive(Debug, Error)]
pub enum MedregError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Registry API errors
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Ingest process errors
    #[error("Ingest error: {0}")]
    Ingest(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// Registry-specific errors
///
/// Errors that occur when talking to the drug registry API. These don't
/// expose the HTTP client's types; the client maps transport failures into
/// this taxonomy at the boundary.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Failed to connect to the registry (connection reset, DNS, TLS)
    #[error("Failed to connect to registry: {0}")]
    ConnectionFailed(String),

    /// Request timed out
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Server error (5xx)
    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// Rate limit exceeded (429)
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Client error (4xx other than 404/429)
    #[error("Client error: {status} - {message}")]
    ClientError { status: u16, message: String },

    /// Item or document not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Response payload does not match the expected shape
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Response body could not be read or parsed
    #[error("Invalid response from registry: {0}")]
    InvalidResponse(String),

    /// Document download returned an empty body
    #[error("Empty document body for {0}")]
    EmptyDocument(String),

    /// Document download exceeded the configured size cap
    #[error("Document {document_id} is {size} bytes, over the {limit}-byte cap")]
    OversizeDocument {
        document_id: String,
        size: u64,
        limit: u64,
    },
}

impl RegistryError {
    /// Whether the failure is worth retrying
    ///
    /// Connection-level failures, timeouts, throttling, and 5xx responses
    /// are transient; everything else is terminal for the current unit of
    /// work and must not consume the retry budget.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RegistryError::ConnectionFailed(_)
                | RegistryError::Timeout(_)
                | RegistryError::ServerError { .. }
                | RegistryError::RateLimited(_)
        )
    }
}

/// Database-specific errors
///
/// Errors from the PostgreSQL persistence gateway. Connection loss is kept
/// distinct from statement failures because only connection loss aborts a
/// run; a failed statement fails just the item or document it was writing.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Could not obtain a connection from the pool
    #[error("Failed to get connection from pool: {0}")]
    Pool(String),

    /// The connection dropped mid-use
    #[error("Database connection lost: {0}")]
    ConnectionLost(String),

    /// A statement failed (constraint violation, bad data, lock timeout)
    #[error("Statement failed: {0}")]
    Query(String),

    /// Schema bootstrap failed
    #[error("Schema migration failed: {0}")]
    Schema(String),
}

impl DatabaseError {
    /// Whether the error means no further writes are possible
    pub fn is_connection_loss(&self) -> bool {
        matches!(
            self,
            DatabaseError::Pool(_) | DatabaseError::ConnectionLost(_)
        )
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for MedregError {
    fn from(err: std::io::Error) -> Self {
        MedregError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for MedregError {
    fn from(err: serde_json::Error) -> Self {
        MedregError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for MedregError {
    fn from(err: toml::de::Error) -> Self {
        MedregError::Configuration(format!("TOML parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_medreg_error_display() {
        let err = MedregError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_registry_error_conversion() {
        let reg_err = RegistryError::ConnectionFailed("Network error".to_string());
        let err: MedregError = reg_err.into();
        assert!(matches!(err, MedregError::Registry(_)));
    }

    #[test]
    fn test_database_error_conversion() {
        let db_err = DatabaseError::Query("duplicate key".to_string());
        let err: MedregError = db_err.into();
        assert!(matches!(err, MedregError::Database(_)));
    }

    #[test]
    fn test_transient_classification() {
        assert!(RegistryError::ConnectionFailed("reset".into()).is_transient());
        assert!(RegistryError::Timeout("30s".into()).is_transient());
        assert!(RegistryError::RateLimited("429".into()).is_transient());
        assert!(RegistryError::ServerError {
            status: 503,
            message: "unavailable".into()
        }
        .is_transient());

        assert!(!RegistryError::NotFound("0094156".into()).is_transient());
        assert!(!RegistryError::SchemaMismatch("missing code".into()).is_transient());
        assert!(!RegistryError::ClientError {
            status: 400,
            message: "bad request".into()
        }
        .is_transient());
        assert!(!RegistryError::EmptyDocument("doc-1".into()).is_transient());
    }

    #[test]
    fn test_connection_loss_classification() {
        assert!(DatabaseError::Pool("timed out".into()).is_connection_loss());
        assert!(DatabaseError::ConnectionLost("closed".into()).is_connection_loss());
        assert!(!DatabaseError::Query("syntax".into()).is_connection_loss());
        assert!(!DatabaseError::Schema("ddl".into()).is_connection_loss());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: MedregError = io_err.into();
        assert!(matches!(err, MedregError::Io(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: MedregError = json_err.into();
        assert!(matches!(err, MedregError::Serialization(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let err: MedregError = toml_err.into();
        assert!(matches!(err, MedregError::Configuration(_)));
        assert!(err.to_string().contains("TOML parse error"));
    }

    #[test]
    fn test_errors_implement_std_error() {
        let _: &dyn std::error::Error = &MedregError::Validation("x".to_string());
        let _: &dyn std::error::Error = &RegistryError::NotFound("x".to_string());
        let _: &dyn std::error::Error = &DatabaseError::Query("x".to_string());
    }
}
