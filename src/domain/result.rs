//! Result type alias for Medreg operations

use crate::domain::errors::MedregError;

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, MedregError>;
