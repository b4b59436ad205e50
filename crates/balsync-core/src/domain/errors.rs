//! Domain error types
//!
//! Validation failures raised while constructing domain values
//! (identifiers, commune codes, emails, positions) and invalid
//! status transitions on datasets.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    /// Invalid INSEE commune code
    #[error("Invalid commune code: {0}")]
    InvalidCommune(String),

    /// Invalid email address format
    #[error("Invalid email format: {0}")]
    InvalidEmail(String),

    /// Invalid content hash (expected lowercase hex SHA-256)
    #[error("Invalid hash format: {0}")]
    InvalidHash(String),

    /// Coordinates outside of the WGS84 range
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    /// Unknown enumeration value read from storage or the wire
    #[error("Unknown {kind} value: {value}")]
    UnknownValue {
        /// Name of the enumeration
        kind: &'static str,
        /// The rejected value
        value: String,
    },

    /// Invalid state transition attempt
    #[error("Invalid state transition from {from} to {to}")]
    InvalidState {
        /// The current state
        from: String,
        /// The attempted target state
        to: String,
    },

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
