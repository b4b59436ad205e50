//! Service error types
//!
//! Errors returned by the use cases and the publication engine. Each
//! kind maps to the HTTP status a calling layer would answer with.

use std::fmt::Display;

use thiserror::Error;

use crate::domain::DomainError;

/// Errors raised by dataset operations
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A gating condition is not met; retrying needs user action
    #[error("{0}")]
    PreconditionFailed(String),

    /// Referenced record does not exist (or is soft-deleted)
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of record
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// The request itself is invalid
    #[error("Bad input: {0}")]
    BadInput(String),

    /// The deposit service failed or answered unexpectedly
    #[error("Deposit service error: {0:#}")]
    RemoteService(anyhow::Error),

    /// A conditional write lost against a concurrent one
    #[error("Concurrent update: {0}")]
    ConcurrentUpdate(String),

    /// Derived geometry could not be computed
    #[error("Geometry computation failed: {0}")]
    Geometry(String),

    /// Storage backend failure
    #[error("Storage error: {0:#}")]
    Storage(anyhow::Error),

    /// Domain validation failure
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl ServiceError {
    /// Builds a `NotFound` error
    pub fn not_found(entity: &'static str, id: impl Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// HTTP status a calling layer should answer with
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::PreconditionFailed(_) => 412,
            ServiceError::NotFound { .. } => 404,
            ServiceError::BadInput(_) | ServiceError::Domain(_) => 400,
            ServiceError::RemoteService(_) => 502,
            ServiceError::ConcurrentUpdate(_) => 409,
            ServiceError::Geometry(_) => 422,
            ServiceError::Storage(_) => 500,
        }
    }

    /// Returns true for precondition failures
    pub fn is_precondition_failed(&self) -> bool {
        matches!(self, ServiceError::PreconditionFailed(_))
    }
}

/// Result alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;
