//! balsync Depot - Deposit API client
//!
//! Provides an async client for the national deposit service ("API de
//! dépôt"), which owns habilitations and publishes the revisions of each
//! commune's address file.
//!
//! ## Modules
//!
//! - [`client`] - HTTP client and wire types
//! - [`provider`] - `IDepositClient` implementation on top of the client

pub mod client;
pub mod provider;

pub use client::DepotClient;
pub use provider::DepotDepositClient;

use thiserror::Error;

/// Errors that can occur when communicating with the deposit service
#[derive(Debug, Error)]
pub enum DepotError {
    /// The token is missing, invalid or lacks the required rights
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The request was rejected (4xx other than 401/403/404)
    #[error("Request rejected ({status}): {message}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Response body, if any
        message: String,
    },

    /// A server-side error occurred (5xx)
    #[error("Server error ({status}): {message}")]
    ServerError {
        /// HTTP status code
        status: u16,
        /// Response body, if any
        message: String,
    },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}
