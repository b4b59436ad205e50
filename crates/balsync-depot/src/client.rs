//! Deposit API HTTP client
//!
//! Typed access to the deposit service endpoints used for publication.
//! Handles the token header, JSON (de)serialization and status mapping.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use balsync_depot::client::DepotClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = DepotClient::new(Some("api-token".to_string()));
//! if let Some(revision) = client.get_current_revision("54084").await? {
//!     println!("current revision: {}", revision.id);
//! }
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::DepotError;

/// Production base URL of the deposit service
pub const DEPOT_BASE_URL: &str = "https://plateforme-bal.adresse.data.gouv.fr/api-depot";

// ============================================================================
// Deposit API wire types
// ============================================================================

/// Habilitation as returned by `GET /habilitations/{id}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabilitationResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub status: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// File entry of a revision
#[derive(Debug, Clone, Deserialize)]
pub struct RevisionFileResponse {
    #[serde(rename = "type")]
    pub kind: String,
    pub hash: Option<String>,
}

/// Revision as returned by the revision endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct RevisionResponse {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub files: Vec<RevisionFileResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RevisionExtras<'a> {
    bal_id: &'a str,
}

#[derive(Debug, Serialize)]
struct RevisionContext<'a> {
    extras: RevisionExtras<'a>,
}

#[derive(Debug, Serialize)]
struct CreateRevisionRequest<'a> {
    context: RevisionContext<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PublishRevisionRequest<'a> {
    habilitation_id: &'a str,
}

// ============================================================================
// Status mapping
// ============================================================================

/// Turns a non-success response into a [`DepotError`]
async fn check_status(response: Response) -> Result<Response, DepotError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => DepotError::Unauthorized(message),
        StatusCode::NOT_FOUND => DepotError::NotFound(message),
        s if s.is_server_error() => DepotError::ServerError {
            status: s.as_u16(),
            message,
        },
        s => DepotError::Rejected {
            status: s.as_u16(),
            message,
        },
    })
}

// ============================================================================
// DepotClient
// ============================================================================

/// HTTP client for the deposit service
///
/// Requests carry `Authorization: Token <token>` when a token is set.
/// No retry or timeout policy is applied here.
pub struct DepotClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl DepotClient {
    /// Creates a client for the production deposit service
    pub fn new(token: Option<String>) -> Self {
        Self::with_base_url(token, DEPOT_BASE_URL)
    }

    /// Creates a client with a custom base URL (useful for testing)
    pub fn with_base_url(token: Option<String>, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Returns the base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Creates an authenticated request builder for the given method and path
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.request(method, &url);
        match &self.token {
            Some(token) => builder.header(header::AUTHORIZATION, format!("Token {token}")),
            None => builder,
        }
    }

    /// Sends a GET and decodes the body, mapping 404 to `None`
    async fn get_optional<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let response = self
            .request(Method::GET, path)
            .send()
            .await
            .map_err(DepotError::from)
            .with_context(|| format!("Failed to send GET {path}"))?;

        match check_status(response).await {
            Ok(response) => {
                let body = response
                    .json()
                    .await
                    .map_err(|e| DepotError::InvalidResponse(e.to_string()))
                    .with_context(|| format!("Failed to parse GET {path} response"))?;
                Ok(Some(body))
            }
            Err(DepotError::NotFound(_)) => Ok(None),
            Err(e) => Err(e).with_context(|| format!("GET {path} returned error status")),
        }
    }

    /// Fetches a habilitation by ID
    ///
    /// Returns `None` if the deposit service answers 404.
    pub async fn get_habilitation(&self, id: &str) -> Result<Option<HabilitationResponse>> {
        debug!(habilitation_id = %id, "Fetching habilitation");
        self.get_optional(&format!("/habilitations/{id}")).await
    }

    /// Fetches the current revision of a commune
    ///
    /// Returns `None` if the commune has no published revision.
    pub async fn get_current_revision(&self, code_commune: &str) -> Result<Option<RevisionResponse>> {
        debug!(commune = %code_commune, "Fetching current revision");
        self.get_optional(&format!("/communes/{code_commune}/current-revision"))
            .await
    }

    /// Opens a new revision for a commune
    pub async fn create_revision(&self, code_commune: &str, bal_id: &str) -> Result<RevisionResponse> {
        let path = format!("/communes/{code_commune}/revisions");
        let body = CreateRevisionRequest {
            context: RevisionContext {
                extras: RevisionExtras { bal_id },
            },
        };

        let response = self
            .request(Method::POST, &path)
            .json(&body)
            .send()
            .await
            .map_err(DepotError::from)
            .context("Failed to send create revision request")?;
        let revision = check_status(response)
            .await
            .with_context(|| format!("POST {path} returned error status"))?
            .json()
            .await
            .map_err(|e| DepotError::InvalidResponse(e.to_string()))
            .context("Failed to parse created revision")?;

        Ok(revision)
    }

    /// Uploads the BAL file of an open revision
    pub async fn upload_file(&self, revision_id: &str, file: &str) -> Result<()> {
        let path = format!("/revisions/{revision_id}/files/bal");

        let response = self
            .request(Method::PUT, &path)
            .header(header::CONTENT_TYPE, "text/csv")
            .body(file.to_string())
            .send()
            .await
            .map_err(DepotError::from)
            .context("Failed to send file upload request")?;
        check_status(response)
            .await
            .with_context(|| format!("PUT {path} returned error status"))?;

        debug!(revision_id = %revision_id, bytes = file.len(), "Uploaded BAL file");
        Ok(())
    }

    /// Asks the deposit service to validate an open revision
    pub async fn compute_revision(&self, revision_id: &str) -> Result<RevisionResponse> {
        let path = format!("/revisions/{revision_id}/compute");

        let response = self
            .request(Method::POST, &path)
            .send()
            .await
            .map_err(DepotError::from)
            .context("Failed to send compute request")?;
        let revision = check_status(response)
            .await
            .with_context(|| format!("POST {path} returned error status"))?
            .json()
            .await
            .map_err(|e| DepotError::InvalidResponse(e.to_string()))
            .context("Failed to parse computed revision")?;

        Ok(revision)
    }

    /// Publishes a computed revision under a habilitation
    pub async fn publish_revision(
        &self,
        revision_id: &str,
        habilitation_id: &str,
    ) -> Result<RevisionResponse> {
        let path = format!("/revisions/{revision_id}/publish");

        let response = self
            .request(Method::POST, &path)
            .json(&PublishRevisionRequest { habilitation_id })
            .send()
            .await
            .map_err(DepotError::from)
            .context("Failed to send publish request")?;
        let revision: RevisionResponse = check_status(response)
            .await
            .with_context(|| format!("POST {path} returned error status"))?
            .json()
            .await
            .map_err(|e| DepotError::InvalidResponse(e.to_string()))
            .context("Failed to parse published revision")?;

        info!(revision_id = %revision.id, "Published revision");
        Ok(revision)
    }
}
