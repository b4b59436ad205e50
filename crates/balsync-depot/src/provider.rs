//! Deposit client adapter implementing the core port
//!
//! Wraps [`DepotClient`] and converts its wire types into the domain
//! records the publication engine works with.

use anyhow::Result;
use tracing::{info, instrument};

use balsync_core::domain::{
    newtypes::{BaseLocaleId, CodeCommune, ContentHash, HabilitationId, RevisionId},
    Habilitation, HabilitationStatus, Revision, RevisionFile,
};
use balsync_core::ports::IDepositClient;

use crate::client::{DepotClient, HabilitationResponse, RevisionResponse};
use crate::DepotError;

/// [`IDepositClient`] backed by the deposit service HTTP API
pub struct DepotDepositClient {
    client: DepotClient,
}

impl DepotDepositClient {
    pub fn new(client: DepotClient) -> Self {
        Self { client }
    }

    /// Returns the underlying HTTP client
    pub fn client(&self) -> &DepotClient {
        &self.client
    }
}

fn to_habilitation(response: HabilitationResponse) -> Result<Habilitation, DepotError> {
    let id = HabilitationId::new(response.id)
        .map_err(|e| DepotError::InvalidResponse(format!("habilitation id: {e}")))?;
    // Unknown statuses become `Other`
    let status: HabilitationStatus =
        serde_json::from_value(serde_json::Value::String(response.status))
            .map_err(|e| DepotError::InvalidResponse(format!("habilitation status: {e}")))?;

    Ok(Habilitation {
        id,
        status,
        expires_at: response.expires_at,
    })
}

fn to_revision(response: RevisionResponse) -> Result<Revision, DepotError> {
    let id = RevisionId::new(response.id)
        .map_err(|e| DepotError::InvalidResponse(format!("revision id: {e}")))?;
    let files = response
        .files
        .into_iter()
        .map(|f| {
            let hash = f
                .hash
                .map(ContentHash::new)
                .transpose()
                .map_err(|e| DepotError::InvalidResponse(format!("file hash: {e}")))?;
            Ok(RevisionFile { kind: f.kind, hash })
        })
        .collect::<Result<Vec<_>, DepotError>>()?;

    Ok(Revision { id, files })
}

#[async_trait::async_trait]
impl IDepositClient for DepotDepositClient {
    async fn find_habilitation(&self, id: &HabilitationId) -> Result<Option<Habilitation>> {
        match self.client.get_habilitation(id.as_str()).await? {
            Some(response) => Ok(Some(to_habilitation(response)?)),
            None => Ok(None),
        }
    }

    async fn get_current_revision(&self, commune: &CodeCommune) -> Result<Option<Revision>> {
        match self.client.get_current_revision(commune.as_str()).await? {
            Some(response) => Ok(Some(to_revision(response)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, file), fields(bytes = file.len()))]
    async fn publish_new_revision(
        &self,
        commune: &CodeCommune,
        bal_id: &BaseLocaleId,
        file: &str,
        habilitation_id: &HabilitationId,
    ) -> Result<Revision> {
        let bal_id = bal_id.to_string();
        let created = self
            .client
            .create_revision(commune.as_str(), &bal_id)
            .await?;
        self.client.upload_file(&created.id, file).await?;
        self.client.compute_revision(&created.id).await?;
        let published = self
            .client
            .publish_revision(&created.id, habilitation_id.as_str())
            .await?;

        let revision = to_revision(published)?;
        info!(commune = %commune, revision_id = %revision.id, "New revision is current");
        Ok(revision)
    }
}
