//! Deposit client port (driven/secondary port)
//!
//! Interface to the national deposit service ("API de dépôt") that owns
//! habilitations and publishes revisions of each commune's addresses.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because transport and protocol errors are
//!   adapter-specific. Callers surface them unchanged as remote errors.
//! - "Not found" answers are values (`Ok(None)`), not errors.
//! - No retry or timeout policy lives at this layer.

use crate::domain::{
    newtypes::{BaseLocaleId, CodeCommune, HabilitationId},
    Habilitation, Revision,
};

/// Port trait for the deposit service
#[async_trait::async_trait]
pub trait IDepositClient: Send + Sync {
    /// Fetches a habilitation by ID
    ///
    /// Returns `None` if the deposit service does not know it.
    async fn find_habilitation(&self, id: &HabilitationId) -> anyhow::Result<Option<Habilitation>>;

    /// Fetches the current revision of a commune
    ///
    /// Returns `None` if nothing was ever published for the commune.
    async fn get_current_revision(&self, commune: &CodeCommune)
        -> anyhow::Result<Option<Revision>>;

    /// Publishes `file` as the new current revision of a commune
    ///
    /// # Arguments
    /// * `commune` - INSEE code of the commune
    /// * `bal_id` - Dataset the file was exported from
    /// * `file` - Canonical BAL export
    /// * `habilitation_id` - Habilitation authorizing the publication
    async fn publish_new_revision(
        &self,
        commune: &CodeCommune,
        bal_id: &BaseLocaleId,
        file: &str,
        habilitation_id: &HabilitationId,
    ) -> anyhow::Result<Revision>;
}
