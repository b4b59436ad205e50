//! Dataset lifecycle use cases
//!
//! Creation, demo transformation, habilitation attachment and soft
//! delete/restore of a Base Adresse Locale. Publication state is not
//! handled here; it belongs to the publication engine.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use crate::domain::{
    newtypes::{BaseLocaleId, CodeCommune, Email, HabilitationId},
    BaseLocale, BaseLocaleStatus,
};
use crate::ports::{BaseLocaleFilter, IAddressRepository};

use super::cascade;
use super::error::{ServiceError, ServiceResult};

/// Input for [`BaseLocaleService::create`]
#[derive(Debug, Clone)]
pub struct CreateBaseLocale {
    pub nom: String,
    pub commune: CodeCommune,
    pub emails: Vec<Email>,
}

/// Use case for the dataset lifecycle
pub struct BaseLocaleService {
    repository: Arc<dyn IAddressRepository + Send + Sync>,
}

impl BaseLocaleService {
    pub fn new(repository: Arc<dyn IAddressRepository + Send + Sync>) -> Self {
        Self { repository }
    }

    async fn any(&self, id: &BaseLocaleId) -> ServiceResult<BaseLocale> {
        self.repository
            .get_base_locale(id)
            .await
            .map_err(ServiceError::Storage)?
            .ok_or_else(|| ServiceError::not_found("BaseLocale", id))
    }

    /// Creates a draft dataset
    #[instrument(skip(self, input), fields(commune = %input.commune))]
    pub async fn create(&self, input: CreateBaseLocale) -> ServiceResult<BaseLocale> {
        let bal = BaseLocale::new(input.nom, input.commune, input.emails)?;
        self.repository
            .save_base_locale(&bal)
            .await
            .map_err(ServiceError::Storage)?;
        info!(bal_id = %bal.id(), commune = %bal.commune(), "Created base locale");
        Ok(bal)
    }

    /// Creates a demo dataset
    #[instrument(skip(self))]
    pub async fn create_demo(
        &self,
        commune: CodeCommune,
        nom: Option<String>,
    ) -> ServiceResult<BaseLocale> {
        let bal = BaseLocale::new_demo(commune, nom);
        self.repository
            .save_base_locale(&bal)
            .await
            .map_err(ServiceError::Storage)?;
        info!(bal_id = %bal.id(), commune = %bal.commune(), "Created demo base locale");
        Ok(bal)
    }

    /// Returns a live dataset
    pub async fn get(&self, id: &BaseLocaleId) -> ServiceResult<BaseLocale> {
        let bal = self.any(id).await?;
        if bal.is_deleted() {
            return Err(ServiceError::not_found("BaseLocale", id));
        }
        Ok(bal)
    }

    /// Lists datasets matching `filter`
    pub async fn list(&self, filter: &BaseLocaleFilter) -> ServiceResult<Vec<BaseLocale>> {
        self.repository
            .query_base_locales(filter)
            .await
            .map_err(ServiceError::Storage)
    }

    /// Attaches the habilitation used for publication
    ///
    /// Does not change `updatedAt`: the address content is unchanged.
    #[instrument(skip(self))]
    pub async fn attach_habilitation(
        &self,
        id: &BaseLocaleId,
        habilitation_id: HabilitationId,
    ) -> ServiceResult<BaseLocale> {
        let mut bal = self.get(id).await?;
        if bal.status() == BaseLocaleStatus::Demo {
            return Err(ServiceError::PreconditionFailed(
                "Une Base Adresse Locale de démo ne peut pas être habilitée".into(),
            ));
        }
        bal.set_habilitation(Some(habilitation_id));
        self.repository
            .save_base_locale(&bal)
            .await
            .map_err(ServiceError::Storage)?;
        debug!(bal_id = %id, "Attached habilitation");
        Ok(bal)
    }

    /// Turns a demo dataset into a draft
    ///
    /// # Errors
    /// - `PreconditionFailed` if the dataset is not a demo
    /// - `Domain` if the name is blank or no email is given
    #[instrument(skip(self, emails))]
    pub async fn transform_to_draft(
        &self,
        id: &BaseLocaleId,
        nom: &str,
        emails: Vec<Email>,
    ) -> ServiceResult<BaseLocale> {
        let mut bal = self.get(id).await?;
        if bal.status() != BaseLocaleStatus::Demo {
            return Err(ServiceError::PreconditionFailed(
                "La Base Adresse Locale n’est pas une Base Adresse Locale de démo".into(),
            ));
        }
        bal.transform_to_draft(nom, emails)?;
        self.repository
            .save_base_locale(&bal)
            .await
            .map_err(ServiceError::Storage)?;
        info!(bal_id = %id, "Transformed demo base locale to draft");
        Ok(bal)
    }

    /// Soft-deletes a dataset
    #[instrument(skip(self))]
    pub async fn soft_delete(&self, id: &BaseLocaleId) -> ServiceResult<BaseLocale> {
        let bal = self.any(id).await?;
        if bal.is_deleted() {
            return Ok(bal);
        }
        let now = Utc::now();
        self.repository
            .set_base_locale_deleted(id, Some(now))
            .await
            .map_err(ServiceError::Storage)?;
        cascade::touch_base_locale(self.repository.as_ref(), id, now).await?;
        info!(bal_id = %id, "Soft-deleted base locale");
        self.any(id).await
    }

    /// Restores a soft-deleted dataset
    #[instrument(skip(self))]
    pub async fn restore(&self, id: &BaseLocaleId) -> ServiceResult<BaseLocale> {
        let bal = self.any(id).await?;
        if !bal.is_deleted() {
            return Ok(bal);
        }
        let now = Utc::now();
        self.repository
            .set_base_locale_deleted(id, None)
            .await
            .map_err(ServiceError::Storage)?;
        cascade::touch_base_locale(self.repository.as_ref(), id, now).await?;
        info!(bal_id = %id, "Restored base locale");
        self.any(id).await
    }

    /// Sets `updatedAt` on a live dataset, to `at` or now
    pub async fn touch(
        &self,
        id: &BaseLocaleId,
        at: Option<DateTime<Utc>>,
    ) -> ServiceResult<BaseLocale> {
        self.get(id).await?;
        cascade::touch_base_locale(self.repository.as_ref(), id, at.unwrap_or_else(Utc::now))
            .await?;
        self.any(id).await
    }
}
