//! Toponyme use cases

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument};

use crate::domain::{
    newtypes::{BaseLocaleId, ToponymeId},
    NomAlt, Position, Toponyme,
};
use crate::ports::IAddressRepository;

use super::cascade;
use super::error::{ServiceError, ServiceResult};

/// Input for [`ToponymeService::create`]
#[derive(Debug, Clone, Default)]
pub struct CreateToponyme {
    pub nom: String,
    pub nom_alt: Option<NomAlt>,
    pub positions: Vec<Position>,
}

/// Input for [`ToponymeService::update`]; `None` fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct UpdateToponyme {
    pub nom: Option<String>,
    pub nom_alt: Option<NomAlt>,
    pub positions: Option<Vec<Position>>,
}

/// Use case for toponyme mutations
pub struct ToponymeService {
    repository: Arc<dyn IAddressRepository + Send + Sync>,
}

impl ToponymeService {
    pub fn new(repository: Arc<dyn IAddressRepository + Send + Sync>) -> Self {
        Self { repository }
    }

    async fn any_toponyme(&self, id: &ToponymeId) -> ServiceResult<Toponyme> {
        self.repository
            .get_toponyme(id)
            .await
            .map_err(ServiceError::Storage)?
            .ok_or_else(|| ServiceError::not_found("Toponyme", id))
    }

    /// Creates a toponyme in a live dataset
    #[instrument(skip(self, input), fields(nom = %input.nom))]
    pub async fn create(
        &self,
        bal_id: &BaseLocaleId,
        input: CreateToponyme,
    ) -> ServiceResult<Toponyme> {
        self.repository
            .get_base_locale(bal_id)
            .await
            .map_err(ServiceError::Storage)?
            .filter(|b| !b.is_deleted())
            .ok_or_else(|| ServiceError::not_found("BaseLocale", bal_id))?;

        let mut toponyme = Toponyme::new(*bal_id, &input.nom)?;
        if let Some(nom_alt) = input.nom_alt {
            toponyme.set_nom_alt(nom_alt);
        }
        toponyme.set_positions(input.positions);

        self.repository
            .save_toponyme(&toponyme)
            .await
            .map_err(ServiceError::Storage)?;
        cascade::touch_base_locale(self.repository.as_ref(), bal_id, toponyme.updated_at())
            .await?;

        info!(toponyme_id = %toponyme.id(), bal_id = %bal_id, "Created toponyme");
        Ok(toponyme)
    }

    /// Updates a live toponyme
    #[instrument(skip(self, changes))]
    pub async fn update(
        &self,
        id: &ToponymeId,
        changes: UpdateToponyme,
    ) -> ServiceResult<Toponyme> {
        let mut toponyme = self.any_toponyme(id).await?;
        if toponyme.is_deleted() {
            return Err(ServiceError::not_found("Toponyme", id));
        }

        if let Some(nom) = &changes.nom {
            toponyme.set_nom(nom)?;
        }
        if let Some(nom_alt) = changes.nom_alt {
            toponyme.set_nom_alt(nom_alt);
        }
        if let Some(positions) = changes.positions {
            toponyme.set_positions(positions);
        }

        let now = Utc::now();
        toponyme.touch(now);
        self.repository
            .save_toponyme(&toponyme)
            .await
            .map_err(ServiceError::Storage)?;
        cascade::touch_base_locale(self.repository.as_ref(), toponyme.bal_id(), now).await?;

        debug!(toponyme_id = %id, "Updated toponyme");
        Ok(toponyme)
    }

    /// Permanently deletes a toponyme; its numeros are detached
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &ToponymeId) -> ServiceResult<()> {
        let toponyme = self.any_toponyme(id).await?;
        let deleted = self
            .repository
            .delete_toponyme(id)
            .await
            .map_err(ServiceError::Storage)?;
        if deleted {
            cascade::touch_base_locale(self.repository.as_ref(), toponyme.bal_id(), Utc::now())
                .await?;
            info!(toponyme_id = %id, "Deleted toponyme");
        }
        Ok(())
    }

    /// Soft-deletes a toponyme
    #[instrument(skip(self))]
    pub async fn soft_delete(&self, id: &ToponymeId) -> ServiceResult<Toponyme> {
        let mut toponyme = self.any_toponyme(id).await?;
        if toponyme.is_deleted() {
            return Ok(toponyme);
        }

        let now = Utc::now();
        toponyme.set_deleted_at(Some(now));
        self.repository
            .save_toponyme(&toponyme)
            .await
            .map_err(ServiceError::Storage)?;
        cascade::touch_base_locale(self.repository.as_ref(), toponyme.bal_id(), now).await?;

        debug!(toponyme_id = %id, "Soft-deleted toponyme");
        Ok(toponyme)
    }

    /// Restores a soft-deleted toponyme
    #[instrument(skip(self))]
    pub async fn restore(&self, id: &ToponymeId) -> ServiceResult<Toponyme> {
        let mut toponyme = self.any_toponyme(id).await?;
        if !toponyme.is_deleted() {
            return Ok(toponyme);
        }

        let now = Utc::now();
        toponyme.set_deleted_at(None);
        toponyme.touch(now);
        self.repository
            .save_toponyme(&toponyme)
            .await
            .map_err(ServiceError::Storage)?;
        cascade::touch_base_locale(self.repository.as_ref(), toponyme.bal_id(), now).await?;

        debug!(toponyme_id = %id, "Restored toponyme");
        Ok(toponyme)
    }
}
