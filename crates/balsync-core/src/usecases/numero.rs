//! Numero use cases
//!
//! Single and batch mutations of house numbers. Every successful write
//! refreshes the centroid of each affected voie, touches the affected
//! toponymes and bumps the owning dataset's `updatedAt`. Centroids are
//! computed before the numero is written.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use crate::domain::{
    newtypes::{BaseLocaleId, NumeroId, ToponymeId, VoieId},
    BaseLocale, Numero, Position, Toponyme, Voie,
};
use crate::ports::{IAddressRepository, IGeometry, NumeroChanges, NumeroFilter};

use super::cascade;
use super::error::{ServiceError, ServiceResult};

/// Input for [`NumeroService::create`]
#[derive(Debug, Clone, Default)]
pub struct CreateNumero {
    pub numero: u32,
    pub suffixe: Option<String>,
    pub toponyme_id: Option<ToponymeId>,
    pub positions: Vec<Position>,
    pub certifie: bool,
    pub comment: Option<String>,
}

/// Input for [`NumeroService::update`]; `None` fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct UpdateNumero {
    pub numero: Option<u32>,
    /// `Some(None)` clears the suffix
    pub suffixe: Option<Option<String>>,
    pub voie_id: Option<VoieId>,
    /// `Some(None)` detaches the numero from its toponyme
    pub toponyme_id: Option<Option<ToponymeId>>,
    pub positions: Option<Vec<Position>>,
    pub certifie: Option<bool>,
    pub comment: Option<Option<String>>,
}

/// Voies and toponymes whose derived state depends on a set of numeros
#[derive(Debug, Default)]
struct Affected {
    voies: BTreeSet<VoieId>,
    toponymes: BTreeSet<ToponymeId>,
}

impl Affected {
    fn add(&mut self, numero: &Numero) {
        self.voies.insert(*numero.voie_id());
        if let Some(toponyme_id) = numero.toponyme_id() {
            self.toponymes.insert(*toponyme_id);
        }
    }
}

/// Use case for numero mutations
pub struct NumeroService {
    repository: Arc<dyn IAddressRepository + Send + Sync>,
    geometry: Arc<dyn IGeometry + Send + Sync>,
}

impl NumeroService {
    pub fn new(
        repository: Arc<dyn IAddressRepository + Send + Sync>,
        geometry: Arc<dyn IGeometry + Send + Sync>,
    ) -> Self {
        Self {
            repository,
            geometry,
        }
    }

    // --- Lookups ---

    async fn live_base_locale(&self, id: &BaseLocaleId) -> ServiceResult<BaseLocale> {
        self.repository
            .get_base_locale(id)
            .await
            .map_err(ServiceError::Storage)?
            .filter(|b| !b.is_deleted())
            .ok_or_else(|| ServiceError::not_found("BaseLocale", id))
    }

    async fn live_voie(&self, bal_id: &BaseLocaleId, id: &VoieId) -> ServiceResult<Voie> {
        self.repository
            .get_voie(id)
            .await
            .map_err(ServiceError::Storage)?
            .filter(|v| !v.is_deleted() && v.bal_id() == bal_id)
            .ok_or_else(|| ServiceError::not_found("Voie", id))
    }

    async fn live_toponyme(
        &self,
        bal_id: &BaseLocaleId,
        id: &ToponymeId,
    ) -> ServiceResult<Toponyme> {
        self.repository
            .get_toponyme(id)
            .await
            .map_err(ServiceError::Storage)?
            .filter(|t| !t.is_deleted() && t.bal_id() == bal_id)
            .ok_or_else(|| ServiceError::not_found("Toponyme", id))
    }

    async fn any_numero(&self, id: &NumeroId) -> ServiceResult<Numero> {
        self.repository
            .get_numero(id)
            .await
            .map_err(ServiceError::Storage)?
            .ok_or_else(|| ServiceError::not_found("Numero", id))
    }

    async fn live_numero(&self, id: &NumeroId) -> ServiceResult<Numero> {
        let numero = self.any_numero(id).await?;
        if numero.is_deleted() {
            return Err(ServiceError::not_found("Numero", id));
        }
        Ok(numero)
    }

    // --- Cascade ---

    /// Voie centroids after the pending writes, computed before any of them
    async fn plan(
        &self,
        affected: &Affected,
        saved: &[Numero],
        removed: &[NumeroId],
    ) -> ServiceResult<Vec<Voie>> {
        cascade::plan_voie_centroids(
            self.repository.as_ref(),
            self.geometry.as_ref(),
            &affected.voies,
            saved,
            removed,
        )
        .await
    }

    async fn propagate(
        &self,
        bal_id: &BaseLocaleId,
        planned: &[Voie],
        affected: Affected,
        at: DateTime<Utc>,
    ) -> ServiceResult<()> {
        cascade::save_voies(self.repository.as_ref(), planned).await?;
        cascade::touch_toponymes(self.repository.as_ref(), affected.toponymes, at).await?;
        cascade::touch_base_locale(self.repository.as_ref(), bal_id, at).await
    }

    // --- Single numero operations ---

    /// Creates a numero on a live voie
    #[instrument(skip(self, input), fields(numero = input.numero))]
    pub async fn create(&self, voie_id: &VoieId, input: CreateNumero) -> ServiceResult<Numero> {
        let voie = self
            .repository
            .get_voie(voie_id)
            .await
            .map_err(ServiceError::Storage)?
            .filter(|v| !v.is_deleted())
            .ok_or_else(|| ServiceError::not_found("Voie", voie_id))?;
        let bal_id = *voie.bal_id();
        self.live_base_locale(&bal_id).await?;
        if let Some(toponyme_id) = &input.toponyme_id {
            self.live_toponyme(&bal_id, toponyme_id).await?;
        }

        let mut numero = Numero::new(bal_id, *voie_id, input.numero, input.suffixe.as_deref())?;
        numero.set_toponyme(input.toponyme_id);
        numero.set_positions(input.positions);
        numero.set_certifie(input.certifie);
        numero.set_comment(input.comment);

        let mut affected = Affected::default();
        affected.add(&numero);
        let planned = self.plan(&affected, std::slice::from_ref(&numero), &[]).await?;

        self.repository
            .save_numero(&numero)
            .await
            .map_err(ServiceError::Storage)?;
        self.propagate(&bal_id, &planned, affected, numero.updated_at())
            .await?;

        info!(
            numero_id = %numero.id(),
            voie_id = %voie_id,
            numero = %numero.numero_complet(),
            "Created numero"
        );
        Ok(numero)
    }

    /// Updates a live numero
    ///
    /// Moving a numero to another voie refreshes both voies.
    #[instrument(skip(self, changes))]
    pub async fn update(&self, id: &NumeroId, changes: UpdateNumero) -> ServiceResult<Numero> {
        let mut numero = self.live_numero(id).await?;
        let bal_id = *numero.bal_id();

        let mut affected = Affected::default();
        affected.add(&numero);

        if let Some(voie_id) = &changes.voie_id {
            self.live_voie(&bal_id, voie_id).await?;
            numero.set_voie(*voie_id);
        }
        if let Some(toponyme_id) = changes.toponyme_id {
            if let Some(toponyme_id) = &toponyme_id {
                self.live_toponyme(&bal_id, toponyme_id).await?;
            }
            numero.set_toponyme(toponyme_id);
        }
        if let Some(n) = changes.numero {
            numero.set_numero(n)?;
        }
        if let Some(suffixe) = &changes.suffixe {
            numero.set_suffixe(suffixe.as_deref());
        }
        if let Some(positions) = changes.positions {
            numero.set_positions(positions);
        }
        if let Some(certifie) = changes.certifie {
            numero.set_certifie(certifie);
        }
        if let Some(comment) = changes.comment {
            numero.set_comment(comment);
        }

        let now = Utc::now();
        numero.touch(now);
        affected.add(&numero);
        let planned = self.plan(&affected, std::slice::from_ref(&numero), &[]).await?;

        self.repository
            .save_numero(&numero)
            .await
            .map_err(ServiceError::Storage)?;
        self.propagate(&bal_id, &planned, affected, now).await?;

        debug!(numero_id = %id, "Updated numero");
        Ok(numero)
    }

    /// Permanently deletes a numero
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &NumeroId) -> ServiceResult<()> {
        let numero = self.any_numero(id).await?;
        let mut affected = Affected::default();
        affected.add(&numero);
        let planned = self.plan(&affected, &[], &[*id]).await?;

        let deleted = self
            .repository
            .delete_numero(id)
            .await
            .map_err(ServiceError::Storage)?;
        if deleted {
            self.propagate(numero.bal_id(), &planned, affected, Utc::now())
                .await?;
            info!(numero_id = %id, "Deleted numero");
        }
        Ok(())
    }

    /// Soft-deletes a numero
    #[instrument(skip(self))]
    pub async fn soft_delete(&self, id: &NumeroId) -> ServiceResult<Numero> {
        let mut numero = self.any_numero(id).await?;
        if numero.is_deleted() {
            return Ok(numero);
        }

        let now = Utc::now();
        numero.set_deleted_at(Some(now));
        let mut affected = Affected::default();
        affected.add(&numero);
        let planned = self.plan(&affected, std::slice::from_ref(&numero), &[]).await?;

        self.repository
            .save_numero(&numero)
            .await
            .map_err(ServiceError::Storage)?;
        self.propagate(numero.bal_id(), &planned, affected, now).await?;

        debug!(numero_id = %id, "Soft-deleted numero");
        Ok(numero)
    }

    /// Restores a soft-deleted numero
    ///
    /// # Errors
    /// `BadInput` if its voie is itself soft-deleted
    #[instrument(skip(self))]
    pub async fn restore(&self, id: &NumeroId) -> ServiceResult<Numero> {
        let mut numero = self.any_numero(id).await?;
        if !numero.is_deleted() {
            return Ok(numero);
        }
        let voie_live = self
            .repository
            .get_voie(numero.voie_id())
            .await
            .map_err(ServiceError::Storage)?
            .is_some_and(|v| !v.is_deleted());
        if !voie_live {
            return Err(ServiceError::BadInput(format!(
                "Voie {} of numero {id} is deleted",
                numero.voie_id()
            )));
        }

        let now = Utc::now();
        numero.set_deleted_at(None);
        numero.touch(now);
        let mut affected = Affected::default();
        affected.add(&numero);
        let planned = self.plan(&affected, std::slice::from_ref(&numero), &[]).await?;

        self.repository
            .save_numero(&numero)
            .await
            .map_err(ServiceError::Storage)?;
        self.propagate(numero.bal_id(), &planned, affected, now).await?;

        debug!(numero_id = %id, "Restored numero");
        Ok(numero)
    }

    // --- Batch operations ---

    /// Live numeros of `ids` in the dataset, with what depends on them
    async fn affected_by(
        &self,
        bal_id: &BaseLocaleId,
        ids: &[NumeroId],
    ) -> ServiceResult<(Vec<Numero>, Affected)> {
        let numeros = self
            .repository
            .query_numeros(&NumeroFilter::for_bal(*bal_id).with_ids(ids.to_vec()))
            .await
            .map_err(ServiceError::Storage)?;
        let mut affected = Affected::default();
        for numero in &numeros {
            affected.add(numero);
        }
        Ok((numeros, affected))
    }

    /// Applies the same changes to several numeros of a dataset
    ///
    /// Returns the number of numeros modified. Deleted or foreign ids are
    /// skipped.
    ///
    /// # Errors
    /// - `BadInput` when `ids` or `changes` is empty
    /// - `NotFound` when the target voie or toponyme does not exist in the dataset
    #[instrument(skip(self, ids, changes), fields(count = ids.len()))]
    pub async fn update_batch(
        &self,
        bal_id: &BaseLocaleId,
        ids: &[NumeroId],
        changes: NumeroChanges,
    ) -> ServiceResult<u64> {
        if ids.is_empty() {
            return Err(ServiceError::BadInput("No numero ids given".into()));
        }
        if changes.is_empty() {
            return Err(ServiceError::BadInput("No changes given".into()));
        }
        self.live_base_locale(bal_id).await?;
        if let Some(voie_id) = &changes.voie_id {
            self.live_voie(bal_id, voie_id).await?;
        }
        if let Some(Some(toponyme_id)) = &changes.toponyme_id {
            self.live_toponyme(bal_id, toponyme_id).await?;
        }

        let (mut moved, mut affected) = self.affected_by(bal_id, ids).await?;
        if let Some(voie_id) = changes.voie_id {
            affected.voies.insert(voie_id);
            for numero in &mut moved {
                numero.set_voie(voie_id);
            }
        }
        if let Some(Some(toponyme_id)) = changes.toponyme_id {
            affected.toponymes.insert(toponyme_id);
        }
        let planned = self.plan(&affected, &moved, &[]).await?;

        let now = Utc::now();
        let count = self
            .repository
            .update_numeros(bal_id, ids, &changes, now)
            .await
            .map_err(ServiceError::Storage)?;
        if count > 0 {
            self.propagate(bal_id, &planned, affected, now).await?;
        }

        info!(bal_id = %bal_id, count, "Updated numeros");
        Ok(count)
    }

    /// Soft-deletes several numeros of a dataset
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn soft_delete_batch(
        &self,
        bal_id: &BaseLocaleId,
        ids: &[NumeroId],
    ) -> ServiceResult<u64> {
        if ids.is_empty() {
            return Err(ServiceError::BadInput("No numero ids given".into()));
        }
        self.live_base_locale(bal_id).await?;

        let (_, affected) = self.affected_by(bal_id, ids).await?;
        let planned = self.plan(&affected, &[], ids).await?;

        let now = Utc::now();
        let count = self
            .repository
            .soft_delete_numeros(bal_id, ids, now)
            .await
            .map_err(ServiceError::Storage)?;
        if count > 0 {
            self.propagate(bal_id, &planned, affected, now).await?;
        }

        info!(bal_id = %bal_id, count, "Soft-deleted numeros");
        Ok(count)
    }

    /// Permanently deletes several numeros of a dataset
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn delete_batch(
        &self,
        bal_id: &BaseLocaleId,
        ids: &[NumeroId],
    ) -> ServiceResult<u64> {
        if ids.is_empty() {
            return Err(ServiceError::BadInput("No numero ids given".into()));
        }
        self.live_base_locale(bal_id).await?;

        let (_, mut affected) = self.affected_by(bal_id, ids).await?;
        // Soft-deleted numeros are removed too
        let deleted = self
            .repository
            .query_numeros(
                &NumeroFilter::for_bal(*bal_id)
                    .with_ids(ids.to_vec())
                    .including_deleted(),
            )
            .await
            .map_err(ServiceError::Storage)?;
        for numero in &deleted {
            affected.add(numero);
        }
        let planned = self.plan(&affected, &[], ids).await?;

        let count = self
            .repository
            .delete_numeros(bal_id, ids)
            .await
            .map_err(ServiceError::Storage)?;
        if count > 0 {
            self.propagate(bal_id, &planned, affected, Utc::now()).await?;
        }

        info!(bal_id = %bal_id, count, "Deleted numeros");
        Ok(count)
    }
}
