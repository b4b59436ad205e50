//! Voie use cases
//!
//! Create, update and remove voies while keeping their derived centroid
//! and the owning dataset's `updatedAt` consistent.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument};

use crate::domain::{
    newtypes::{BaseLocaleId, NumeroId, VoieId},
    BBox, GeoPoint, LineTrace, NomAlt, Toponyme, TypeNumerotation, Voie,
};
use crate::ports::{IAddressRepository, IGeometry, NumeroFilter};

use super::cascade;
use super::error::{ServiceError, ServiceResult};

/// Input for [`VoieService::create`]
#[derive(Debug, Clone, Default)]
pub struct CreateVoie {
    pub nom: String,
    pub nom_alt: Option<NomAlt>,
    pub type_numerotation: Option<TypeNumerotation>,
    pub trace: Option<LineTrace>,
}

/// Input for [`VoieService::update`]; `None` fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct UpdateVoie {
    pub nom: Option<String>,
    pub nom_alt: Option<NomAlt>,
    pub type_numerotation: Option<TypeNumerotation>,
    /// `Some(None)` removes the trace
    pub trace: Option<Option<LineTrace>>,
}

impl UpdateVoie {
    fn is_empty(&self) -> bool {
        self.nom.is_none()
            && self.nom_alt.is_none()
            && self.type_numerotation.is_none()
            && self.trace.is_none()
    }
}

/// Use case for voie mutations
pub struct VoieService {
    repository: Arc<dyn IAddressRepository + Send + Sync>,
    geometry: Arc<dyn IGeometry + Send + Sync>,
}

impl VoieService {
    pub fn new(
        repository: Arc<dyn IAddressRepository + Send + Sync>,
        geometry: Arc<dyn IGeometry + Send + Sync>,
    ) -> Self {
        Self {
            repository,
            geometry,
        }
    }

    async fn live_voie(&self, id: &VoieId) -> ServiceResult<Voie> {
        self.repository
            .get_voie(id)
            .await
            .map_err(ServiceError::Storage)?
            .filter(|v| !v.is_deleted())
            .ok_or_else(|| ServiceError::not_found("Voie", id))
    }

    async fn any_voie(&self, id: &VoieId) -> ServiceResult<Voie> {
        self.repository
            .get_voie(id)
            .await
            .map_err(ServiceError::Storage)?
            .ok_or_else(|| ServiceError::not_found("Voie", id))
    }

    /// Creates a voie in a live dataset
    ///
    /// The centroid is derived from the trace when numbering is metric.
    #[instrument(skip(self, input), fields(nom = %input.nom))]
    pub async fn create(&self, bal_id: &BaseLocaleId, input: CreateVoie) -> ServiceResult<Voie> {
        let bal = self
            .repository
            .get_base_locale(bal_id)
            .await
            .map_err(ServiceError::Storage)?
            .filter(|b| !b.is_deleted())
            .ok_or_else(|| ServiceError::not_found("BaseLocale", bal_id))?;

        let mut voie = Voie::new(*bal.id(), &input.nom)?;
        if let Some(nom_alt) = input.nom_alt {
            voie.set_nom_alt(nom_alt);
        }
        voie.set_type_numerotation(input.type_numerotation.unwrap_or_default());
        voie.set_trace(input.trace);
        // Computed before anything is written
        voie.set_centroid(cascade::trace_centroid(self.geometry.as_ref(), &voie)?);

        self.repository
            .save_voie(&voie)
            .await
            .map_err(ServiceError::Storage)?;
        cascade::touch_base_locale(self.repository.as_ref(), bal_id, voie.updated_at()).await?;

        info!(voie_id = %voie.id(), bal_id = %bal_id, "Created voie");
        Ok(voie)
    }

    /// Updates a live voie
    ///
    /// A new trace on a metric voie recomputes its centroid; any other
    /// change keeps the stored one. An empty update returns the voie
    /// unchanged and touches nothing.
    #[instrument(skip(self, changes))]
    pub async fn update(&self, id: &VoieId, changes: UpdateVoie) -> ServiceResult<Voie> {
        let mut voie = self.live_voie(id).await?;
        if changes.is_empty() {
            return Ok(voie);
        }

        let trace_changed = changes.trace.is_some();
        if let Some(nom) = &changes.nom {
            voie.set_nom(nom)?;
        }
        if let Some(nom_alt) = changes.nom_alt {
            voie.set_nom_alt(nom_alt);
        }
        if let Some(type_numerotation) = changes.type_numerotation {
            voie.set_type_numerotation(type_numerotation);
        }
        if let Some(trace) = changes.trace {
            voie.set_trace(trace);
        }

        if trace_changed && voie.has_metric_trace() {
            voie.set_centroid(cascade::trace_centroid(self.geometry.as_ref(), &voie)?);
        }

        voie.touch(Utc::now());
        self.repository
            .save_voie(&voie)
            .await
            .map_err(ServiceError::Storage)?;
        cascade::touch_base_locale(self.repository.as_ref(), voie.bal_id(), voie.updated_at())
            .await?;

        debug!(voie_id = %id, trace_changed, "Updated voie");
        Ok(voie)
    }

    /// Permanently deletes a voie and its numeros
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &VoieId) -> ServiceResult<()> {
        let voie = self.any_voie(id).await?;
        let deleted = self
            .repository
            .delete_voie(id)
            .await
            .map_err(ServiceError::Storage)?;
        if deleted {
            cascade::touch_base_locale(self.repository.as_ref(), voie.bal_id(), Utc::now()).await?;
            info!(voie_id = %id, "Deleted voie");
        }
        Ok(())
    }

    /// Soft-deletes a voie together with all its numeros
    ///
    /// The dataset is touched once for the whole cascade.
    #[instrument(skip(self))]
    pub async fn soft_delete(&self, id: &VoieId) -> ServiceResult<Voie> {
        let voie = self.any_voie(id).await?;
        if voie.is_deleted() {
            return Ok(voie);
        }

        let now = Utc::now();
        let numeros = self
            .repository
            .soft_delete_voie(id, now)
            .await
            .map_err(ServiceError::Storage)?;
        cascade::touch_base_locale(self.repository.as_ref(), voie.bal_id(), now).await?;

        info!(voie_id = %id, numeros, "Soft-deleted voie");
        self.any_voie(id).await
    }

    /// Restores a voie and, optionally, some of its numeros
    ///
    /// When numeros are restored the voie centroid becomes the centroid of
    /// every numero live afterwards, whatever the numbering type.
    #[instrument(skip(self, numero_ids), fields(numeros = numero_ids.len()))]
    pub async fn restore(&self, id: &VoieId, numero_ids: &[NumeroId]) -> ServiceResult<Voie> {
        let voie = self.any_voie(id).await?;

        let numeros = self
            .repository
            .query_numeros(
                &NumeroFilter::for_bal(*voie.bal_id())
                    .with_voie(*id)
                    .including_deleted(),
            )
            .await
            .map_err(ServiceError::Storage)?;
        let restoring = numeros
            .iter()
            .any(|n| n.is_deleted() && numero_ids.contains(n.id()));
        let centroid = if restoring {
            let points: Vec<GeoPoint> = numeros
                .iter()
                .filter(|n| !n.is_deleted() || numero_ids.contains(n.id()))
                .flat_map(|n| n.points())
                .collect();
            Some(cascade::points_centroid(self.geometry.as_ref(), &points)?)
        } else {
            None
        };

        let restored = self
            .repository
            .restore_voie(id, numero_ids)
            .await
            .map_err(ServiceError::Storage)?;
        let mut voie = self.any_voie(id).await?;
        if let (true, Some(centroid)) = (restored > 0, centroid) {
            voie.set_centroid(centroid);
            self.repository
                .save_voie(&voie)
                .await
                .map_err(ServiceError::Storage)?;
        }
        cascade::touch_base_locale(self.repository.as_ref(), voie.bal_id(), Utc::now()).await?;

        info!(voie_id = %id, restored, "Restored voie");
        Ok(voie)
    }

    /// Turns a voie without numeros into a toponyme
    ///
    /// The toponyme insert and the voie delete happen in one transaction.
    ///
    /// # Errors
    /// `BadInput` if the voie is soft-deleted or still has live numeros
    #[instrument(skip(self))]
    pub async fn convert_to_toponyme(&self, id: &VoieId) -> ServiceResult<Toponyme> {
        let voie = self.any_voie(id).await?;
        if voie.is_deleted() {
            return Err(ServiceError::BadInput(format!("Voie {id} is deleted")));
        }

        let numeros = self
            .repository
            .query_numeros(&NumeroFilter::for_bal(*voie.bal_id()).with_voie(*id))
            .await
            .map_err(ServiceError::Storage)?;
        if !numeros.is_empty() {
            return Err(ServiceError::BadInput(format!("Voie {id} has numero(s)")));
        }

        let mut toponyme = Toponyme::new(*voie.bal_id(), voie.nom())?;
        toponyme.set_nom_alt(voie.nom_alt().clone());

        let converted = self
            .repository
            .convert_voie_to_toponyme(id, &toponyme)
            .await
            .map_err(ServiceError::Storage)?;
        if !converted {
            return Err(ServiceError::ConcurrentUpdate(format!(
                "Voie {id} changed during conversion"
            )));
        }
        cascade::touch_base_locale(self.repository.as_ref(), voie.bal_id(), toponyme.updated_at())
            .await?;

        info!(voie_id = %id, toponyme_id = %toponyme.id(), "Converted voie to toponyme");
        Ok(toponyme)
    }

    /// Display bounding box of a voie
    ///
    /// Uses the positions of its live numeros, falls back to the trace box
    /// for numerically-numbered voies, and is `None` otherwise.
    pub async fn bbox(&self, id: &VoieId) -> ServiceResult<Option<BBox>> {
        let voie = self.any_voie(id).await?;
        let numeros = self
            .repository
            .query_numeros(&NumeroFilter::for_bal(*voie.bal_id()).with_voie(*id))
            .await
            .map_err(ServiceError::Storage)?;

        let points: Vec<GeoPoint> = numeros.iter().flat_map(|n| n.points()).collect();
        let bbox = if !points.is_empty() {
            Some(self.geometry.bounding_box(&points))
        } else {
            match voie.trace() {
                Some(trace) if voie.type_numerotation() == TypeNumerotation::Numerique => {
                    Some(self.geometry.trace_bounding_box(trace))
                }
                _ => None,
            }
        };

        bbox.transpose()
            .map_err(|e| ServiceError::Geometry(format!("{e:#}")))
    }
}
