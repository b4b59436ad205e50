//! Shared cascade steps
//!
//! Every child mutation ends with the same follow-ups: store the derived
//! centroid of the voies it touched and bump `updatedAt` on the owning
//! dataset. Centroids are planned before the mutation writes anything, so
//! a geometry failure leaves the store untouched.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::{
    newtypes::{BaseLocaleId, NumeroId, ToponymeId, VoieId},
    GeoPoint, Numero, Voie,
};
use crate::ports::{IAddressRepository, IGeometry, NumeroFilter};

use super::error::{ServiceError, ServiceResult};

/// Sets the dataset `updatedAt`
pub(crate) async fn touch_base_locale(
    repository: &dyn IAddressRepository,
    bal_id: &BaseLocaleId,
    at: DateTime<Utc>,
) -> ServiceResult<()> {
    repository
        .touch_base_locale(bal_id, at)
        .await
        .map_err(ServiceError::Storage)?;
    debug!(bal_id = %bal_id, at = %at, "Touched base locale");
    Ok(())
}

/// Sets `updatedAt` on each live toponyme of `ids`
pub(crate) async fn touch_toponymes(
    repository: &dyn IAddressRepository,
    ids: impl IntoIterator<Item = ToponymeId>,
    at: DateTime<Utc>,
) -> ServiceResult<()> {
    for id in ids {
        repository
            .touch_toponyme(&id, at)
            .await
            .map_err(ServiceError::Storage)?;
    }
    Ok(())
}

/// Computes the trace centroid of a metric voie
pub(crate) fn trace_centroid(
    geometry: &dyn IGeometry,
    voie: &Voie,
) -> ServiceResult<Option<GeoPoint>> {
    match voie.trace() {
        Some(trace) if voie.has_metric_trace() => geometry
            .trace_centroid(trace)
            .map(Some)
            .map_err(|e| ServiceError::Geometry(format!("{e:#}"))),
        _ => Ok(None),
    }
}

/// Centroid of a set of positions, `None` when there are none
pub(crate) fn points_centroid(
    geometry: &dyn IGeometry,
    points: &[GeoPoint],
) -> ServiceResult<Option<GeoPoint>> {
    if points.is_empty() {
        return Ok(None);
    }
    geometry
        .centroid(points)
        .map(Some)
        .map_err(|e| ServiceError::Geometry(format!("{e:#}")))
}

async fn live_numeros(
    repository: &dyn IAddressRepository,
    voie: &Voie,
) -> ServiceResult<Vec<Numero>> {
    repository
        .query_numeros(&NumeroFilter::for_bal(*voie.bal_id()).with_voie(*voie.id()))
        .await
        .map_err(ServiceError::Storage)
}

/// Computes the centroid each voie will have once pending numero writes land
///
/// `saved` are numeros about to be stored: they replace the stored rows with
/// the same id and count only when live and attached to the voie. `removed`
/// ids drop out. A metric voie with a trace keeps its trace centroid.
///
/// Nothing is written; the returned voies are the live ones whose centroid
/// changes, ready for [`save_voies`].
pub(crate) async fn plan_voie_centroids(
    repository: &dyn IAddressRepository,
    geometry: &dyn IGeometry,
    voie_ids: &BTreeSet<VoieId>,
    saved: &[Numero],
    removed: &[NumeroId],
) -> ServiceResult<Vec<Voie>> {
    let mut planned = Vec::new();
    for voie_id in voie_ids {
        let Some(mut voie) = repository
            .get_voie(voie_id)
            .await
            .map_err(ServiceError::Storage)?
            .filter(|v| !v.is_deleted())
        else {
            continue;
        };

        let centroid = if voie.has_metric_trace() {
            trace_centroid(geometry, &voie)?
        } else {
            let stored = live_numeros(repository, &voie).await?;
            let replaced =
                |n: &Numero| removed.contains(n.id()) || saved.iter().any(|s| s.id() == n.id());
            let points: Vec<GeoPoint> = stored
                .iter()
                .filter(|n| !replaced(*n))
                .chain(
                    saved
                        .iter()
                        .filter(|n| n.voie_id() == voie_id && !n.is_deleted()),
                )
                .flat_map(|n| n.points())
                .collect();
            points_centroid(geometry, &points)?
        };

        if centroid != voie.centroid() {
            voie.set_centroid(centroid);
            planned.push(voie);
        }
    }
    Ok(planned)
}

/// Stores voies whose centroid was planned by [`plan_voie_centroids`]
pub(crate) async fn save_voies(
    repository: &dyn IAddressRepository,
    voies: &[Voie],
) -> ServiceResult<()> {
    for voie in voies {
        repository
            .save_voie(voie)
            .await
            .map_err(ServiceError::Storage)?;
        debug!(
            voie_id = %voie.id(),
            has_centroid = voie.centroid().is_some(),
            "Refreshed voie centroid"
        );
    }
    Ok(())
}
