//! In-memory port doubles for use case tests

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::domain::{
    newtypes::{BaseLocaleId, NumeroId, ToponymeId, VoieId},
    BBox, BaseLocale, BaseLocaleStatus, GeoPoint, LineTrace, Numero, Position, SyncRecord,
    Toponyme, Voie,
};
use crate::ports::{
    BaseLocaleFilter, IAddressRepository, IGeometry, NumeroChanges, NumeroFilter, SyncGuard,
};

#[derive(Default)]
struct State {
    bals: HashMap<BaseLocaleId, BaseLocale>,
    voies: HashMap<VoieId, Voie>,
    numeros: HashMap<NumeroId, Numero>,
    toponymes: HashMap<ToponymeId, Toponyme>,
    bal_touches: HashMap<BaseLocaleId, u32>,
}

/// Repository keeping everything in hash maps behind one mutex
#[derive(Default)]
pub(crate) struct MemoryRepository {
    state: Mutex<State>,
}

impl MemoryRepository {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Number of `touch_base_locale` calls for a dataset
    pub(crate) fn touches(&self, id: &BaseLocaleId) -> u32 {
        let state = self.state.lock().unwrap();
        state.bal_touches.get(id).copied().unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl IAddressRepository for MemoryRepository {
    async fn save_base_locale(&self, bal: &BaseLocale) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.bals.insert(*bal.id(), bal.clone());
        Ok(())
    }

    async fn get_base_locale(&self, id: &BaseLocaleId) -> anyhow::Result<Option<BaseLocale>> {
        Ok(self.state.lock().unwrap().bals.get(id).cloned())
    }

    async fn query_base_locales(
        &self,
        filter: &BaseLocaleFilter,
    ) -> anyhow::Result<Vec<BaseLocale>> {
        let state = self.state.lock().unwrap();
        let mut out: Vec<BaseLocale> = state
            .bals
            .values()
            .filter(|b| filter.include_deleted || !b.is_deleted())
            .filter(|b| filter.status.map_or(true, |s| b.status() == s))
            .filter(|b| match &filter.sync_status {
                Some(statuses) => b.sync_status().is_some_and(|s| statuses.contains(&s)),
                None => true,
            })
            .filter(|b| filter.is_paused.map_or(true, |p| b.is_sync_paused() == p))
            .cloned()
            .collect();
        out.sort_by_key(BaseLocale::created_at);
        Ok(out)
    }

    async fn touch_base_locale(&self, id: &BaseLocaleId, at: DateTime<Utc>) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(bal) = state.bals.get_mut(id) {
            bal.touch(at);
        }
        *state.bal_touches.entry(*id).or_insert(0) += 1;
        Ok(())
    }

    async fn update_sync(
        &self,
        id: &BaseLocaleId,
        guard: &SyncGuard,
        status: BaseLocaleStatus,
        sync: &SyncRecord,
    ) -> anyhow::Result<bool> {
        let mut state = self.state.lock().unwrap();
        let Some(bal) = state.bals.get_mut(id) else {
            return Ok(false);
        };
        let matches = !bal.is_deleted()
            && bal.status() == guard.status
            && guard.sync_status.map_or(true, |s| bal.sync_status() == Some(s));
        if matches {
            bal.set_status(status);
            bal.set_sync(Some(sync.clone()));
        }
        Ok(matches)
    }

    async fn set_sync_paused(&self, id: &BaseLocaleId, paused: bool) -> anyhow::Result<bool> {
        let mut state = self.state.lock().unwrap();
        let Some(bal) = state.bals.get_mut(id) else {
            return Ok(false);
        };
        match bal.sync().map(|s| s.with_paused(paused)) {
            Some(Ok(sync)) => {
                bal.set_sync(Some(sync));
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_base_locale_deleted(
        &self,
        id: &BaseLocaleId,
        deleted_at: Option<DateTime<Utc>>,
    ) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(bal) = state.bals.get_mut(id) {
            bal.set_deleted_at(deleted_at);
        }
        Ok(())
    }

    async fn save_voie(&self, voie: &Voie) -> anyhow::Result<()> {
        self.state.lock().unwrap().voies.insert(*voie.id(), voie.clone());
        Ok(())
    }

    async fn get_voie(&self, id: &VoieId) -> anyhow::Result<Option<Voie>> {
        Ok(self.state.lock().unwrap().voies.get(id).cloned())
    }

    async fn list_voies(&self, bal_id: &BaseLocaleId) -> anyhow::Result<Vec<Voie>> {
        let state = self.state.lock().unwrap();
        let mut out: Vec<Voie> = state
            .voies
            .values()
            .filter(|v| v.bal_id() == bal_id && !v.is_deleted())
            .cloned()
            .collect();
        out.sort_by(|a, b| a.nom().cmp(b.nom()));
        Ok(out)
    }

    async fn delete_voie(&self, id: &VoieId) -> anyhow::Result<bool> {
        let mut state = self.state.lock().unwrap();
        let existed = state.voies.remove(id).is_some();
        state.numeros.retain(|_, n| n.voie_id() != id);
        Ok(existed)
    }

    async fn soft_delete_voie(&self, id: &VoieId, at: DateTime<Utc>) -> anyhow::Result<u64> {
        let mut state = self.state.lock().unwrap();
        if let Some(voie) = state.voies.get_mut(id) {
            voie.set_deleted_at(Some(at));
        }
        let mut count = 0;
        for numero in state.numeros.values_mut() {
            if numero.voie_id() == id && !numero.is_deleted() {
                numero.set_deleted_at(Some(at));
                count += 1;
            }
        }
        Ok(count)
    }

    async fn restore_voie(&self, id: &VoieId, numero_ids: &[NumeroId]) -> anyhow::Result<u64> {
        let mut state = self.state.lock().unwrap();
        if let Some(voie) = state.voies.get_mut(id) {
            voie.set_deleted_at(None);
        }
        let mut count = 0;
        for numero_id in numero_ids {
            if let Some(numero) = state.numeros.get_mut(numero_id) {
                if numero.voie_id() == id && numero.is_deleted() {
                    numero.set_deleted_at(None);
                    count += 1;
                }
            }
        }
        Ok(count)
    }

    async fn convert_voie_to_toponyme(
        &self,
        voie_id: &VoieId,
        toponyme: &Toponyme,
    ) -> anyhow::Result<bool> {
        let mut state = self.state.lock().unwrap();
        let has_numeros = state
            .numeros
            .values()
            .any(|n| n.voie_id() == voie_id && !n.is_deleted());
        if has_numeros || !state.voies.contains_key(voie_id) {
            return Ok(false);
        }
        state.toponymes.insert(*toponyme.id(), toponyme.clone());
        state.voies.remove(voie_id);
        state.numeros.retain(|_, n| n.voie_id() != voie_id);
        Ok(true)
    }

    async fn save_numero(&self, numero: &Numero) -> anyhow::Result<()> {
        self.state.lock().unwrap().numeros.insert(*numero.id(), numero.clone());
        Ok(())
    }

    async fn get_numero(&self, id: &NumeroId) -> anyhow::Result<Option<Numero>> {
        Ok(self.state.lock().unwrap().numeros.get(id).cloned())
    }

    async fn query_numeros(&self, filter: &NumeroFilter) -> anyhow::Result<Vec<Numero>> {
        let state = self.state.lock().unwrap();
        let mut out: Vec<Numero> = state
            .numeros
            .values()
            .filter(|n| n.bal_id() == &filter.bal_id)
            .filter(|n| filter.include_deleted || !n.is_deleted())
            .filter(|n| filter.voie_id.as_ref().map_or(true, |v| n.voie_id() == v))
            .filter(|n| {
                filter
                    .toponyme_id
                    .as_ref()
                    .map_or(true, |t| n.toponyme_id() == Some(t))
            })
            .filter(|n| filter.ids.as_ref().map_or(true, |ids| ids.contains(n.id())))
            .cloned()
            .collect();
        out.sort_by_key(|n| (*n.voie_id(), n.numero()));
        Ok(out)
    }

    async fn count_numeros(&self, bal_id: &BaseLocaleId) -> anyhow::Result<u64> {
        let state = self.state.lock().unwrap();
        Ok(state
            .numeros
            .values()
            .filter(|n| n.bal_id() == bal_id && !n.is_deleted())
            .count() as u64)
    }

    async fn delete_numero(&self, id: &NumeroId) -> anyhow::Result<bool> {
        Ok(self.state.lock().unwrap().numeros.remove(id).is_some())
    }

    async fn update_numeros(
        &self,
        bal_id: &BaseLocaleId,
        ids: &[NumeroId],
        changes: &NumeroChanges,
        at: DateTime<Utc>,
    ) -> anyhow::Result<u64> {
        let mut state = self.state.lock().unwrap();
        let mut count = 0;
        for id in ids {
            let Some(numero) = state.numeros.get_mut(id) else {
                continue;
            };
            if numero.bal_id() != bal_id || numero.is_deleted() {
                continue;
            }
            if let Some(voie_id) = changes.voie_id {
                numero.set_voie(voie_id);
            }
            if let Some(toponyme_id) = changes.toponyme_id {
                numero.set_toponyme(toponyme_id);
            }
            if let Some(kind) = changes.position_type {
                let positions: Vec<Position> = numero
                    .positions()
                    .iter()
                    .cloned()
                    .map(|p| Position { kind, ..p })
                    .collect();
                numero.set_positions(positions);
            }
            if let Some(certifie) = changes.certifie {
                numero.set_certifie(certifie);
            }
            if let Some(comment) = &changes.comment {
                numero.set_comment(comment.clone());
            }
            numero.touch(at);
            count += 1;
        }
        Ok(count)
    }

    async fn soft_delete_numeros(
        &self,
        bal_id: &BaseLocaleId,
        ids: &[NumeroId],
        at: DateTime<Utc>,
    ) -> anyhow::Result<u64> {
        let mut state = self.state.lock().unwrap();
        let mut count = 0;
        for id in ids {
            if let Some(numero) = state.numeros.get_mut(id) {
                if numero.bal_id() == bal_id && !numero.is_deleted() {
                    numero.set_deleted_at(Some(at));
                    count += 1;
                }
            }
        }
        Ok(count)
    }

    async fn delete_numeros(&self, bal_id: &BaseLocaleId, ids: &[NumeroId]) -> anyhow::Result<u64> {
        let mut state = self.state.lock().unwrap();
        let before = state.numeros.len();
        state
            .numeros
            .retain(|id, n| !(ids.contains(id) && n.bal_id() == bal_id));
        Ok((before - state.numeros.len()) as u64)
    }

    async fn save_toponyme(&self, toponyme: &Toponyme) -> anyhow::Result<()> {
        self.state
            .lock()
            .unwrap()
            .toponymes
            .insert(*toponyme.id(), toponyme.clone());
        Ok(())
    }

    async fn get_toponyme(&self, id: &ToponymeId) -> anyhow::Result<Option<Toponyme>> {
        Ok(self.state.lock().unwrap().toponymes.get(id).cloned())
    }

    async fn list_toponymes(&self, bal_id: &BaseLocaleId) -> anyhow::Result<Vec<Toponyme>> {
        let state = self.state.lock().unwrap();
        let mut out: Vec<Toponyme> = state
            .toponymes
            .values()
            .filter(|t| t.bal_id() == bal_id && !t.is_deleted())
            .cloned()
            .collect();
        out.sort_by(|a, b| a.nom().cmp(b.nom()));
        Ok(out)
    }

    async fn delete_toponyme(&self, id: &ToponymeId) -> anyhow::Result<bool> {
        let mut state = self.state.lock().unwrap();
        let existed = state.toponymes.remove(id).is_some();
        for numero in state.numeros.values_mut() {
            if numero.toponyme_id() == Some(id) {
                numero.set_toponyme(None);
            }
        }
        Ok(existed)
    }

    async fn touch_toponyme(&self, id: &ToponymeId, at: DateTime<Utc>) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(toponyme) = state.toponymes.get_mut(id) {
            toponyme.touch(at);
        }
        Ok(())
    }
}

/// Geometry double: vertex mean and min/max box, optionally failing
#[derive(Default)]
pub(crate) struct MeanGeometry {
    pub(crate) fail: bool,
}

impl MeanGeometry {
    pub(crate) fn failing() -> Self {
        Self { fail: true }
    }
}

impl IGeometry for MeanGeometry {
    fn centroid(&self, points: &[GeoPoint]) -> anyhow::Result<GeoPoint> {
        if self.fail || points.is_empty() {
            anyhow::bail!("cannot compute centroid");
        }
        let n = points.len() as f64;
        let lon = points.iter().map(GeoPoint::lon).sum::<f64>() / n;
        let lat = points.iter().map(GeoPoint::lat).sum::<f64>() / n;
        Ok(GeoPoint::new(lon, lat)?)
    }

    fn trace_centroid(&self, trace: &LineTrace) -> anyhow::Result<GeoPoint> {
        self.centroid(trace.points())
    }

    fn bounding_box(&self, points: &[GeoPoint]) -> anyhow::Result<BBox> {
        if self.fail || points.is_empty() {
            anyhow::bail!("cannot compute bounding box");
        }
        let mut bbox = [f64::MAX, f64::MAX, f64::MIN, f64::MIN];
        for p in points {
            bbox[0] = bbox[0].min(p.lon());
            bbox[1] = bbox[1].min(p.lat());
            bbox[2] = bbox[2].max(p.lon());
            bbox[3] = bbox[3].max(p.lat());
        }
        Ok(BBox(bbox))
    }
}

pub(crate) fn point(lon: f64, lat: f64) -> GeoPoint {
    GeoPoint::new(lon, lat).unwrap()
}
