//! balsync Export - Canonical BAL file
//!
//! Writes the live content of a dataset as the semicolon-separated BAL
//! file uploaded to the deposit service. The output is the input of the
//! content hash used for change detection, so it is fully deterministic:
//! rows are sorted by voie name, then number, then suffix, and every
//! column is derived from stored fields only.
//!
//! ## Format
//!
//! One row per numero position. A numero without positions still gets a
//! row, with empty `position`, `long` and `lat` columns.
//!
//! | Column | Source |
//! |--------|--------|
//! | `cle_interop` | `{commune}_xxxx_{numero:05}[_{suffixe}]`, lowercase |
//! | `commune_insee` | dataset commune |
//! | `voie_nom` | voie name |
//! | `lieudit_complement_nom` | attached toponyme name |
//! | `numero` / `suffixe` | numero |
//! | `position` | position type label |
//! | `long` / `lat` | WGS84 coordinates |
//! | `source` | position source, `commune` by default |
//! | `date_der_maj` | numero `updatedAt`, `YYYY-MM-DD` |
//! | `certification_commune` | `1` or `0` |

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use tracing::debug;

use balsync_core::domain::{BaseLocale, Numero, Position, ToponymeId, Voie, VoieId};
use balsync_core::ports::{IAddressRepository, IExporter, NumeroFilter};

/// Column names, in file order
pub const BAL_HEADER: [&str; 12] = [
    "cle_interop",
    "commune_insee",
    "voie_nom",
    "lieudit_complement_nom",
    "numero",
    "suffixe",
    "position",
    "long",
    "lat",
    "source",
    "date_der_maj",
    "certification_commune",
];

/// Source written when a position carries none
const DEFAULT_SOURCE: &str = "commune";

/// Unknown FANTOIR part of the interoperability key
const UNKNOWN_FANTOIR: &str = "xxxx";

#[derive(Debug, Serialize)]
struct BalRow<'a> {
    cle_interop: String,
    commune_insee: &'a str,
    voie_nom: &'a str,
    lieudit_complement_nom: &'a str,
    numero: u32,
    suffixe: &'a str,
    position: &'a str,
    long: Option<f64>,
    lat: Option<f64>,
    source: &'a str,
    date_der_maj: String,
    certification_commune: u8,
}

/// Builds the interoperability key of a numero
pub fn cle_interop(commune: &str, numero: &Numero) -> String {
    let mut key = format!("{}_{}_{:05}", commune, UNKNOWN_FANTOIR, numero.numero());
    if let Some(suffixe) = numero.suffixe() {
        key.push('_');
        key.push_str(suffixe);
    }
    key.to_lowercase()
}

/// [`IExporter`] reading the dataset through the repository port
pub struct CsvExporter {
    repository: Arc<dyn IAddressRepository + Send + Sync>,
}

impl CsvExporter {
    pub fn new(repository: Arc<dyn IAddressRepository + Send + Sync>) -> Self {
        Self { repository }
    }

    fn rows<'a>(
        commune: &'a str,
        voie: &'a Voie,
        toponyme: &'a str,
        numero: &'a Numero,
    ) -> Vec<BalRow<'a>> {
        let row = |position: Option<&'a Position>| BalRow {
            cle_interop: cle_interop(commune, numero),
            commune_insee: commune,
            voie_nom: voie.nom(),
            lieudit_complement_nom: toponyme,
            numero: numero.numero(),
            suffixe: numero.suffixe().unwrap_or_default(),
            position: position.map(|p| p.kind.as_str()).unwrap_or_default(),
            long: position.map(|p| p.point.lon()),
            lat: position.map(|p| p.point.lat()),
            source: position
                .and_then(|p| p.source.as_deref())
                .unwrap_or(DEFAULT_SOURCE),
            date_der_maj: numero.updated_at().format("%Y-%m-%d").to_string(),
            certification_commune: u8::from(numero.certifie()),
        };

        if numero.positions().is_empty() {
            vec![row(None)]
        } else {
            numero.positions().iter().map(|p| row(Some(p))).collect()
        }
    }
}

#[async_trait::async_trait]
impl IExporter for CsvExporter {
    async fn export_to_csv(&self, bal: &BaseLocale) -> Result<String> {
        let voies = self
            .repository
            .list_voies(bal.id())
            .await
            .context("Failed to list voies for export")?;
        let toponymes = self
            .repository
            .list_toponymes(bal.id())
            .await
            .context("Failed to list toponymes for export")?;
        let mut numeros = self
            .repository
            .query_numeros(&NumeroFilter::for_bal(*bal.id()))
            .await
            .context("Failed to list numeros for export")?;

        let voies_by_id: HashMap<&VoieId, &Voie> = voies.iter().map(|v| (v.id(), v)).collect();
        let toponyme_names: HashMap<&ToponymeId, &str> =
            toponymes.iter().map(|t| (t.id(), t.nom())).collect();

        // Numeros of a soft-deleted voie are not part of the file
        numeros.retain(|n| voies_by_id.contains_key(n.voie_id()));
        numeros.sort_by(|a, b| {
            let voie_a = voies_by_id.get(a.voie_id()).map(|v| v.nom());
            let voie_b = voies_by_id.get(b.voie_id()).map(|v| v.nom());
            voie_a
                .cmp(&voie_b)
                .then(a.voie_id().to_string().cmp(&b.voie_id().to_string()))
                .then(a.numero().cmp(&b.numero()))
                .then(a.suffixe().cmp(&b.suffixe()))
        });

        let commune = bal.commune().as_str();
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b';')
            .has_headers(false)
            .from_writer(Vec::new());
        writer
            .write_record(BAL_HEADER)
            .context("Failed to write BAL header")?;

        let mut row_count = 0usize;
        for numero in &numeros {
            let Some(voie) = voies_by_id.get(numero.voie_id()) else {
                continue;
            };
            let toponyme = numero
                .toponyme_id()
                .and_then(|id| toponyme_names.get(id).copied())
                .unwrap_or_default();
            for row in Self::rows(commune, voie, toponyme, numero) {
                writer.serialize(row).context("Failed to write BAL row")?;
                row_count += 1;
            }
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| anyhow!("Failed to flush BAL file: {}", e.error()))?;
        let file = String::from_utf8(bytes).context("BAL file is not valid UTF-8")?;

        debug!(bal_id = %bal.id(), rows = row_count, bytes = file.len(), "Exported BAL file");
        Ok(file)
    }
}
