//! Voie command - Voie maintenance
//!
//! Creates voies (optionally metric, with a drawn trace), soft-deletes and
//! restores them, converts a voie into a toponyme and prints its bounding
//! box.

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Subcommand;

use balsync_core::domain::{
    BaseLocaleId, GeoPoint, LineTrace, NumeroId, TypeNumerotation, Voie, VoieId,
};
use balsync_core::usecases::CreateVoie;

use super::{parse_id, AppContext};
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum VoieCommand {
    /// Create a voie in a dataset
    Create {
        /// Dataset id
        bal: String,
        /// Voie name
        nom: String,
        /// Trace as `lon,lat;lon,lat;...`
        #[arg(long)]
        trace: Option<String>,
        /// Numbers are distances in meters along the trace
        #[arg(long, requires = "trace")]
        metrique: bool,
    },
    /// Soft-delete a voie and its numeros
    Delete {
        /// Voie id
        id: String,
    },
    /// Restore a soft-deleted voie
    Restore {
        /// Voie id
        id: String,
        /// Numero to restore with the voie (repeatable)
        #[arg(long = "numero")]
        numeros: Vec<String>,
    },
    /// Convert a voie without numeros into a toponyme
    ToToponyme {
        /// Voie id
        id: String,
    },
    /// Print the bounding box of a voie
    Bbox {
        /// Voie id
        id: String,
    },
}

impl VoieCommand {
    pub async fn execute(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        let ctx = AppContext::open(config_path).await?;
        let service = &ctx.voies;
        let formatter = get_formatter(format.is_json());

        match self {
            VoieCommand::Create {
                bal,
                nom,
                trace,
                metrique,
            } => {
                let bal_id: BaseLocaleId = parse_id(bal)?;
                let input = CreateVoie {
                    nom: nom.clone(),
                    type_numerotation: metrique.then_some(TypeNumerotation::Metrique),
                    trace: trace.as_deref().map(parse_trace).transpose()?,
                    ..CreateVoie::default()
                };
                let voie = service.create(&bal_id, input).await?;
                print_voie(&voie, "Voie créée", format);
            }
            VoieCommand::Delete { id } => {
                let id: VoieId = parse_id(id)?;
                let voie = service.soft_delete(&id).await?;
                print_voie(&voie, "Voie supprimée", format);
            }
            VoieCommand::Restore { id, numeros } => {
                let id: VoieId = parse_id(id)?;
                let numero_ids = numeros
                    .iter()
                    .map(|n| parse_id::<NumeroId>(n))
                    .collect::<Result<Vec<_>>>()?;
                let voie = service.restore(&id, &numero_ids).await?;
                print_voie(&voie, "Voie restaurée", format);
            }
            VoieCommand::ToToponyme { id } => {
                let id: VoieId = parse_id(id)?;
                let toponyme = service.convert_to_toponyme(&id).await?;
                if format.is_json() {
                    formatter.print_json(&serde_json::json!({
                        "id": toponyme.id().to_string(),
                        "nom": toponyme.nom(),
                    }));
                } else {
                    formatter.success(&format!("Toponyme créé : {}", toponyme.nom()));
                    formatter.info(&toponyme.id().to_string());
                }
            }
            VoieCommand::Bbox { id } => {
                let id: VoieId = parse_id(id)?;
                let bbox = service.bbox(&id).await?;
                match (bbox, format.is_json()) {
                    (Some(b), true) => formatter.print_json(&serde_json::json!([
                        b.min_x(),
                        b.min_y(),
                        b.max_x(),
                        b.max_y()
                    ])),
                    (None, true) => formatter.print_json(&serde_json::Value::Null),
                    (Some(b), false) => formatter.info(&format!(
                        "{} {} {} {}",
                        b.min_x(),
                        b.min_y(),
                        b.max_x(),
                        b.max_y()
                    )),
                    (None, false) => formatter.info("Aucune géométrie"),
                }
            }
        }
        Ok(())
    }
}

/// Parses `lon,lat;lon,lat;...`
fn parse_trace(value: &str) -> Result<LineTrace> {
    let mut points = Vec::new();
    for pair in value.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        let Some((lon, lat)) = pair.split_once(',') else {
            bail!("Invalid trace point '{pair}', expected lon,lat");
        };
        let lon: f64 = lon
            .trim()
            .parse()
            .with_context(|| format!("Invalid longitude in '{pair}'"))?;
        let lat: f64 = lat
            .trim()
            .parse()
            .with_context(|| format!("Invalid latitude in '{pair}'"))?;
        points.push(GeoPoint::new(lon, lat)?);
    }
    Ok(LineTrace::new(points)?)
}

fn print_voie(voie: &Voie, message: &str, format: OutputFormat) {
    let formatter = get_formatter(format.is_json());
    if format.is_json() {
        formatter.print_json(&serde_json::json!({
            "id": voie.id().to_string(),
            "nom": voie.nom(),
            "typeNumerotation": voie.type_numerotation().as_str(),
            "centroid": voie.centroid().map(|c| [c.lon(), c.lat()]),
            "deletedAt": voie.deleted_at(),
        }));
    } else {
        formatter.success(message);
        formatter.info(&format!("{}  {}", voie.id(), voie.nom()));
    }
}
