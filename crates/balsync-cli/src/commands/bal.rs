//! Bal command - Dataset lifecycle
//!
//! Creates drafts and demo datasets, attaches habilitations, turns a demo
//! into a draft, soft-deletes and restores, lists and exports datasets.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Subcommand;

use balsync_core::domain::{BaseLocale, BaseLocaleId, CodeCommune, Email, HabilitationId};
use balsync_core::ports::BaseLocaleFilter;
use balsync_core::usecases::CreateBaseLocale;

use super::{parse_id, AppContext};
use crate::output::{base_locale_json, base_locale_line, get_formatter, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum BalCommand {
    /// Create a draft dataset
    Create {
        /// INSEE code of the commune
        commune: String,
        /// Dataset name
        nom: String,
        /// Administrator email (repeatable)
        #[arg(long = "email", required = true)]
        emails: Vec<String>,
    },
    /// Create a demo dataset
    Demo {
        /// INSEE code of the commune
        commune: String,
        /// Dataset name
        #[arg(long)]
        nom: Option<String>,
    },
    /// Attach the habilitation used for publication
    Habilitation {
        /// Dataset id
        id: String,
        /// Habilitation id issued by the deposit service
        habilitation: String,
    },
    /// Turn a demo dataset into a draft
    ToDraft {
        /// Dataset id
        id: String,
        /// Dataset name
        nom: String,
        /// Administrator email (repeatable)
        #[arg(long = "email", required = true)]
        emails: Vec<String>,
    },
    /// Soft-delete a dataset
    Delete {
        /// Dataset id
        id: String,
    },
    /// Restore a soft-deleted dataset
    Restore {
        /// Dataset id
        id: String,
    },
    /// List datasets
    List {
        /// Include soft-deleted datasets
        #[arg(long)]
        deleted: bool,
    },
    /// Print the BAL file of a dataset
    Export {
        /// Dataset id
        id: String,
    },
}

impl BalCommand {
    pub async fn execute(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        let ctx = AppContext::open(config_path).await?;
        let service = &ctx.base_locales;

        match self {
            BalCommand::Create {
                commune,
                nom,
                emails,
            } => {
                let bal = service
                    .create(CreateBaseLocale {
                        nom: nom.clone(),
                        commune: CodeCommune::new(commune.as_str())?,
                        emails: parse_emails(emails)?,
                    })
                    .await?;
                print_one(&bal, "Base Adresse Locale créée", format);
            }
            BalCommand::Demo { commune, nom } => {
                let bal = service
                    .create_demo(CodeCommune::new(commune.as_str())?, nom.clone())
                    .await?;
                print_one(&bal, "Base Adresse Locale de démo créée", format);
            }
            BalCommand::Habilitation { id, habilitation } => {
                let id: BaseLocaleId = parse_id(id)?;
                let habilitation = HabilitationId::new(habilitation.as_str())?;
                let bal = service.attach_habilitation(&id, habilitation).await?;
                print_one(&bal, "Habilitation rattachée", format);
            }
            BalCommand::ToDraft { id, nom, emails } => {
                let id: BaseLocaleId = parse_id(id)?;
                let bal = service
                    .transform_to_draft(&id, nom, parse_emails(emails)?)
                    .await?;
                print_one(&bal, "Base Adresse Locale passée en brouillon", format);
            }
            BalCommand::Delete { id } => {
                let id: BaseLocaleId = parse_id(id)?;
                let bal = service.soft_delete(&id).await?;
                print_one(&bal, "Base Adresse Locale supprimée", format);
            }
            BalCommand::Restore { id } => {
                let id: BaseLocaleId = parse_id(id)?;
                let bal = service.restore(&id).await?;
                print_one(&bal, "Base Adresse Locale restaurée", format);
            }
            BalCommand::List { deleted } => {
                let filter = if *deleted {
                    BaseLocaleFilter::new().including_deleted()
                } else {
                    BaseLocaleFilter::new()
                };
                let datasets = service.list(&filter).await?;
                print_list(&datasets, format);
            }
            BalCommand::Export { id } => {
                let id: BaseLocaleId = parse_id(id)?;
                let bal = service.get(&id).await?;
                let file = ctx
                    .exporter
                    .export_to_csv(&bal)
                    .await
                    .context("Failed to export BAL file")?;
                print!("{file}");
            }
        }
        Ok(())
    }
}

fn parse_emails(values: &[String]) -> Result<Vec<Email>> {
    values
        .iter()
        .map(|v| Email::new(v.as_str()).with_context(|| format!("Invalid email '{v}'")))
        .collect()
}

fn print_one(bal: &BaseLocale, message: &str, format: OutputFormat) {
    let formatter = get_formatter(format.is_json());
    if format.is_json() {
        formatter.print_json(&base_locale_json(bal));
    } else {
        formatter.success(message);
        formatter.info(&base_locale_line(bal));
    }
}

fn print_list(datasets: &[BaseLocale], format: OutputFormat) {
    let formatter = get_formatter(format.is_json());
    if format.is_json() {
        let items: Vec<_> = datasets.iter().map(base_locale_json).collect();
        formatter.print_json(&serde_json::Value::Array(items));
        return;
    }
    if datasets.is_empty() {
        formatter.info("Aucune Base Adresse Locale");
        return;
    }
    for bal in datasets {
        formatter.info(&base_locale_line(bal));
    }
}
