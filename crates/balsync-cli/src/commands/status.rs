//! Status command - Show synchronization state of datasets
//!
//! Without an id, lists every live dataset with its publication and sync
//! status. With an id, shows one dataset; `--refresh` first reconciles it
//! against the deposit service.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use clap::Args;
use tracing::info;

use balsync_core::domain::{BaseLocale, BaseLocaleId};
use balsync_core::ports::BaseLocaleFilter;

use super::{parse_id, AppContext};
use crate::output::{base_locale_json, base_locale_line, get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Dataset id; all datasets when omitted
    pub id: Option<String>,

    /// Reconcile with the deposit service before printing
    #[arg(long, requires = "id")]
    pub refresh: bool,
}

impl StatusCommand {
    pub async fn execute(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        let ctx = AppContext::open(config_path).await?;
        match &self.id {
            Some(id) => self.show_one(&ctx, parse_id(id)?, format).await,
            None => show_all(&ctx, format).await,
        }
    }

    async fn show_one(
        &self,
        ctx: &AppContext,
        id: BaseLocaleId,
        format: OutputFormat,
    ) -> Result<()> {
        if self.refresh {
            info!(bal_id = %id, "Reconciling before status");
            ctx.engine.reconcile(&id).await?;
        }
        let bal = ctx.base_locales.get(&id).await?;

        let formatter = get_formatter(format.is_json());
        if format.is_json() {
            formatter.print_json(&base_locale_json(&bal));
            return Ok(());
        }

        formatter.success(&format!("Base Adresse Locale {}", bal.id()));
        formatter.info(&format!("Nom:          {}", bal.nom()));
        formatter.info(&format!("Commune:      {}", bal.commune()));
        formatter.info(&format!("Statut:       {}", bal.status()));
        formatter.info(&format!(
            "Habilitation: {}",
            bal.habilitation_id().map(|h| h.as_str()).unwrap_or("-")
        ));
        formatter.info(&format!("Mise à jour:  {}", bal.updated_at().to_rfc3339()));
        match bal.sync() {
            Some(record) => {
                formatter.info(&format!("Sync:         {}", record.status()));
                formatter.info(&format!("En pause:     {}", record.is_paused()));
                formatter.info(&format!(
                    "Révision:     {}",
                    record.last_uploaded_revision_id()
                ));
            }
            None => formatter.info("Sync:         -"),
        }
        Ok(())
    }
}

async fn show_all(ctx: &AppContext, format: OutputFormat) -> Result<()> {
    let datasets = ctx.base_locales.list(&BaseLocaleFilter::new()).await?;
    let counts = count_by_sync_status(&datasets);

    let formatter = get_formatter(format.is_json());
    if format.is_json() {
        let items: Vec<_> = datasets.iter().map(base_locale_json).collect();
        formatter.print_json(&serde_json::json!({
            "total": datasets.len(),
            "bySyncStatus": counts,
            "baseLocales": items,
        }));
        return Ok(());
    }

    formatter.success(&format!("{} Base(s) Adresse(s) Locale(s)", datasets.len()));
    for (status, count) in &counts {
        formatter.info(&format!("{status}: {count}"));
    }
    formatter.info("");
    for bal in &datasets {
        formatter.info(&base_locale_line(bal));
    }
    Ok(())
}

/// Counts datasets per sync status, `none` for never published ones
fn count_by_sync_status(datasets: &[BaseLocale]) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for bal in datasets {
        let key = bal.sync_status().map(|s| s.as_str()).unwrap_or("none");
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
}
