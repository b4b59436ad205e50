//! Sync, pause and resume commands
//!
//! `balsync sync <id>` publishes a draft for the first time, or reconciles
//! a published dataset and republishes it when its content changed.
//! `--force` republishes a dataset whose remote revision was replaced.

use std::path::Path;

use anyhow::Result;
use clap::Args;
use tracing::info;

use balsync_core::domain::{BaseLocale, BaseLocaleId};
use balsync_sync::SyncOptions;

use super::{parse_id, AppContext};
use crate::output::{base_locale_json, base_locale_line, get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Dataset id
    pub id: String,

    /// Republish even if another revision replaced ours
    #[arg(long)]
    pub force: bool,
}

impl SyncCommand {
    pub async fn execute(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        let id: BaseLocaleId = parse_id(&self.id)?;
        let ctx = AppContext::open(config_path).await?;

        let options = if self.force {
            SyncOptions::forced()
        } else {
            SyncOptions::default()
        };
        info!(bal_id = %id, force = self.force, "Synchronizing base locale");

        let bal = ctx.engine.synchronize(&id, options).await?;
        print_result(&bal, "Synchronisation terminée", format);
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct PauseCommand {
    /// Dataset id
    pub id: String,
}

impl PauseCommand {
    pub async fn execute(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        let id: BaseLocaleId = parse_id(&self.id)?;
        let ctx = AppContext::open(config_path).await?;

        let bal = ctx.engine.pause(&id).await?;
        print_result(&bal, "Synchronisation mise en pause", format);
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct ResumeCommand {
    /// Dataset id
    pub id: String,
}

impl ResumeCommand {
    pub async fn execute(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        let id: BaseLocaleId = parse_id(&self.id)?;
        let ctx = AppContext::open(config_path).await?;

        let bal = ctx.engine.resume(&id).await?;
        print_result(&bal, "Synchronisation reprise", format);
        Ok(())
    }
}

fn print_result(bal: &BaseLocale, message: &str, format: OutputFormat) {
    let formatter = get_formatter(format.is_json());
    if format.is_json() {
        formatter.print_json(&base_locale_json(bal));
    } else {
        formatter.success(message);
        formatter.info(&base_locale_line(bal));
    }
}
