//! Run command - Periodic synchronization
//!
//! Starts the [`SyncScheduler`] on the configured interval and runs until
//! SIGINT or SIGTERM. `--once` runs a single pass and exits.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use balsync_sync::{SchedulerPass, SyncScheduler};

use super::AppContext;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct RunCommand {
    /// Run a single pass and exit
    #[arg(long)]
    pub once: bool,

    /// Print metrics in Prometheus text format after a single pass
    #[arg(long, requires = "once")]
    pub metrics: bool,
}

impl RunCommand {
    pub async fn execute(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        let ctx = AppContext::open(config_path).await?;
        let formatter = get_formatter(format.is_json());

        let scheduler = SyncScheduler::new(
            ctx.engine.clone(),
            ctx.repository.clone(),
            Duration::from_secs(ctx.config.sync.poll_interval),
        )
        .with_metrics(ctx.metrics.clone());

        if self.once {
            let pass = scheduler.run_once().await?;
            if format.is_json() {
                formatter.print_json(&pass_json(&pass));
            } else {
                formatter.success(&format!(
                    "{} synchronisée(s), {} échec(s) sur {}",
                    pass.synchronized, pass.failed, pass.selected
                ));
            }
            if self.metrics {
                let text = ctx.metrics.encode().context("Failed to encode metrics")?;
                print!("{text}");
            }
            return Ok(());
        }

        if !ctx.config.sync.enabled {
            formatter.warn("sync.enabled is false, scheduler not started");
            return Ok(());
        }

        let shutdown = CancellationToken::new();
        let signal_token = shutdown.clone();
        tokio::spawn(async move {
            shutdown_signal(signal_token).await;
        });

        scheduler.run(shutdown).await;
        info!("balsync scheduler shut down gracefully");
        Ok(())
    }
}

fn pass_json(pass: &SchedulerPass) -> serde_json::Value {
    serde_json::json!({
        "selected": pass.selected,
        "synchronized": pass.synchronized,
        "failed": pass.failed,
    })
}

/// Cancels `token` on SIGINT or SIGTERM
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}
