//! Periodic synchronization of published datasets
//!
//! The [`SyncScheduler`] wakes up on a fixed interval, lists every live
//! published dataset whose sync is synced or outdated and not paused, and
//! runs a non-forced [`synchronize`](PublicationEngine::synchronize) on each.
//!
//! ## Flow
//!
//! ```text
//! interval tick ──→ query schedulable datasets ──→ synchronize(id) for each
//!       ▲                                                │
//!       └──────────── until the CancellationToken fires ─┘
//! ```
//!
//! A failure on one dataset is logged and counted; the pass goes on.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use balsync_core::ports::{BaseLocaleFilter, IAddressRepository};
use balsync_telemetry::MetricsRegistry;

use crate::engine::{PublicationEngine, SyncOptions};

/// Summary of one scheduler pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerPass {
    /// Datasets selected for synchronization
    pub selected: usize,
    /// Datasets synchronized without error
    pub synchronized: usize,
    /// Datasets whose synchronization failed
    pub failed: usize,
}

/// Runs synchronization passes on an interval
pub struct SyncScheduler {
    engine: Arc<PublicationEngine>,
    repository: Arc<dyn IAddressRepository + Send + Sync>,
    interval: Duration,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl SyncScheduler {
    /// Creates a scheduler running a pass every `interval`
    pub fn new(
        engine: Arc<PublicationEngine>,
        repository: Arc<dyn IAddressRepository + Send + Sync>,
        interval: Duration,
    ) -> Self {
        info!(interval_secs = interval.as_secs(), "Creating sync scheduler");
        Self {
            engine,
            repository,
            interval,
            metrics: None,
        }
    }

    /// Records pass sizes in `metrics`
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Runs one synchronization pass
    ///
    /// # Errors
    /// Fails only if the schedulable datasets cannot be listed.
    pub async fn run_once(&self) -> anyhow::Result<SchedulerPass> {
        let datasets = self
            .repository
            .query_base_locales(&BaseLocaleFilter::schedulable())
            .await?;

        let mut pass = SchedulerPass {
            selected: datasets.len(),
            ..SchedulerPass::default()
        };
        if let Some(metrics) = &self.metrics {
            metrics.set_scheduled_datasets(pass.selected);
        }

        for bal in &datasets {
            match self
                .engine
                .synchronize(bal.id(), SyncOptions::default())
                .await
            {
                Ok(_) => pass.synchronized += 1,
                Err(e) => {
                    pass.failed += 1;
                    warn!(bal_id = %bal.id(), error = %e, "Scheduled synchronization failed");
                }
            }
        }

        info!(
            selected = pass.selected,
            synchronized = pass.synchronized,
            failed = pass.failed,
            "Scheduler pass complete"
        );
        Ok(pass)
    }

    /// Runs passes until `shutdown` is cancelled
    ///
    /// The first pass starts immediately.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!("Sync scheduler starting");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested, scheduler stopping");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once().await {
                        error!(error = %format!("{e:#}"), "Scheduler pass failed");
                    }
                }
            }
        }

        info!("Sync scheduler stopped");
    }
}
