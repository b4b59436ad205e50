//! Prometheus metrics registry for balsync
//!
//! Typed, labeled metrics for every observable step of a synchronization:
//! the outcome of each `synchronize` call, publications sent to the
//! deposit service, reconciliation verdicts and scheduler passes.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

/// How a `synchronize` call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// A new revision was published
    Published,
    /// Local and remote content already matched
    AlreadySynced,
    /// Nothing to upload (conflict without force, synced, draft refused...)
    Unchanged,
    /// The call returned an error
    Failed,
}

impl SyncOutcome {
    fn label(&self) -> &'static str {
        match self {
            SyncOutcome::Published => "published",
            SyncOutcome::AlreadySynced => "already_synced",
            SyncOutcome::Unchanged => "unchanged",
            SyncOutcome::Failed => "failed",
        }
    }
}

/// Why a revision was published
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicationKind {
    /// First publication of a draft
    First,
    /// Republication of outdated content
    Update,
    /// Forced republication out of a conflict
    Forced,
}

impl PublicationKind {
    fn label(&self) -> &'static str {
        match self {
            PublicationKind::First => "first",
            PublicationKind::Update => "update",
            PublicationKind::Forced => "forced",
        }
    }
}

/// Central metrics registry holding all Prometheus metrics.
pub struct MetricsRegistry {
    registry: Registry,
    /// Counter: `synchronize` calls by outcome
    pub sync_runs_total: IntCounterVec,
    /// Counter: revisions published by kind
    pub publications_total: IntCounterVec,
    /// Counter: reconciliation verdicts by sync status
    pub reconciliations_total: IntCounterVec,
    /// Counter: conditional sync writes lost to a concurrent update
    pub concurrent_updates_total: IntCounter,
    /// Gauge: datasets picked by the last scheduler pass
    pub scheduled_datasets: IntGauge,
    /// Histogram: `synchronize` duration in seconds
    pub sync_duration_seconds: HistogramVec,
}

impl MetricsRegistry {
    /// Creates a new `MetricsRegistry` with all metrics registered.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new_custom(Some("balsync".to_string()), None)?;

        let sync_runs_total = IntCounterVec::new(
            Opts::new("sync_runs_total", "Total synchronize calls"),
            &["outcome"],
        )?;
        registry.register(Box::new(sync_runs_total.clone()))?;

        let publications_total = IntCounterVec::new(
            Opts::new("publications_total", "Total revisions published"),
            &["kind"],
        )?;
        registry.register(Box::new(publications_total.clone()))?;

        let reconciliations_total = IntCounterVec::new(
            Opts::new("reconciliations_total", "Reconciliation verdicts"),
            &["status"],
        )?;
        registry.register(Box::new(reconciliations_total.clone()))?;

        let concurrent_updates_total = IntCounter::with_opts(Opts::new(
            "concurrent_updates_total",
            "Sync writes lost to a concurrent update",
        ))?;
        registry.register(Box::new(concurrent_updates_total.clone()))?;

        let scheduled_datasets = IntGauge::with_opts(Opts::new(
            "scheduled_datasets",
            "Datasets picked by the last scheduler pass",
        ))?;
        registry.register(Box::new(scheduled_datasets.clone()))?;

        let sync_duration_seconds = HistogramVec::new(
            HistogramOpts::new("sync_duration_seconds", "Synchronize duration in seconds")
                .buckets(vec![0.1, 0.5, 2.0, 10.0, 60.0, f64::INFINITY]),
            &["outcome"],
        )?;
        registry.register(Box::new(sync_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            sync_runs_total,
            publications_total,
            reconciliations_total,
            concurrent_updates_total,
            scheduled_datasets,
            sync_duration_seconds,
        })
    }

    // ========================================================================
    // Recording helpers
    // ========================================================================

    /// Record the outcome and duration of a `synchronize` call.
    pub fn record_sync(&self, outcome: SyncOutcome, duration_secs: f64) {
        self.sync_runs_total
            .with_label_values(&[outcome.label()])
            .inc();
        self.sync_duration_seconds
            .with_label_values(&[outcome.label()])
            .observe(duration_secs);
    }

    /// Record a published revision.
    pub fn record_publication(&self, kind: PublicationKind) {
        self.publications_total
            .with_label_values(&[kind.label()])
            .inc();
    }

    /// Record a reconciliation verdict (`synced`, `outdated`, `conflict`).
    pub fn record_reconciliation(&self, status: &str) {
        self.reconciliations_total
            .with_label_values(&[status])
            .inc();
    }

    /// Record a lost conditional write.
    pub fn record_concurrent_update(&self) {
        self.concurrent_updates_total.inc();
    }

    /// Set the number of datasets picked by a scheduler pass.
    pub fn set_scheduled_datasets(&self, count: usize) {
        self.scheduled_datasets
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    // ========================================================================
    // Encoding
    // ========================================================================

    /// Encode all metrics in Prometheus text exposition format.
    pub fn encode(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
