//! balsync Telemetry - Publication metrics
//!
//! Provides `MetricsRegistry`: Prometheus counters, gauges and histograms
//! for the synchronization engine and the scheduler. The registry is
//! rendered in the text exposition format on demand (`balsync metrics`).

pub mod metrics;

pub use metrics::{MetricsRegistry, PublicationKind, SyncOutcome};
