//! balsync Sync - Publication engine
//!
//! Keeps each published Base Adresse Locale consistent with the revision
//! the deposit service holds for its commune.
//!
//! ## Modules
//!
//! - [`engine`] - `synchronize`, `pause` and `resume`
//! - [`reconcile`] - Pure reconciliation decision between local and remote state
//! - [`scheduler`] - Periodic synchronization of every schedulable dataset

pub mod engine;
pub mod reconcile;
pub mod scheduler;

pub use engine::{PublicationEngine, SyncOptions};
pub use reconcile::{decide, Verdict};
pub use scheduler::{SchedulerPass, SyncScheduler};
