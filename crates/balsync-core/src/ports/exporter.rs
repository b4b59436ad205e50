//! Export port (driven/secondary port)
//!
//! Produces the canonical BAL file of a dataset, the exact content
//! uploaded to the deposit service and hashed for change detection.

use crate::domain::BaseLocale;

/// Port trait for the canonical dataset export
///
/// Implementations must be deterministic: exporting an unchanged dataset
/// twice yields byte-identical output, otherwise hash comparison against
/// the remote revision would always report a change.
#[async_trait::async_trait]
pub trait IExporter: Send + Sync {
    /// Exports the live content of a dataset as a BAL CSV file
    async fn export_to_csv(&self, bal: &BaseLocale) -> anyhow::Result<String>;
}
