//! Reconciliation between a published dataset and the deposit service
//!
//! [`decide`] classifies a published dataset as synced, outdated or in
//! conflict from three facts: the stored sync record, the dataset
//! `updatedAt`, and the id of the revision currently live for the commune.
//! It performs no I/O; the engine persists the verdict with one
//! conditional write when [`Verdict::changed`] is set.

use chrono::{DateTime, Utc};

use balsync_core::domain::{BaseLocaleStatus, RevisionId, SyncRecord, SyncStatus};
use balsync_core::usecases::{ServiceError, ServiceResult};

/// Precondition message for reconciliation outside synced/outdated
pub const RECONCILE_STATUS_MESSAGE: &str =
    "Le statut de synchronisation doit être \"synced\" ou \"outdated\"";

/// Result of a reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Dataset status to store with the record
    pub status: BaseLocaleStatus,
    /// Sync record after reconciliation
    pub record: SyncRecord,
    /// True if the stored state must be rewritten
    pub changed: bool,
}

/// Fails unless `record` may be reconciled
pub fn ensure_reconcilable(record: &SyncRecord) -> ServiceResult<()> {
    match record.status() {
        SyncStatus::Synced | SyncStatus::Outdated => Ok(()),
        SyncStatus::Conflict => Err(ServiceError::PreconditionFailed(
            RECONCILE_STATUS_MESSAGE.to_string(),
        )),
    }
}

/// Classifies a published dataset against the remote current revision
///
/// A remote revision other than the last one uploaded from here, or no
/// remote revision at all, means someone else published: the record goes
/// to conflict and the dataset to replaced, together.
pub fn decide(
    record: &SyncRecord,
    updated_at: DateTime<Utc>,
    remote_revision: Option<&RevisionId>,
) -> Verdict {
    if remote_revision != Some(record.last_uploaded_revision_id()) {
        return Verdict {
            status: BaseLocaleStatus::Replaced,
            record: record.with_status(SyncStatus::Conflict),
            changed: true,
        };
    }

    let status = if updated_at == record.current_updated() {
        SyncStatus::Synced
    } else {
        SyncStatus::Outdated
    };

    Verdict {
        status: BaseLocaleStatus::Published,
        record: record.with_status(status),
        changed: record.status() != status,
    }
}
