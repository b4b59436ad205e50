//! Publication sync record
//!
//! A [`SyncRecord`] is embedded in every published dataset and tracks how
//! the local data relates to the revision last uploaded to the deposit
//! service. Records are immutable values: every transition returns a new
//! record which the caller persists with a conditional update.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{errors::DomainError, newtypes::RevisionId};

/// Publication state of a dataset relative to the deposit service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Remote revision matches the local data
    Synced,
    /// Local data changed since the last upload
    Outdated,
    /// Someone else published on top of our last revision
    Conflict,
}

impl SyncStatus {
    /// Returns true if pause/resume may be toggled in this status
    pub fn allows_pause_toggle(&self) -> bool {
        matches!(self, SyncStatus::Synced | SyncStatus::Outdated)
    }

    /// Lowercase storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Synced => "synced",
            SyncStatus::Outdated => "outdated",
            SyncStatus::Conflict => "conflict",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "synced" => Ok(SyncStatus::Synced),
            "outdated" => Ok(SyncStatus::Outdated),
            "conflict" => Ok(SyncStatus::Conflict),
            other => Err(DomainError::UnknownValue {
                kind: "sync status",
                value: other.to_string(),
            }),
        }
    }
}

/// Sync state embedded in a published dataset
///
/// Serialized standalone as
/// `{status, isPaused, currentUpdated, lastUploadedRevisionId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRecord {
    status: SyncStatus,
    is_paused: bool,
    /// Snapshot of the dataset `updatedAt` at the last reconciliation
    current_updated: DateTime<Utc>,
    last_uploaded_revision_id: RevisionId,
}

impl SyncRecord {
    /// A freshly synced record, as written after every successful upload
    pub fn synced(current_updated: DateTime<Utc>, revision_id: RevisionId) -> Self {
        Self {
            status: SyncStatus::Synced,
            is_paused: false,
            current_updated,
            last_uploaded_revision_id: revision_id,
        }
    }

    /// Reconstitutes a record from storage
    pub fn from_parts(
        status: SyncStatus,
        is_paused: bool,
        current_updated: DateTime<Utc>,
        last_uploaded_revision_id: RevisionId,
    ) -> Self {
        // A conflict is never stored unpaused
        let is_paused = is_paused || status == SyncStatus::Conflict;
        Self {
            status,
            is_paused,
            current_updated,
            last_uploaded_revision_id,
        }
    }

    // --- Getters ---

    /// Returns the sync status
    pub fn status(&self) -> SyncStatus {
        self.status
    }

    /// Returns true if automatic synchronization is paused
    pub fn is_paused(&self) -> bool {
        self.is_paused
    }

    /// Returns the `updatedAt` snapshot taken at the last reconciliation
    pub fn current_updated(&self) -> DateTime<Utc> {
        self.current_updated
    }

    /// Returns the id of the last revision uploaded by this system
    pub fn last_uploaded_revision_id(&self) -> &RevisionId {
        &self.last_uploaded_revision_id
    }

    // --- Transitions ---

    /// Returns a copy with a new status
    ///
    /// Entering [`SyncStatus::Conflict`] forces the pause flag on.
    #[must_use]
    pub fn with_status(&self, status: SyncStatus) -> Self {
        Self {
            status,
            is_paused: self.is_paused || status == SyncStatus::Conflict,
            ..self.clone()
        }
    }

    /// Returns a copy with the pause flag toggled
    ///
    /// # Errors
    /// Returns `InvalidState` unless the status is synced or outdated
    pub fn with_paused(&self, paused: bool) -> Result<Self, DomainError> {
        if !self.status.allows_pause_toggle() {
            return Err(DomainError::InvalidState {
                from: self.status.to_string(),
                to: if paused { "paused" } else { "resumed" }.to_string(),
            });
        }
        Ok(Self {
            is_paused: paused,
            ..self.clone()
        })
    }
}
