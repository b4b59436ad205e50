//! Records owned by the deposit service
//!
//! Habilitations and revisions are read-only from this system's point of
//! view: they are fetched through [`IDepositClient`](crate::ports::IDepositClient)
//! and only inspected to decide whether a dataset may be published.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{ContentHash, HabilitationId, RevisionId};

/// Status of a habilitation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HabilitationStatus {
    /// Granted, publication allowed until expiry
    Accepted,
    /// Waiting for the commune to confirm
    Pending,
    /// Refused
    Rejected,
    /// Any status this system does not know about
    #[serde(other)]
    Other,
}

/// Authorization to publish for one commune
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habilitation {
    /// Habilitation identifier
    pub id: HabilitationId,
    /// Current status
    pub status: HabilitationStatus,
    /// Expiry, `None` when never accepted
    pub expires_at: Option<DateTime<Utc>>,
}

impl Habilitation {
    /// Returns true if the habilitation is accepted
    pub fn is_accepted(&self) -> bool {
        self.status == HabilitationStatus::Accepted
    }

    /// Returns true if the habilitation has expired at `now`
    ///
    /// A missing expiry counts as already expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= now,
            None => true,
        }
    }
}

/// A file attached to a revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionFile {
    /// File type, `"bal"` for the address file
    #[serde(rename = "type")]
    pub kind: String,
    /// Content hash computed by the deposit service
    pub hash: Option<ContentHash>,
}

/// One published snapshot of a commune's addresses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    /// Revision identifier
    pub id: RevisionId,
    /// Attached files
    #[serde(default)]
    pub files: Vec<RevisionFile>,
}

impl Revision {
    /// File type of the canonical BAL export
    pub const BAL_FILE: &'static str = "bal";

    /// Hash of the attached BAL file, if the revision carries one
    pub fn bal_file_hash(&self) -> Option<&ContentHash> {
        self.files
            .iter()
            .find(|f| f.kind == Self::BAL_FILE)
            .and_then(|f| f.hash.as_ref())
    }
}
