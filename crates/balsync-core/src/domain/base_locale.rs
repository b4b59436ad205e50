//! BaseLocale domain entity
//!
//! A Base Adresse Locale is one commune's address dataset: the root
//! aggregate owning voies, numeros and toponymes, and the unit of
//! publication to the deposit service.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    errors::DomainError,
    newtypes::{BaseLocaleId, CodeCommune, Email, HabilitationId},
    sync::{SyncRecord, SyncStatus},
};

/// Lifecycle status of a dataset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseLocaleStatus {
    /// Being edited, never published
    #[default]
    Draft,
    /// Published on the deposit service
    Published,
    /// Sandbox dataset, can never be published
    Demo,
    /// Another revision was published on top of ours
    Replaced,
}

impl BaseLocaleStatus {
    /// Lowercase storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            BaseLocaleStatus::Draft => "draft",
            BaseLocaleStatus::Published => "published",
            BaseLocaleStatus::Demo => "demo",
            BaseLocaleStatus::Replaced => "replaced",
        }
    }
}

impl fmt::Display for BaseLocaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BaseLocaleStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(BaseLocaleStatus::Draft),
            "published" => Ok(BaseLocaleStatus::Published),
            "demo" => Ok(BaseLocaleStatus::Demo),
            "replaced" => Ok(BaseLocaleStatus::Replaced),
            other => Err(DomainError::UnknownValue {
                kind: "base locale status",
                value: other.to_string(),
            }),
        }
    }
}

/// One commune's address dataset
///
/// Dataset values are snapshots: the sync engine reads one, decides, and
/// writes through the repository instead of mutating it in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseLocale {
    id: BaseLocaleId,
    nom: String,
    commune: CodeCommune,
    emails: Vec<Email>,
    status: BaseLocaleStatus,
    habilitation_id: Option<HabilitationId>,
    sync: Option<SyncRecord>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl BaseLocale {
    /// Creates a new draft dataset
    ///
    /// # Errors
    /// Returns `ValidationFailed` if the name is blank or no email is given
    pub fn new(
        nom: impl Into<String>,
        commune: CodeCommune,
        emails: Vec<Email>,
    ) -> Result<Self, DomainError> {
        let nom = nom.into().trim().to_string();
        if nom.is_empty() {
            return Err(DomainError::ValidationFailed(
                "A Base Adresse Locale needs a name".to_string(),
            ));
        }
        if emails.is_empty() {
            return Err(DomainError::ValidationFailed(
                "A Base Adresse Locale needs at least one email".to_string(),
            ));
        }

        let now = Utc::now();
        Ok(Self {
            id: BaseLocaleId::new(),
            nom,
            commune,
            emails: dedup_emails(emails),
            status: BaseLocaleStatus::Draft,
            habilitation_id: None,
            sync: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    /// Creates a demo dataset, without name or contact
    pub fn new_demo(commune: CodeCommune, nom: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: BaseLocaleId::new(),
            nom: nom.unwrap_or_default(),
            commune,
            emails: Vec::new(),
            status: BaseLocaleStatus::Demo,
            habilitation_id: None,
            sync: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Creates a BaseLocale with a specific ID (for reconstitution from storage)
    pub fn with_id(
        id: BaseLocaleId,
        nom: impl Into<String>,
        commune: CodeCommune,
        status: BaseLocaleStatus,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            nom: nom.into(),
            commune,
            emails: Vec::new(),
            status,
            habilitation_id: None,
            sync: None,
            created_at,
            updated_at,
            deleted_at: None,
        }
    }

    // --- Getters ---

    /// Returns the dataset identifier
    pub fn id(&self) -> &BaseLocaleId {
        &self.id
    }

    /// Returns the dataset display name
    pub fn nom(&self) -> &str {
        &self.nom
    }

    /// Returns the INSEE code of the commune
    pub fn commune(&self) -> &CodeCommune {
        &self.commune
    }

    /// Returns the notification addresses
    pub fn emails(&self) -> &[Email] {
        &self.emails
    }

    /// Returns the lifecycle status
    pub fn status(&self) -> BaseLocaleStatus {
        self.status
    }

    /// Returns the attached habilitation, if any
    pub fn habilitation_id(&self) -> Option<&HabilitationId> {
        self.habilitation_id.as_ref()
    }

    /// Returns the sync record, if the dataset was ever published
    pub fn sync(&self) -> Option<&SyncRecord> {
        self.sync.as_ref()
    }

    /// Shortcut for the sync record status
    pub fn sync_status(&self) -> Option<SyncStatus> {
        self.sync.as_ref().map(SyncRecord::status)
    }

    /// Returns when the dataset was created
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the dataset or one of its children last changed
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the soft-delete timestamp
    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    /// Returns true if the dataset is soft-deleted
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Returns true if the sync record says automatic sync is paused
    pub fn is_sync_paused(&self) -> bool {
        self.sync.as_ref().is_some_and(SyncRecord::is_paused)
    }

    // --- Mutators ---

    /// Replaces the notification addresses (duplicates removed)
    pub fn set_emails(&mut self, emails: Vec<Email>) {
        self.emails = dedup_emails(emails);
    }

    /// Sets the lifecycle status
    ///
    /// Used when reconstituting from storage; transitions driven by
    /// publication go through the repository's conditional update.
    pub fn set_status(&mut self, status: BaseLocaleStatus) {
        self.status = status;
    }

    /// Attaches or detaches a habilitation
    pub fn set_habilitation(&mut self, habilitation_id: Option<HabilitationId>) {
        self.habilitation_id = habilitation_id;
    }

    /// Sets the sync record
    pub fn set_sync(&mut self, sync: Option<SyncRecord>) {
        self.sync = sync;
    }

    /// Sets `updatedAt`
    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }

    /// Sets the soft-delete timestamp
    pub fn set_deleted_at(&mut self, at: Option<DateTime<Utc>>) {
        self.deleted_at = at;
    }

    /// Turns a demo dataset into a regular draft
    ///
    /// # Errors
    /// Returns `InvalidState` unless the dataset is a demo, and
    /// `ValidationFailed` if the name is blank or no email is given
    pub fn transform_to_draft(
        &mut self,
        nom: impl Into<String>,
        emails: Vec<Email>,
    ) -> Result<(), DomainError> {
        if self.status != BaseLocaleStatus::Demo {
            return Err(DomainError::InvalidState {
                from: self.status.to_string(),
                to: BaseLocaleStatus::Draft.to_string(),
            });
        }
        let nom = nom.into().trim().to_string();
        if nom.is_empty() || emails.is_empty() {
            return Err(DomainError::ValidationFailed(
                "A name and at least one email are required".to_string(),
            ));
        }

        self.nom = nom;
        self.emails = dedup_emails(emails);
        self.status = BaseLocaleStatus::Draft;
        self.updated_at = Utc::now();
        Ok(())
    }
}

fn dedup_emails(emails: Vec<Email>) -> Vec<Email> {
    let mut out: Vec<Email> = Vec::with_capacity(emails.len());
    for email in emails {
        if !out.contains(&email) {
            out.push(email);
        }
    }
    out
}
