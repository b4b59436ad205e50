//! Address repository port (driven/secondary port)
//!
//! This module defines the interface for persisting datasets and their
//! child records (voies, numeros, toponymes).
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific
//!   and don't need domain-level classification.
//! - Sync-record writes are conditional: [`IAddressRepository::update_sync`]
//!   only applies when the stored dataset still matches a [`SyncGuard`],
//!   and reports whether it did. Callers turn a `false` into a
//!   concurrent-update error instead of overwriting someone else's write.
//! - Operations spanning several rows (voie soft-delete cascade, voie to
//!   toponyme conversion, numero batches) run in a single transaction.

use chrono::{DateTime, Utc};

use crate::domain::{
    newtypes::{BaseLocaleId, NumeroId, ToponymeId, VoieId},
    BaseLocale, BaseLocaleStatus, Numero, PositionType, SyncRecord, SyncStatus, Toponyme, Voie,
};

// ============================================================================
// Query filters
// ============================================================================

/// Filter criteria for listing datasets
///
/// All fields are optional; when `None`, no filtering is applied for that field.
/// Multiple filters are combined with AND logic.
#[derive(Debug, Clone, Default)]
pub struct BaseLocaleFilter {
    /// Filter by dataset status
    pub status: Option<BaseLocaleStatus>,
    /// Filter by sync status
    pub sync_status: Option<Vec<SyncStatus>>,
    /// Filter by the sync pause flag
    pub is_paused: Option<bool>,
    /// Include soft-deleted datasets
    pub include_deleted: bool,
}

impl BaseLocaleFilter {
    /// Creates a new empty filter (matches all live datasets)
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the status filter
    pub fn with_status(mut self, status: BaseLocaleStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Restricts to datasets whose sync status is one of `statuses`
    pub fn with_sync_status(mut self, statuses: Vec<SyncStatus>) -> Self {
        self.sync_status = Some(statuses);
        self
    }

    /// Sets the pause flag filter
    pub fn with_paused(mut self, paused: bool) -> Self {
        self.is_paused = Some(paused);
        self
    }

    /// Includes soft-deleted datasets
    pub fn including_deleted(mut self) -> Self {
        self.include_deleted = true;
        self
    }

    /// Datasets the periodic scheduler should reconcile
    pub fn schedulable() -> Self {
        Self::new()
            .with_status(BaseLocaleStatus::Published)
            .with_sync_status(vec![SyncStatus::Synced, SyncStatus::Outdated])
            .with_paused(false)
    }
}

/// Filter criteria for listing numeros of a dataset
#[derive(Debug, Clone)]
pub struct NumeroFilter {
    /// Owning dataset (required)
    pub bal_id: BaseLocaleId,
    /// Restrict to one voie
    pub voie_id: Option<VoieId>,
    /// Restrict to one toponyme
    pub toponyme_id: Option<ToponymeId>,
    /// Restrict to these ids
    pub ids: Option<Vec<NumeroId>>,
    /// Include soft-deleted numeros
    pub include_deleted: bool,
}

impl NumeroFilter {
    /// Live numeros of a dataset
    pub fn for_bal(bal_id: BaseLocaleId) -> Self {
        Self {
            bal_id,
            voie_id: None,
            toponyme_id: None,
            ids: None,
            include_deleted: false,
        }
    }

    /// Sets the voie filter
    pub fn with_voie(mut self, voie_id: VoieId) -> Self {
        self.voie_id = Some(voie_id);
        self
    }

    /// Sets the toponyme filter
    pub fn with_toponyme(mut self, toponyme_id: ToponymeId) -> Self {
        self.toponyme_id = Some(toponyme_id);
        self
    }

    /// Sets the id filter
    pub fn with_ids(mut self, ids: Vec<NumeroId>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Includes soft-deleted numeros
    pub fn including_deleted(mut self) -> Self {
        self.include_deleted = true;
        self
    }
}

// ============================================================================
// Conditional sync update
// ============================================================================

/// Expected stored state for a conditional sync write
///
/// The write applies only if the dataset is live, has `status`, and, when
/// `sync_status` is set, a sync record in that status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncGuard {
    pub status: BaseLocaleStatus,
    pub sync_status: Option<SyncStatus>,
}

impl SyncGuard {
    /// Guard on dataset status only
    pub fn status(status: BaseLocaleStatus) -> Self {
        Self {
            status,
            sync_status: None,
        }
    }

    /// Guard on dataset status and sync status
    pub fn sync(status: BaseLocaleStatus, sync_status: SyncStatus) -> Self {
        Self {
            status,
            sync_status: Some(sync_status),
        }
    }
}

/// Field changes applied to a batch of numeros
///
/// `None` leaves the field untouched. `toponyme_id: Some(None)` detaches
/// the numeros from their toponyme.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumeroChanges {
    pub voie_id: Option<VoieId>,
    pub toponyme_id: Option<Option<ToponymeId>>,
    pub position_type: Option<PositionType>,
    pub certifie: Option<bool>,
    pub comment: Option<Option<String>>,
}

impl NumeroChanges {
    /// Returns true if no field would change
    pub fn is_empty(&self) -> bool {
        self.voie_id.is_none()
            && self.toponyme_id.is_none()
            && self.position_type.is_none()
            && self.certifie.is_none()
            && self.comment.is_none()
    }
}

// ============================================================================
// IAddressRepository trait
// ============================================================================

/// Port trait for dataset storage
///
/// Datasets and their children share one trait to avoid proliferating
/// small repository traits; the cascade rules need to touch several of
/// them inside one operation.
///
/// Getters return soft-deleted records too; callers check `is_deleted()`.
#[async_trait::async_trait]
pub trait IAddressRepository: Send + Sync {
    // --- BaseLocale operations ---

    /// Saves a dataset (insert or update), including its sync record
    async fn save_base_locale(&self, bal: &BaseLocale) -> anyhow::Result<()>;

    /// Retrieves a dataset by ID
    async fn get_base_locale(&self, id: &BaseLocaleId) -> anyhow::Result<Option<BaseLocale>>;

    /// Lists datasets matching the filter, oldest first
    async fn query_base_locales(
        &self,
        filter: &BaseLocaleFilter,
    ) -> anyhow::Result<Vec<BaseLocale>>;

    /// Sets the dataset `updatedAt`
    async fn touch_base_locale(&self, id: &BaseLocaleId, at: DateTime<Utc>)
        -> anyhow::Result<()>;

    /// Writes status and sync record if the stored dataset matches `guard`
    ///
    /// Returns `false` when no row matched. Writing a record in
    /// [`SyncStatus::Conflict`] must come with `status == Replaced`.
    async fn update_sync(
        &self,
        id: &BaseLocaleId,
        guard: &SyncGuard,
        status: BaseLocaleStatus,
        sync: &SyncRecord,
    ) -> anyhow::Result<bool>;

    /// Sets the pause flag if the sync status is synced or outdated
    ///
    /// Returns `false` when no row matched.
    async fn set_sync_paused(&self, id: &BaseLocaleId, paused: bool) -> anyhow::Result<bool>;

    /// Sets or clears the dataset soft-delete timestamp
    async fn set_base_locale_deleted(
        &self,
        id: &BaseLocaleId,
        deleted_at: Option<DateTime<Utc>>,
    ) -> anyhow::Result<()>;

    // --- Voie operations ---

    /// Saves a voie (insert or update)
    async fn save_voie(&self, voie: &Voie) -> anyhow::Result<()>;

    /// Retrieves a voie by ID
    async fn get_voie(&self, id: &VoieId) -> anyhow::Result<Option<Voie>>;

    /// Lists live voies of a dataset, by name
    async fn list_voies(&self, bal_id: &BaseLocaleId) -> anyhow::Result<Vec<Voie>>;

    /// Permanently deletes a voie and its numeros
    ///
    /// Returns `false` if the voie did not exist.
    async fn delete_voie(&self, id: &VoieId) -> anyhow::Result<bool>;

    /// Soft-deletes a voie and all its live numeros in one transaction
    ///
    /// Returns the number of numeros soft-deleted.
    async fn soft_delete_voie(&self, id: &VoieId, at: DateTime<Utc>) -> anyhow::Result<u64>;

    /// Restores a voie and the given numeros in one transaction
    ///
    /// Returns the number of numeros restored.
    async fn restore_voie(&self, id: &VoieId, numero_ids: &[NumeroId]) -> anyhow::Result<u64>;

    /// Inserts `toponyme` and deletes the voie in one transaction
    ///
    /// Returns `false` (and writes nothing) if the voie has live numeros.
    async fn convert_voie_to_toponyme(
        &self,
        voie_id: &VoieId,
        toponyme: &Toponyme,
    ) -> anyhow::Result<bool>;

    // --- Numero operations ---

    /// Saves a numero (insert or update)
    async fn save_numero(&self, numero: &Numero) -> anyhow::Result<()>;

    /// Retrieves a numero by ID
    async fn get_numero(&self, id: &NumeroId) -> anyhow::Result<Option<Numero>>;

    /// Lists numeros matching the filter, by voie then number
    async fn query_numeros(&self, filter: &NumeroFilter) -> anyhow::Result<Vec<Numero>>;

    /// Counts live numeros of a dataset
    async fn count_numeros(&self, bal_id: &BaseLocaleId) -> anyhow::Result<u64>;

    /// Permanently deletes a numero
    async fn delete_numero(&self, id: &NumeroId) -> anyhow::Result<bool>;

    /// Applies `changes` to the live numeros `ids` of a dataset
    ///
    /// Returns the number of numeros modified.
    async fn update_numeros(
        &self,
        bal_id: &BaseLocaleId,
        ids: &[NumeroId],
        changes: &NumeroChanges,
        at: DateTime<Utc>,
    ) -> anyhow::Result<u64>;

    /// Soft-deletes the live numeros `ids` of a dataset
    async fn soft_delete_numeros(
        &self,
        bal_id: &BaseLocaleId,
        ids: &[NumeroId],
        at: DateTime<Utc>,
    ) -> anyhow::Result<u64>;

    /// Permanently deletes the numeros `ids` of a dataset
    async fn delete_numeros(&self, bal_id: &BaseLocaleId, ids: &[NumeroId])
        -> anyhow::Result<u64>;

    // --- Toponyme operations ---

    /// Saves a toponyme (insert or update)
    async fn save_toponyme(&self, toponyme: &Toponyme) -> anyhow::Result<()>;

    /// Retrieves a toponyme by ID
    async fn get_toponyme(&self, id: &ToponymeId) -> anyhow::Result<Option<Toponyme>>;

    /// Lists live toponymes of a dataset, by name
    async fn list_toponymes(&self, bal_id: &BaseLocaleId) -> anyhow::Result<Vec<Toponyme>>;

    /// Permanently deletes a toponyme, detaching its numeros
    async fn delete_toponyme(&self, id: &ToponymeId) -> anyhow::Result<bool>;

    /// Sets the toponyme `updatedAt`
    async fn touch_toponyme(&self, id: &ToponymeId, at: DateTime<Utc>) -> anyhow::Result<()>;
}
