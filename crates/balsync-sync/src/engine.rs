//! Publication engine
//!
//! Drives a Base Adresse Locale through its publication lifecycle against
//! the deposit service:
//!
//! ```text
//! DRAFT ──publish──→ PUBLISHED ⇄ (synced | outdated)
//!                        │ foreign revision
//!                        ▼
//!                    REPLACED + conflict ──force──→ PUBLISHED + synced
//! ```
//!
//! Every sync write is conditional on the state the engine read, so two
//! concurrent synchronizations of one dataset cannot both win: the loser
//! gets [`ServiceError::ConcurrentUpdate`].

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use balsync_core::domain::{
    BaseLocale, BaseLocaleId, BaseLocaleStatus, ContentHash, HabilitationId, SyncRecord,
    SyncStatus,
};
use balsync_core::ports::{
    EmailMessage, IAddressRepository, IDepositClient, IExporter, IMailer, SyncGuard,
};
use balsync_core::usecases::{ServiceError, ServiceResult};
use balsync_telemetry::{MetricsRegistry, PublicationKind, SyncOutcome};

use crate::reconcile::{decide, ensure_reconcilable, RECONCILE_STATUS_MESSAGE};

// ============================================================================
// Precondition messages
// ============================================================================

pub const DEMO_MESSAGE: &str =
    "La synchronisation pas possibles pour les Bases Adresses Locales de démo";
pub const NO_HABILITATION_MESSAGE: &str =
    "Aucune habilitation rattachée à cette Base Adresse Locale";
pub const INVALID_HABILITATION_MESSAGE: &str =
    "L’habilitation rattachée n’est pas une habilitation valide";
pub const EXPIRED_HABILITATION_MESSAGE: &str = "L’habilitation rattachée a expiré";
pub const NO_NUMERO_MESSAGE: &str = "La base locale ne possède aucune adresse";
pub const PAUSE_MESSAGE: &str =
    "Le statut de synchronisation doit être actif pour modifier l’état de pause";

/// Options of a synchronization request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Republish even when the dataset is in conflict
    pub force: bool,
}

impl SyncOptions {
    /// Options for a forced republication
    pub fn forced() -> Self {
        Self { force: true }
    }
}

// ============================================================================
// PublicationEngine
// ============================================================================

/// Publishes datasets and keeps their sync record up to date
///
/// ## Dependencies
///
/// - `repository`: dataset storage with conditional sync writes
/// - `depot`: habilitations and revisions of the deposit service
/// - `exporter`: canonical BAL file, uploaded and hashed
/// - `mailer`: notification after a first publication
pub struct PublicationEngine {
    repository: Arc<dyn IAddressRepository + Send + Sync>,
    depot: Arc<dyn IDepositClient + Send + Sync>,
    exporter: Arc<dyn IExporter + Send + Sync>,
    mailer: Arc<dyn IMailer + Send + Sync>,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl PublicationEngine {
    pub fn new(
        repository: Arc<dyn IAddressRepository + Send + Sync>,
        depot: Arc<dyn IDepositClient + Send + Sync>,
        exporter: Arc<dyn IExporter + Send + Sync>,
        mailer: Arc<dyn IMailer + Send + Sync>,
    ) -> Self {
        Self {
            repository,
            depot,
            exporter,
            mailer,
            metrics: None,
        }
    }

    /// Records outcomes in `metrics`
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    // ========================================================================
    // synchronize
    // ========================================================================

    /// Brings a dataset in line with the deposit service
    ///
    /// A draft is published for the first time. A published dataset is
    /// reconciled, then republished if its content changed. A dataset in
    /// conflict is only republished with `force`.
    ///
    /// # Errors
    /// - `NotFound` if the dataset is missing or deleted, or if the
    ///   deposit service does not know its habilitation
    /// - `PreconditionFailed` if the dataset cannot be published
    /// - `RemoteService` if a deposit call fails
    /// - `ConcurrentUpdate` if the dataset changed during the call
    #[instrument(skip(self), fields(force = options.force))]
    pub async fn synchronize(
        &self,
        id: &BaseLocaleId,
        options: SyncOptions,
    ) -> ServiceResult<BaseLocale> {
        let start = Instant::now();
        let result = self.run_synchronize(id, options).await;

        if let Some(metrics) = &self.metrics {
            let outcome = match &result {
                Ok((_, outcome)) => *outcome,
                Err(_) => SyncOutcome::Failed,
            };
            metrics.record_sync(outcome, start.elapsed().as_secs_f64());
            if matches!(result, Err(ServiceError::ConcurrentUpdate(_))) {
                metrics.record_concurrent_update();
            }
        }

        result.map(|(bal, _)| bal)
    }

    async fn run_synchronize(
        &self,
        id: &BaseLocaleId,
        options: SyncOptions,
    ) -> ServiceResult<(BaseLocale, SyncOutcome)> {
        let bal = self.live(id).await?;
        let habilitation_id = self.check_preconditions(&bal).await?;

        match bal.status() {
            BaseLocaleStatus::Draft => self.publish_first(&bal, &habilitation_id).await,
            BaseLocaleStatus::Published | BaseLocaleStatus::Replaced => {
                self.synchronize_published(&bal, &habilitation_id, options)
                    .await
            }
            BaseLocaleStatus::Demo => Err(ServiceError::PreconditionFailed(DEMO_MESSAGE.into())),
        }
    }

    /// Checks every publication precondition, in order
    ///
    /// Returns the habilitation to publish with.
    async fn check_preconditions(&self, bal: &BaseLocale) -> ServiceResult<HabilitationId> {
        if bal.status() == BaseLocaleStatus::Demo {
            return Err(ServiceError::PreconditionFailed(DEMO_MESSAGE.into()));
        }

        let habilitation_id = bal
            .habilitation_id()
            .cloned()
            .ok_or_else(|| ServiceError::PreconditionFailed(NO_HABILITATION_MESSAGE.into()))?;

        let habilitation = self
            .depot
            .find_habilitation(&habilitation_id)
            .await
            .map_err(ServiceError::RemoteService)?
            .ok_or_else(|| ServiceError::not_found("Habilitation", &habilitation_id))?;

        let now = chrono::Utc::now();
        if !habilitation.is_accepted() {
            return Err(ServiceError::PreconditionFailed(
                INVALID_HABILITATION_MESSAGE.into(),
            ));
        }
        if habilitation.is_expired_at(now) {
            return Err(ServiceError::PreconditionFailed(
                EXPIRED_HABILITATION_MESSAGE.into(),
            ));
        }

        let numeros = self
            .repository
            .count_numeros(bal.id())
            .await
            .map_err(ServiceError::Storage)?;
        if numeros == 0 {
            return Err(ServiceError::PreconditionFailed(NO_NUMERO_MESSAGE.into()));
        }

        Ok(habilitation_id)
    }

    /// First publication of a draft
    async fn publish_first(
        &self,
        bal: &BaseLocale,
        habilitation_id: &HabilitationId,
    ) -> ServiceResult<(BaseLocale, SyncOutcome)> {
        let file = self.export(bal).await?;
        let revision = self
            .depot
            .publish_new_revision(bal.commune(), bal.id(), &file, habilitation_id)
            .await
            .map_err(ServiceError::RemoteService)?;

        self.notify_publication(bal).await;

        let record = SyncRecord::synced(bal.updated_at(), revision.id.clone());
        self.write_sync(
            bal.id(),
            SyncGuard::status(BaseLocaleStatus::Draft),
            BaseLocaleStatus::Published,
            &record,
        )
        .await?;

        if let Some(metrics) = &self.metrics {
            metrics.record_publication(PublicationKind::First);
        }
        info!(
            bal_id = %bal.id(),
            commune = %bal.commune(),
            revision_id = %revision.id,
            "First publication"
        );
        Ok((self.live(bal.id()).await?, SyncOutcome::Published))
    }

    /// Reconciles a published dataset and republishes changed content
    async fn synchronize_published(
        &self,
        bal: &BaseLocale,
        habilitation_id: &HabilitationId,
        options: SyncOptions,
    ) -> ServiceResult<(BaseLocale, SyncOutcome)> {
        let (status, record) = self.reconcile_loaded(bal).await?;

        let must_publish = match record.status() {
            SyncStatus::Outdated => true,
            SyncStatus::Conflict => options.force,
            SyncStatus::Synced => false,
        };
        if !must_publish {
            debug!(bal_id = %bal.id(), sync_status = %record.status(), "Nothing to publish");
            return Ok((self.live(bal.id()).await?, SyncOutcome::Unchanged));
        }

        let guard = SyncGuard::sync(status, record.status());
        let file = self.export(bal).await?;
        let hash = ContentHash::of(file.as_bytes());
        let remote = self
            .depot
            .get_current_revision(bal.commune())
            .await
            .map_err(ServiceError::RemoteService)?;

        if let Some(remote) = remote.filter(|r| r.bal_file_hash() == Some(&hash)) {
            // The remote revision may be foreign; the record keeps our last upload
            let synced =
                SyncRecord::synced(bal.updated_at(), record.last_uploaded_revision_id().clone());
            self.write_sync(bal.id(), guard, BaseLocaleStatus::Published, &synced)
                .await?;
            info!(
                bal_id = %bal.id(),
                revision_id = %remote.id,
                "Remote revision already matches local content"
            );
            return Ok((self.live(bal.id()).await?, SyncOutcome::AlreadySynced));
        }

        let revision = self
            .depot
            .publish_new_revision(bal.commune(), bal.id(), &file, habilitation_id)
            .await
            .map_err(ServiceError::RemoteService)?;
        let synced = SyncRecord::synced(bal.updated_at(), revision.id.clone());
        self.write_sync(bal.id(), guard, BaseLocaleStatus::Published, &synced)
            .await?;

        let kind = if record.status() == SyncStatus::Conflict {
            PublicationKind::Forced
        } else {
            PublicationKind::Update
        };
        if let Some(metrics) = &self.metrics {
            metrics.record_publication(kind);
        }
        info!(
            bal_id = %bal.id(),
            revision_id = %revision.id,
            kind = ?kind,
            "Published new revision"
        );
        Ok((self.live(bal.id()).await?, SyncOutcome::Published))
    }

    // ========================================================================
    // reconcile
    // ========================================================================

    /// Reconciles a dataset with the remote current revision
    ///
    /// Returns the sync record after reconciliation, or the stored one
    /// unchanged when the dataset is not published.
    #[instrument(skip(self))]
    pub async fn reconcile(&self, id: &BaseLocaleId) -> ServiceResult<Option<SyncRecord>> {
        let bal = self.live(id).await?;
        if bal.status() != BaseLocaleStatus::Published {
            return Ok(bal.sync().cloned());
        }
        let (_, record) = self.reconcile_loaded(&bal).await?;
        Ok(Some(record))
    }

    /// Returns the dataset status and sync record after reconciliation
    async fn reconcile_loaded(
        &self,
        bal: &BaseLocale,
    ) -> ServiceResult<(BaseLocaleStatus, SyncRecord)> {
        let record = bal
            .sync()
            .ok_or_else(|| ServiceError::PreconditionFailed(RECONCILE_STATUS_MESSAGE.into()))?;
        if bal.status() != BaseLocaleStatus::Published {
            return Ok((bal.status(), record.clone()));
        }
        ensure_reconcilable(record)?;

        let remote = self
            .depot
            .get_current_revision(bal.commune())
            .await
            .map_err(ServiceError::RemoteService)?;
        let verdict = decide(record, bal.updated_at(), remote.as_ref().map(|r| &r.id));

        if let Some(metrics) = &self.metrics {
            metrics.record_reconciliation(verdict.record.status().as_str());
        }

        if verdict.changed {
            self.write_sync(
                bal.id(),
                SyncGuard::sync(BaseLocaleStatus::Published, record.status()),
                verdict.status,
                &verdict.record,
            )
            .await?;
            if verdict.record.status() == SyncStatus::Conflict {
                warn!(
                    bal_id = %bal.id(),
                    last_uploaded = %record.last_uploaded_revision_id(),
                    remote = ?remote.as_ref().map(|r| r.id.as_str()),
                    "Dataset replaced by a foreign revision"
                );
            }
        }

        debug!(
            bal_id = %bal.id(),
            from = %record.status(),
            to = %verdict.record.status(),
            "Reconciled"
        );
        Ok((verdict.status, verdict.record))
    }

    // ========================================================================
    // pause / resume
    // ========================================================================

    /// Stops automatic synchronization of a dataset
    #[instrument(skip(self))]
    pub async fn pause(&self, id: &BaseLocaleId) -> ServiceResult<BaseLocale> {
        self.set_paused(id, true).await
    }

    /// Resumes automatic synchronization of a dataset
    #[instrument(skip(self))]
    pub async fn resume(&self, id: &BaseLocaleId) -> ServiceResult<BaseLocale> {
        self.set_paused(id, false).await
    }

    async fn set_paused(&self, id: &BaseLocaleId, paused: bool) -> ServiceResult<BaseLocale> {
        let bal = self.live(id).await?;
        let allowed = bal
            .sync()
            .is_some_and(|record| record.status().allows_pause_toggle());
        if !allowed {
            return Err(ServiceError::PreconditionFailed(PAUSE_MESSAGE.into()));
        }

        let applied = self
            .repository
            .set_sync_paused(id, paused)
            .await
            .map_err(ServiceError::Storage)?;
        if !applied {
            return Err(ServiceError::PreconditionFailed(PAUSE_MESSAGE.into()));
        }

        info!(bal_id = %id, paused, "Changed sync pause state");
        self.live(id).await
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Reads a live dataset
    async fn live(&self, id: &BaseLocaleId) -> ServiceResult<BaseLocale> {
        self.repository
            .get_base_locale(id)
            .await
            .map_err(ServiceError::Storage)?
            .filter(|bal| !bal.is_deleted())
            .ok_or_else(|| ServiceError::not_found("BaseLocale", id))
    }

    async fn export(&self, bal: &BaseLocale) -> ServiceResult<String> {
        self.exporter
            .export_to_csv(bal)
            .await
            .map_err(ServiceError::Storage)
    }

    /// Conditional sync write; a miss means someone else wrote first
    async fn write_sync(
        &self,
        id: &BaseLocaleId,
        guard: SyncGuard,
        status: BaseLocaleStatus,
        record: &SyncRecord,
    ) -> ServiceResult<()> {
        let applied = self
            .repository
            .update_sync(id, &guard, status, record)
            .await
            .map_err(ServiceError::Storage)?;
        if !applied {
            warn!(
                bal_id = %id,
                expected_status = %guard.status,
                expected_sync = ?guard.sync_status,
                "Sync write lost to a concurrent update"
            );
            return Err(ServiceError::ConcurrentUpdate(format!(
                "Base locale {id} changed during synchronization"
            )));
        }
        Ok(())
    }

    /// Best-effort notification after a first publication
    async fn notify_publication(&self, bal: &BaseLocale) {
        if bal.emails().is_empty() {
            debug!(bal_id = %bal.id(), "No email registered, skipping notification");
            return;
        }
        let message = EmailMessage::publication_notification(bal);
        if let Err(e) = self.mailer.send_mail(&message, bal.emails()).await {
            warn!(
                bal_id = %bal.id(),
                error = %format!("{e:#}"),
                "Failed to send publication email"
            );
        }
    }
}
