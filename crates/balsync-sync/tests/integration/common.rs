//! Shared harness for publication engine tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::bail;
use chrono::{Duration, Utc};

use balsync_cache::{DatabasePool, SqliteAddressRepository};
use balsync_core::domain::{
    newtypes::{BaseLocaleId, CodeCommune, ContentHash, Email, HabilitationId, RevisionId},
    BaseLocale, GeoPoint, Habilitation, HabilitationStatus, Numero, Position, PositionType,
    Revision, RevisionFile, Voie,
};
use balsync_core::ports::{EmailMessage, IAddressRepository, IDepositClient, IMailer};
use balsync_export::CsvExporter;
use balsync_sync::PublicationEngine;
use balsync_telemetry::MetricsRegistry;

pub const HABILITATION: &str = "hab-1";

// ============================================================================
// Deposit service double
// ============================================================================

#[derive(Default)]
pub struct DepotState {
    pub habilitations: Vec<Habilitation>,
    /// Current revision per commune
    pub current: HashMap<String, Revision>,
    pub published: Vec<String>,
    pub fail_publish: bool,
}

/// In-process deposit service keeping one current revision
#[derive(Default)]
pub struct FakeDepot {
    pub state: Mutex<DepotState>,
    /// Dataset written to storage while a publication is in flight
    pub concurrent_write: Mutex<Option<(Arc<SqliteAddressRepository>, BaseLocale)>>,
}

impl FakeDepot {
    pub fn with_habilitation(habilitation: Habilitation) -> Self {
        let depot = Self::default();
        depot.state.lock().unwrap().habilitations.push(habilitation);
        depot
    }

    pub fn published_count(&self) -> usize {
        self.state.lock().unwrap().published.len()
    }

    pub fn set_current(&self, commune: &CodeCommune, revision: Option<Revision>) {
        let mut state = self.state.lock().unwrap();
        match revision {
            Some(revision) => state.current.insert(commune.to_string(), revision),
            None => state.current.remove(commune.as_str()),
        };
    }
}

#[async_trait::async_trait]
impl IDepositClient for FakeDepot {
    async fn find_habilitation(&self, id: &HabilitationId) -> anyhow::Result<Option<Habilitation>> {
        let state = self.state.lock().unwrap();
        Ok(state.habilitations.iter().find(|h| &h.id == id).cloned())
    }

    async fn get_current_revision(
        &self,
        commune: &CodeCommune,
    ) -> anyhow::Result<Option<Revision>> {
        let state = self.state.lock().unwrap();
        Ok(state.current.get(commune.as_str()).cloned())
    }

    async fn publish_new_revision(
        &self,
        commune: &CodeCommune,
        _bal_id: &BaseLocaleId,
        file: &str,
        _habilitation_id: &HabilitationId,
    ) -> anyhow::Result<Revision> {
        let writer = self.concurrent_write.lock().unwrap().take();
        if let Some((repo, bal)) = writer {
            repo.save_base_locale(&bal).await?;
        }

        let mut state = self.state.lock().unwrap();
        if state.fail_publish {
            bail!("deposit service unavailable");
        }
        state.published.push(file.to_string());
        let revision = foreign_revision(
            &format!("rev-{}", state.published.len()),
            Some(ContentHash::of(file.as_bytes())),
        );
        state.current.insert(commune.to_string(), revision.clone());
        Ok(revision)
    }
}

/// A revision as the deposit service would return it
pub fn foreign_revision(id: &str, hash: Option<ContentHash>) -> Revision {
    Revision {
        id: RevisionId::new(id).unwrap(),
        files: vec![RevisionFile {
            kind: "bal".to_string(),
            hash,
        }],
    }
}

pub fn habilitation(status: HabilitationStatus, expires_in_days: Option<i64>) -> Habilitation {
    Habilitation {
        id: HabilitationId::new(HABILITATION).unwrap(),
        status,
        expires_at: expires_in_days.map(|d| Utc::now() + Duration::days(d)),
    }
}

// ============================================================================
// Mailer double
// ============================================================================

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<(EmailMessage, Vec<Email>)>>,
    pub fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl IMailer for RecordingMailer {
    async fn send_mail(&self, message: &EmailMessage, recipients: &[Email]) -> anyhow::Result<()> {
        if self.fail {
            bail!("smtp down");
        }
        self.sent
            .lock()
            .unwrap()
            .push((message.clone(), recipients.to_vec()));
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub repo: Arc<SqliteAddressRepository>,
    pub depot: Arc<FakeDepot>,
    pub mailer: Arc<RecordingMailer>,
    pub metrics: Arc<MetricsRegistry>,
    pub engine: Arc<PublicationEngine>,
    next_commune: AtomicU32,
}

pub async fn harness() -> Harness {
    harness_with(
        FakeDepot::with_habilitation(habilitation(HabilitationStatus::Accepted, Some(180))),
        RecordingMailer::default(),
    )
    .await
}

pub async fn harness_with(depot: FakeDepot, mailer: RecordingMailer) -> Harness {
    let pool = DatabasePool::in_memory()
        .await
        .expect("Failed to create in-memory database");
    let repo = Arc::new(SqliteAddressRepository::new(pool.pool().clone()));
    let depot = Arc::new(depot);
    let mailer = Arc::new(mailer);
    let metrics = Arc::new(MetricsRegistry::new().unwrap());
    let engine = PublicationEngine::new(
        repo.clone(),
        depot.clone(),
        Arc::new(CsvExporter::new(repo.clone())),
        mailer.clone(),
    )
    .with_metrics(metrics.clone());

    Harness {
        repo,
        depot,
        mailer,
        metrics,
        engine: Arc::new(engine),
        next_commune: AtomicU32::new(54084),
    }
}

impl Harness {
    /// Saves a habilitated draft with one voie and one numero
    ///
    /// Each draft gets its own commune, starting at 54084.
    pub async fn draft(&self) -> BaseLocale {
        let commune = self.next_commune.fetch_add(1, Ordering::Relaxed);
        let mut bal = BaseLocale::new(
            "Commune de Test",
            CodeCommune::new(commune.to_string()).unwrap(),
            vec![Email::new("mairie@test.fr").unwrap()],
        )
        .unwrap();
        bal.set_habilitation(Some(HabilitationId::new(HABILITATION).unwrap()));
        self.repo.save_base_locale(&bal).await.unwrap();

        let voie = Voie::new(*bal.id(), "rue de la gare").unwrap();
        self.repo.save_voie(&voie).await.unwrap();
        self.add_numero(&voie, 1).await;
        bal
    }

    /// A draft published once through the engine
    pub async fn published(&self) -> BaseLocale {
        let bal = self.draft().await;
        self.engine
            .synchronize(bal.id(), Default::default())
            .await
            .unwrap()
    }

    pub async fn add_numero(&self, voie: &Voie, n: u32) -> Numero {
        let mut numero = Numero::new(*voie.bal_id(), *voie.id(), n, None).unwrap();
        numero.set_positions(vec![Position::new(
            PositionType::Entree,
            GeoPoint::new(6.18, 48.69).unwrap(),
        )]);
        self.repo.save_numero(&numero).await.unwrap();
        numero
    }

    /// Adds a numero and bumps `updatedAt`, as the cascade would
    pub async fn edit(&self, bal: &BaseLocale, n: u32) {
        let voie = self.repo.list_voies(bal.id()).await.unwrap().remove(0);
        self.add_numero(&voie, n).await;
        self.touch(bal).await;
    }

    /// Bumps `updatedAt` without changing content
    pub async fn touch(&self, bal: &BaseLocale) {
        self.repo
            .touch_base_locale(bal.id(), Utc::now() + Duration::seconds(1))
            .await
            .unwrap();
    }

    pub async fn reload(&self, bal: &BaseLocale) -> BaseLocale {
        self.repo.get_base_locale(bal.id()).await.unwrap().unwrap()
    }
}
