//! First publication and preconditions

use std::sync::Arc;

use balsync_core::domain::{
    BaseLocale, BaseLocaleId, BaseLocaleStatus, CodeCommune, HabilitationId, HabilitationStatus,
    SyncStatus,
};
use balsync_core::ports::IAddressRepository;
use balsync_core::usecases::ServiceError;
use balsync_sync::engine::{
    DEMO_MESSAGE, EXPIRED_HABILITATION_MESSAGE, INVALID_HABILITATION_MESSAGE,
    NO_HABILITATION_MESSAGE, NO_NUMERO_MESSAGE,
};
use balsync_sync::SyncOptions;

use crate::common::{habilitation, harness, harness_with, FakeDepot, RecordingMailer};

fn precondition(err: ServiceError) -> String {
    match err {
        ServiceError::PreconditionFailed(reason) => reason,
        other => panic!("expected a precondition failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_first_publication() {
    let h = harness().await;
    let draft = h.draft().await;

    let bal = h
        .engine
        .synchronize(draft.id(), SyncOptions::default())
        .await
        .unwrap();

    assert_eq!(bal.status(), BaseLocaleStatus::Published);
    let sync = bal.sync().unwrap();
    assert_eq!(sync.status(), SyncStatus::Synced);
    assert!(!sync.is_paused());
    assert_eq!(sync.last_uploaded_revision_id().as_str(), "rev-1");
    assert_eq!(sync.current_updated(), bal.updated_at());

    assert_eq!(h.depot.published_count(), 1);
    let sent = h.mailer.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1[0].as_str(), "mairie@test.fr");

    let metrics = h.metrics.encode().unwrap();
    assert!(metrics.contains("balsync_publications_total{kind=\"first\"} 1"));
    assert!(metrics.contains("balsync_sync_runs_total{outcome=\"published\"} 1"));
}

#[tokio::test]
async fn test_published_file_is_the_export() {
    let h = harness().await;
    h.published().await;

    let state = h.depot.state.lock().unwrap();
    assert!(state.published[0].starts_with("cle_interop;commune_insee;"));
    assert!(state.published[0].contains("54084_xxxx_00001;54084;rue de la gare"));
}

#[tokio::test]
async fn test_mail_failure_does_not_fail_publication() {
    let h = harness_with(
        FakeDepot::with_habilitation(habilitation(HabilitationStatus::Accepted, Some(30))),
        RecordingMailer::failing(),
    )
    .await;
    let draft = h.draft().await;

    let bal = h
        .engine
        .synchronize(draft.id(), SyncOptions::default())
        .await
        .unwrap();
    assert_eq!(bal.status(), BaseLocaleStatus::Published);
}

#[tokio::test]
async fn test_demo_is_refused() {
    let h = harness().await;
    let mut demo = BaseLocale::new_demo(CodeCommune::new("54084").unwrap(), None);
    demo.set_habilitation(Some(HabilitationId::new("hab-1").unwrap()));
    h.repo.save_base_locale(&demo).await.unwrap();

    let err = h
        .engine
        .synchronize(demo.id(), SyncOptions::default())
        .await
        .unwrap_err();
    assert_eq!(precondition(err), DEMO_MESSAGE);
    assert_eq!(h.depot.published_count(), 0);
}

#[tokio::test]
async fn test_missing_habilitation_is_refused() {
    let h = harness().await;
    let mut draft = h.draft().await;
    draft.set_habilitation(None);
    h.repo.save_base_locale(&draft).await.unwrap();

    let err = h
        .engine
        .synchronize(draft.id(), SyncOptions::default())
        .await
        .unwrap_err();
    assert_eq!(precondition(err), NO_HABILITATION_MESSAGE);
}

#[tokio::test]
async fn test_unknown_habilitation_is_not_found() {
    let h = harness_with(FakeDepot::default(), RecordingMailer::default()).await;
    let draft = h.draft().await;

    let err = h
        .engine
        .synchronize(draft.id(), SyncOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { entity: "Habilitation", .. }));
}

#[tokio::test]
async fn test_pending_habilitation_is_refused() {
    let h = harness_with(
        FakeDepot::with_habilitation(habilitation(HabilitationStatus::Pending, Some(30))),
        RecordingMailer::default(),
    )
    .await;
    let draft = h.draft().await;

    let err = h
        .engine
        .synchronize(draft.id(), SyncOptions::default())
        .await
        .unwrap_err();
    assert_eq!(precondition(err), INVALID_HABILITATION_MESSAGE);
}

#[tokio::test]
async fn test_expired_habilitation_is_refused() {
    for expires_in in [Some(-1), None] {
        let h = harness_with(
            FakeDepot::with_habilitation(habilitation(HabilitationStatus::Accepted, expires_in)),
            RecordingMailer::default(),
        )
        .await;
        let draft = h.draft().await;

        let err = h
            .engine
            .synchronize(draft.id(), SyncOptions::default())
            .await
            .unwrap_err();
        assert_eq!(precondition(err), EXPIRED_HABILITATION_MESSAGE);
    }
}

#[tokio::test]
async fn test_empty_dataset_is_refused() {
    let h = harness().await;
    let draft = h.draft().await;
    let voies = h.repo.list_voies(draft.id()).await.unwrap();
    h.repo.delete_voie(voies[0].id()).await.unwrap();

    let err = h
        .engine
        .synchronize(draft.id(), SyncOptions::default())
        .await
        .unwrap_err();
    assert_eq!(precondition(err), NO_NUMERO_MESSAGE);
    assert_eq!(h.depot.published_count(), 0);
}

#[tokio::test]
async fn test_missing_or_deleted_dataset_is_not_found() {
    let h = harness().await;
    let err = h
        .engine
        .synchronize(&BaseLocaleId::new(), SyncOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { .. }));

    let draft = h.draft().await;
    h.repo
        .set_base_locale_deleted(draft.id(), Some(chrono::Utc::now()))
        .await
        .unwrap();
    let err = h
        .engine
        .synchronize(draft.id(), SyncOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { .. }));
}

#[tokio::test]
async fn test_publish_failure_leaves_draft() {
    let h = harness().await;
    h.depot.state.lock().unwrap().fail_publish = true;
    let draft = h.draft().await;

    let err = h
        .engine
        .synchronize(draft.id(), SyncOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.http_status(), 502);
    assert!(err.to_string().contains("deposit service unavailable"));
    let stored = h.reload(&draft).await;
    assert_eq!(stored.status(), BaseLocaleStatus::Draft);
    assert!(stored.sync().is_none());
    assert_eq!(h.mailer.sent_count(), 0);
}

#[tokio::test]
async fn test_concurrent_publication_is_reported() {
    let h = harness().await;
    let draft = h.draft().await;

    // Another writer publishes the dataset while our upload is in flight
    let mut raced = h.reload(&draft).await;
    raced.set_status(BaseLocaleStatus::Published);
    raced.set_sync(Some(balsync_core::domain::SyncRecord::synced(
        raced.updated_at(),
        balsync_core::domain::RevisionId::new("rev-other").unwrap(),
    )));
    *h.depot.concurrent_write.lock().unwrap() = Some((Arc::clone(&h.repo), raced));

    let err = h
        .engine
        .synchronize(draft.id(), SyncOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::ConcurrentUpdate(_)));
    let stored = h.reload(&draft).await;
    assert_eq!(
        stored.sync().unwrap().last_uploaded_revision_id().as_str(),
        "rev-other"
    );
    assert!(h
        .metrics
        .encode()
        .unwrap()
        .contains("balsync_concurrent_updates_total 1"));
}
