//! Pause and resume

use balsync_core::domain::BaseLocaleId;
use balsync_core::ports::IAddressRepository;
use balsync_core::usecases::ServiceError;
use balsync_sync::engine::PAUSE_MESSAGE;
use balsync_sync::SyncOptions;

use crate::common::{foreign_revision, harness};

#[tokio::test]
async fn test_pause_then_resume() {
    let h = harness().await;
    let bal = h.published().await;

    let paused = h.engine.pause(bal.id()).await.unwrap();
    assert!(paused.is_sync_paused());

    let resumed = h.engine.resume(bal.id()).await.unwrap();
    assert!(!resumed.is_sync_paused());
}

#[tokio::test]
async fn test_pause_outdated() {
    let h = harness().await;
    let bal = h.published().await;
    h.touch(&bal).await;
    h.engine.reconcile(bal.id()).await.unwrap();

    let paused = h.engine.pause(bal.id()).await.unwrap();
    assert!(paused.is_sync_paused());
}

#[tokio::test]
async fn test_pause_draft_is_refused() {
    let h = harness().await;
    let draft = h.draft().await;

    let err = h.engine.pause(draft.id()).await.unwrap_err();
    assert!(matches!(err, ServiceError::PreconditionFailed(ref m) if m == PAUSE_MESSAGE));
}

#[tokio::test]
async fn test_resume_in_conflict_is_refused() {
    let h = harness().await;
    let bal = h.published().await;
    h.depot.set_current(bal.commune(), Some(foreign_revision("rev-other", None)));
    h.engine
        .synchronize(bal.id(), SyncOptions::default())
        .await
        .unwrap();

    let err = h.engine.resume(bal.id()).await.unwrap_err();
    assert!(err.is_precondition_failed());
    assert!(h.reload(&bal).await.is_sync_paused());
}

#[tokio::test]
async fn test_pause_unknown_is_not_found() {
    let h = harness().await;
    let err = h.engine.pause(&BaseLocaleId::new()).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { .. }));
}

#[tokio::test]
async fn test_pause_does_not_touch_dataset() {
    let h = harness().await;
    let bal = h.published().await;
    h.engine.pause(bal.id()).await.unwrap();

    let stored = h.repo.get_base_locale(bal.id()).await.unwrap().unwrap();
    assert_eq!(stored.updated_at(), bal.updated_at());
}
