//! Reconciliation and republication of published datasets

use balsync_core::domain::{BaseLocaleStatus, ContentHash, SyncStatus};
use balsync_core::ports::IAddressRepository;
use balsync_core::usecases::ServiceError;
use balsync_sync::SyncOptions;

use crate::common::{foreign_revision, harness};

#[tokio::test]
async fn test_unchanged_dataset_is_not_republished() {
    let h = harness().await;
    let bal = h.published().await;

    let again = h
        .engine
        .synchronize(bal.id(), SyncOptions::default())
        .await
        .unwrap();

    assert_eq!(again.sync().unwrap().status(), SyncStatus::Synced);
    assert_eq!(h.depot.published_count(), 1);
}

#[tokio::test]
async fn test_reconcile_marks_outdated() {
    let h = harness().await;
    let bal = h.published().await;
    h.touch(&bal).await;

    let record = h.engine.reconcile(bal.id()).await.unwrap().unwrap();

    assert_eq!(record.status(), SyncStatus::Outdated);
    let stored = h.reload(&bal).await;
    assert_eq!(stored.sync_status(), Some(SyncStatus::Outdated));
    assert_eq!(h.depot.published_count(), 1);
}

#[tokio::test]
async fn test_reconcile_draft_returns_stored_record() {
    let h = harness().await;
    let draft = h.draft().await;
    assert!(h.engine.reconcile(draft.id()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_changed_content_is_republished() {
    let h = harness().await;
    let bal = h.published().await;
    h.edit(&bal, 2).await;

    let synced = h
        .engine
        .synchronize(bal.id(), SyncOptions::default())
        .await
        .unwrap();

    let sync = synced.sync().unwrap();
    assert_eq!(synced.status(), BaseLocaleStatus::Published);
    assert_eq!(sync.status(), SyncStatus::Synced);
    assert_eq!(sync.last_uploaded_revision_id().as_str(), "rev-2");
    assert_eq!(sync.current_updated(), synced.updated_at());
    assert_eq!(h.depot.published_count(), 2);
    // Only the first publication sends a mail
    assert_eq!(h.mailer.sent_count(), 1);
}

#[tokio::test]
async fn test_touched_but_identical_content_is_marked_synced() {
    let h = harness().await;
    let bal = h.published().await;
    h.touch(&bal).await;

    let synced = h
        .engine
        .synchronize(bal.id(), SyncOptions::default())
        .await
        .unwrap();

    let sync = synced.sync().unwrap();
    assert_eq!(sync.status(), SyncStatus::Synced);
    assert_eq!(sync.last_uploaded_revision_id().as_str(), "rev-1");
    assert_eq!(sync.current_updated(), synced.updated_at());
    assert_eq!(h.depot.published_count(), 1);
}

#[tokio::test]
async fn test_foreign_revision_is_conflict() {
    let h = harness().await;
    let bal = h.published().await;
    h.depot.set_current(
        bal.commune(),
        Some(foreign_revision("rev-other", Some(ContentHash::of(b"x")))),
    );

    let replaced = h
        .engine
        .synchronize(bal.id(), SyncOptions::default())
        .await
        .unwrap();

    assert_eq!(replaced.status(), BaseLocaleStatus::Replaced);
    let sync = replaced.sync().unwrap();
    assert_eq!(sync.status(), SyncStatus::Conflict);
    assert!(sync.is_paused());
    assert_eq!(h.depot.published_count(), 1);
}

#[tokio::test]
async fn test_no_remote_revision_is_conflict() {
    let h = harness().await;
    let bal = h.published().await;
    h.depot.set_current(bal.commune(), None);

    let replaced = h
        .engine
        .synchronize(bal.id(), SyncOptions::default())
        .await
        .unwrap();
    assert_eq!(replaced.status(), BaseLocaleStatus::Replaced);
    assert_eq!(replaced.sync_status(), Some(SyncStatus::Conflict));
}

#[tokio::test]
async fn test_conflict_without_force_is_left_alone() {
    let h = harness().await;
    let bal = h.published().await;
    h.depot.set_current(bal.commune(), Some(foreign_revision("rev-other", None)));
    h.engine
        .synchronize(bal.id(), SyncOptions::default())
        .await
        .unwrap();

    let again = h
        .engine
        .synchronize(bal.id(), SyncOptions::default())
        .await
        .unwrap();

    assert_eq!(again.status(), BaseLocaleStatus::Replaced);
    assert_eq!(h.depot.published_count(), 1);
}

#[tokio::test]
async fn test_forced_republication_escapes_conflict() {
    let h = harness().await;
    let bal = h.published().await;
    h.depot.set_current(bal.commune(), Some(foreign_revision("rev-other", None)));

    let republished = h
        .engine
        .synchronize(bal.id(), SyncOptions::forced())
        .await
        .unwrap();

    assert_eq!(republished.status(), BaseLocaleStatus::Published);
    let sync = republished.sync().unwrap();
    assert_eq!(sync.status(), SyncStatus::Synced);
    assert!(!sync.is_paused());
    assert_eq!(sync.last_uploaded_revision_id().as_str(), "rev-2");
    assert!(h
        .metrics
        .encode()
        .unwrap()
        .contains("balsync_publications_total{kind=\"forced\"} 1"));
}

#[tokio::test]
async fn test_forced_republication_of_identical_remote_content() {
    let h = harness().await;
    let bal = h.published().await;
    let file = h.depot.state.lock().unwrap().published[0].clone();
    h.depot.set_current(
        bal.commune(),
        Some(foreign_revision(
            "rev-other",
            Some(ContentHash::of(file.as_bytes())),
        )),
    );

    let synced = h
        .engine
        .synchronize(bal.id(), SyncOptions::forced())
        .await
        .unwrap();

    assert_eq!(synced.status(), BaseLocaleStatus::Published);
    assert_eq!(
        synced.sync().unwrap().last_uploaded_revision_id().as_str(),
        "rev-1"
    );
    assert_eq!(synced.sync_status(), Some(SyncStatus::Synced));
    assert_eq!(h.depot.published_count(), 1);
}

#[tokio::test]
async fn test_paused_dataset_can_still_be_synchronized() {
    let h = harness().await;
    let bal = h.published().await;
    h.engine.pause(bal.id()).await.unwrap();
    h.edit(&bal, 3).await;

    let synced = h
        .engine
        .synchronize(bal.id(), SyncOptions::default())
        .await
        .unwrap();

    assert_eq!(synced.sync_status(), Some(SyncStatus::Synced));
    assert!(!synced.is_sync_paused());
    assert_eq!(h.depot.published_count(), 2);
}

#[tokio::test]
async fn test_published_without_record_is_refused() {
    let h = harness().await;
    let mut bal = h.draft().await;
    bal.set_status(BaseLocaleStatus::Published);
    h.repo.save_base_locale(&bal).await.unwrap();

    let err = h
        .engine
        .synchronize(bal.id(), SyncOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::PreconditionFailed(_)));
}

#[tokio::test]
async fn test_reconcile_twice_when_synced() {
    let h = harness().await;
    let bal = h.published().await;

    let first = h.engine.reconcile(bal.id()).await.unwrap().unwrap();
    let second = h.engine.reconcile(bal.id()).await.unwrap().unwrap();

    assert_eq!(first.status(), SyncStatus::Synced);
    assert_eq!(first, second);
    assert_eq!(h.reload(&bal).await.sync(), Some(&second));
}

#[tokio::test]
async fn test_reconcile_twice_when_outdated() {
    let h = harness().await;
    let bal = h.published().await;
    h.touch(&bal).await;

    let first = h.engine.reconcile(bal.id()).await.unwrap().unwrap();
    let stored = h.reload(&bal).await;
    let second = h.engine.reconcile(bal.id()).await.unwrap().unwrap();

    assert_eq!(first.status(), SyncStatus::Outdated);
    assert_eq!(first, second);
    assert_eq!(h.reload(&bal).await, stored);
}

#[tokio::test]
async fn test_reconcile_twice_when_conflict() {
    let h = harness().await;
    let bal = h.published().await;
    h.depot.set_current(
        bal.commune(),
        Some(foreign_revision("rev-other", Some(ContentHash::of(b"x")))),
    );

    let first = h.engine.reconcile(bal.id()).await.unwrap().unwrap();
    let stored = h.reload(&bal).await;
    let second = h.engine.reconcile(bal.id()).await.unwrap().unwrap();

    assert_eq!(first.status(), SyncStatus::Conflict);
    assert_eq!(stored.status(), BaseLocaleStatus::Replaced);
    assert_eq!(first, second);
    assert_eq!(h.reload(&bal).await, stored);
}
