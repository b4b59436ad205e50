//! Scheduler passes

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use balsync_core::domain::{HabilitationId, SyncStatus};
use balsync_core::ports::IAddressRepository;
use balsync_sync::SyncScheduler;

use crate::common::harness;

fn scheduler(h: &crate::common::Harness) -> SyncScheduler {
    SyncScheduler::new(h.engine.clone(), h.repo.clone(), Duration::from_secs(3600))
        .with_metrics(h.metrics.clone())
}

#[tokio::test]
async fn test_pass_skips_paused_and_drafts() {
    let h = harness().await;
    let active = h.published().await;
    let paused = h.published().await;
    h.draft().await;
    h.engine.pause(paused.id()).await.unwrap();
    h.edit(&active, 2).await;
    h.edit(&paused, 2).await;

    let pass = scheduler(&h).run_once().await.unwrap();

    assert_eq!(pass.selected, 1);
    assert_eq!(pass.synchronized, 1);
    assert_eq!(pass.failed, 0);
    // Two first publications plus the republication of `active`
    assert_eq!(h.depot.published_count(), 3);
    assert_eq!(h.reload(&paused).await.sync_status(), Some(SyncStatus::Synced));
    assert!(h
        .metrics
        .encode()
        .unwrap()
        .contains("balsync_scheduled_datasets 1"));
}

#[tokio::test]
async fn test_failure_does_not_stop_the_pass() {
    let h = harness().await;
    let broken = h.published().await;
    let healthy = h.published().await;

    let mut stored = h.reload(&broken).await;
    stored.set_habilitation(Some(HabilitationId::new("hab-unknown").unwrap()));
    h.repo.save_base_locale(&stored).await.unwrap();
    h.edit(&healthy, 5).await;

    let pass = scheduler(&h).run_once().await.unwrap();

    assert_eq!(pass.selected, 2);
    assert_eq!(pass.synchronized, 1);
    assert_eq!(pass.failed, 1);
    assert_eq!(h.reload(&healthy).await.sync_status(), Some(SyncStatus::Synced));
}

#[tokio::test]
async fn test_run_stops_on_cancellation() {
    let h = harness().await;
    let bal = h.published().await;
    h.edit(&bal, 2).await;

    let scheduler = scheduler(&h);
    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    let handle = tokio::spawn(async move { scheduler.run(token).await });

    // The first tick fires immediately
    for _ in 0..100 {
        if h.depot.published_count() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    shutdown.cancel();

    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("scheduler did not stop")
        .unwrap();
    assert_eq!(h.depot.published_count(), 2);
}
