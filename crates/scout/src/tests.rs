// SPDX-License-Identifier: MIT

//! Integration tests against a real Postgres, provisioned per-test by
//! `sqlx::test` (mirrors `sf-storage`/`sf-scheduler`'s own test style).
//! Covers spec.md §8 testable property 5 (at most one active `ScoutRun`)
//! and the S6 scenario (trigger/409/cancel/trigger).

use crate::coordinator::ScoutCoordinator;
use crate::{cron_loop, ScoutConfig};
use chrono::Utc;
use sf_core::{DomainError, ScoutSchedule};
use sf_eventbus::testing::RecordingPublisher;
use sf_eventbus::EventPublisher;
use sf_storage::{Store, StorageError};
use sf_wire::routing_key;
use std::sync::Arc;

fn coordinator(store: Arc<Store>) -> (Arc<ScoutCoordinator>, Arc<RecordingPublisher>) {
    let publisher = Arc::new(RecordingPublisher::default());
    let coordinator = Arc::new(ScoutCoordinator::new(store, publisher.clone() as Arc<dyn EventPublisher>));
    (coordinator, publisher)
}

#[sqlx::test(migrations = "../storage/migrations")]
async fn manual_trigger_creates_a_pending_run_and_publishes_scout_trigger(pool: sqlx::PgPool) {
    let store = Arc::new(Store::from_pool(pool));
    let (coordinator, publisher) = coordinator(store.clone());

    let run = coordinator.trigger_manual("stratninja", None).await.unwrap();
    assert_eq!(run.status, sf_core::ScoutRunStatus::Pending);
    assert_eq!(publisher.routing_keys(), vec![routing_key::SCOUT_TRIGGER]);
}

#[sqlx::test(migrations = "../storage/migrations")]
async fn second_manual_trigger_conflicts_then_succeeds_after_cancel(pool: sqlx::PgPool) {
    let store = Arc::new(Store::from_pool(pool));
    let (coordinator, _publisher) = coordinator(store.clone());

    let first = coordinator.trigger_manual("stratninja", None).await.unwrap();

    let err = coordinator.trigger_manual("stratninja", None).await.unwrap_err();
    assert!(matches!(err, crate::ScoutError::Storage(StorageError::Domain(DomainError::ScoutRunActive))));

    coordinator.cancel(first.id).await.unwrap();

    let second = coordinator.trigger_manual("stratninja", None).await.unwrap();
    assert_ne!(second.id, first.id);
}

#[sqlx::test(migrations = "../storage/migrations")]
async fn scheduled_trigger_is_dropped_silently_when_a_run_is_already_active(pool: sqlx::PgPool) {
    let store = Arc::new(Store::from_pool(pool));
    let (coordinator, publisher) = coordinator(store.clone());

    coordinator.trigger_manual("stratninja", None).await.unwrap();
    let dropped = coordinator.trigger_scheduled("quantconnect-feed", None).await;
    assert!(dropped.is_none());

    // Only the one manual scout.trigger event was published; the dropped
    // scheduled attempt never reaches the bus.
    assert_eq!(publisher.routing_keys(), vec![routing_key::SCOUT_TRIGGER]);
}

#[sqlx::test(migrations = "../storage/migrations")]
async fn due_schedule_fires_once_and_advances_next_run_at(pool: sqlx::PgPool) {
    let store = Arc::new(Store::from_pool(pool));
    let (coordinator, publisher) = coordinator(store.clone());

    let schedule = ScoutSchedule::new("nightly-stratninja", "0 0 0 * * * *", "stratninja", Utc::now());
    store.create_scout_schedule(&schedule).await.unwrap();

    let shutdown = tokio_util::sync::CancellationToken::new();
    let loop_coordinator = coordinator.clone();
    let handle = tokio::spawn(cron_loop::run(
        loop_coordinator,
        std::time::Duration::from_millis(20),
        shutdown.clone(),
    ));

    let fired = wait_for(std::time::Duration::from_secs(2), || {
        let store = store.clone();
        let id = schedule.id;
        async move { store.get_scout_schedule(id).await.unwrap().last_run_at.is_some() }
    })
    .await;
    assert!(fired, "schedule did not fire within the deadline");

    shutdown.cancel();
    handle.await.unwrap();

    let reloaded = store.get_scout_schedule(schedule.id).await.unwrap();
    assert!(reloaded.next_run_at.unwrap() > Utc::now());
    assert_eq!(publisher.routing_keys(), vec![routing_key::SCOUT_TRIGGER]);
}

async fn wait_for<F, Fut>(deadline: std::time::Duration, mut predicate: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = tokio::time::Instant::now();
    loop {
        if predicate().await {
            return true;
        }
        if start.elapsed() > deadline {
            return false;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
}

#[test]
fn default_tick_interval_is_a_small_poll() {
    assert_eq!(ScoutConfig::default().tick_interval, std::time::Duration::from_secs(5));
}
