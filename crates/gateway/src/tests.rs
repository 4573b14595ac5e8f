use crate::hub::Hub;
use chrono::Utc;
use sf_core::{JobId, StrategyId};
use sf_wire::{EventEnvelope, EventPayload};
use std::time::Duration;
use uuid::Uuid;

fn submitted_event() -> EventEnvelope {
    EventEnvelope::new(
        EventPayload::BacktestSubmitted { job_id: JobId::new(), strategy_id: StrategyId::new() },
        Utc::now(),
    )
}

#[tokio::test]
async fn an_unfiltered_client_receives_every_broadcast() {
    let hub = Hub::spawn();
    let (tx, mut rx) = tokio::sync::mpsc::channel(8);
    let client_id = Uuid::new_v4();
    hub.register(client_id, tx);

    hub.broadcast(submitted_event());

    let payload = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
    assert!(payload.contains("backtest.submitted"));
}

#[tokio::test]
async fn a_narrowed_filter_drops_non_matching_events() {
    let hub = Hub::spawn();
    let (tx, mut rx) = tokio::sync::mpsc::channel(8);
    let client_id = Uuid::new_v4();
    hub.register(client_id, tx);
    hub.add_filter(client_id, &["optimization".to_string()]);

    hub.broadcast(submitted_event());

    // give the actor a beat to process the filter update before broadcasting
    tokio::time::sleep(Duration::from_millis(20)).await;
    hub.broadcast(submitted_event());

    let result = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
    assert!(result.is_err(), "client should not have received a non-matching event");
}

#[tokio::test]
async fn unregistering_a_client_drops_it_from_the_connected_count() {
    let hub = Hub::spawn();
    let (tx, _rx) = tokio::sync::mpsc::channel(8);
    let client_id = Uuid::new_v4();
    hub.register(client_id, tx);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(hub.connected_count().await, 1);

    hub.unregister(client_id);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(hub.connected_count().await, 0);
}

#[tokio::test]
async fn a_full_client_buffer_gets_disconnected_rather_than_blocking_the_hub() {
    let hub = Hub::spawn();
    let (tx, rx) = tokio::sync::mpsc::channel(1);
    let client_id = Uuid::new_v4();
    hub.register(client_id, tx);

    for _ in 0..4 {
        hub.broadcast(submitted_event());
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(hub.connected_count().await, 0);
    drop(rx);
}
