// SPDX-License-Identifier: MIT

//! `sfd` — the composition root (spec.md §9: "Hold them in a composition
//! root; do not thread them through module-level variables"). Startup
//! order is fixed: store → event bus → executor → scheduler → hub → scout
//! scheduler → request surface. Grounded on `oj-daemon::lifecycle`'s
//! startup/reconcile ordering, adapted from that crate's in-process daemon
//! to this one's networked services.

mod bridge;
mod config;

use config::{DaemonConfig, SandboxBackendKind, SHUTDOWN_DEADLINE};
use sf_coordinator::Coordinator;
use sf_eventbus::AmqpEventBus;
use sf_gateway::Hub;
use sf_sandbox::{DockerBackend, K8sBackend, SandboxBackend};
use sf_scheduler::Scheduler;
use sf_scout::ScoutScheduler;
use sf_storage::Store;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = DaemonConfig::load();

    // store
    let store = Arc::new(Store::connect(&config.database_url, config.db_max_connections).await?);
    store.migrate().await?;
    tracing::info!("connected to store and applied migrations");

    // event bus
    let event_bus = AmqpEventBus::connect(&config.eventbus_config()).await?;
    let eventbus_pool = event_bus.pool();
    let publisher: Arc<dyn sf_eventbus::EventPublisher> = Arc::new(event_bus);
    tracing::info!(exchange = %config.exchange, "connected to event bus");

    // executor
    let backend: Arc<dyn SandboxBackend> = match config.sandbox_backend {
        SandboxBackendKind::Docker => Arc::new(DockerBackend::connect(config.sandbox_config())?),
        SandboxBackendKind::K8s => {
            Arc::new(K8sBackend::connect(config.k8s_namespace.clone(), config.sandbox_config()).await?)
        }
    };
    tracing::info!(backend = ?config.sandbox_backend, "sandbox backend ready");

    // scheduler
    let scheduler =
        Scheduler::spawn(store.clone(), backend.clone(), publisher.clone(), config.scheduler_config()).await;
    let scheduler_metrics = scheduler.metrics();
    tracing::info!(worker_count = config.worker_count, "scheduler started");

    // hub
    let hub = Hub::spawn();
    let bridge_subscription = bridge::spawn(eventbus_pool, config.eventbus_config(), hub.clone()).await?;
    tracing::info!("realtime gateway bridged to event bus");

    // scout scheduler
    let scout = ScoutScheduler::spawn(store.clone(), publisher.clone(), sf_scout::ScoutConfig::default());
    tracing::info!("scout scheduler started");

    // request surface
    let coordinator = Arc::new(Coordinator::new(store.clone(), publisher.clone()));
    let state = sf_api::AppState {
        store: store.clone(),
        coordinator,
        scout: scout.coordinator().clone(),
        scheduler_metrics,
        hub,
    };
    let app = sf_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "request surface listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutting down");
    bridge_subscription.cancel();
    let drain = async {
        scheduler.shutdown().await;
        scout.shutdown().await;
    };
    if tokio::time::timeout(SHUTDOWN_DEADLINE, drain).await.is_err() {
        tracing::warn!("shutdown deadline elapsed with background tasks still draining");
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(%err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::warn!(%err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
