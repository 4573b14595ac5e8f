// SPDX-License-Identifier: MIT

//! Integration tests against a real Postgres, provisioned per-test by
//! `sqlx::test` (mirrors `sf-storage`'s own test style). A fake
//! `SandboxBackend` stands in for the real executor so these exercise
//! dispatch, completion, reaping, and recovery without a container
//! runtime.

use crate::{Scheduler, SchedulerConfig};
use async_trait::async_trait;
use chrono::Utc;
use sf_core::{BacktestConfig, BacktestJob, Metrics, Stake, Strategy};
use sf_eventbus::testing::RecordingPublisher;
use sf_eventbus::EventPublisher;
use sf_sandbox::{BacktestReport, ExecutionRequest, HandleSink, SandboxBackend, SandboxError, SandboxResult};
use sf_storage::Store;
use sf_wire::routing_key;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn sample_strategy() -> Strategy {
    Strategy::new_root("mean-reversion", "fn entry() {}", Utc::now())
}

fn sample_config() -> BacktestConfig {
    BacktestConfig {
        venue: "binance".into(),
        symbols: vec!["BTC/USDT".into()],
        timeframe: "1h".into(),
        start: "2024-01-01".into(),
        end: "2024-06-01".into(),
        initial_wallet: 1000.0,
        max_open_trades: 3,
        stake: Stake::Amount(100.0),
    }
}

/// Always succeeds immediately with a fixed report.
struct AlwaysSucceeds;

#[async_trait]
impl SandboxBackend for AlwaysSucceeds {
    async fn run(&self, _r: &ExecutionRequest, _c: CancellationToken, on_handle: HandleSink) -> SandboxResult<BacktestReport> {
        let _ = on_handle.send(sf_core::SandboxHandle("fake-container".into()));
        Ok(BacktestReport {
            metrics: Metrics { total_trades: 3, sharpe_ratio: 1.5, profit_pct: 4.2, ..Metrics::default() },
            per_instrument: Default::default(),
            raw_log: "ok".into(),
            trade_ledger: None,
        })
    }

    async fn cleanup(&self, _handle: &sf_core::SandboxHandle) {}

    async fn is_alive(&self, _handle: &sf_core::SandboxHandle) -> bool {
        false
    }
}

/// Never returns until cancelled, so reaper/recovery paths can be driven
/// deterministically by the test instead of racing a real timeout.
struct HangsUntilCancelled {
    handle_sent: AtomicBool,
}

#[async_trait]
impl SandboxBackend for HangsUntilCancelled {
    async fn run(&self, _r: &ExecutionRequest, cancel: CancellationToken, on_handle: HandleSink) -> SandboxResult<BacktestReport> {
        if !self.handle_sent.swap(true, Ordering::SeqCst) {
            let _ = on_handle.send(sf_core::SandboxHandle("hung-container".into()));
        }
        cancel.cancelled().await;
        Err(SandboxError::Cancelled)
    }

    async fn cleanup(&self, _handle: &sf_core::SandboxHandle) {}

    async fn is_alive(&self, _handle: &sf_core::SandboxHandle) -> bool {
        false
    }
}

#[sqlx::test(migrations = "../storage/migrations")]
async fn claimed_job_completes_and_persists_a_result(pool: sqlx::PgPool) {
    let store = Arc::new(Store::from_pool(pool));
    let strategy = sample_strategy();
    store.submit_strategy(&strategy).await.unwrap();

    let job = BacktestJob::new(strategy.id, sample_config(), 0, Utc::now());
    store.submit_job(&job).await.unwrap();

    let backend: Arc<dyn SandboxBackend> = Arc::new(AlwaysSucceeds);
    let publisher = Arc::new(RecordingPublisher::default());
    let config = SchedulerConfig { poll_interval: Duration::from_millis(20), ..SchedulerConfig::default() };

    let scheduler =
        Scheduler::spawn(store.clone(), backend, publisher.clone() as Arc<dyn EventPublisher>, config).await;

    let completed = wait_for(Duration::from_secs(2), || async {
        store.get_job(job.id).await.unwrap().status == sf_core::JobStatus::Completed
    })
    .await;
    assert!(completed, "job did not reach COMPLETED within the deadline");

    let result = store.get_result_by_job(job.id).await.unwrap();
    assert!(result.is_some(), "a result row must be written on completion");
    assert_eq!(result.unwrap().metrics.total_trades, 3);

    let keys = publisher.routing_keys();
    assert!(keys.iter().any(|k| k == routing_key::BACKTEST_SUBMITTED));
    assert!(keys.iter().any(|k| k == routing_key::BACKTEST_COMPLETED));

    scheduler.shutdown().await;
}

#[sqlx::test(migrations = "../storage/migrations")]
async fn reaper_marks_a_wedged_job_failed_with_timeout(pool: sqlx::PgPool) {
    let store = Arc::new(Store::from_pool(pool));
    let strategy = sample_strategy();
    store.submit_strategy(&strategy).await.unwrap();

    let job = BacktestJob::new(strategy.id, sample_config(), 0, Utc::now());
    store.submit_job(&job).await.unwrap();

    let backend: Arc<dyn SandboxBackend> =
        Arc::new(HangsUntilCancelled { handle_sent: AtomicBool::new(false) });
    let publisher = Arc::new(RecordingPublisher::default());
    let config = SchedulerConfig {
        poll_interval: Duration::from_millis(20),
        reaper_interval: Duration::from_millis(30),
        job_timeout: chrono::Duration::milliseconds(1),
        executor_grace: Duration::from_millis(1),
        ..SchedulerConfig::default()
    };

    let scheduler =
        Scheduler::spawn(store.clone(), backend, publisher.clone() as Arc<dyn EventPublisher>, config).await;

    let failed = wait_for(Duration::from_secs(2), || async {
        store.get_job(job.id).await.unwrap().status == sf_core::JobStatus::Failed
    })
    .await;
    assert!(failed, "wedged job was not reaped within the deadline");

    let row = store.get_job(job.id).await.unwrap();
    assert_eq!(row.error.as_deref(), Some("timeout"));

    scheduler.shutdown().await;
}

#[sqlx::test(migrations = "../storage/migrations")]
async fn startup_recovery_fails_orphaned_running_jobs(pool: sqlx::PgPool) {
    let store = Arc::new(Store::from_pool(pool));
    let strategy = sample_strategy();
    store.submit_strategy(&strategy).await.unwrap();

    let job = BacktestJob::new(strategy.id, sample_config(), 0, Utc::now());
    store.submit_job(&job).await.unwrap();
    let handle = sf_core::SandboxHandle("dead-on-restart".into());
    store.mark_running(job.id, &handle, Utc::now()).await.unwrap();

    let backend: Arc<dyn SandboxBackend> = Arc::new(AlwaysSucceeds);
    let publisher = Arc::new(RecordingPublisher::default());
    crate::recovery::recover(&store, &backend, &(publisher.clone() as Arc<dyn EventPublisher>)).await;

    let row = store.get_job(job.id).await.unwrap();
    assert_eq!(row.status, sf_core::JobStatus::Failed);
    assert_eq!(row.error.as_deref(), Some("orphaned"));
}

async fn wait_for<F, Fut>(deadline: Duration, mut predicate: F) -> bool
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
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}
