// SPDX-License-Identifier: MIT

//! Job Scheduler (spec.md §4, C3): the fixed-size worker pool, the
//! transactional dequeue loop, the timeout reaper, startup crash recovery,
//! and the cancellation watcher that ties a `cancel_job` row transition to
//! an in-flight worker's executor. Grounded on the teacher's
//! dispatch/monitor split in `oj-daemon::engine::runtime`, rebuilt against
//! `sf-storage`'s async repository API instead of the teacher's in-memory
//! queue.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod canceller;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod reaper;
pub mod recovery;
pub mod worker;

#[cfg(test)]
mod tests;

pub use config::SchedulerConfig;
pub use error::{SchedulerError, SchedulerResult};
pub use metrics::{SchedulerMetrics, SchedulerSnapshot};

use sf_eventbus::EventPublisher;
use sf_sandbox::SandboxBackend;
use sf_storage::Store;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use worker::RunningJobs;

/// Owns the background tasks that turn queued `BacktestJob` rows into
/// executor runs. Construct with [`Scheduler::spawn`], which performs
/// startup crash recovery before starting the dispatcher, reaper, and
/// cancellation watcher.
pub struct Scheduler {
    store: Arc<Store>,
    metrics: Arc<SchedulerMetrics>,
    running: RunningJobs,
    config: SchedulerConfig,
    shutdown: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

/// Upper bound on how long [`Scheduler::shutdown`] waits for in-flight
/// worker tasks to drain before returning regardless (spec.md §5).
const SHUTDOWN_DEADLINE: std::time::Duration = std::time::Duration::from_secs(30);

impl Scheduler {
    /// Run startup crash recovery, then spawn the dispatcher, reaper, and
    /// cancellation watcher tasks. Returns immediately; tasks run until
    /// [`Scheduler::shutdown`] is called or the process exits.
    pub async fn spawn(
        store: Arc<Store>,
        backend: Arc<dyn SandboxBackend>,
        publisher: Arc<dyn EventPublisher>,
        config: SchedulerConfig,
    ) -> Self {
        let config = config.clamped();
        recovery::recover(&store, &backend, &publisher).await;

        let metrics = Arc::new(SchedulerMetrics::default());
        let running: RunningJobs = Arc::new(parking_lot::Mutex::new(std::collections::HashMap::new()));
        let semaphore = Arc::new(Semaphore::new(config.worker_count));
        let shutdown = CancellationToken::new();

        let dispatcher_task = tokio::spawn(dispatcher::run(
            store.clone(),
            backend.clone(),
            publisher.clone(),
            metrics.clone(),
            running.clone(),
            config.clone(),
            semaphore,
            shutdown.clone(),
        ));

        let reaper_task = tokio::spawn(reaper::run(
            store.clone(),
            backend.clone(),
            publisher.clone(),
            running.clone(),
            config.clone(),
            shutdown.clone(),
        ));

        let canceller_task =
            tokio::spawn(canceller::run(store.clone(), running.clone(), config.poll_interval, shutdown.clone()));

        Self {
            store,
            metrics,
            running,
            config,
            shutdown,
            tasks: vec![dispatcher_task, reaper_task, canceller_task],
        }
    }

    /// In-process worker occupancy plus the durable queue depth, for
    /// `/backtests/queue/stats` and `/metrics` (spec.md §4.3, §6.1).
    pub async fn snapshot(&self) -> SchedulerResult<SchedulerSnapshot> {
        let queue = self.store.queue_stats().await?;
        Ok(SchedulerSnapshot {
            queue,
            active_workers: self.metrics.active_workers(),
            worker_count: self.config.worker_count,
        })
    }

    pub fn metrics(&self) -> Arc<SchedulerMetrics> {
        self.metrics.clone()
    }

    /// Number of jobs this process currently owns a worker task for.
    pub fn in_flight(&self) -> usize {
        self.running.lock().len()
    }

    /// Signal all background tasks to stop, then wait up to the shutdown
    /// deadline for them to drain (spec.md §5: "the dispatcher stops
    /// claiming, workers drain to completion or timeout, the reaper is
    /// halted"). Worker tasks themselves are not tracked here since they
    /// are detached (spawned per job); they complete on their own via the
    /// executor's own timeout/cancellation handling.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        let drain = futures_util::future::join_all(self.tasks);
        if tokio::time::timeout(SHUTDOWN_DEADLINE, drain).await.is_err() {
            tracing::warn!("scheduler shutdown deadline elapsed with tasks still running");
        }
    }
}
