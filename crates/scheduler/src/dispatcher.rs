// SPDX-License-Identifier: MIT

//! Dispatcher task (spec.md §4.3): repeatedly polls for work with a small
//! idle backoff that shrinks toward zero when the queue is non-empty.
//! Computes available slots, claims up to that many PENDING jobs via the
//! transactional dequeue primitive, and hands each to a worker task.

use crate::config::SchedulerConfig;
use crate::metrics::SchedulerMetrics;
use crate::worker::{self, RunningJobs};
use chrono::Utc;
use sf_eventbus::EventPublisher;
use sf_sandbox::SandboxBackend;
use sf_storage::Store;
use sf_wire::{EventEnvelope, EventPayload};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

pub async fn run(
    store: Arc<Store>,
    backend: Arc<dyn SandboxBackend>,
    publisher: Arc<dyn EventPublisher>,
    metrics: Arc<SchedulerMetrics>,
    running: RunningJobs,
    config: SchedulerConfig,
    semaphore: Arc<Semaphore>,
    shutdown: CancellationToken,
) {
    loop {
        if shutdown.is_cancelled() {
            return;
        }

        let available = semaphore.available_permits();
        let claimed = if available > 0 {
            match store.claim_pending(available as i64, Utc::now()).await {
                Ok(jobs) => jobs,
                Err(err) => {
                    tracing::error!(error = %err, "claim_pending failed");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        if claimed.is_empty() {
            tokio::select! {
                _ = tokio::time::sleep(config.poll_interval) => {}
                _ = shutdown.cancelled() => return,
            }
            continue;
        }

        for job in claimed {
            let permit = match semaphore.clone().try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => {
                    // Raced with another claim batch; the job stays RUNNING
                    // and will be picked up by the reaper if nothing ever
                    // frees a slot for it (should not happen in steady state
                    // since `available` bounded the claim size).
                    tracing::warn!(job_id = %job.id, "no free worker slot for claimed job");
                    continue;
                }
            };

            let envelope = EventEnvelope::new(
                EventPayload::BacktestSubmitted { job_id: job.id, strategy_id: job.strategy_id },
                Utc::now(),
            );
            let publisher_for_submit = publisher.clone();
            tokio::spawn(async move {
                if let Err(err) = publisher_for_submit.publish(&envelope).await {
                    tracing::warn!(error = %err, "failed to publish backtest.submitted");
                }
            });

            let store = store.clone();
            let backend = backend.clone();
            let publisher = publisher.clone();
            let metrics = metrics.clone();
            let running = running.clone();
            tokio::spawn(async move {
                let _permit = permit;
                worker::run_job(store, backend, publisher, metrics, running, job).await;
            });
        }

        // Non-empty claim: loop again immediately rather than sleeping, so
        // the poll interval shrinks toward zero under load (spec.md §4.3).
    }
}
