// SPDX-License-Identifier: MIT

//! Reaper task (spec.md §4.3): on a fixed cadence, sweep RUNNING jobs whose
//! `started_at` predates the configured timeout, mark each FAILED("timeout"),
//! and best-effort clean up its sandbox handle.

use crate::config::SchedulerConfig;
use crate::worker::RunningJobs;
use chrono::Utc;
use sf_eventbus::EventPublisher;
use sf_sandbox::SandboxBackend;
use sf_storage::Store;
use sf_wire::{EventEnvelope, EventPayload};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const TIMEOUT_REASON: &str = "timeout";

pub async fn run(
    store: Arc<Store>,
    backend: Arc<dyn SandboxBackend>,
    publisher: Arc<dyn EventPublisher>,
    running: RunningJobs,
    config: SchedulerConfig,
    shutdown: CancellationToken,
) {
    let cutoff = config.job_timeout + chrono::Duration::from_std(config.executor_grace).unwrap_or_default();

    loop {
        tokio::select! {
            _ = tokio::time::sleep(config.reaper_interval) => {}
            _ = shutdown.cancelled() => return,
        }

        let now = Utc::now();
        let wedged = match store.reap_timeouts(cutoff, now).await {
            Ok(jobs) => jobs,
            Err(err) => {
                tracing::error!(error = %err, "reap_timeouts query failed");
                continue;
            }
        };

        for job in wedged {
            tracing::warn!(job_id = %job.id, "reaping timed-out job");
            if let Some(handle) = &job.sandbox_handle {
                backend.cleanup(handle).await;
            }
            // If this process still owns a worker for the job, stop its
            // executor too, instead of leaving it to run to completion
            // after the row has already moved to a terminal state.
            if let Some(token) = running.lock().get(&job.id) {
                token.cancel();
            }
            if let Err(err) = store.mark_failed(job.id, TIMEOUT_REASON, now).await {
                tracing::error!(job_id = %job.id, error = %err, "failed to mark timed-out job FAILED");
                continue;
            }
            let envelope = EventEnvelope::new(
                EventPayload::BacktestFailed {
                    job_id: job.id,
                    strategy_id: job.strategy_id,
                    error: TIMEOUT_REASON.to_string(),
                },
                now,
            );
            if let Err(err) = publisher.publish(&envelope).await {
                tracing::warn!(error = %err, "failed to publish backtest.failed for reaped job");
            }
        }
    }
}
