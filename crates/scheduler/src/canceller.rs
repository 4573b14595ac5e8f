// SPDX-License-Identifier: MIT

//! Cancellation watcher (spec.md §5): `cancel_job` transitions the row to
//! CANCELLED immediately, independent of whether a worker in this process
//! currently owns it. This task is the "dispatcher-side watcher" that
//! notices such a transition for a locally in-flight job and signals its
//! worker, which in turn signals the executor.

use crate::worker::RunningJobs;
use sf_core::JobStatus;
use sf_storage::Store;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub async fn run(store: Arc<Store>, running: RunningJobs, poll_interval: Duration, shutdown: CancellationToken) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(poll_interval) => {}
            _ = shutdown.cancelled() => return,
        }

        let in_flight: Vec<_> = running.lock().iter().map(|(id, token)| (*id, token.clone())).collect();
        for (job_id, token) in in_flight {
            if token.is_cancelled() {
                continue;
            }
            match store.get_job(job_id).await {
                Ok(job) if job.status == JobStatus::Cancelled => {
                    tracing::info!(job_id = %job_id, "propagating external cancellation to worker");
                    token.cancel();
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(job_id = %job_id, error = %err, "failed to poll job status for cancellation");
                }
            }
        }
    }
}
