// SPDX-License-Identifier: MIT

//! Startup crash recovery (spec.md §4.3): the previous process may have
//! died with jobs still marked RUNNING. Any such job whose sandbox handle
//! is no longer live is an orphan and is marked FAILED("orphaned"); a job
//! whose handle is still live is left alone — it will either finish
//! naturally or be caught by the reaper once its timeout elapses, since no
//! worker task exists for it in this process to own its completion.

use chrono::Utc;
use sf_eventbus::EventPublisher;
use sf_sandbox::SandboxBackend;
use sf_storage::Store;
use sf_wire::{EventEnvelope, EventPayload};
use std::sync::Arc;

const ORPHANED_REASON: &str = "orphaned";

pub async fn recover(store: &Store, backend: &Arc<dyn SandboxBackend>, publisher: &Arc<dyn EventPublisher>) {
    let running = match store.list_running().await {
        Ok(jobs) => jobs,
        Err(err) => {
            tracing::error!(error = %err, "failed to list RUNNING jobs during startup recovery");
            return;
        }
    };

    for job in running {
        let alive = match &job.sandbox_handle {
            Some(handle) => backend.is_alive(handle).await,
            None => false,
        };
        if alive {
            tracing::info!(job_id = %job.id, "RUNNING job has a live sandbox handle, leaving it alone");
            continue;
        }

        tracing::warn!(job_id = %job.id, "marking orphaned RUNNING job FAILED");
        let now = Utc::now();
        if let Err(err) = store.mark_failed(job.id, ORPHANED_REASON, now).await {
            tracing::error!(job_id = %job.id, error = %err, "failed to mark orphaned job FAILED");
            continue;
        }
        let envelope = EventEnvelope::new(
            EventPayload::BacktestFailed {
                job_id: job.id,
                strategy_id: job.strategy_id,
                error: ORPHANED_REASON.to_string(),
            },
            now,
        );
        if let Err(err) = publisher.publish(&envelope).await {
            tracing::warn!(error = %err, "failed to publish backtest.failed for orphaned job");
        }
    }
}
