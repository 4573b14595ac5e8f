// SPDX-License-Identifier: MIT

//! Worker task (spec.md §4.3): receive `(job, sandbox_handle)`; invoke the
//! executor; on return, write the result or error in a call that also
//! transitions job status; emit the corresponding event; release the
//! worker slot.

use crate::metrics::SchedulerMetrics;
use chrono::Utc;
use sf_core::{BacktestJob, BacktestResult, JobId};
use sf_eventbus::EventPublisher;
use sf_sandbox::guard::ContainerGuard;
use sf_sandbox::{ExecutionRequest, SandboxBackend, SandboxError};
use sf_storage::Store;
use sf_wire::{EventEnvelope, EventPayload};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Shared registry of cancellation tokens for in-flight jobs, so a
/// dispatcher-side watcher can signal a specific worker when `cancel_job`
/// transitions a RUNNING row (spec.md §5).
pub type RunningJobs = Arc<parking_lot::Mutex<HashMap<JobId, CancellationToken>>>;

/// Run one job end to end. Always releases the worker slot and sandbox
/// handle on return, including on cancellation or a sandbox-side failure.
pub async fn run_job(
    store: Arc<Store>,
    backend: Arc<dyn SandboxBackend>,
    publisher: Arc<dyn EventPublisher>,
    metrics: Arc<SchedulerMetrics>,
    running: RunningJobs,
    job: BacktestJob,
) {
    metrics.worker_started();
    let cancel = CancellationToken::new();
    running.lock().insert(job.id, cancel.clone());

    let outcome = execute(&store, &backend, &job, cancel).await;

    running.lock().remove(&job.id);
    metrics.worker_finished();

    let now = Utc::now();
    match outcome {
        Ok(report) => {
            let result = BacktestResult::new(
                job.id,
                job.strategy_id,
                report.metrics.clone(),
                report.per_instrument,
                report.raw_log,
                report.trade_ledger,
                now,
            );
            if let Err(err) = store.mark_completed(job.id, now).await {
                tracing::error!(job_id = %job.id, error = %err, "failed to mark job completed");
                return;
            }
            if let Err(err) = store.create_result(&result).await {
                tracing::error!(job_id = %job.id, error = %err, "failed to persist backtest result");
                return;
            }
            let payload = EventPayload::BacktestCompleted {
                job_id: job.id,
                strategy_id: job.strategy_id,
                result_id: result.id,
                sharpe_ratio: result.metrics.sharpe_ratio,
                profit_pct: result.metrics.profit_pct,
                total_trades: result.metrics.total_trades,
            };
            publish(&publisher, payload, now).await;
        }
        Err(SandboxError::Cancelled) => {
            // `cancel_job` already transitioned the row to CANCELLED before
            // this worker's cancellation token fired; nothing left to
            // persist and no dedicated event exists for job cancellation.
            tracing::info!(job_id = %job.id, "job execution stopped: cancelled");
        }
        Err(err) => {
            let message = describe(&err);
            if let Err(store_err) = store.mark_failed(job.id, &message, now).await {
                tracing::error!(job_id = %job.id, error = %store_err, "failed to mark job failed");
                return;
            }
            let payload =
                EventPayload::BacktestFailed { job_id: job.id, strategy_id: job.strategy_id, error: message };
            publish(&publisher, payload, now).await;
        }
    }
}

async fn execute(
    store: &Store,
    backend: &Arc<dyn SandboxBackend>,
    job: &BacktestJob,
    cancel: CancellationToken,
) -> Result<sf_sandbox::BacktestReport, SandboxError> {
    let strategy = store
        .get_strategy(job.strategy_id)
        .await
        .map_err(|e| SandboxError::Executor(e.to_string()))?;

    let request = ExecutionRequest { job_id: job.id, strategy_code: strategy.code, config: job.config.clone() };
    let (handle_tx, handle_rx) = tokio::sync::oneshot::channel();

    let backend_for_run = backend.clone();
    let cancel_for_run = cancel.clone();
    let run_fut = tokio::spawn(async move { backend_for_run.run(&request, cancel_for_run, handle_tx).await });

    // Persist the handle as soon as the backend allocates it, without
    // blocking on container exit (spec.md §4.2).
    let store_for_handle = store;
    let job_id = job.id;
    let backend_for_guard = backend.clone();
    let handle_task = async move {
        if let Ok(handle) = handle_rx.await {
            let guard = ContainerGuard::new(handle.clone(), backend_for_guard);
            if let Err(err) = store_for_handle.set_sandbox_handle(job_id, &handle).await {
                tracing::warn!(job_id = %job_id, error = %err, "failed to persist sandbox handle");
            }
            Some(guard)
        } else {
            None
        }
    };

    let (guard, run_result) = tokio::join!(handle_task, run_fut);
    if let Some(guard) = guard {
        guard.release().await;
    }

    run_result.map_err(|e| SandboxError::Executor(format!("worker task panicked: {e}")))?
}

async fn publish(publisher: &Arc<dyn EventPublisher>, payload: EventPayload, now: chrono::DateTime<Utc>) {
    let envelope = EventEnvelope::new(payload, now);
    if let Err(err) = publisher.publish(&envelope).await {
        tracing::warn!(error = %err, routing_key = envelope.routing_key(), "failed to publish event");
    }
}

fn describe(err: &SandboxError) -> String {
    match err {
        SandboxError::Timeout => "timeout".to_string(),
        SandboxError::Cancelled => "cancelled".to_string(),
        other => other.to_string(),
    }
}
