// SPDX-License-Identifier: MIT

//! `SandboxBackend` — the contract between the scheduler's worker tasks
//! and an isolated container runtime (spec.md §4.2).

use crate::error::SandboxResult;
use crate::report::BacktestReport;
use async_trait::async_trait;
use sf_core::{BacktestConfig, JobId, SandboxHandle};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// Everything a backend needs to launch one backtest, decoupled from
/// `sf-storage` so the sandbox crate never depends on the persistence
/// layer (the worker task fetches the strategy source and passes it in),
/// mirroring the teacher's `AgentConfig` — a dedicated spawn-config struct
/// rather than the raw `Job` entity.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub job_id: JobId,
    pub strategy_code: String,
    pub config: BacktestConfig,
}

/// One-shot channel a backend uses to hand the allocated [`SandboxHandle`]
/// back to the caller as soon as the container exists, without waiting for
/// it to finish (spec.md §4.2: "Record the sandbox handle; return it to
/// the scheduler before blocking on termination").
pub type HandleSink = oneshot::Sender<SandboxHandle>;

/// Given a job, produce either a parsed result or a typed failure, in
/// isolation from the host (spec.md §4.2).
#[async_trait]
pub trait SandboxBackend: Send + Sync + 'static {
    /// Launch `request` in an isolated container. Sends the allocated
    /// handle on `on_handle` immediately after creation, then blocks until
    /// the container exits, is cancelled via `cancel`, or the configured
    /// timeout elapses.
    ///
    /// Timeout semantics: if wall clock exceeds the configured timeout,
    /// terminate the sandbox and return [`crate::error::SandboxError::Timeout`]
    /// without attempting to parse partial output. Graceful termination is
    /// attempted first (request stop, wait the grace period), then forced.
    async fn run(
        &self,
        request: &ExecutionRequest,
        cancel: CancellationToken,
        on_handle: HandleSink,
    ) -> SandboxResult<BacktestReport>;

    /// Best-effort cleanup of a handle whose owning job was reaped or
    /// found orphaned at startup (spec.md §4.3, §9: handle release is a
    /// correctness requirement on every exit path, not best-effort, but a
    /// handle surviving a scheduler crash can only be cleaned up
    /// best-effort on the next process's watch).
    async fn cleanup(&self, handle: &SandboxHandle);

    /// Whether the container behind `handle` is still alive. Used by the
    /// scheduler's startup crash recovery (spec.md §4.3): a RUNNING job row
    /// whose handle is no longer live is marked FAILED("orphaned").
    async fn is_alive(&self, handle: &SandboxHandle) -> bool;
}
