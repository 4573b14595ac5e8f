// SPDX-License-Identifier: MIT

//! `BacktestJob` persistence: the priority queue and its transactional
//! dequeue primitive (spec.md §4.1).

use crate::error::{map_write_error, not_found, StorageResult};
use crate::repo::rows::{job_status_parse, job_status_str, JobRow};
use crate::store::Store;
use chrono::{DateTime, Utc};
use sf_core::{BacktestConfig, BacktestJob, JobId, JobQuery, JobStatus, QueueStats, RunId, SandboxHandle, StrategyId};

impl Store {
    /// Insert a new PENDING job. `BacktestConfig` validation is the
    /// caller's responsibility (spec.md §3); foreign keys are enforced by
    /// the schema.
    pub async fn submit_job(&self, job: &BacktestJob) -> StorageResult<()> {
        let config = serde_json::to_value(&job.config)
            .map_err(|e| sf_core::DomainError::Internal(e.to_string()))?;
        sqlx::query(
            r#"
            INSERT INTO backtest_jobs
                (id, strategy_id, optimization_run_id, config, priority, status,
                 sandbox_handle, error, retry_count, created_at, started_at, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(job.id.as_uuid())
        .bind(job.strategy_id.as_uuid())
        .bind(job.optimization_run_id.map(|v| v.as_uuid()))
        .bind(config)
        .bind(job.priority)
        .bind(job_status_str(job.status))
        .bind(job.sandbox_handle.as_ref().map(|h| h.0.clone()))
        .bind(&job.error)
        .bind(job.retry_count as i32)
        .bind(job.created_at)
        .bind(job.started_at)
        .bind(job.completed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "backtest_job"))?;
        Ok(())
    }

    /// The transactional dequeue primitive (spec.md §4.1): atomically
    /// selects up to `limit` PENDING jobs ordered by `(priority DESC,
    /// created_at ASC)`, skipping rows already locked by a concurrent
    /// claim, and transitions them straight to RUNNING in the same
    /// statement. This is the sole mechanism guaranteeing at-most-one
    /// worker per job under parallel dispatch (testable property 4).
    pub async fn claim_pending(&self, limit: i64, now: DateTime<Utc>) -> StorageResult<Vec<BacktestJob>> {
        let rows = sqlx::query_as::<_, JobRow>(
            r#"
            WITH claimed AS (
                SELECT id
                FROM backtest_jobs
                WHERE status = 'pending'
                ORDER BY priority DESC, created_at ASC
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE backtest_jobs
            SET status = 'running', started_at = $2
            WHERE id IN (SELECT id FROM claimed)
            RETURNING id, strategy_id, optimization_run_id, config, priority, status,
                      sandbox_handle, error, retry_count, created_at, started_at, completed_at
            "#,
        )
        .bind(limit)
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "backtest_job"))?;

        rows.into_iter().map(BacktestJob::try_from).collect()
    }

    /// Attach the sandbox handle allocated for an already-RUNNING job
    /// (claimed via `claim_pending`, which sets RUNNING without a handle
    /// since the handle is only known once the executor launches).
    pub async fn set_sandbox_handle(&self, job_id: JobId, handle: &SandboxHandle) -> StorageResult<()> {
        let result = sqlx::query(
            "UPDATE backtest_jobs SET sandbox_handle = $1 WHERE id = $2 AND status = 'running'",
        )
        .bind(&handle.0)
        .bind(job_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "backtest_job"))?;
        if result.rows_affected() == 0 {
            return Err(sf_core::DomainError::JobAlreadyRunning(job_id.to_string()).into());
        }
        Ok(())
    }

    /// Transition PENDING→RUNNING directly (used when a caller claims and
    /// transitions a single job outside `claim_pending`, e.g. re-dispatch).
    pub async fn mark_running(&self, job_id: JobId, handle: &SandboxHandle, now: DateTime<Utc>) -> StorageResult<()> {
        let result = sqlx::query(
            "UPDATE backtest_jobs SET status = 'running', sandbox_handle = $1, started_at = $2 \
             WHERE id = $3 AND status = 'pending'",
        )
        .bind(&handle.0)
        .bind(now)
        .bind(job_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "backtest_job"))?;
        if result.rows_affected() == 0 {
            return Err(sf_core::DomainError::JobAlreadyRunning(job_id.to_string()).into());
        }
        Ok(())
    }

    /// RUNNING→COMPLETED. No-op (not an error) if the job is already
    /// COMPLETED, per spec.md §4.1 idempotence.
    pub async fn mark_completed(&self, job_id: JobId, now: DateTime<Utc>) -> StorageResult<()> {
        self.mark_terminal(job_id, JobStatus::Completed, None, now).await
    }

    /// RUNNING→FAILED with a reason. No-op if already FAILED.
    pub async fn mark_failed(&self, job_id: JobId, message: &str, now: DateTime<Utc>) -> StorageResult<()> {
        self.mark_terminal(job_id, JobStatus::Failed, Some(message), now).await
    }

    async fn mark_terminal(
        &self,
        job_id: JobId,
        target: JobStatus,
        message: Option<&str>,
        now: DateTime<Utc>,
    ) -> StorageResult<()> {
        let current = self.get_job(job_id).await?;
        if current.status == target {
            return Ok(());
        }
        let result = sqlx::query(
            "UPDATE backtest_jobs SET status = $1, error = $2, completed_at = $3 \
             WHERE id = $4 AND status = 'running'",
        )
        .bind(job_status_str(target))
        .bind(message)
        .bind(now)
        .bind(job_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "backtest_job"))?;
        if result.rows_affected() == 0 {
            return Err(sf_core::DomainError::InvalidTransition(format!(
                "job {job_id} is not RUNNING (currently {})",
                current.status
            ))
            .into());
        }
        Ok(())
    }

    /// PENDING/RUNNING → CANCELLED. Does not itself stop an executor; the
    /// scheduler polls for this transition (spec.md §4.1, §5).
    pub async fn cancel_job(&self, job_id: JobId, now: DateTime<Utc>) -> StorageResult<()> {
        let result = sqlx::query(
            "UPDATE backtest_jobs SET status = 'cancelled', completed_at = $1 \
             WHERE id = $2 AND status IN ('pending', 'running')",
        )
        .bind(now)
        .bind(job_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "backtest_job"))?;
        if result.rows_affected() == 0 {
            let current = self.get_job(job_id).await?;
            return Err(sf_core::DomainError::JobNotCancellable(format!(
                "job {job_id} is {} and cannot be cancelled",
                current.status
            ))
            .into());
        }
        Ok(())
    }

    /// RUNNING jobs whose `started_at` predates `now - cutoff` (spec.md
    /// §4.1, §4.3 reaper task).
    pub async fn reap_timeouts(&self, cutoff: chrono::Duration, now: DateTime<Utc>) -> StorageResult<Vec<BacktestJob>> {
        let threshold = now - cutoff;
        let rows = sqlx::query_as::<_, JobRow>(
            "SELECT id, strategy_id, optimization_run_id, config, priority, status, \
             sandbox_handle, error, retry_count, created_at, started_at, completed_at \
             FROM backtest_jobs WHERE status = 'running' AND started_at < $1",
        )
        .bind(threshold)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "backtest_job"))?;
        rows.into_iter().map(BacktestJob::try_from).collect()
    }

    /// All jobs currently RUNNING, used by crash recovery on startup
    /// (spec.md §4.3) to detect orphaned rows whose sandbox handle is no
    /// longer live.
    pub async fn list_running(&self) -> StorageResult<Vec<BacktestJob>> {
        let rows = sqlx::query_as::<_, JobRow>(
            "SELECT id, strategy_id, optimization_run_id, config, priority, status, \
             sandbox_handle, error, retry_count, created_at, started_at, completed_at \
             FROM backtest_jobs WHERE status = 'running'",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "backtest_job"))?;
        rows.into_iter().map(BacktestJob::try_from).collect()
    }

    pub async fn get_job(&self, job_id: JobId) -> StorageResult<BacktestJob> {
        let row = sqlx::query_as::<_, JobRow>(
            "SELECT id, strategy_id, optimization_run_id, config, priority, status, \
             sandbox_handle, error, retry_count, created_at, started_at, completed_at \
             FROM backtest_jobs WHERE id = $1",
        )
        .bind(job_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "backtest_job"))?
        .ok_or_else(|| not_found("backtest_job", job_id))?;
        row.try_into()
    }

    /// Filtered, paginated job listing (spec.md §6.1 `GET /backtests`).
    pub async fn list_jobs(&self, query: &JobQuery) -> StorageResult<(Vec<BacktestJob>, u64)> {
        let page = query.page.max(1);
        let page_size = query.page_size.max(1);
        let offset = (page - 1) as i64 * page_size as i64;

        let strategy_id = query.strategy_id.map(StrategyId::as_uuid);
        let run_id = query.optimization_run_id.map(RunId::as_uuid);
        let status = query.status.map(job_status_str);

        let rows = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT id, strategy_id, optimization_run_id, config, priority, status,
                   sandbox_handle, error, retry_count, created_at, started_at, completed_at
            FROM backtest_jobs
            WHERE ($1::uuid IS NULL OR strategy_id = $1)
              AND ($2::uuid IS NULL OR optimization_run_id = $2)
              AND ($3::text IS NULL OR status = $3)
              AND ($4::timestamptz IS NULL OR created_at >= $4)
              AND ($5::timestamptz IS NULL OR created_at < $5)
            ORDER BY created_at DESC
            LIMIT $6 OFFSET $7
            "#,
        )
        .bind(strategy_id)
        .bind(run_id)
        .bind(status)
        .bind(query.created_after)
        .bind(query.created_before)
        .bind(page_size as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "backtest_job"))?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM backtest_jobs
            WHERE ($1::uuid IS NULL OR strategy_id = $1)
              AND ($2::uuid IS NULL OR optimization_run_id = $2)
              AND ($3::text IS NULL OR status = $3)
              AND ($4::timestamptz IS NULL OR created_at >= $4)
              AND ($5::timestamptz IS NULL OR created_at < $5)
            "#,
        )
        .bind(strategy_id)
        .bind(run_id)
        .bind(status)
        .bind(query.created_after)
        .bind(query.created_before)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "backtest_job"))?;

        let jobs: StorageResult<Vec<_>> = rows.into_iter().map(BacktestJob::try_from).collect();
        Ok((jobs?, total.max(0) as u64))
    }

    /// Aggregate queue stats for `/backtests/queue/stats` and scheduler
    /// observability (spec.md §4.3, §6.1).
    pub async fn queue_stats(&self) -> StorageResult<QueueStats> {
        let pending: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM backtest_jobs WHERE status = 'pending'")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| map_write_error(e, "backtest_job"))?;
        let running: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM backtest_jobs WHERE status = 'running'")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| map_write_error(e, "backtest_job"))?;
        let avg_wait_ms: Option<f64> = sqlx::query_scalar(
            "SELECT AVG(EXTRACT(EPOCH FROM (started_at - created_at)) * 1000) \
             FROM backtest_jobs WHERE started_at IS NOT NULL",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "backtest_job"))?;
        let avg_run_ms: Option<f64> = sqlx::query_scalar(
            "SELECT AVG(EXTRACT(EPOCH FROM (completed_at - started_at)) * 1000) \
             FROM backtest_jobs WHERE completed_at IS NOT NULL AND started_at IS NOT NULL",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "backtest_job"))?;

        Ok(QueueStats {
            pending_jobs: pending.max(0) as u64,
            running_jobs: running.max(0) as u64,
            avg_wait_ms: avg_wait_ms.unwrap_or(0.0),
            avg_run_ms: avg_run_ms.unwrap_or(0.0),
        })
    }

    /// Used by `sf-coordinator` when building an iteration's config so it
    /// never has to round-trip through JSON itself.
    pub async fn job_config(&self, job_id: JobId) -> StorageResult<BacktestConfig> {
        Ok(self.get_job(job_id).await?.config)
    }
}
